//! Per-node opinion formation from stake-weighted color tallies.

use crate::events::TangleEvent;
use crate::storage::Storage;
use std::collections::{HashMap, VecDeque};
use tanglesim_types::{Color, MessageId, NodeBehavior, PeerId};

/// Latest color declared by a peer, with the sequence number that carried
/// it. Stale (lower-sequence) messages never replace an opinion.
#[derive(Debug, Clone, Copy, Default)]
pub struct Opinion {
    pub color: Color,
    pub sequence_number: u64,
}

/// How the node derives its own opinion from the tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpinionPolicy {
    /// Argmax by weight, ties to the smaller color.
    Heaviest,
    /// Argmin over the colored tallies, keeping conflicts alive.
    Lightest,
    /// A fixed color, regardless of the tallies.
    Pinned(Color),
}

/// Tracks every peer's latest declared color and derives the node's own
/// opinion as the argmax (honest) over per-color approval weights.
#[derive(Debug)]
pub struct OpinionManager {
    policy: OpinionPolicy,
    own_opinion: Color,
    peer_opinions: HashMap<PeerId, Opinion>,
    /// Stake currently opining each color, indexed by `Color::index()`.
    approval_weights: [u64; 4],
}

impl OpinionManager {
    pub fn new(behavior: NodeBehavior) -> Self {
        let policy = match behavior {
            NodeBehavior::ShiftOpinion => OpinionPolicy::Lightest,
            NodeBehavior::SameOpinion { color } => OpinionPolicy::Pinned(color),
            _ => OpinionPolicy::Heaviest,
        };
        let own_opinion = match policy {
            OpinionPolicy::Pinned(color) => color,
            _ => Color::Undefined,
        };
        Self {
            policy,
            own_opinion,
            peer_opinions: HashMap::new(),
            approval_weights: [0; 4],
        }
    }

    /// The node's current opinion.
    pub fn opinion(&self) -> Color {
        self.own_opinion
    }

    /// Stake currently opining the given color.
    pub fn approval_weight(&self, color: Color) -> u64 {
        self.approval_weights[color.index()]
    }

    /// React to a booked message: update the issuer's declared color and
    /// re-derive the own opinion. Always ends by announcing
    /// `OpinionFormed` for the message.
    pub fn form_opinion(
        &mut self,
        id: MessageId,
        storage: &Storage,
        events: &mut VecDeque<TangleEvent>,
    ) {
        self.update_tallies(id, storage, events);
        events.push_back(TangleEvent::OpinionFormed(id));
    }

    fn update_tallies(
        &mut self,
        id: MessageId,
        storage: &Storage,
        events: &mut VecDeque<TangleEvent>,
    ) {
        let message = storage
            .message(id)
            .unwrap_or_else(|| panic!("booked message {id} not in storage"))
            .clone();
        let color = storage
            .metadata(id)
            .unwrap_or_else(|| panic!("metadata missing for booked message {id}"))
            .inherited_color();
        if color == Color::Undefined {
            return;
        }

        let stake = storage.context().weights.weight(message.issuer);
        let existed = self.peer_opinions.contains_key(&message.issuer);
        let last = self.peer_opinions.entry(message.issuer).or_default();

        if message.sequence_number <= last.sequence_number {
            return;
        }
        last.sequence_number = message.sequence_number;

        if last.color == color {
            return;
        }

        if existed && last.color != Color::Undefined {
            let previous = last.color;
            self.approval_weights[previous.index()] -= stake;
            events.push_back(TangleEvent::ApprovalWeightUpdated {
                color: previous,
                delta: -(stake as i64),
            });
        }

        self.peer_opinions.get_mut(&message.issuer).expect("entry exists").color = color;
        self.approval_weights[color.index()] += stake;
        events.push_back(TangleEvent::ApprovalWeightUpdated {
            color,
            delta: stake as i64,
        });

        self.weights_updated(events);
    }

    /// Re-derive the own opinion after a tally change.
    fn weights_updated(&mut self, events: &mut VecDeque<TangleEvent>) {
        let derived = match self.policy {
            OpinionPolicy::Pinned(color) => color,
            OpinionPolicy::Heaviest => {
                let mut best = Color::Undefined;
                let mut best_weight = 0u64;
                for color in Color::CONCRETE {
                    let weight = self.approval_weights[color.index()];
                    // Strict '>' keeps the smaller color on ties.
                    if weight > best_weight {
                        best_weight = weight;
                        best = color;
                    }
                }
                best
            }
            OpinionPolicy::Lightest => {
                let mut best = Color::Undefined;
                let mut best_weight = u64::MAX;
                for color in Color::CONCRETE {
                    let weight = self.approval_weights[color.index()];
                    if weight > 0 && weight < best_weight {
                        best_weight = weight;
                        best = color;
                    }
                }
                best
            }
        };

        if derived != self.own_opinion {
            let previous = self.own_opinion;
            self.own_opinion = derived;
            events.push_back(TangleEvent::OpinionChanged {
                previous,
                current: derived,
            });
        }
    }
}
