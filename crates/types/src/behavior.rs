//! Node behaviors and adversary group configuration.

use crate::{Color, PeerId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Attack strategy identifier as it appears in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AdversaryKind {
    #[default]
    Honest,
    ShiftOpinion,
    SameOpinion,
    NoGossip,
    Blowball,
}

impl AdversaryKind {
    /// Decode the numeric configuration form. Unknown values are honest.
    pub fn from_index(i: usize) -> AdversaryKind {
        match i {
            1 => AdversaryKind::ShiftOpinion,
            2 => AdversaryKind::SameOpinion,
            3 => AdversaryKind::NoGossip,
            4 => AdversaryKind::Blowball,
            _ => AdversaryKind::Honest,
        }
    }
}

/// How a node behaves in the protocol.
///
/// Honest nodes follow the reference pipeline; each adversary variant
/// deviates in exactly one place (opinion formation, relaying, or parent
/// selection). Dispatch is a plain `match`, no downcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeBehavior {
    /// Reference behavior.
    Honest,
    /// Own opinion is forced to the weakest colored branch, keeping
    /// conflicts alive.
    ShiftOpinion,
    /// Own opinion is pinned to a fixed color forever.
    SameOpinion { color: Color },
    /// Never relays other nodes' messages; still issues its own.
    NoGossip,
    /// Issues star-shaped bursts attached directly to genesis.
    Blowball,
}

impl NodeBehavior {
    /// Whether this node relays scheduled messages to its neighbors.
    pub fn relays(&self) -> bool {
        !matches!(self, NodeBehavior::NoGossip)
    }

    pub fn is_honest(&self) -> bool {
        matches!(self, NodeBehavior::Honest)
    }
}

/// One configured group of adversary nodes.
///
/// Groups are resolved against the honest weight distribution at startup:
/// members take the highest peer ids and split the group's mana evenly.
#[derive(Debug, Clone)]
pub struct AdversaryGroup {
    pub kind: AdversaryKind,
    /// Percentage of the total network weight held by the group.
    pub mana_percent: f64,
    /// Number of member nodes.
    pub node_count: usize,
    /// Override for the network delay of every link touching a member.
    pub delay: Option<Duration>,
    /// Color this group pushes when double spends are injected.
    pub init_color: Color,
    /// Issuance speed multiplier relative to the group's mana share.
    pub speedup: f64,
    /// Members have a direct connection to every peer in the network.
    pub peering_all: bool,
    /// Assigned member ids, filled during network construction.
    pub node_ids: Vec<PeerId>,
}

impl AdversaryGroup {
    /// The behavior variant for members of this group.
    pub fn behavior(&self) -> NodeBehavior {
        match self.kind {
            AdversaryKind::Honest => NodeBehavior::Honest,
            AdversaryKind::ShiftOpinion => NodeBehavior::ShiftOpinion,
            AdversaryKind::SameOpinion => NodeBehavior::SameOpinion {
                color: self.init_color,
            },
            AdversaryKind::NoGossip => NodeBehavior::NoGossip,
            AdversaryKind::Blowball => NodeBehavior::Blowball,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_decoding() {
        assert_eq!(AdversaryKind::from_index(0), AdversaryKind::Honest);
        assert_eq!(AdversaryKind::from_index(2), AdversaryKind::SameOpinion);
        assert_eq!(AdversaryKind::from_index(42), AdversaryKind::Honest);
    }

    #[test]
    fn test_same_opinion_behavior_carries_color() {
        let group = AdversaryGroup {
            kind: AdversaryKind::SameOpinion,
            mana_percent: 10.0,
            node_count: 1,
            delay: None,
            init_color: Color::Red,
            speedup: 1.0,
            peering_all: false,
            node_ids: vec![],
        };
        assert_eq!(
            group.behavior(),
            NodeBehavior::SameOpinion { color: Color::Red }
        );
    }
}
