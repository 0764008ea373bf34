//! One simulated peer: behavior, tangle, issuance timing.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Duration;
use tanglesim_tangle::{Tangle, TangleEvent};
use tanglesim_types::{Color, Imif, Message, NodeBehavior, PeerId, SimContext};
use tracing::trace;

/// Inputs a peer can receive from the harness queue.
#[derive(Debug, Clone)]
pub enum PeerInput {
    /// A gossiped message arrived on the inbound socket.
    MessageReceived(Arc<Message>),
    /// The issuance timer fired.
    IssueTick,
    /// The scheduler's pacing timer fired.
    SchedulerTick,
}

/// Everything a step produced that the harness must act on.
#[derive(Debug, Default)]
pub struct PeerOutput {
    /// Messages to gossip to the peer's neighbors.
    pub gossip: Vec<Arc<Message>>,
    /// Delay until the next issuance tick (only after an `IssueTick`).
    pub next_issue_in: Option<Duration>,
    /// The full pipeline event log of this step.
    pub events: Vec<TangleEvent>,
}

/// Counters a peer maintains about its own pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct PeerCounters {
    pub issued: u64,
    pub scheduled: u64,
    pub confirmed: u64,
    pub orphaned: u64,
    /// Admission drops at the storage gate.
    pub dropped: u64,
    /// Issuance ticks skipped by the rate setter.
    pub throttled: u64,
}

/// A simulated peer. All of its state is mutated by exactly one harness
/// event at a time; cross-peer interaction happens only through the
/// returned [`PeerOutput::gossip`].
#[derive(Debug)]
pub struct Peer {
    id: PeerId,
    behavior: NodeBehavior,
    tangle: Tangle,
    rng: ChaCha8Rng,
    /// Messages per second this peer aims to issue.
    issuance_rate: f64,
    imif: Imif,
    counters: PeerCounters,
}

impl Peer {
    pub fn new(
        ctx: Arc<SimContext>,
        id: PeerId,
        behavior: NodeBehavior,
        issuance_rate: f64,
        rng: ChaCha8Rng,
    ) -> Self {
        let imif = ctx.config.imif;
        Self {
            id,
            behavior,
            tangle: Tangle::new(ctx, id, behavior),
            rng,
            issuance_rate,
            imif,
            counters: PeerCounters::default(),
        }
    }

    /// Process one input and run the pipeline to quiescence.
    pub fn step(&mut self, now: Duration, input: PeerInput) -> PeerOutput {
        match input {
            PeerInput::MessageReceived(message) => {
                let events = self.tangle.attach(message, now);
                self.collect(events, None)
            }
            PeerInput::SchedulerTick => {
                let events = self.tangle.scheduler_tick(now);
                self.collect(events, None)
            }
            PeerInput::IssueTick => {
                let next = self.sample_inter_arrival();
                match self.tangle.issue(now, &mut self.rng, Color::Undefined, false) {
                    Some((message, events)) => {
                        trace!(peer = %self.id, id = %message.id, "issued message");
                        self.counters.issued += 1;
                        self.collect(events, next)
                    }
                    None => {
                        self.counters.throttled += 1;
                        PeerOutput {
                            next_issue_in: next,
                            ..Default::default()
                        }
                    }
                }
            }
        }
    }

    /// Issue a conflicting message carrying `color`, bypassing the rate
    /// setter. Used by the harness for double-spend injection.
    pub fn issue_conflict(&mut self, now: Duration, color: Color) -> PeerOutput {
        let (message, events) = self
            .tangle
            .issue(now, &mut self.rng, color, true)
            .expect("forced issuance cannot be throttled");
        trace!(peer = %self.id, id = %message.id, %color, "issued double spend");
        self.counters.issued += 1;
        self.collect(events, None)
    }

    /// Update counters from the event log and decide what to gossip:
    /// every message this peer scheduled, when its behavior relays (its
    /// own messages are always gossiped).
    fn collect(&mut self, events: Vec<TangleEvent>, next_issue_in: Option<Duration>) -> PeerOutput {
        let mut gossip = Vec::new();
        for event in &events {
            match event {
                TangleEvent::MessageScheduled(id) => {
                    self.counters.scheduled += 1;
                    let message = self
                        .tangle
                        .storage()
                        .message(*id)
                        .expect("scheduled message is stored")
                        .clone();
                    if self.behavior.relays() || message.issuer == self.id {
                        gossip.push(message);
                    }
                }
                TangleEvent::MessageConfirmed { .. } => self.counters.confirmed += 1,
                TangleEvent::MessageOrphaned(_) => self.counters.orphaned += 1,
                TangleEvent::MessageDropped(_) => self.counters.dropped += 1,
                _ => {}
            }
        }
        PeerOutput {
            gossip,
            next_issue_in,
            events,
        }
    }

    /// Draw the next issuance inter-arrival from the configured IMIF.
    fn sample_inter_arrival(&mut self) -> Option<Duration> {
        if self.issuance_rate <= 0.0 {
            return None;
        }
        let seconds = match self.imif {
            Imif::Poisson => {
                // Exponential inter-arrivals with mean 1/rate.
                let u: f64 = self.rng.gen::<f64>().max(f64::MIN_POSITIVE);
                -u.ln() / self.issuance_rate
            }
            Imif::Uniform => {
                // Uniform in [0, 2/rate): same mean, bounded spread.
                self.rng.gen::<f64>() * 2.0 / self.issuance_rate
            }
        };
        Some(Duration::from_secs_f64(seconds))
    }

    // ─── Accessors ───

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn behavior(&self) -> NodeBehavior {
        self.behavior
    }

    pub fn tangle(&self) -> &Tangle {
        &self.tangle
    }

    pub fn counters(&self) -> PeerCounters {
        self.counters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use tanglesim_types::{ProtocolConfig, SchedulerKind, WeightDistribution};

    fn peer(behavior: NodeBehavior) -> Peer {
        let config = ProtocolConfig {
            nodes_count: 2,
            nodes_total_weight: 100,
            scheduler: SchedulerKind::NoScheduler,
            ..Default::default()
        };
        let ctx = Arc::new(SimContext::new(config, WeightDistribution::new(vec![50, 50])));
        Peer::new(ctx, PeerId(0), behavior, 10.0, ChaCha8Rng::seed_from_u64(3))
    }

    #[test]
    fn test_issue_tick_gossips_own_message() {
        let mut p = peer(NodeBehavior::Honest);
        let output = p.step(Duration::from_secs(1), PeerInput::IssueTick);
        assert_eq!(output.gossip.len(), 1);
        assert_eq!(output.gossip[0].issuer, PeerId(0));
        assert!(output.next_issue_in.is_some());
        assert_eq!(p.counters().issued, 1);
        assert_eq!(p.counters().scheduled, 1);
    }

    #[test]
    fn test_received_message_is_relayed_once_scheduled() {
        let mut issuer = peer(NodeBehavior::Honest);
        let issued = issuer
            .step(Duration::from_secs(1), PeerInput::IssueTick)
            .gossip
            .remove(0);

        let mut relay = peer(NodeBehavior::Honest);
        let output = relay.step(
            Duration::from_secs(1),
            PeerInput::MessageReceived(issued.clone()),
        );
        assert_eq!(output.gossip.len(), 1, "relayed on scheduling");
        assert_eq!(output.gossip[0].id, issued.id);
    }

    #[test]
    fn test_no_gossip_behavior_keeps_others_messages() {
        let mut issuer = peer(NodeBehavior::Honest);
        let issued = issuer
            .step(Duration::from_secs(1), PeerInput::IssueTick)
            .gossip
            .remove(0);

        let mut silent = peer(NodeBehavior::NoGossip);
        let output = silent.step(
            Duration::from_secs(1),
            PeerInput::MessageReceived(issued),
        );
        assert!(output.gossip.is_empty(), "no-gossip node must not relay");

        // Its own messages still go out.
        let own = silent.step(Duration::from_secs(2), PeerInput::IssueTick);
        assert_eq!(own.gossip.len(), 1);
    }

    #[test]
    fn test_conflict_injection_carries_color() {
        let mut p = peer(NodeBehavior::Honest);
        let output = p.issue_conflict(Duration::from_secs(1), Color::Red);
        assert_eq!(output.gossip.len(), 1);
        assert_eq!(output.gossip[0].payload, Color::Red);
    }

    #[test]
    fn test_inter_arrival_mean_tracks_rate() {
        let mut p = peer(NodeBehavior::Honest);
        let samples: f64 = (0..2_000)
            .map(|_| p.sample_inter_arrival().unwrap().as_secs_f64())
            .sum();
        let mean = samples / 2_000.0;
        assert!(
            (mean - 0.1).abs() < 0.02,
            "mean inter-arrival should approach 1/rate, got {mean}"
        );
    }
}
