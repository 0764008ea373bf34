//! Deterministic discrete-event simulation harness.
//!
//! The harness owns one [`Peer`] per node, a global event queue ordered by
//! (time, priority, peer, sequence), the simulated network, and a seeded
//! RNG. Given the same seed and configuration, a run is bit-for-bit
//! reproducible.
//!
//! Each event is delivered to exactly one peer, whose pipeline runs to
//! quiescence before the next event is popped: all per-peer state is
//! single-writer, and peers interact only through delayed gossip
//! deliveries scheduled on the queue.

mod config;
mod event_queue;
mod metrics;
mod peer;
mod runner;

pub use config::{AdversaryConfig, SimulationConfig, SimulationMode};
pub use event_queue::{EventKey, EventPriority, SimEvent};
pub use metrics::{AwRow, MetricsLog, ThroughputRow, TipsRow, WwRow};
pub use peer::{Peer, PeerCounters, PeerInput, PeerOutput};
pub use runner::{SimulationRunner, SimulationStats};
