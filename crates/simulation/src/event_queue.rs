//! Event queue with deterministic ordering.

use crate::peer::PeerInput;
use std::cmp::Ordering;
use std::time::Duration;
use tanglesim_types::PeerId;

/// Priority levels for events sharing a timestamp.
///
/// Lower values are processed first, so consequences of prior processing
/// (internal events) run before timers, and timers before newly arriving
/// network traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum EventPriority {
    /// Consequences of prior event processing (conflict injection).
    Internal = 0,
    /// Timers the harness set for a peer (issuance, scheduling, monitor).
    Timer = 1,
    /// Gossip deliveries from other peers.
    Network = 2,
}

/// An event on the harness queue.
#[derive(Debug, Clone)]
pub enum SimEvent {
    /// Deliver an input to a peer.
    Peer(PeerId, PeerInput),
    /// Take a metrics snapshot and check the early-stop rule.
    MonitorTick,
    /// Inject the configured double spends.
    DoubleSpend,
}

impl SimEvent {
    pub fn priority(&self) -> EventPriority {
        match self {
            SimEvent::Peer(_, PeerInput::MessageReceived(_)) => EventPriority::Network,
            SimEvent::Peer(_, _) => EventPriority::Timer,
            SimEvent::MonitorTick => EventPriority::Timer,
            SimEvent::DoubleSpend => EventPriority::Internal,
        }
    }

    /// The peer index used for ordering; harness-global events use 0.
    pub fn peer_index(&self) -> u64 {
        match self {
            SimEvent::Peer(peer, _) => peer.0,
            _ => 0,
        }
    }
}

/// Key ordering events in the queue: time, then priority, then peer
/// index, then FIFO sequence.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct EventKey {
    pub time: Duration,
    pub priority: EventPriority,
    pub peer_index: u64,
    pub sequence: u64,
}

impl EventKey {
    pub fn new(time: Duration, event: &SimEvent, sequence: u64) -> Self {
        Self {
            time,
            priority: event.priority(),
            peer_index: event.peer_index(),
            sequence,
        }
    }
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.priority.cmp(&other.priority))
            .then_with(|| self.peer_index.cmp(&other.peer_index))
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
