//! Typed event records emitted by the tangle pipeline.

use tanglesim_types::{Color, MessageId};

/// An event produced while processing the tangle pipeline of one node.
///
/// Events are appended to the owning [`Tangle`](crate::Tangle)'s internal
/// FIFO and dispatched synchronously, in emission order, until the queue
/// drains. The full event log of a dispatch round is returned to the
/// caller, so the harness can react (relay, count) without the components
/// knowing about it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TangleEvent {
    /// A message entered storage.
    MessageStored(MessageId),
    /// A message was dropped at the storage gate (mana burn below RMC).
    MessageDropped(MessageId),
    /// All ancestors of the message are stored locally.
    MessageSolid(MessageId),
    /// The message inherited its conflict color.
    MessageBooked(MessageId),
    /// Queue occupancy after an enqueue into the scheduler.
    MessageEnqueued { ready: usize, non_ready: usize },
    /// The scheduler emitted the message downstream.
    MessageScheduled(MessageId),
    /// A witness bit was newly set; `weight` is the new accumulated weight.
    MessageWeightUpdated { id: MessageId, weight: u64 },
    /// Witness-weight trace point for the monitored (peer, message) pair.
    WitnessWeightUpdated { id: MessageId, weight: u64 },
    /// Accumulated weight crossed the confirmation threshold in time.
    MessageConfirmed { id: MessageId, weight: u64 },
    /// The threshold was crossed too late; the message is orphaned.
    MessageOrphaned(MessageId),
    /// Opinion processing finished for the message (always fired).
    OpinionFormed(MessageId),
    /// The node's own opinion moved.
    OpinionChanged { previous: Color, current: Color },
    /// A peer's declared color changed the per-color stake tally.
    ApprovalWeightUpdated { color: Color, delta: i64 },
}
