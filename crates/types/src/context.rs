//! Shared per-run context.

use crate::{MessageId, ProtocolConfig, WeightDistribution};
use std::sync::atomic::{AtomicU64, Ordering};

/// Read-only state shared by all peers of a run, plus the run-wide message
/// id counter.
///
/// This replaces process globals: constructors receive the context
/// explicitly, and the only mutation it permits is the atomic id draw.
#[derive(Debug)]
pub struct SimContext {
    /// Protocol parameters.
    pub config: ProtocolConfig,
    /// Stake table.
    pub weights: WeightDistribution,
    /// Next message id to hand out. Id 0 is genesis.
    next_message_id: AtomicU64,
}

impl SimContext {
    pub fn new(config: ProtocolConfig, weights: WeightDistribution) -> Self {
        Self {
            config,
            weights,
            next_message_id: AtomicU64::new(1),
        }
    }

    /// Draw the next message id.
    pub fn next_message_id(&self) -> MessageId {
        MessageId(self.next_message_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Number of messages issued so far across the whole network.
    pub fn issued_messages(&self) -> u64 {
        self.next_message_id.load(Ordering::Relaxed) - 1
    }

    /// Length of the witness bitset in bytes: ⌈N/8⌉.
    pub fn witness_bytes(&self) -> usize {
        self.config.nodes_count.div_ceil(8)
    }
}
