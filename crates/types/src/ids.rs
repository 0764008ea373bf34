//! Identifier newtypes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a message.
///
/// Assigned monotonically from the run-wide counter on [`SimContext`].
/// The genesis message is reserved id 0.
///
/// [`SimContext`]: crate::SimContext
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct MessageId(pub u64);

/// The genesis message, implicitly known to every node.
pub const GENESIS: MessageId = MessageId(0);

impl MessageId {
    /// Whether this is the genesis id.
    pub fn is_genesis(&self) -> bool {
        *self == GENESIS
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a peer (node).
///
/// Peer ids are dense: `0..NodesCount`. They double as the index into the
/// stake table and into each message's witness bitset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct PeerId(pub u64);

impl PeerId {
    /// Index form for table lookups.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Peer{}", self.0)
    }
}

/// Index of a fixed-duration slot used to bucket messages for RMC accounting.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct SlotIndex(pub u64);

impl SlotIndex {
    /// The previous slot, saturating at slot 0.
    pub fn prev(&self) -> SlotIndex {
        SlotIndex(self.0.saturating_sub(1))
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
