//! The message: the immutable unit of the DAG.

use crate::{Color, MessageId, PeerId};
use std::collections::BTreeSet;
use std::time::Duration;

/// A message in the tangle.
///
/// Immutable after creation. Created once by its issuer's factory, then
/// shared by reference between nodes; each node keeps its own mutable
/// metadata next to its copy of the message.
///
/// Parent sets are ordered (`BTreeSet`) so that walks over the DAG visit
/// parents in a deterministic order regardless of insertion history.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Monotonically assigned identifier.
    pub id: MessageId,
    /// The issuing peer. Stands in for a signature.
    pub issuer: PeerId,
    /// Logical issuance timestamp (simulation time).
    pub issuance_time: Duration,
    /// Per-issuer monotonic sequence number.
    pub sequence_number: u64,
    /// Strong parent references (at least one, except for genesis).
    pub strong_parents: BTreeSet<MessageId>,
    /// Weak parent references.
    pub weak_parents: BTreeSet<MessageId>,
    /// Conflict tag carried by the payload; `Undefined` for plain messages.
    pub payload: Color,
    /// Fee attached to the message; priority under the mana-burn scheduler,
    /// admission ticket under ICCA+.
    pub mana_burn_value: f64,
    /// True iff the issuer is a validator eligible to witness.
    pub validation: bool,
}

impl Message {
    /// Iterate strong then weak parents.
    pub fn parents(&self) -> impl Iterator<Item = MessageId> + '_ {
        self.strong_parents
            .iter()
            .chain(self.weak_parents.iter())
            .copied()
    }

    /// The genesis message. Issuer and payload are placeholders; genesis is
    /// implicitly solid, booked and eligible on every node.
    pub fn genesis() -> Message {
        Message {
            id: crate::GENESIS,
            issuer: PeerId(0),
            issuance_time: Duration::ZERO,
            sequence_number: 0,
            strong_parents: BTreeSet::new(),
            weak_parents: BTreeSet::new(),
            payload: Color::Undefined,
            mana_burn_value: 0.0,
            validation: false,
        }
    }
}
