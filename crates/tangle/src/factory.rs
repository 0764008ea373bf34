//! Message creation for the local node.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tanglesim_types::{Color, Message, MessageId, PeerId, SimContext};

/// Assembles the local node's messages: draws ids from the shared
/// context, keeps the per-issuer sequence number monotonic, and stamps
/// the burn value decided by the scheduler gate.
#[derive(Debug)]
pub struct MessageFactory {
    peer: PeerId,
    sequence: u64,
    validation: bool,
}

impl MessageFactory {
    pub fn new(peer: PeerId, validation: bool) -> Self {
        Self {
            peer,
            sequence: 0,
            validation,
        }
    }

    /// Build the next message. Sequence numbers start at 1 so a fresh
    /// opinion entry (sequence 0) is always older than any real message.
    pub fn create(
        &mut self,
        ctx: &SimContext,
        now: Duration,
        strong_parents: BTreeSet<MessageId>,
        weak_parents: BTreeSet<MessageId>,
        payload: Color,
        mana_burn_value: f64,
    ) -> Arc<Message> {
        self.sequence += 1;
        Arc::new(Message {
            id: ctx.next_message_id(),
            issuer: self.peer,
            issuance_time: now,
            sequence_number: self.sequence,
            strong_parents,
            weak_parents,
            payload,
            mana_burn_value,
            validation: self.validation,
        })
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tanglesim_types::{ProtocolConfig, WeightDistribution, GENESIS};

    #[test]
    fn test_sequence_is_monotonic_from_one() {
        let ctx = SimContext::new(
            ProtocolConfig::default(),
            WeightDistribution::new(vec![1; 2]),
        );
        let mut factory = MessageFactory::new(PeerId(1), true);

        let first = factory.create(
            &ctx,
            Duration::ZERO,
            BTreeSet::from([GENESIS]),
            BTreeSet::new(),
            Color::Undefined,
            0.0,
        );
        let second = factory.create(
            &ctx,
            Duration::from_secs(1),
            BTreeSet::from([first.id]),
            BTreeSet::new(),
            Color::Undefined,
            0.0,
        );

        assert_eq!(first.sequence_number, 1);
        assert_eq!(second.sequence_number, 2);
        assert!(second.id > first.id);
        assert_eq!(second.issuer, PeerId(1));
    }
}
