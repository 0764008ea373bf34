//! Witness-weight accumulation over the past cone.

use crate::events::TangleEvent;
use crate::storage::Storage;
use crate::walker::Walker;
use std::collections::VecDeque;
use std::time::Duration;
use tanglesim_types::{MessageId, PeerId};

/// Propagates a new message's issuer stake through its past cone.
///
/// Each (issuer, message) pair contributes at most once: the issuer's bit
/// in the message's witness bitset is checked before crediting, and an
/// already-set bit stops the walk into that subtree (it was credited from
/// this issuer before). This keeps per-message approval cost proportional
/// to the number of new ancestors and makes weight monotonic.
#[derive(Debug)]
pub struct ApprovalManager {
    local_peer: PeerId,
    /// (peer, message) pair whose witness-weight growth is traced.
    monitored: Option<(PeerId, MessageId)>,
}

impl ApprovalManager {
    pub fn new(local_peer: PeerId, monitored: Option<(PeerId, MessageId)>) -> Self {
        Self {
            local_peer,
            monitored,
        }
    }

    /// React to a message turning solid: walk its past cone and credit the
    /// issuer's stake to every ancestor not yet witnessed by this issuer.
    pub fn approve_messages(
        &mut self,
        id: MessageId,
        now: Duration,
        storage: &mut Storage,
        events: &mut VecDeque<TangleEvent>,
    ) {
        let issuing = storage
            .message(id)
            .unwrap_or_else(|| panic!("solid message {id} not in storage"))
            .clone();
        if !issuing.validation {
            return;
        }

        let issuer_index = issuing.issuer.index();
        let ctx = storage.context().clone();
        let weight = ctx.weights.weight(issuing.issuer);
        let total_weight = ctx.weights.total_weight() as f64;
        let threshold = ctx.config.confirmation_threshold * total_weight;

        let mut walker = Walker::new(id);
        while let Some(current) = walker.next() {
            let message = storage
                .message(current)
                .unwrap_or_else(|| panic!("walked message {current} not in storage"))
                .clone();

            if self.monitored == Some((self.local_peer, current)) {
                let weight_now = storage.metadata(current).map(|m| m.weight()).unwrap_or(0);
                events.push_back(TangleEvent::WitnessWeightUpdated {
                    id: current,
                    weight: weight_now,
                });
            }

            let meta = storage
                .metadata_mut(current)
                .unwrap_or_else(|| panic!("metadata missing for walked message {current}"));
            if meta.witness_bit(issuer_index) {
                // Subtree already credited from this issuer.
                continue;
            }

            meta.set_witness_bit(issuer_index);
            meta.add_weight(weight);
            let accumulated = meta.weight();
            events.push_back(TangleEvent::MessageWeightUpdated {
                id: current,
                weight: accumulated,
            });

            if accumulated as f64 >= threshold && !meta.confirmed() && !meta.orphaned() {
                if storage.too_old(&message, now) {
                    storage
                        .metadata_mut(current)
                        .expect("metadata present")
                        .set_orphan_time(now);
                    events.push_back(TangleEvent::MessageOrphaned(current));
                } else {
                    storage
                        .metadata_mut(current)
                        .expect("metadata present")
                        .set_confirmation_time(now);
                    events.push_back(TangleEvent::MessageConfirmed {
                        id: current,
                        weight: accumulated,
                    });
                }
            }

            for parent in message.parents() {
                walker.push(parent);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use tanglesim_types::{
        Color, Message, ProtocolConfig, SchedulerKind, SimContext, WeightDistribution, GENESIS,
    };

    fn context() -> Arc<SimContext> {
        let config = ProtocolConfig {
            nodes_count: 2,
            confirmation_threshold: 0.6,
            confirmation_window: Duration::from_secs(30),
            scheduler: SchedulerKind::NoScheduler,
            ..Default::default()
        };
        // Two validators, 60/40.
        Arc::new(SimContext::new(config, WeightDistribution::new(vec![60, 40])))
    }

    fn store(
        storage: &mut Storage,
        ctx: &SimContext,
        issuer: u64,
        seq: u64,
        parents: &[MessageId],
    ) -> MessageId {
        let msg = Arc::new(Message {
            id: ctx.next_message_id(),
            issuer: PeerId(issuer),
            issuance_time: Duration::ZERO,
            sequence_number: seq,
            strong_parents: parents.iter().copied().collect::<BTreeSet<_>>(),
            weak_parents: BTreeSet::new(),
            payload: Color::Undefined,
            mana_burn_value: 0.0,
            validation: true,
        });
        let mut events = VecDeque::new();
        storage.store(msg.clone(), Duration::ZERO, &mut events);
        storage.metadata_mut(msg.id).unwrap().set_solid();
        msg.id
    }

    #[test]
    fn test_weight_accumulates_up_the_past_cone() {
        let ctx = context();
        let mut storage = Storage::new(ctx.clone());
        let mut approval = ApprovalManager::new(PeerId(0), None);
        let mut events = VecDeque::new();

        let a = store(&mut storage, &ctx, 0, 1, &[GENESIS]);
        let b = store(&mut storage, &ctx, 1, 1, &[a]);

        approval.approve_messages(a, Duration::ZERO, &mut storage, &mut events);
        assert_eq!(storage.metadata(a).unwrap().weight(), 60);

        approval.approve_messages(b, Duration::ZERO, &mut storage, &mut events);
        // b carries its own issuer's stake; a now has both witnesses.
        assert_eq!(storage.metadata(b).unwrap().weight(), 40);
        assert_eq!(storage.metadata(a).unwrap().weight(), 100);
    }

    #[test]
    fn test_duplicate_delivery_is_idempotent() {
        let ctx = context();
        let mut storage = Storage::new(ctx.clone());
        let mut approval = ApprovalManager::new(PeerId(0), None);
        let mut events = VecDeque::new();

        let a = store(&mut storage, &ctx, 0, 1, &[GENESIS]);
        approval.approve_messages(a, Duration::ZERO, &mut storage, &mut events);
        let weight_after_first = storage.metadata(a).unwrap().weight();
        events.clear();

        approval.approve_messages(a, Duration::ZERO, &mut storage, &mut events);
        assert_eq!(storage.metadata(a).unwrap().weight(), weight_after_first);
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, TangleEvent::MessageWeightUpdated { .. })),
            "second delivery must not change any weight"
        );
    }

    #[test]
    fn test_confirmation_at_threshold() {
        let ctx = context();
        let mut storage = Storage::new(ctx.clone());
        let mut approval = ApprovalManager::new(PeerId(0), None);
        let mut events = VecDeque::new();

        let a = store(&mut storage, &ctx, 0, 1, &[GENESIS]);
        // Issuer 0 alone carries 60% of the weight: threshold met.
        approval.approve_messages(a, Duration::from_secs(1), &mut storage, &mut events);
        let meta = storage.metadata(a).unwrap();
        assert!(meta.confirmed());
        assert_eq!(meta.confirmation_time(), Some(Duration::from_secs(1)));
        assert!(events
            .iter()
            .any(|e| matches!(e, TangleEvent::MessageConfirmed { id, .. } if *id == a)));
    }

    #[test]
    fn test_old_message_is_orphaned_not_confirmed() {
        let ctx = context();
        let mut storage = Storage::new(ctx.clone());
        let mut approval = ApprovalManager::new(PeerId(0), None);
        let mut events = VecDeque::new();

        let a = store(&mut storage, &ctx, 0, 1, &[GENESIS]);
        // Threshold crossed long after the confirmation window.
        let late = Duration::from_secs(120);
        approval.approve_messages(a, late, &mut storage, &mut events);
        let meta = storage.metadata(a).unwrap();
        assert!(meta.orphaned());
        assert!(!meta.confirmed());
        assert!(events
            .iter()
            .any(|e| matches!(e, TangleEvent::MessageOrphaned(id) if *id == a)));
    }

    #[test]
    fn test_non_validator_is_ignored() {
        let ctx = context();
        let mut storage = Storage::new(ctx.clone());
        let mut approval = ApprovalManager::new(PeerId(0), None);
        let mut events = VecDeque::new();

        let msg = Arc::new(Message {
            id: ctx.next_message_id(),
            issuer: PeerId(1),
            issuance_time: Duration::ZERO,
            sequence_number: 1,
            strong_parents: BTreeSet::from([GENESIS]),
            weak_parents: BTreeSet::new(),
            payload: Color::Undefined,
            mana_burn_value: 0.0,
            validation: false,
        });
        storage.store(msg.clone(), Duration::ZERO, &mut events);
        storage.metadata_mut(msg.id).unwrap().set_solid();
        events.clear();

        approval.approve_messages(msg.id, Duration::ZERO, &mut storage, &mut events);
        assert_eq!(storage.metadata(msg.id).unwrap().weight(), 0);
        assert!(events.is_empty());
    }
}
