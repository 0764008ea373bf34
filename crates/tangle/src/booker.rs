//! Booking: color inheritance along parent references.

use crate::events::TangleEvent;
use crate::storage::Storage;
use std::collections::VecDeque;
use tanglesim_types::{Color, MessageId};

/// Assigns each solid message its inherited conflict color.
///
/// A colored payload wins outright; otherwise the message inherits from
/// its parents. When parents disagree the smaller color (tie-break order)
/// is kept, mirroring the opinion tie-break convention.
#[derive(Debug, Default)]
pub struct Booker;

impl Booker {
    /// React to a message turning solid.
    pub fn on_solid(
        &mut self,
        id: MessageId,
        storage: &mut Storage,
        events: &mut VecDeque<TangleEvent>,
    ) {
        self.try_book(id, storage, events);
    }

    /// React to a message being booked: solid children waiting on this
    /// parent may now book.
    pub fn on_booked(
        &mut self,
        id: MessageId,
        storage: &mut Storage,
        events: &mut VecDeque<TangleEvent>,
    ) {
        for child in storage.children(id) {
            self.try_book(child, storage, events);
        }
    }

    fn try_book(
        &mut self,
        id: MessageId,
        storage: &mut Storage,
        events: &mut VecDeque<TangleEvent>,
    ) {
        let Some(meta) = storage.metadata(id) else {
            return;
        };
        if meta.booked() || !meta.solid() {
            return;
        }

        let message = storage
            .message(id)
            .expect("message missing for stored metadata")
            .clone();
        for parent in message.parents() {
            match storage.metadata(parent) {
                Some(parent_meta) if parent_meta.booked() => {}
                _ => return,
            }
        }

        let color = self.inherited_color(&message, storage);
        let meta = storage.metadata_mut(id).expect("metadata checked above");
        meta.set_inherited_color(color);
        meta.set_booked();
        events.push_back(TangleEvent::MessageBooked(id));
    }

    fn inherited_color(&self, message: &tanglesim_types::Message, storage: &Storage) -> Color {
        if message.payload != Color::Undefined {
            return message.payload;
        }
        let mut inherited = Color::Undefined;
        for parent in message.parents() {
            let parent_color = storage
                .metadata(parent)
                .expect("parent booked, metadata must exist")
                .inherited_color();
            if parent_color == Color::Undefined {
                continue;
            }
            if inherited == Color::Undefined || parent_color < inherited {
                inherited = parent_color;
            }
        }
        inherited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solidifier::Solidifier;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::time::Duration;
    use tanglesim_types::{
        Message, PeerId, ProtocolConfig, SchedulerKind, SimContext, WeightDistribution, GENESIS,
    };

    fn context() -> Arc<SimContext> {
        let config = ProtocolConfig {
            nodes_count: 2,
            scheduler: SchedulerKind::NoScheduler,
            ..Default::default()
        };
        Arc::new(SimContext::new(config, WeightDistribution::new(vec![1; 2])))
    }

    fn message(ctx: &SimContext, parents: &[MessageId], payload: Color) -> Arc<Message> {
        Arc::new(Message {
            id: ctx.next_message_id(),
            issuer: PeerId(0),
            issuance_time: Duration::ZERO,
            sequence_number: 1,
            strong_parents: parents.iter().copied().collect::<BTreeSet<_>>(),
            weak_parents: BTreeSet::new(),
            payload,
            mana_burn_value: 0.0,
            validation: true,
        })
    }

    fn store_and_book(
        storage: &mut Storage,
        msg: &Arc<Message>,
    ) -> Vec<TangleEvent> {
        let mut solidifier = Solidifier;
        let mut booker = Booker;
        let mut events = VecDeque::new();
        storage.store(msg.clone(), Duration::ZERO, &mut events);
        let mut log = Vec::new();
        while let Some(event) = events.pop_front() {
            match event {
                TangleEvent::MessageStored(id) => solidifier.on_stored(id, storage, &mut events),
                TangleEvent::MessageSolid(id) => {
                    solidifier.on_solid(id, storage, &mut events);
                    booker.on_solid(id, storage, &mut events);
                }
                TangleEvent::MessageBooked(id) => booker.on_booked(id, storage, &mut events),
                _ => {}
            }
            log.push(event);
        }
        log
    }

    #[test]
    fn test_payload_color_wins() {
        let ctx = context();
        let mut storage = Storage::new(ctx.clone());
        let msg = message(&ctx, &[GENESIS], Color::Red);
        store_and_book(&mut storage, &msg);
        assert_eq!(
            storage.metadata(msg.id).unwrap().inherited_color(),
            Color::Red
        );
    }

    #[test]
    fn test_inherits_parent_color() {
        let ctx = context();
        let mut storage = Storage::new(ctx.clone());
        let colored = message(&ctx, &[GENESIS], Color::Green);
        let plain = message(&ctx, &[colored.id], Color::Undefined);
        store_and_book(&mut storage, &colored);
        store_and_book(&mut storage, &plain);
        assert_eq!(
            storage.metadata(plain.id).unwrap().inherited_color(),
            Color::Green
        );
    }

    #[test]
    fn test_uncolored_parents_stay_undefined() {
        let ctx = context();
        let mut storage = Storage::new(ctx.clone());
        let plain = message(&ctx, &[GENESIS], Color::Undefined);
        store_and_book(&mut storage, &plain);
        assert_eq!(
            storage.metadata(plain.id).unwrap().inherited_color(),
            Color::Undefined
        );
    }

    #[test]
    fn test_conflicting_parents_keep_smaller_color() {
        let ctx = context();
        let mut storage = Storage::new(ctx.clone());
        let red = message(&ctx, &[GENESIS], Color::Red);
        let green = message(&ctx, &[GENESIS], Color::Green);
        let child = message(&ctx, &[red.id, green.id], Color::Undefined);
        store_and_book(&mut storage, &red);
        store_and_book(&mut storage, &green);
        store_and_book(&mut storage, &child);
        assert_eq!(
            storage.metadata(child.id).unwrap().inherited_color(),
            Color::Red
        );
    }
}
