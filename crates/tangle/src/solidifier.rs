//! Solidification: a message is solid once all its ancestors are stored.

use crate::events::TangleEvent;
use crate::storage::Storage;
use std::collections::VecDeque;
use tanglesim_types::MessageId;

/// Marks messages solid and cascades solidity to waiting children.
///
/// Solidity is monotonic: once set it never clears. Genesis is implicitly
/// solid.
#[derive(Debug, Default)]
pub struct Solidifier;

impl Solidifier {
    /// React to a message entering storage.
    pub fn on_stored(
        &mut self,
        id: MessageId,
        storage: &mut Storage,
        events: &mut VecDeque<TangleEvent>,
    ) {
        self.try_solidify(id, storage, events);
    }

    /// React to a message turning solid: children blocked on it may now
    /// solidify as well.
    pub fn on_solid(
        &mut self,
        id: MessageId,
        storage: &mut Storage,
        events: &mut VecDeque<TangleEvent>,
    ) {
        for child in storage.children(id) {
            self.try_solidify(child, storage, events);
        }
    }

    fn try_solidify(
        &mut self,
        id: MessageId,
        storage: &mut Storage,
        events: &mut VecDeque<TangleEvent>,
    ) {
        let Some(meta) = storage.metadata(id) else {
            return;
        };
        if meta.solid() {
            return;
        }

        let message = storage
            .message(id)
            .expect("message missing for stored metadata")
            .clone();
        for parent in message.parents() {
            match storage.metadata(parent) {
                Some(parent_meta) if parent_meta.solid() => {}
                _ => return,
            }
        }

        storage
            .metadata_mut(id)
            .expect("metadata checked above")
            .set_solid();
        events.push_back(TangleEvent::MessageSolid(id));
    }
}
