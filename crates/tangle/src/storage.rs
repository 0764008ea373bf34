//! Per-node message store: messages, metadata, child and slot indices,
//! and the Referenced Mana Cost ledger.

use crate::events::TangleEvent;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tanglesim_types::{
    Color, Message, MessageId, SchedulerKind, SimContext, SlotIndex, GENESIS,
};
use tracing::debug;

/// Mutable per-message state. Created on store, never destroyed during a
/// run; mutated only by the owning node's task.
#[derive(Debug, Clone)]
pub struct MessageMetadata {
    id: MessageId,
    solid: bool,
    booked: bool,
    scheduled: bool,
    inherited_color: Color,
    arrival_time: Duration,
    confirmation_time: Option<Duration>,
    orphan_time: Option<Duration>,
    /// Witness bitset, one bit per validator, ⌈N/8⌉ bytes.
    weight_bytes: Vec<u8>,
    /// Sum of stakes over the set bits.
    weight: u64,
}

impl MessageMetadata {
    fn new(id: MessageId, witness_bytes: usize, arrival_time: Duration) -> Self {
        Self {
            id,
            solid: false,
            booked: false,
            scheduled: false,
            inherited_color: Color::Undefined,
            arrival_time,
            confirmation_time: None,
            orphan_time: None,
            weight_bytes: vec![0; witness_bytes],
            weight: 0,
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn solid(&self) -> bool {
        self.solid
    }

    pub fn set_solid(&mut self) {
        self.solid = true;
    }

    pub fn booked(&self) -> bool {
        self.booked
    }

    pub fn set_booked(&mut self) {
        self.booked = true;
    }

    pub fn scheduled(&self) -> bool {
        self.scheduled
    }

    pub fn set_scheduled(&mut self) {
        self.scheduled = true;
    }

    /// Scheduled and booked: usable as a parent downstream.
    pub fn eligible(&self) -> bool {
        self.scheduled && self.booked
    }

    pub fn inherited_color(&self) -> Color {
        self.inherited_color
    }

    pub fn set_inherited_color(&mut self, color: Color) {
        self.inherited_color = color;
    }

    pub fn arrival_time(&self) -> Duration {
        self.arrival_time
    }

    pub fn confirmed(&self) -> bool {
        self.confirmation_time.is_some()
    }

    pub fn confirmation_time(&self) -> Option<Duration> {
        self.confirmation_time
    }

    pub fn set_confirmation_time(&mut self, at: Duration) {
        self.confirmation_time = Some(at);
    }

    pub fn orphaned(&self) -> bool {
        self.orphan_time.is_some()
    }

    pub fn set_orphan_time(&mut self, at: Duration) {
        self.orphan_time = Some(at);
    }

    pub fn weight(&self) -> u64 {
        self.weight
    }

    pub fn add_weight(&mut self, weight: u64) {
        self.weight += weight;
    }

    /// Whether the witness bit of the given peer index is set.
    pub fn witness_bit(&self, peer_index: usize) -> bool {
        self.weight_bytes[peer_index / 8] & (1 << (peer_index % 8)) != 0
    }

    /// Set the witness bit of the given peer index.
    pub fn set_witness_bit(&mut self, peer_index: usize) {
        self.weight_bytes[peer_index / 8] |= 1 << (peer_index % 8);
    }

    /// Raw bitset access for consistency checks.
    pub fn weight_bytes(&self) -> &[u8] {
        &self.weight_bytes
    }
}

/// Keyed store of messages and their metadata.
///
/// Owns every [`Message`] and [`MessageMetadata`] of its node; the other
/// pipeline components hold `MessageId` handles and resolve them here.
/// Children are a separate index keyed by parent id, so the ownership
/// graph stays acyclic.
#[derive(Debug)]
pub struct Storage {
    ctx: Arc<SimContext>,
    messages: HashMap<MessageId, Arc<Message>>,
    metadata: HashMap<MessageId, MessageMetadata>,
    strong_children: HashMap<MessageId, BTreeSet<MessageId>>,
    weak_children: HashMap<MessageId, BTreeSet<MessageId>>,
    slots: HashMap<SlotIndex, Vec<MessageId>>,
    rmc: HashMap<SlotIndex, f64>,
    /// Highest slot index whose RMC has been materialized.
    rmc_head: SlotIndex,
}

impl Storage {
    pub fn new(ctx: Arc<SimContext>) -> Self {
        let mut storage = Self {
            ctx,
            messages: HashMap::new(),
            metadata: HashMap::new(),
            strong_children: HashMap::new(),
            weak_children: HashMap::new(),
            slots: HashMap::new(),
            rmc: HashMap::new(),
            rmc_head: SlotIndex(0),
        };

        // Genesis is implicitly solid, booked, scheduled and confirmed on
        // every node.
        let genesis = Arc::new(Message::genesis());
        let witness_bytes = storage.ctx.witness_bytes();
        let mut meta = MessageMetadata::new(GENESIS, witness_bytes, Duration::ZERO);
        meta.set_solid();
        meta.set_booked();
        meta.set_scheduled();
        meta.set_confirmation_time(Duration::ZERO);
        storage.messages.insert(GENESIS, genesis);
        storage.metadata.insert(GENESIS, meta);
        storage.rmc.insert(SlotIndex(0), storage.initial_rmc());

        storage
    }

    fn initial_rmc(&self) -> f64 {
        match self.ctx.config.scheduler {
            SchedulerKind::Icca => self.ctx.config.initial_rmc,
            _ => 0.0,
        }
    }

    /// Store a message. Idempotent on id. Under ICCA+ a message burning
    /// less than the RMC of its slot is dropped at the gate.
    pub fn store(
        &mut self,
        message: Arc<Message>,
        now: Duration,
        events: &mut VecDeque<TangleEvent>,
    ) {
        if self.messages.contains_key(&message.id) {
            return;
        }

        let slot = self.slot_index(message.issuance_time);
        self.materialize_rmc(slot);

        if message.mana_burn_value < self.rmc[&slot] {
            debug!(id = %message.id, slot = %slot, "message dropped: mana burn below RMC");
            events.push_back(TangleEvent::MessageDropped(message.id));
            return;
        }

        self.slots.entry(slot).or_default().push(message.id);

        let meta = MessageMetadata::new(message.id, self.ctx.witness_bytes(), now);
        for parent in &message.strong_parents {
            self.strong_children
                .entry(*parent)
                .or_default()
                .insert(message.id);
        }
        for parent in &message.weak_parents {
            self.weak_children
                .entry(*parent)
                .or_default()
                .insert(message.id);
        }
        let id = message.id;
        self.messages.insert(id, message);
        self.metadata.insert(id, meta);
        events.push_back(TangleEvent::MessageStored(id));
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.messages.contains_key(&id)
    }

    pub fn message(&self, id: MessageId) -> Option<&Arc<Message>> {
        self.messages.get(&id)
    }

    pub fn metadata(&self, id: MessageId) -> Option<&MessageMetadata> {
        self.metadata.get(&id)
    }

    pub fn metadata_mut(&mut self, id: MessageId) -> Option<&mut MessageMetadata> {
        self.metadata.get_mut(&id)
    }

    pub fn strong_children(&self, id: MessageId) -> Option<&BTreeSet<MessageId>> {
        self.strong_children.get(&id)
    }

    pub fn weak_children(&self, id: MessageId) -> Option<&BTreeSet<MessageId>> {
        self.weak_children.get(&id)
    }

    /// All children, strong then weak, deduplicated.
    pub fn children(&self, id: MessageId) -> BTreeSet<MessageId> {
        let mut children = self.strong_children.get(&id).cloned().unwrap_or_default();
        if let Some(weak) = self.weak_children.get(&id) {
            children.extend(weak.iter().copied());
        }
        children
    }

    /// Number of stored messages, genesis excluded.
    pub fn len(&self) -> usize {
        self.messages.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Solid, with every non-genesis parent eligible: the message can move
    /// from the scheduler's non-ready partition to the ready one.
    ///
    /// Panics when a strong parent's metadata is missing after the message
    /// was declared solid; that is a pipeline bug, not a runtime condition.
    pub fn is_ready(&self, id: MessageId) -> bool {
        let meta = self
            .metadata(id)
            .unwrap_or_else(|| panic!("metadata missing for stored message {id}"));
        if !meta.solid() {
            return false;
        }
        let message = &self.messages[&id];
        for parent in message.parents() {
            if parent.is_genesis() {
                continue;
            }
            let parent_meta = self
                .metadata(parent)
                .unwrap_or_else(|| panic!("parent {parent} of solid message {id} has no metadata"));
            if !parent_meta.eligible() {
                return false;
            }
        }
        true
    }

    /// Whether the message is past the confirmation window.
    pub fn too_old(&self, message: &Message, now: Duration) -> bool {
        now.saturating_sub(message.issuance_time) > self.ctx.config.confirmation_window
    }

    /// Slot containing the given issuance time.
    pub fn slot_index(&self, at: Duration) -> SlotIndex {
        let slot_nanos = self.ctx.config.slot_time.as_nanos().max(1);
        SlotIndex((at.as_nanos() / slot_nanos) as u64)
    }

    /// Messages stored in a slot.
    pub fn slot(&self, index: SlotIndex) -> &[MessageId] {
        self.slots.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Referenced Mana Cost of a slot, materializing it (and any gap of
    /// skipped slots before it) on first access. Zero outside ICCA+.
    pub fn rmc(&mut self, index: SlotIndex) -> f64 {
        self.materialize_rmc(index);
        self.rmc[&index]
    }

    /// RMC of an already-materialized slot; zero if never touched.
    pub fn rmc_at(&self, index: SlotIndex) -> f64 {
        self.rmc.get(&index).copied().unwrap_or(0.0)
    }

    /// Ensure RMC entries exist from the current head through `index`.
    ///
    /// Each new slot inherits the previous slot's value, then adjusts by
    /// the occupancy of the slot `rmc_slots` in the past: below the lower
    /// threshold the price decays by `alpha`, above the upper threshold it
    /// grows by `beta`. The clamp to [rmc_min, rmc_max] is applied on
    /// every write.
    fn materialize_rmc(&mut self, index: SlotIndex) {
        if self.ctx.config.scheduler != SchedulerKind::Icca {
            for s in self.rmc_head.0..=index.0 {
                self.rmc.entry(SlotIndex(s)).or_insert(0.0);
            }
            self.rmc_head = self.rmc_head.max(index);
            return;
        }

        let config = &self.ctx.config;
        for s in (self.rmc_head.0 + 1)..=index.0 {
            let slot = SlotIndex(s);
            let mut value = self.rmc[&slot.prev()];
            if s >= config.rmc_slots {
                let lookback = SlotIndex(s - config.rmc_slots);
                let occupancy = self.slot(lookback).len() as f64;
                if occupancy < config.lower_rmc_threshold {
                    value *= config.alpha_rmc;
                } else if occupancy > config.upper_rmc_threshold {
                    value *= config.beta_rmc;
                }
            }
            value = value.clamp(config.rmc_min, config.rmc_max);
            self.rmc.insert(slot, value);
        }
        self.rmc_head = self.rmc_head.max(index);
    }

    /// RMC time series materialized so far, ordered by slot.
    pub fn rmc_series(&self) -> Vec<(SlotIndex, f64)> {
        let mut series: Vec<_> = self.rmc.iter().map(|(&s, &v)| (s, v)).collect();
        series.sort_by_key(|(s, _)| *s);
        series
    }

    pub fn context(&self) -> &Arc<SimContext> {
        &self.ctx
    }

    /// Iterate all stored metadata (genesis included).
    pub fn iter_metadata(&self) -> impl Iterator<Item = &MessageMetadata> {
        self.metadata.values()
    }
}
