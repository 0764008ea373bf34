//! Per-node tangle pipeline.
//!
//! Each simulated peer owns a [`Tangle`]: storage, solidifier, booker,
//! scheduler, approval manager, opinion manager, tip manager and message
//! factory, wired through a typed event queue.
//!
//! # Data flow
//!
//! ```text
//! received ─▶ Storage ─▶ Solidifier ─▶ Booker ─▶ Scheduler ─▶ TipManager
//!                             │            └────▶ OpinionManager
//!                             └─▶ ApprovalManager (witness weights)
//! ```
//!
//! Components never call each other directly: they append
//! [`TangleEvent`]s to the tangle's internal FIFO, and [`Tangle`]
//! dispatches each event to its subscribers in a fixed order until the
//! queue drains. Delivery is synchronous within a node; the full event
//! log of a round is returned so the harness can relay scheduled
//! messages and count confirmations without reaching into the pipeline.

mod approval;
mod booker;
mod events;
mod factory;
mod opinion;
mod random_map;
mod scheduler;
mod solidifier;
mod storage;
mod tips;
mod walker;

pub use approval::ApprovalManager;
pub use booker::Booker;
pub use events::TangleEvent;
pub use factory::MessageFactory;
pub use opinion::{Opinion, OpinionManager};
pub use random_map::RandomMap;
pub use scheduler::{new_scheduler, IccaScheduler, MbScheduler, NoScheduler, Scheduler};
pub use solidifier::Solidifier;
pub use storage::{MessageMetadata, Storage};
pub use tips::{TipManager, TipSet};
pub use walker::Walker;

use rand::Rng;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tanglesim_types::{Color, Message, MessageId, NodeBehavior, PeerId, SimContext, GENESIS};

/// One node's view of the DAG and the components operating on it.
pub struct Tangle {
    ctx: Arc<SimContext>,
    peer_id: PeerId,
    behavior: NodeBehavior,
    storage: Storage,
    solidifier: Solidifier,
    booker: Booker,
    scheduler: Box<dyn Scheduler>,
    approval: ApprovalManager,
    opinions: OpinionManager,
    tips: TipManager,
    factory: MessageFactory,
    events: VecDeque<TangleEvent>,
}

impl Tangle {
    pub fn new(ctx: Arc<SimContext>, peer_id: PeerId, behavior: NodeBehavior) -> Self {
        let monitored = ctx
            .config
            .monitored_witness
            .map(|(peer, message)| (PeerId(peer), MessageId(message)));
        Self {
            storage: Storage::new(ctx.clone()),
            solidifier: Solidifier,
            booker: Booker,
            scheduler: new_scheduler(&ctx, peer_id),
            approval: ApprovalManager::new(peer_id, monitored),
            opinions: OpinionManager::new(behavior),
            tips: TipManager::new(&ctx.config),
            factory: MessageFactory::new(peer_id, true),
            events: VecDeque::new(),
            ctx,
            peer_id,
            behavior,
        }
    }

    /// Store a message (received or self-issued) and run the pipeline to
    /// quiescence. Returns the ordered event log of this round.
    pub fn attach(&mut self, message: Arc<Message>, now: Duration) -> Vec<TangleEvent> {
        self.storage.store(message, now, &mut self.events);
        self.dispatch(now)
    }

    /// One scheduling tick: replenish access mana (one unit of
    /// network-wide mana per slot, split by stake) and let the scheduler
    /// emit at most one message.
    pub fn scheduler_tick(&mut self, now: Duration) -> Vec<TangleEvent> {
        self.scheduler.increment_access_mana(1.0);
        self.scheduler
            .schedule_message(now, &mut self.storage, &mut self.events);
        self.dispatch(now)
    }

    /// Issue a new message if the scheduler's rate setter permits (or
    /// unconditionally when `force` is set, used for conflict injection).
    ///
    /// Parents come from the tip pool of the current opinion; a blowball
    /// node always attaches to genesis.
    pub fn issue<R: Rng>(
        &mut self,
        now: Duration,
        rng: &mut R,
        payload: Color,
        force: bool,
    ) -> Option<(Arc<Message>, Vec<TangleEvent>)> {
        let (floor, allowed) = self.scheduler.burn_value(now, &mut self.storage);
        if !allowed && !force {
            return None;
        }
        let burn = self.ctx.config.burn_policy(self.peer_id.index()).burn(floor);

        let (strong_parents, weak_parents) = if self.behavior == NodeBehavior::Blowball {
            (std::collections::BTreeSet::from([GENESIS]), Default::default())
        } else {
            self.tips
                .tips(self.opinions.opinion(), rng, &self.storage, now)
        };

        let message = self.factory.create(
            &self.ctx,
            now,
            strong_parents,
            weak_parents,
            payload,
            burn,
        );
        let events = self.attach(message.clone(), now);
        Some((message, events))
    }

    /// Drain the internal event queue, routing each event to its
    /// subscribers. New events appended by subscribers are processed in
    /// the same round.
    fn dispatch(&mut self, now: Duration) -> Vec<TangleEvent> {
        let mut log = Vec::new();
        while let Some(event) = self.events.pop_front() {
            match event {
                TangleEvent::MessageStored(id) => {
                    self.solidifier
                        .on_stored(id, &mut self.storage, &mut self.events);
                }
                TangleEvent::MessageSolid(id) => {
                    self.solidifier
                        .on_solid(id, &mut self.storage, &mut self.events);
                    self.booker
                        .on_solid(id, &mut self.storage, &mut self.events);
                    self.approval
                        .approve_messages(id, now, &mut self.storage, &mut self.events);
                }
                TangleEvent::MessageBooked(id) => {
                    self.booker
                        .on_booked(id, &mut self.storage, &mut self.events);
                    self.scheduler
                        .enqueue_message(id, &mut self.storage, &mut self.events);
                    self.opinions
                        .form_opinion(id, &self.storage, &mut self.events);
                }
                TangleEvent::MessageScheduled(id) => {
                    self.scheduler.on_parent_eligible(id, &self.storage);
                    self.tips.on_scheduled(id, &self.storage, now);
                }
                _ => {}
            }
            log.push(event);
        }
        log
    }

    // ─── Accessors ───

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    pub fn behavior(&self) -> NodeBehavior {
        self.behavior
    }

    pub fn context(&self) -> &Arc<SimContext> {
        &self.ctx
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut Storage {
        &mut self.storage
    }

    pub fn scheduler(&self) -> &dyn Scheduler {
        self.scheduler.as_ref()
    }

    pub fn opinions(&self) -> &OpinionManager {
        &self.opinions
    }

    pub fn tip_manager(&self) -> &TipManager {
        &self.tips
    }
}

impl std::fmt::Debug for Tangle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tangle")
            .field("peer_id", &self.peer_id)
            .field("behavior", &self.behavior)
            .field("stored", &self.storage.len())
            .field("opinion", &self.opinions.opinion())
            .finish()
    }
}
