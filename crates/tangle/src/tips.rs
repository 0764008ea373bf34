//! Color-partitioned tip pools and tip selection.

use crate::random_map::RandomMap;
use crate::storage::Storage;
use rand::Rng;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tanglesim_types::{Color, MessageId, ProtocolConfig, TipSelectorKind, GENESIS};

/// The unapproved frontier for one color: strong and weak tips with
/// uniform random sampling and O(1) delete.
#[derive(Debug, Clone, Default)]
pub struct TipSet {
    strong: RandomMap<MessageId>,
    weak: RandomMap<MessageId>,
}

impl TipSet {
    /// A new tip set starting from the contents of another (used when a
    /// color first appears: it inherits the undefined-color frontier).
    fn inheriting(from: &TipSet) -> TipSet {
        from.clone()
    }

    /// Admit a message as a strong tip and retire its parents from the
    /// frontier.
    fn add_strong_tip(&mut self, id: MessageId, storage: &Storage) {
        self.strong.insert(id);
        let message = storage.message(id).expect("scheduled message is stored");
        for parent in &message.strong_parents {
            self.strong.remove(*parent);
        }
        for parent in &message.weak_parents {
            self.weak.remove(*parent);
        }
    }

    pub fn strong_len(&self) -> usize {
        self.strong.len()
    }

    pub fn weak_len(&self) -> usize {
        self.weak.len()
    }

    pub fn contains_strong(&self, id: &MessageId) -> bool {
        self.strong.contains(id)
    }
}

/// Maintains per-color tip pools and selects parents for new messages.
///
/// Attached to the scheduler: a message joins the frontier when it is
/// scheduled, so under ICCA+ tip admission follows congestion admission.
#[derive(Debug)]
pub struct TipManager {
    tsa: TipSelectorKind,
    delta_urts: f64,
    parents_count: usize,
    weak_tips_ratio: f64,
    tip_sets: HashMap<Color, TipSet>,
    processed: [u64; 4],
}

impl TipManager {
    pub fn new(config: &ProtocolConfig) -> Self {
        let mut tip_sets = HashMap::new();
        tip_sets.insert(Color::Undefined, TipSet::default());
        Self {
            tsa: config.tsa,
            delta_urts: config.delta_urts,
            parents_count: config.parents_count,
            weak_tips_ratio: config.weak_tips_ratio,
            tip_sets,
            processed: [0; 4],
        }
    }

    /// React to a message being scheduled: admit it to the frontier of its
    /// color (or of every tracked color when it is uncolored) and retire
    /// its parents.
    pub fn on_scheduled(&mut self, id: MessageId, storage: &Storage, now: Duration) {
        let message = storage.message(id).expect("scheduled message is stored");
        let color = storage
            .metadata(id)
            .expect("metadata missing for scheduled message")
            .inherited_color();

        // Under RURTS a message already older than the tip window never
        // enters the frontier.
        let age = now.saturating_sub(message.issuance_time).as_secs_f64();
        if self.tsa == TipSelectorKind::Rurts && age > self.delta_urts {
            return;
        }

        if color == Color::Undefined {
            for (c, tip_set) in self.tip_sets.iter_mut() {
                tip_set.add_strong_tip(id, storage);
                self.processed[c.index()] += 1;
            }
        } else {
            let tip_set = Self::ensure_tip_set(&mut self.tip_sets, color);
            tip_set.add_strong_tip(id, storage);
            self.processed[color.index()] += 1;
        }
    }

    fn ensure_tip_set(tip_sets: &mut HashMap<Color, TipSet>, color: Color) -> &mut TipSet {
        if !tip_sets.contains_key(&color) {
            let inherited = TipSet::inheriting(&tip_sets[&Color::Undefined]);
            tip_sets.insert(color, inherited);
        }
        tip_sets.get_mut(&color).expect("inserted above")
    }

    /// Select parents from the pool of the node's current opinion.
    ///
    /// Returns `({GENESIS}, ∅)` when the strong frontier is empty. Under
    /// RURTS, stale tips encountered during selection are evicted.
    pub fn tips<R: Rng>(
        &mut self,
        opinion: Color,
        rng: &mut R,
        storage: &Storage,
        now: Duration,
    ) -> (BTreeSet<MessageId>, BTreeSet<MessageId>) {
        let delta_urts = self.delta_urts;
        let tsa = self.tsa;
        let weak_count = (self.parents_count as f64 * self.weak_tips_ratio) as usize;
        let strong_count = self.parents_count - weak_count;
        let tip_set = Self::ensure_tip_set(&mut self.tip_sets, opinion);

        let strong = match tsa {
            TipSelectorKind::Urts => tip_set
                .strong
                .random_unique(rng, strong_count)
                .into_iter()
                .collect::<BTreeSet<_>>(),
            TipSelectorKind::Rurts => {
                Self::select_fresh(&mut tip_set.strong, rng, strong_count, delta_urts, storage, now)
            }
        };
        let strong = if strong.is_empty() {
            BTreeSet::from([GENESIS])
        } else {
            strong
        };

        let weak = if weak_count > 0 {
            tip_set
                .weak
                .random_unique(rng, weak_count)
                .into_iter()
                .filter(|id| !strong.contains(id))
                .collect()
        } else {
            BTreeSet::new()
        };

        (strong, weak)
    }

    /// RURTS selection: walk a shuffled view of the pool, evicting tips
    /// older than the window and accepting fresh ones until the quota is
    /// met.
    fn select_fresh<R: Rng>(
        tips: &mut RandomMap<MessageId>,
        rng: &mut R,
        amount: usize,
        delta_urts: f64,
        storage: &Storage,
        now: Duration,
    ) -> BTreeSet<MessageId> {
        let shuffled = tips.random_unique(rng, tips.len());
        let mut selected = BTreeSet::new();
        for id in shuffled {
            let issuance = storage
                .message(id)
                .expect("tip is stored")
                .issuance_time;
            if now.saturating_sub(issuance).as_secs_f64() > delta_urts {
                tips.remove(id);
                continue;
            }
            if selected.len() < amount {
                selected.insert(id);
            }
        }
        selected
    }

    /// Strong tip pool size for a color (zero when the color has no pool
    /// yet).
    pub fn tip_pool_size(&self, color: Color) -> usize {
        self.tip_sets
            .get(&color)
            .map(TipSet::strong_len)
            .unwrap_or(0)
    }

    /// Messages admitted to the frontier of a color so far.
    pub fn processed(&self, color: Color) -> u64 {
        self.processed[color.index()]
    }

    pub fn tip_set(&self, color: Color) -> Option<&TipSet> {
        self.tip_sets.get(&color)
    }
}
