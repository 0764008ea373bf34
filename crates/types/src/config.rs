//! Protocol configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which congestion-control scheduler a node runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SchedulerKind {
    /// Pass-through: every booked message is scheduled immediately.
    NoScheduler,
    /// Priority queue ordered by mana burn, gated by access mana.
    #[default]
    ManaBurn,
    /// Deficit round robin per issuer with Referenced Mana Cost admission.
    Icca,
}

impl SchedulerKind {
    /// Parse the configuration spelling. Unknown values fall back to
    /// `NoScheduler`; the caller is expected to log the fallback.
    pub fn parse(s: &str) -> Option<SchedulerKind> {
        match s {
            "NoScheduler" => Some(SchedulerKind::NoScheduler),
            "ManaBurn" => Some(SchedulerKind::ManaBurn),
            "ICCA+" => Some(SchedulerKind::Icca),
            _ => None,
        }
    }
}

/// Tip-selection algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TipSelectorKind {
    /// Uniform random tip selection.
    #[default]
    Urts,
    /// URTS restricted to tips younger than `delta_urts` seconds.
    Rurts,
}

impl TipSelectorKind {
    pub fn parse(s: &str) -> Option<TipSelectorKind> {
        match s.to_ascii_uppercase().as_str() {
            "URTS" => Some(TipSelectorKind::Urts),
            "RURTS" => Some(TipSelectorKind::Rurts),
            _ => None,
        }
    }
}

/// Inter-message issuing function: the distribution of issuance
/// inter-arrival times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Imif {
    /// Exponential inter-arrivals (Poisson process).
    #[default]
    Poisson,
    /// Constant inter-arrivals.
    Uniform,
}

impl Imif {
    pub fn parse(s: &str) -> Option<Imif> {
        match s.to_ascii_lowercase().as_str() {
            "poisson" => Some(Imif::Poisson),
            "uniform" => Some(Imif::Uniform),
            _ => None,
        }
    }
}

/// Per-node mana-burn policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BurnPolicy {
    /// Burn nothing.
    #[default]
    NoBurn,
    /// Burn exactly the current scheduling floor.
    Anxious,
    /// Burn the floor plus one unit.
    Greedy1,
    /// Burn the floor plus ten units.
    Greedy10,
}

impl BurnPolicy {
    /// Decode the numeric configuration form (0..=3). Out-of-range values
    /// mean `NoBurn`.
    pub fn from_index(i: usize) -> BurnPolicy {
        match i {
            1 => BurnPolicy::Anxious,
            2 => BurnPolicy::Greedy1,
            3 => BurnPolicy::Greedy10,
            _ => BurnPolicy::NoBurn,
        }
    }

    /// The burn value for a given scheduling floor.
    pub fn burn(&self, floor: f64) -> f64 {
        const EPSILON: f64 = 1.0;
        match self {
            BurnPolicy::NoBurn => 0.0,
            BurnPolicy::Anxious => floor,
            BurnPolicy::Greedy1 => floor + EPSILON,
            BurnPolicy::Greedy10 => floor + 10.0 * EPSILON,
        }
    }
}

/// Protocol-level parameters, shared read-only by every component of every
/// node through [`SimContext`](crate::SimContext).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Number of nodes in the network.
    pub nodes_count: usize,
    /// Total consensus weight distributed across nodes.
    pub nodes_total_weight: u64,
    /// Skew of the Zipf stake distribution.
    pub zipf_parameter: f64,
    /// Fraction of total weight at which a message confirms.
    pub confirmation_threshold: f64,
    /// Messages older than this when reaching the threshold are orphaned
    /// instead of confirmed.
    pub confirmation_window: Duration,
    /// Number of parents referenced per message.
    pub parents_count: usize,
    /// Ratio of weak parents among the references.
    pub weak_tips_ratio: f64,
    /// Tip-selection algorithm.
    pub tsa: TipSelectorKind,
    /// Maximum tip age in seconds under RURTS.
    pub delta_urts: f64,
    /// Scheduler discipline.
    pub scheduler: SchedulerKind,
    /// Scheduler emissions per second.
    pub scheduling_rate: u64,
    /// Deficit cap under ICCA+.
    pub max_deficit: f64,
    /// Access mana every peer starts with.
    pub initial_mana: f64,
    /// Duration of one RMC accounting slot.
    pub slot_time: Duration,
    /// How many slots in the past RMC looks when adjusting.
    pub rmc_slots: u64,
    /// RMC of slot 0 under ICCA+.
    pub initial_rmc: f64,
    /// Slot occupancy below which RMC decreases.
    pub lower_rmc_threshold: f64,
    /// Slot occupancy above which RMC increases.
    pub upper_rmc_threshold: f64,
    /// RMC decrease factor (< 1).
    pub alpha_rmc: f64,
    /// RMC increase factor (> 1).
    pub beta_rmc: f64,
    /// RMC clamp, lower bound.
    pub rmc_min: f64,
    /// RMC clamp, upper bound.
    pub rmc_max: f64,
    /// Network-wide issuance rate in messages per second.
    pub issuing_rate: u64,
    /// Inter-arrival distribution for issuance.
    pub imif: Imif,
    /// Per-node burn policies, cycled when shorter than `nodes_count`.
    pub burn_policies: Vec<BurnPolicy>,
    /// (peer, message) pair whose witness-weight growth is traced.
    pub monitored_witness: Option<(u64, u64)>,
}

impl ProtocolConfig {
    /// Burn policy of a node, cycling the configured list.
    pub fn burn_policy(&self, node: usize) -> BurnPolicy {
        if self.burn_policies.is_empty() {
            BurnPolicy::NoBurn
        } else {
            self.burn_policies[node % self.burn_policies.len()]
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            nodes_count: 100,
            nodes_total_weight: 100_000_000,
            zipf_parameter: 0.9,
            confirmation_threshold: 0.66,
            confirmation_window: Duration::from_secs(30),
            parents_count: 8,
            weak_tips_ratio: 0.0,
            tsa: TipSelectorKind::Urts,
            delta_urts: 5.0,
            scheduler: SchedulerKind::ManaBurn,
            scheduling_rate: 200,
            max_deficit: 2.0,
            initial_mana: 0.0,
            slot_time: Duration::from_secs(1),
            rmc_slots: 3,
            initial_rmc: 1.0,
            lower_rmc_threshold: 100.0,
            upper_rmc_threshold: 150.0,
            alpha_rmc: 0.8,
            beta_rmc: 1.2,
            rmc_min: 0.5,
            rmc_max: 10.0,
            issuing_rate: 50,
            imif: Imif::Poisson,
            burn_policies: vec![BurnPolicy::NoBurn],
            monitored_witness: None,
        }
    }
}
