//! Simulation-level configuration and adversary group resolution.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tanglesim_network::NetworkConfig;
use tanglesim_types::{
    AdversaryGroup, AdversaryKind, Color, PeerId, ProtocolConfig, SimContext, WeightDistribution,
};
use tracing::warn;

/// How conflicting colors enter the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SimulationMode {
    /// No conflicts are injected.
    #[default]
    Normal,
    /// Honest issuers accidentally double spend at the configured delay.
    Accidental,
    /// Adversary groups issue their initial colors at the configured delay.
    Adversary,
}

impl SimulationMode {
    pub fn parse(s: &str) -> Option<SimulationMode> {
        match s {
            "Normal" => Some(SimulationMode::Normal),
            "Accidental" => Some(SimulationMode::Accidental),
            "Adversary" => Some(SimulationMode::Adversary),
            _ => None,
        }
    }
}

/// Raw adversary arrays as configured. Entries are parallel per group;
/// mismatched lengths are repaired with a warning, never fatal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdversaryConfig {
    /// Strategy per group (0 honest, 1 shift, 2 same, 3 no-gossip, 4 blowball).
    pub types: Vec<usize>,
    /// Percent of total weight per group.
    pub mana: Vec<f64>,
    /// Member count per group.
    pub node_counts: Vec<usize>,
    /// Delay override per group, milliseconds.
    pub delays_ms: Vec<u64>,
    /// Initial color per group ("R", "G", "B"). Mandatory per group.
    pub init_colors: Vec<String>,
    /// Issuance speedup per group.
    pub speedup: Vec<f64>,
    /// Members gossip directly to every peer.
    pub peering_all: bool,
}

/// Everything a run needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub protocol: ProtocolConfig,
    pub network: NetworkConfig,
    /// Master seed; every derived RNG is a pure function of it.
    pub seed: u64,
    pub duration: Duration,
    /// Cadence of metrics snapshots and early-stop checks.
    pub consensus_monitor_tick: Duration,
    /// Peers whose approval weights are written to `aw<peer>.csv`.
    pub monitored_aw_peers: Vec<u64>,
    pub simulation_mode: SimulationMode,
    /// When the conflicting colors are issued.
    pub double_spend_delay: Duration,
    /// Stop once this fraction of peers shares one colored opinion.
    pub simulation_stop_threshold: f64,
    pub adversary: AdversaryConfig,
    /// Issuers of accidental double spends: "max", "min", "random" or a
    /// literal peer id.
    pub accidental_mana: Vec<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            protocol: ProtocolConfig::default(),
            network: NetworkConfig::default(),
            seed: 0,
            duration: Duration::from_secs(60),
            consensus_monitor_tick: Duration::from_millis(100),
            monitored_aw_peers: vec![0],
            simulation_mode: SimulationMode::Normal,
            double_spend_delay: Duration::from_secs(5),
            simulation_stop_threshold: 1.0,
            adversary: AdversaryConfig::default(),
            accidental_mana: Vec::new(),
        }
    }
}

impl SimulationConfig {
    /// Resolve the adversary arrays into groups.
    ///
    /// Groups without an initial color are discarded (matching the rule
    /// that colors are mandatory); optional arrays whose length disagrees
    /// with the types array are dropped entirely with a warning.
    pub fn resolve_adversary_groups(&self) -> Vec<AdversaryGroup> {
        if self.simulation_mode != SimulationMode::Adversary {
            return Vec::new();
        }
        let types = &self.adversary.types;
        if types.is_empty() {
            return Vec::new();
        }
        if self.adversary.init_colors.len() != types.len() {
            warn!("adversary init colors count differs from types count; no adversary groups");
            return Vec::new();
        }

        let mana = checked_array("adversary mana", &self.adversary.mana, types.len(), 1.0);
        let counts = checked_array(
            "adversary node counts",
            &self.adversary.node_counts,
            types.len(),
            1,
        );
        let delays = checked_array("adversary delays", &self.adversary.delays_ms, types.len(), 0);
        let speedups = checked_array("adversary speedup", &self.adversary.speedup, types.len(), 1.0);

        types
            .iter()
            .enumerate()
            .map(|(i, &kind)| AdversaryGroup {
                kind: AdversaryKind::from_index(kind),
                mana_percent: mana[i],
                node_count: counts[i],
                delay: match delays[i] {
                    0 => None,
                    ms => Some(Duration::from_millis(ms)),
                },
                init_color: Color::from_letter(&self.adversary.init_colors[i]),
                speedup: speedups[i],
                peering_all: self.adversary.peering_all,
                node_ids: Vec::new(),
            })
            .collect()
    }

    /// Build the stake table: honest nodes share the non-adversary weight
    /// by the Zipf law, adversary members take the highest peer ids with
    /// their group's mana split evenly. Returns the distribution and the
    /// groups with `node_ids` assigned.
    pub fn build_weights(&self) -> (WeightDistribution, Vec<AdversaryGroup>) {
        let mut groups = self.resolve_adversary_groups();
        let total_adversary_nodes: usize = groups.iter().map(|g| g.node_count).sum();
        let total_adversary_mana: f64 = groups.iter().map(|g| g.mana_percent).sum();

        let honest_nodes = self
            .protocol
            .nodes_count
            .saturating_sub(total_adversary_nodes);
        let honest_weight = (self.protocol.nodes_total_weight as f64
            * (1.0 - total_adversary_mana / 100.0)) as u64;

        let honest = WeightDistribution::zipf(
            honest_nodes,
            honest_weight,
            self.protocol.zipf_parameter,
        );
        let mut weights: Vec<u64> = (0..honest_nodes)
            .map(|i| honest.weight(PeerId(i as u64)))
            .collect();

        let mut next_id = honest_nodes as u64;
        for group in &mut groups {
            let group_mana = group.mana_percent * self.protocol.nodes_total_weight as f64 / 100.0;
            let per_node = (group_mana / group.node_count as f64) as u64;
            for _ in 0..group.node_count {
                group.node_ids.push(PeerId(next_id));
                weights.push(per_node);
                next_id += 1;
            }
        }

        (WeightDistribution::new(weights), groups)
    }

    /// The shared context for this run.
    pub fn build_context(&self) -> (Arc<SimContext>, Vec<AdversaryGroup>) {
        let (weights, groups) = self.build_weights();
        (
            Arc::new(SimContext::new(self.protocol.clone(), weights)),
            groups,
        )
    }
}

/// Validate a parallel adversary array: empty means "all defaults", the
/// right length passes through, anything else is dropped with a warning.
fn checked_array<T: Copy>(name: &str, values: &[T], expected: usize, default: T) -> Vec<T> {
    if values.is_empty() {
        return vec![default; expected];
    }
    if values.len() == expected {
        return values.to_vec();
    }
    warn!(
        name,
        got = values.len(),
        expected,
        "array length differs from adversary group count; ignoring it"
    );
    vec![default; expected]
}
