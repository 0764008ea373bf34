//! Metrics snapshots collected during a run.

use std::collections::BTreeMap;

/// One approval-weight snapshot for a monitored peer.
#[derive(Debug, Clone, Copy)]
pub struct AwRow {
    pub ns_since_start: u128,
    /// Stake per color, indexed by `Color::index()`.
    pub approval_weights: [u64; 4],
    /// Messages this peer has confirmed so far.
    pub confirmed: u64,
    /// Messages issued network-wide so far.
    pub issued: u64,
}

/// One tip-pool snapshot (taken from peer 0).
#[derive(Debug, Clone, Copy)]
pub struct TipsRow {
    pub ns_since_start: u128,
    /// Strong tip pool size per color, indexed by `Color::index()`.
    pub sizes: [usize; 4],
}

/// One witness-weight trace point for the monitored (peer, message) pair.
#[derive(Debug, Clone, Copy)]
pub struct WwRow {
    pub ns_since_start: u128,
    pub weight: u64,
}

/// Final per-peer throughput counters.
#[derive(Debug, Clone, Copy)]
pub struct ThroughputRow {
    pub peer: u64,
    pub issued: u64,
    pub scheduled: u64,
    pub confirmed: u64,
    pub orphaned: u64,
    pub dropped: u64,
    pub throttled: u64,
}

/// Everything a run measured, ready for the result writers.
#[derive(Debug, Default)]
pub struct MetricsLog {
    /// Approval-weight series per monitored peer.
    pub aw: BTreeMap<u64, Vec<AwRow>>,
    /// Tip-pool series of peer 0.
    pub tips: Vec<TipsRow>,
    /// Witness-weight trace of the monitored (peer, message) pair.
    pub ww: Vec<WwRow>,
    /// RMC series of peer 0: (slot, price).
    pub rmc: Vec<(u64, f64)>,
    /// Final throughput counters, one row per peer.
    pub throughput: Vec<ThroughputRow>,
}
