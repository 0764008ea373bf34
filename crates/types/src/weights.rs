//! Consensus weight (stake) distribution.

use crate::PeerId;

/// The stake table: one weight per peer, indexed by [`PeerId`].
///
/// Built once at startup from a Zipf law (optionally with adversary weights
/// appended) and read-only for the rest of the run, so it can be shared
/// freely across peers.
#[derive(Debug, Clone)]
pub struct WeightDistribution {
    weights: Vec<u64>,
    total: u64,
}

impl WeightDistribution {
    /// Create a distribution from explicit weights.
    pub fn new(weights: Vec<u64>) -> Self {
        let total = weights.iter().sum();
        Self { weights, total }
    }

    /// Zipf-distributed weights: weight(i) ∝ (i+1)^(-s), scaled so the sum
    /// approximates `total_weight`. Peer 0 is the heaviest.
    pub fn zipf(nodes: usize, total_weight: u64, s: f64) -> Self {
        let raw: Vec<f64> = (0..nodes).map(|i| ((i + 1) as f64).powf(-s)).collect();
        let sum: f64 = raw.iter().sum();
        let weights = raw
            .iter()
            .map(|w| ((w / sum) * total_weight as f64) as u64)
            .collect();
        Self::new(weights)
    }

    /// Stake of a single peer.
    pub fn weight(&self, peer: PeerId) -> u64 {
        self.weights[peer.index()]
    }

    /// Sum of all stakes.
    pub fn total_weight(&self) -> u64 {
        self.total
    }

    /// Number of peers.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Stake of a peer as a fraction of the total.
    pub fn share(&self, peer: PeerId) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.weight(peer) as f64 / self.total as f64
        }
    }

    /// The peer with the smallest stake (highest index on ties, matching
    /// the Zipf ordering where weight decreases with the id).
    pub fn lightest_peer(&self) -> PeerId {
        let mut min = u64::MAX;
        let mut peer = PeerId(0);
        for (i, &w) in self.weights.iter().enumerate() {
            if w <= min {
                min = w;
                peer = PeerId(i as u64);
            }
        }
        peer
    }

    /// Raw access for table-driven callers (witness accumulation).
    pub fn as_slice(&self) -> &[u64] {
        &self.weights
    }
}
