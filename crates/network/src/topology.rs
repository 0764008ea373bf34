//! Watts–Strogatz small-world topology generation.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;
use tracing::warn;

/// Generate a Watts–Strogatz graph over `n` nodes.
///
/// Starts from a ring lattice where every node links to its `k / 2`
/// clockwise and counter-clockwise neighbors, then rewires each clockwise
/// edge with probability `beta` to a uniformly random target (no self
/// loops, no duplicate edges). The result is undirected: both endpoints
/// list each other.
///
/// Degenerate parameters are repaired, not rejected: an odd `k` is rounded
/// down, and `k >= n` falls back to the complete graph.
pub fn watts_strogatz(n: usize, k: usize, beta: f64, rng: &mut ChaCha8Rng) -> Vec<BTreeSet<usize>> {
    let mut adjacency: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
    if n <= 1 {
        return adjacency;
    }

    let mut k = k;
    if k % 2 == 1 {
        warn!(k, "neighbor count must be even; rounding down");
        k -= 1;
    }
    if k >= n {
        warn!(k, n, "neighbor count too large; using complete graph");
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    adjacency[i].insert(j);
                }
            }
        }
        return adjacency;
    }

    // Ring lattice.
    for i in 0..n {
        for j in 1..=k / 2 {
            let neighbor = (i + j) % n;
            adjacency[i].insert(neighbor);
            adjacency[neighbor].insert(i);
        }
    }

    // Rewire clockwise edges.
    for i in 0..n {
        for j in 1..=k / 2 {
            if rng.gen::<f64>() >= beta {
                continue;
            }
            let old = (i + j) % n;
            // Find a fresh target; give up if the node is saturated.
            let mut target = rng.gen_range(0..n);
            let mut attempts = 0;
            while (target == i || adjacency[i].contains(&target)) && attempts < 4 * n {
                target = rng.gen_range(0..n);
                attempts += 1;
            }
            if target == i || adjacency[i].contains(&target) {
                continue;
            }
            adjacency[i].remove(&old);
            adjacency[old].remove(&i);
            adjacency[i].insert(target);
            adjacency[target].insert(i);
        }
    }

    adjacency
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_ring_lattice_without_rewiring() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let adjacency = watts_strogatz(10, 4, 0.0, &mut rng);
        for (i, neighbors) in adjacency.iter().enumerate() {
            assert_eq!(neighbors.len(), 4, "node {i} must keep lattice degree");
            assert!(!neighbors.contains(&i), "no self loops");
        }
    }

    #[test]
    fn test_graph_is_undirected() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let adjacency = watts_strogatz(20, 6, 0.5, &mut rng);
        for (i, neighbors) in adjacency.iter().enumerate() {
            for &j in neighbors {
                assert!(adjacency[j].contains(&i), "edge ({i},{j}) must be mutual");
            }
        }
    }

    #[test]
    fn test_is_deterministic_for_seed() {
        let mut rng1 = ChaCha8Rng::seed_from_u64(7);
        let mut rng2 = ChaCha8Rng::seed_from_u64(7);
        assert_eq!(
            watts_strogatz(30, 8, 0.3, &mut rng1),
            watts_strogatz(30, 8, 0.3, &mut rng2)
        );
    }

    #[test]
    fn test_oversized_degree_yields_complete_graph() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let adjacency = watts_strogatz(4, 10, 0.1, &mut rng);
        for (i, neighbors) in adjacency.iter().enumerate() {
            assert_eq!(neighbors.len(), 3, "node {i} must link to all others");
        }
    }
}
