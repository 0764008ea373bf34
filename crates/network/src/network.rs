//! Simulated network with per-connection delay and packet loss.

use crate::topology::watts_strogatz;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tanglesim_types::{AdversaryGroup, PeerId};
use tracing::{debug, warn};

/// Configuration for the simulated network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Lower bound of the per-connection delay.
    pub min_delay: Duration,
    /// Upper bound of the per-connection delay.
    pub max_delay: Duration,
    /// Probability that any single send is lost.
    pub packet_loss: f64,
    /// Watts–Strogatz rewiring probability.
    pub ws_randomness: f64,
    /// Watts–Strogatz neighbor count (lattice degree).
    pub ws_neighbor_count: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(100),
            packet_loss: 0.0,
            ws_randomness: 1.0,
            ws_neighbor_count: 8,
        }
    }
}

/// A directed link between two peers: a fixed delay sampled at build
/// time plus the global loss probability.
#[derive(Debug, Clone, Copy)]
pub struct Connection {
    delay: Duration,
    packet_loss: f64,
}

impl Connection {
    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn packet_loss(&self) -> f64 {
        self.packet_loss
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }
}

/// One gossip delivery decided by the network: target peer and one-way
/// delay. The caller schedules the actual event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GossipDelivery {
    pub to: PeerId,
    pub delay: Duration,
}

/// The network fabric: adjacency plus per-edge connections.
///
/// Construction is deterministic for a given RNG state; delivery
/// decisions (loss) consume the harness RNG per send.
#[derive(Debug)]
pub struct SimulatedNetwork {
    config: NetworkConfig,
    neighbors: Vec<Vec<PeerId>>,
    connections: HashMap<(PeerId, PeerId), Connection>,
}

impl SimulatedNetwork {
    /// Build the topology and sample per-edge delays.
    pub fn new(nodes: usize, config: NetworkConfig, rng: &mut ChaCha8Rng) -> Self {
        let mut config = config;
        if config.min_delay > config.max_delay {
            warn!(
                min = ?config.min_delay,
                max = ?config.max_delay,
                "min delay above max; swapping"
            );
            std::mem::swap(&mut config.min_delay, &mut config.max_delay);
        }

        let adjacency = watts_strogatz(nodes, config.ws_neighbor_count, config.ws_randomness, rng);

        let mut neighbors = Vec::with_capacity(nodes);
        let mut connections = HashMap::new();
        for (i, adjacent) in adjacency.iter().enumerate() {
            let from = PeerId(i as u64);
            let mut list = Vec::with_capacity(adjacent.len());
            for &j in adjacent {
                let to = PeerId(j as u64);
                list.push(to);
                connections.insert(
                    (from, to),
                    Connection {
                        delay: Self::sample_delay(&config, rng),
                        packet_loss: config.packet_loss,
                    },
                );
            }
            neighbors.push(list);
        }

        debug!(
            nodes,
            edges = connections.len(),
            "built Watts-Strogatz network"
        );
        Self {
            config,
            neighbors,
            connections,
        }
    }

    fn sample_delay(config: &NetworkConfig, rng: &mut ChaCha8Rng) -> Duration {
        if config.max_delay <= config.min_delay {
            return config.min_delay;
        }
        let span = (config.max_delay - config.min_delay).as_secs_f64();
        config.min_delay + Duration::from_secs_f64(rng.gen::<f64>() * span)
    }

    /// Apply adversary group overrides: member links take the group's
    /// delay, and `peering_all` members get a lossless direct connection
    /// to every peer.
    pub fn apply_adversary_overrides(&mut self, groups: &[AdversaryGroup], rng: &mut ChaCha8Rng) {
        for group in groups {
            for &member in &group.node_ids {
                if let Some(delay) = group.delay {
                    let peers: Vec<PeerId> = self.neighbors[member.index()].clone();
                    for peer in peers {
                        if let Some(conn) = self.connections.get_mut(&(member, peer)) {
                            conn.set_delay(delay);
                        }
                        if let Some(conn) = self.connections.get_mut(&(peer, member)) {
                            conn.set_delay(delay);
                        }
                    }
                }
                if group.peering_all {
                    for other in 0..self.neighbors.len() {
                        let other = PeerId(other as u64);
                        if other == member
                            || self.connections.contains_key(&(member, other))
                        {
                            continue;
                        }
                        let delay = group
                            .delay
                            .unwrap_or_else(|| Self::sample_delay(&self.config, rng));
                        self.connections.insert(
                            (member, other),
                            Connection {
                                delay,
                                packet_loss: 0.0,
                            },
                        );
                        self.neighbors[member.index()].push(other);
                    }
                }
            }
        }
    }

    /// Neighbors of a peer.
    pub fn neighbors(&self, peer: PeerId) -> &[PeerId] {
        &self.neighbors[peer.index()]
    }

    /// The connection of a directed edge, if it exists.
    pub fn connection(&self, from: PeerId, to: PeerId) -> Option<&Connection> {
        self.connections.get(&(from, to))
    }

    /// Decide delivery over one edge: `None` on packet loss, otherwise the
    /// connection's delay.
    pub fn should_deliver(
        &self,
        from: PeerId,
        to: PeerId,
        rng: &mut ChaCha8Rng,
    ) -> Option<Duration> {
        let connection = self.connections.get(&(from, to))?;
        if connection.packet_loss > 0.0 && rng.gen::<f64>() <= connection.packet_loss {
            return None;
        }
        Some(connection.delay)
    }

    /// Fan a gossip send out to all of the sender's neighbors, sampling
    /// loss per edge. Returns the surviving deliveries.
    pub fn gossip(&self, from: PeerId, rng: &mut ChaCha8Rng) -> Vec<GossipDelivery> {
        let mut deliveries = Vec::new();
        for &to in &self.neighbors[from.index()] {
            if let Some(delay) = self.should_deliver(from, to, rng) {
                deliveries.push(GossipDelivery { to, delay });
            }
        }
        deliveries
    }

    pub fn total_nodes(&self) -> usize {
        self.neighbors.len()
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }
}
