//! Simulated peer-to-peer network.
//!
//! A [`SimulatedNetwork`] is pure data: a Watts–Strogatz adjacency, one
//! [`Connection`] per directed edge with a fixed sampled delay, and a
//! global packet-loss probability. The harness asks it where (and after
//! what delay) a gossiped message lands; actual delivery timing is the
//! harness's event queue.

mod network;
mod topology;

pub use network::{Connection, GossipDelivery, NetworkConfig, SimulatedNetwork};
pub use topology::watts_strogatz;
