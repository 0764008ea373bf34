//! Core types for the tangle simulator.
//!
//! This crate provides the foundational types shared by every layer:
//!
//! - [`MessageId`], [`PeerId`], [`SlotIndex`]: identifiers
//! - [`Message`]: the immutable unit of the DAG
//! - [`Color`]: conflict-branch label
//! - [`WeightDistribution`]: the consensus stake table
//! - [`ProtocolConfig`]: protocol-level parameters
//! - [`NodeBehavior`]: honest/adversary behavior tagged union
//! - [`SimContext`]: shared per-run context (config, stakes, id counter)
//!
//! Everything here is plain data. Components in `tanglesim-tangle` hold
//! `MessageId` handles and resolve them through their node's storage; the
//! only cross-node shared state is the read-only [`SimContext`].

mod behavior;
mod color;
mod config;
mod context;
mod ids;
mod message;
mod weights;

pub use behavior::{AdversaryGroup, AdversaryKind, NodeBehavior};
pub use color::Color;
pub use config::{BurnPolicy, Imif, ProtocolConfig, SchedulerKind, TipSelectorKind};
pub use context::SimContext;
pub use ids::{MessageId, PeerId, SlotIndex, GENESIS};
pub use message::Message;
pub use weights::WeightDistribution;
