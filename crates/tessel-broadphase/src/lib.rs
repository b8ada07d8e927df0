//! Tessel Broadphase - Distributed-aware collision broad-phase
//!
//! This crate produces overlap-pair candidates for the narrow-phase
//! and solver stages of one rank's pipeline:
//!
//! - **Registration**: collision proxies keyed by global body id
//! - **Ownership awareness**: foreign-tagged bodies are excluded even
//!   while their stale geometry is still cached locally
//! - **Active-region filter**: an optional box restricting which
//!   bodies participate in pairing at all
//! - **Reporting**: begin / add / end streaming into external contact
//!   and proximity containers
//!
//! The engine underneath is a deterministic sort-and-sweep; its
//! data-parallelism is confined to the local rank.

mod error;
mod facade;
mod pair;
mod report;
mod sweep;

pub use error::{Error, Result};
pub use facade::{max_workers, BroadPhaseConfig, DistributedBroadPhase};
pub use pair::OverlapPair;
pub use report::{CollectingConsumer, PairConsumer};
