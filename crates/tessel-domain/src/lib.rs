//! Tessel Domain - Distributed domain decomposition for multibody
//! simulation
//!
//! This crate keeps one logically-consistent simulation running across
//! independent spatial partitions: each rank simulates the bodies in
//! its region, replicates boundary-straddling bodies with its
//! neighbors, and hands bodies over as they cross domain boundaries.
//!
//! # Architecture
//!
//! ```text
//! DomainRank (one per rank, owns everything for the run)
//!  │
//!  ├── DomainDescriptor     local region + neighbor adjacency
//!  ├── BodyStore            local records with ownership tags
//!  ├── classify()           geometry -> Interior/Master/Slave/Foreign
//!  ├── migrate::exchange()  spillover + replica fan-out, collective
//!  ├── sync::exchange()     master -> slave reconciliation, collective
//!  └── Transport            reliable ordered p2p + barrier
//! ```
//!
//! # Key properties
//!
//! 1. **Single writer**: exactly one rank holds `Interior` or
//!    `SharedMaster` for a body at every step boundary; ownership is
//!    decided by geometry rules, never negotiated.
//! 2. **Lock-step**: migration and synchronization are collective
//!    rounds; a rank cannot run ahead of its neighbors.
//! 3. **Fail-fast**: lost, malformed, or ambiguous messages abort the
//!    run; partial recovery cannot restore the single-owner invariant.

pub mod migrate;
pub mod sync;

mod classify;
mod codec;
mod config;
mod error;
mod memory;
mod partition;
mod rank;
mod transport;

pub use classify::{classify, primary_owner};
pub use codec::{BincodeCodec, BodyCodec, FORMAT_VERSION};
pub use config::{DomainConfig, TieBreak};
pub use error::{Error, Result};
pub use memory::{MemoryMesh, MeshEndpoint};
pub use migrate::{MigrationOutcome, TagTransition};
pub use partition::{Decomposition, DecompositionSpec, DomainDescriptor, Neighbor};
pub use rank::{DomainRank, StepReport};
pub use sync::SyncOutcome;
pub use transport::{MigratedBody, Packet, StateUpdate, Transport};

// Re-export core types for convenience
pub use tessel_core::{Aabb, BodyId, BodyRecord, BodyState, BodyStore, OwnershipTag, RankId};
