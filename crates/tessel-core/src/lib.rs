//! Tessel Core - Data model for distributed multibody simulation
//!
//! This crate provides the leaf types shared by the tessel workspace:
//! - Body and rank identifiers
//! - AABB geometry used for extents, domain regions, and filters
//! - Body physics state, ownership tags, and the per-rank body store
//!
//! Protocol logic (classification, synchronization, migration) lives in
//! `tessel-domain`; this crate stays a dependency-light leaf.

mod aabb;
mod body;
mod error;
mod identity;

pub use aabb::Aabb;
pub use body::{BodyRecord, BodyState, BodyStore, OwnershipTag, Pose, ShapeRef, Velocity};
pub use error::{Error, Result};
pub use identity::{BodyId, RankId};
