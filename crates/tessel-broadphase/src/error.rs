//! Error types for tessel-broadphase
//!
//! All errors here are local registration misuse, reported to the
//! immediate caller; none of them aborts the distributed run.

use tessel_core::BodyId;
use thiserror::Error;

/// Broad-phase error type
#[derive(Debug, Error)]
pub enum Error {
    /// `add` called for a body that is already registered
    #[error("collision model already registered: {0}")]
    AlreadyRegistered(BodyId),

    /// `remove` or `update` called for a body that was never
    /// registered (removal is not idempotent by contract)
    #[error("collision model not registered: {0}")]
    NotRegistered(BodyId),

    /// The active-region filter box has zero volume along some axis
    #[error("active region has zero extent along some axis")]
    InvalidActiveRegion,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
