//! Error types for tessel-core

use crate::BodyId;
use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("duplicate body: {0} is already present in the store")]
    DuplicateBody(BodyId),

    #[error("body not found: {0}")]
    BodyNotFound(BodyId),

    #[error("invalid extent for {0}: half-extents must be positive")]
    InvalidExtent(BodyId),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
