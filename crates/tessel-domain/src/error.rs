//! Error types for tessel-domain
//!
//! The taxonomy follows the propagation policy of the run:
//! configuration, distributed-consistency, and transport errors are
//! fatal (continuing would silently duplicate or lose physical state);
//! local call misuse is returned to the caller and the run continues.
//! [`Error::is_fatal`] encodes the split.

use tessel_core::{BodyId, RankId};
use thiserror::Error;

/// Result type for tessel-domain operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tessel-domain
#[derive(Debug, Error)]
pub enum Error {
    /// The decomposition is structurally invalid (detected at setup,
    /// before the first step)
    #[error("invalid decomposition: {0}")]
    InvalidDecomposition(String),

    /// A configuration value failed to parse or validate
    #[error("configuration error: {0}")]
    Config(String),

    /// Two ranks both claim authority over the same body
    #[error("ownership conflict for {body}: ranks {ranks:?} both claim authority")]
    OwnershipConflict {
        /// The contested body
        body: BodyId,
        /// The ranks involved, for fault reproduction
        ranks: Vec<RankId>,
    },

    /// A master sent an update for a replica this rank does not hold
    #[error("missing replica for {body}: update from {from} has no local record")]
    MissingReplica { body: BodyId, from: RankId },

    /// A body left the local region but overlaps no neighbor region,
    /// so it would be owned nowhere
    #[error("migration target missing for {body}: extent overlaps no neighbor region")]
    MigrationTargetMissing { body: BodyId },

    /// A migrated body arrived at a rank whose region its extent does
    /// not reach
    #[error("misdirected migration of {body} from {from}: extent does not reach this region")]
    MisdirectedMigration { body: BodyId, from: RankId },

    /// A neighbor's packet carries the wrong step index; the ranks have
    /// fallen out of lock-step
    #[error("lock-step violation: expected tick {expected} from {from}, got {got}")]
    TickMismatch {
        expected: u64,
        got: u64,
        from: RankId,
    },

    /// A packet of the wrong kind arrived mid-round
    #[error("unexpected packet from {from}: expected {expected}")]
    UnexpectedPacket {
        from: RankId,
        expected: &'static str,
    },

    /// Message exchange with a peer failed or timed out.
    ///
    /// Never retried: without idempotence guarantees a retry could
    /// double-apply a migration.
    #[error("transport failure with {peer}: {reason}")]
    Transport { peer: RankId, reason: String },

    /// Body state failed to encode or decode
    #[error("codec error: {0}")]
    Codec(String),

    /// A migration buffer was produced by a different codec version
    #[error("codec version mismatch: expected {expected}, got {got}")]
    CodecVersion { expected: u8, got: u8 },

    /// Caller tried to place a body wholly outside the local region
    #[error("body outside local region: {0}")]
    OutsideRegion(BodyId),

    /// Core error
    #[error("core error: {0}")]
    Core(#[from] tessel_core::Error),
}

impl Error {
    /// `true` if the run cannot safely continue past this error.
    ///
    /// Only local call misuse is recoverable; everything else risks a
    /// body owned nowhere or owned twice.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::OutsideRegion(_))
    }

    /// Shorthand for a transport failure with a peer
    pub fn transport(peer: RankId, reason: impl Into<String>) -> Self {
        Error::Transport {
            peer,
            reason: reason.into(),
        }
    }
}

// Compile-time check that Error is Send + Sync for thread-safe error
// propagation across rank threads.
fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<Error>();
}
