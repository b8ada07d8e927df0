//! Transport abstraction and wire packets
//!
//! Ranks exchange state through explicit messages only; no rank ever
//! reads another rank's body records directly. The trait assumes a
//! reliable, ordered point-to-point channel between any two ranks plus
//! a collective barrier; the protocols perform no retries of their
//! own and surface transport failures upward as fatal errors.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tessel_core::{BodyId, Pose, RankId, Velocity};

/// Reliable, ordered message exchange between ranks.
///
/// Implementations: [`crate::MemoryMesh`] for in-process runs and
/// tests; MPI or socket transports live outside this workspace behind
/// the same trait.
pub trait Transport: Send {
    /// The local rank this endpoint belongs to
    fn rank(&self) -> RankId;

    /// Send one message to `to`. Must preserve per-peer ordering.
    fn send(&mut self, to: RankId, bytes: Vec<u8>) -> Result<()>;

    /// Receive the next message from `from`, blocking until it arrives
    /// or the transport gives up (which is fatal to the run).
    fn recv(&mut self, from: RankId) -> Result<Vec<u8>>;

    /// Collective barrier: every rank enters before any rank exits.
    ///
    /// Used between steps so rank N's step K exchange always observes
    /// rank M's step K state, never K-1 or K+1.
    fn barrier(&mut self) -> Result<()>;
}

/// Pose and velocity of one shared body, sent master → slave
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    /// Global body identifier
    pub id: BodyId,
    /// Master's pose
    pub pose: Pose,
    /// Master's velocity state
    pub velocity: Velocity,
}

/// One body in flight during migration: the codec output plus the
/// identifier the receiver must preserve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigratedBody {
    /// Global body identifier, stable across the transfer
    pub id: BodyId,
    /// Encoded [`tessel_core::BodyState`]
    pub buf: Vec<u8>,
}

/// Wire packets of the two per-step protocol rounds.
///
/// Both rounds are collective: a rank sends one packet (possibly with
/// an empty payload) to every neighbor and expects one back, so a
/// receiver can always tell "nothing to send" apart from a lost
/// message. Every packet carries the sender's step index; a mismatch
/// means the ranks fell out of lock-step and is fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    /// Master → slave state reconciliation for one round
    Sync {
        /// Sender's step index
        tick: u64,
        /// Updates for every shared body relevant to the receiver
        updates: Vec<StateUpdate>,
    },
    /// Bodies spilling over into the receiver's region this round
    Migrate {
        /// Sender's step index
        tick: u64,
        /// Encoded bodies; empty when nothing crossed
        bodies: Vec<MigratedBody>,
    },
}

impl Packet {
    /// Encode for the wire.
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Codec(e.to_string()))
    }

    /// Decode from the wire. A malformed packet is fatal to the run.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Codec(e.to_string()))
    }
}
