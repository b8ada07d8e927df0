//! Body state serialization for migration buffers
//!
//! Migration streams a body's full physics state into a binary buffer,
//! ships it to the receiving rank, and rebuilds the record there. The
//! codec must round-trip every field integration needs (pose, velocity,
//! extent, shape, material reference) exactly, and encoder and decoder
//! must agree on the format version: buffers carry a leading version
//! byte and decoding a foreign version is refused rather than guessed
//! at.

use crate::{Error, Result};
use tessel_core::BodyState;

/// Format version written as the first byte of every encoded buffer
pub const FORMAT_VERSION: u8 = 1;

/// Body state serializer used by the migration protocol
pub trait BodyCodec: Send {
    /// Encode a body state into a self-describing binary buffer.
    fn encode(&self, state: &BodyState) -> Result<Vec<u8>>;

    /// Decode a buffer produced by a matching encoder version.
    fn decode(&self, bytes: &[u8]) -> Result<BodyState>;
}

/// Default codec: a version byte followed by the bincode encoding
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl BincodeCodec {
    /// Create the default codec
    pub fn new() -> Self {
        Self
    }
}

impl BodyCodec for BincodeCodec {
    fn encode(&self, state: &BodyState) -> Result<Vec<u8>> {
        let mut buf = vec![FORMAT_VERSION];
        let body = bincode::serialize(state).map_err(|e| Error::Codec(e.to_string()))?;
        buf.extend_from_slice(&body);
        Ok(buf)
    }

    fn decode(&self, bytes: &[u8]) -> Result<BodyState> {
        let (&version, body) = bytes
            .split_first()
            .ok_or_else(|| Error::Codec("empty migration buffer".to_string()))?;
        if version != FORMAT_VERSION {
            return Err(Error::CodecVersion {
                expected: FORMAT_VERSION,
                got: version,
            });
        }
        bincode::deserialize(body).map_err(|e| Error::Codec(e.to_string()))
    }
}
