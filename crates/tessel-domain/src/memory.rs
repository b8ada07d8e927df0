//! In-process mesh transport
//!
//! One endpoint per rank, connected pairwise by mpsc channels, with a
//! shared barrier for the collective step boundary. Intended for tests,
//! demos, and single-machine runs where each rank is a thread; the
//! channels give exactly the reliable, ordered point-to-point semantics
//! the protocols assume.

use crate::{Error, Result, Transport};
use indexmap::IndexMap;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Barrier};
use std::time::Duration;
use tessel_core::RankId;

/// Default patience before a blocked receive is declared lost.
///
/// Generous compared to a simulation step so that only a genuinely
/// dead or wedged neighbor trips it; the resulting error is fatal,
/// never a retry trigger.
const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Fully-connected in-process mesh of rank endpoints
pub struct MemoryMesh;

impl MemoryMesh {
    /// Build endpoints for ranks `0..count`, fully connected.
    ///
    /// Hand one endpoint to each rank thread. The endpoints share one
    /// barrier sized to `count`, so `barrier()` only returns once every
    /// rank has entered it.
    ///
    /// # Panics
    ///
    /// Panics if `count` is zero.
    pub fn connect(count: usize) -> Vec<MeshEndpoint> {
        assert!(count > 0, "mesh needs at least one rank");

        let barrier = Arc::new(Barrier::new(count));

        // One channel per ordered pair (i -> j).
        let mut senders: Vec<IndexMap<RankId, Sender<Vec<u8>>>> =
            (0..count).map(|_| IndexMap::new()).collect();
        let mut receivers: Vec<IndexMap<RankId, Receiver<Vec<u8>>>> =
            (0..count).map(|_| IndexMap::new()).collect();

        for i in 0..count {
            for j in 0..count {
                if i == j {
                    continue;
                }
                let (tx, rx) = std::sync::mpsc::channel();
                senders[i].insert(RankId(j as u32), tx);
                receivers[j].insert(RankId(i as u32), rx);
            }
        }

        senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(i, (senders, receivers))| MeshEndpoint {
                rank: RankId(i as u32),
                senders,
                receivers,
                barrier: Arc::clone(&barrier),
                recv_timeout: DEFAULT_RECV_TIMEOUT,
            })
            .collect()
    }
}

/// One rank's endpoint of a [`MemoryMesh`]
pub struct MeshEndpoint {
    rank: RankId,
    senders: IndexMap<RankId, Sender<Vec<u8>>>,
    receivers: IndexMap<RankId, Receiver<Vec<u8>>>,
    barrier: Arc<Barrier>,
    recv_timeout: Duration,
}

impl MeshEndpoint {
    /// Override the receive timeout (default 5 s).
    pub fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }
}

impl Transport for MeshEndpoint {
    fn rank(&self) -> RankId {
        self.rank
    }

    fn send(&mut self, to: RankId, bytes: Vec<u8>) -> Result<()> {
        let sender = self
            .senders
            .get(&to)
            .ok_or_else(|| Error::transport(to, "unknown peer"))?;
        sender
            .send(bytes)
            .map_err(|_| Error::transport(to, "peer endpoint dropped"))
    }

    fn recv(&mut self, from: RankId) -> Result<Vec<u8>> {
        let receiver = self
            .receivers
            .get(&from)
            .ok_or_else(|| Error::transport(from, "unknown peer"))?;
        receiver.recv_timeout(self.recv_timeout).map_err(|e| {
            Error::transport(from, format!("recv failed after {:?}: {}", self.recv_timeout, e))
        })
    }

    fn barrier(&mut self) -> Result<()> {
        self.barrier.wait();
        Ok(())
    }
}
