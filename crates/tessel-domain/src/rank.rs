//! Per-rank simulation driver
//!
//! `DomainRank` is the context object a rank's simulation loop owns:
//! the body store, the partition descriptor, the run configuration, and
//! the transport and codec collaborators. Everything is explicitly
//! passed and scoped to one run; there is no process-wide shared state.
//!
//! Per step, the driver enforces the protocol order the distributed
//! invariant depends on:
//!
//! ```text
//! integrate (caller)          every rank advances its local copies
//!   -> reclassify             ownership tags follow the new geometry
//!   -> migration round        bodies and replicas change hands
//!   -> synchronization round  slave replicas snap to master state
//!   -> barrier                no rank starts step K+1 early
//! ```
//!
//! Steps are logically lock-stepped across ranks: `end_of_step` blocks
//! until the collective exchanges complete, and a slow or dead neighbor
//! surfaces as a fatal transport error rather than a partial step.

use crate::{
    classify, migrate, sync, BodyCodec, DomainConfig, DomainDescriptor, MigrationOutcome, Result,
    SyncOutcome, TagTransition, Transport,
};
use indexmap::IndexMap;
use tessel_core::{Aabb, BodyId, BodyRecord, BodyState, BodyStore, Error as CoreError, OwnershipTag};
use tracing::info;

/// What one completed step did on this rank
#[derive(Debug, Clone)]
pub struct StepReport {
    /// The step index that was completed
    pub tick: u64,
    /// Ownership transitions observed during reclassification
    pub transitions: Vec<TagTransition>,
    /// Migration round outcome
    pub migration: MigrationOutcome,
    /// Synchronization round outcome
    pub synced: SyncOutcome,
}

/// One rank's view of the distributed simulation
pub struct DomainRank {
    descriptor: DomainDescriptor,
    config: DomainConfig,
    store: BodyStore,
    transport: Box<dyn Transport>,
    codec: Box<dyn BodyCodec>,
    /// Body extents as of the previous completed round; drives replica
    /// fan-out decisions in the migration protocol
    prev_extents: IndexMap<BodyId, Aabb>,
    tick: u64,
}

impl DomainRank {
    /// Create a rank driver from its validated descriptor and
    /// collaborators.
    pub fn new(
        descriptor: DomainDescriptor,
        config: DomainConfig,
        transport: Box<dyn Transport>,
        codec: Box<dyn BodyCodec>,
    ) -> Self {
        Self {
            descriptor,
            config,
            store: BodyStore::new(),
            transport,
            codec,
            prev_extents: IndexMap::new(),
            tick: 0,
        }
    }

    /// The local rank id
    pub fn rank(&self) -> tessel_core::RankId {
        self.descriptor.rank()
    }

    /// The partition descriptor
    pub fn descriptor(&self) -> &DomainDescriptor {
        &self.descriptor
    }

    /// The run configuration
    pub fn config(&self) -> &DomainConfig {
        &self.config
    }

    /// Completed steps so far
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// The local body store
    pub fn store(&self) -> &BodyStore {
        &self.store
    }

    /// Mutable access to the local body store.
    ///
    /// Ownership tags are managed by the classifier and the migration
    /// protocol; callers should mutate state, not tags.
    pub fn store_mut(&mut self) -> &mut BodyStore {
        &mut self.store
    }

    /// Place a body in this rank's simulation.
    ///
    /// Classifies immediately and rejects bodies whose extent misses
    /// the local region entirely (a local caller error, not fatal to
    /// the run). Initial placement of a straddling body on several
    /// ranks is fine: each rank classifies its own copy and exactly one
    /// becomes the master.
    pub fn insert_body(&mut self, id: BodyId, state: BodyState) -> Result<OwnershipTag> {
        let extent = state.world_aabb().inflate(self.config.ghost_margin);
        let tag = classify(
            &extent,
            state.reference_point(),
            &self.descriptor,
            self.config.tie_break,
        );
        if tag == OwnershipTag::Foreign {
            return Err(crate::Error::OutsideRegion(id));
        }
        self.store.insert(BodyRecord::new(id, state, tag))?;
        Ok(tag)
    }

    /// Remove a body explicitly (deletion, not migration).
    pub fn remove_body(&mut self, id: BodyId) -> Result<BodyRecord> {
        self.prev_extents.shift_remove(&id);
        self.store
            .remove(id)
            .ok_or_else(|| crate::Error::Core(CoreError::BodyNotFound(id)))
    }

    /// Apply the external integrator to every local body copy.
    ///
    /// Every rank integrates every replica it holds, masters and slaves
    /// alike, with the same scheme; the synchronization round then
    /// erases the small numerical divergence the independent
    /// integrations accumulate.
    pub fn integrate_with(&mut self, mut f: impl FnMut(BodyId, &mut BodyState)) {
        for record in self.store.iter_mut() {
            f(record.id, &mut record.state);
        }
    }

    /// Complete the current step: reclassify, exchange migrations,
    /// synchronize replicas, and hit the inter-step barrier.
    ///
    /// Blocks until every neighbor has completed its own exchanges.
    /// There is no partial-progress mode: any error out of here is
    /// fatal to the run (see [`crate::Error::is_fatal`]).
    pub fn end_of_step(&mut self) -> Result<StepReport> {
        self.tick += 1;

        let transitions = migrate::reclassify(&mut self.store, &self.descriptor, &self.config);
        let migration = migrate::exchange(
            &mut self.store,
            &self.descriptor,
            self.codec.as_ref(),
            self.transport.as_mut(),
            self.tick,
            &self.config,
            &transitions,
            &self.prev_extents,
        )?;
        let synced = sync::exchange(
            &mut self.store,
            &self.descriptor,
            self.transport.as_mut(),
            self.tick,
        )?;
        self.transport.barrier()?;

        self.prev_extents = self
            .store
            .iter()
            .map(|record| (record.id, record.world_aabb()))
            .collect();

        if !migration.is_quiet() || !transitions.is_empty() {
            info!(
                rank = %self.descriptor.rank(),
                tick = self.tick,
                transitions = transitions.len(),
                migrated_out = migration.sent.len(),
                migrated_in = migration.received.len(),
                dropped = migration.dropped.len(),
                "step boundary"
            );
        }

        Ok(StepReport {
            tick: self.tick,
            transitions,
            migration,
            synced,
        })
    }
}

impl std::fmt::Debug for DomainRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainRank")
            .field("rank", &self.descriptor.rank())
            .field("tick", &self.tick)
            .field("bodies", &self.store.len())
            .finish()
    }
}
