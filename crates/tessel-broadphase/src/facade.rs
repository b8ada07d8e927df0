//! Distributed-aware broad-phase facade
//!
//! Wraps the sort-and-sweep engine with the bookkeeping a distributed
//! rank needs: registration keyed by global body id, ownership-tag
//! awareness (foreign bodies never pair, even while their stale
//! geometry is still cached locally), and the optional active-region
//! filter that keeps far-away bodies out of pairing entirely.
//!
//! Internal data-parallelism (the worker count) is confined to this
//! rank's engine and invisible across rank boundaries.

use crate::{sweep, Error, OverlapPair, PairConsumer, Result};
use indexmap::IndexMap;
use tessel_core::{Aabb, BodyId, OwnershipTag};
use tracing::debug;

/// Worker-count configuration for the sweep engine
///
/// The value is clamped to `[1, max_workers()]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadPhaseConfig {
    workers: usize,
}

impl BroadPhaseConfig {
    /// Configure with the given worker count (clamped).
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: workers.clamp(1, max_workers()),
        }
    }

    /// The configured worker count
    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Default for BroadPhaseConfig {
    /// Single worker by default: zero parallel overhead.
    fn default() -> Self {
        Self { workers: 1 }
    }
}

/// Maximum useful worker count on this machine
pub fn max_workers() -> usize {
    num_cpus::get()
}

/// One registered collision proxy
#[derive(Debug, Clone, Copy)]
struct Proxy {
    aabb: Aabb,
    tag: OwnershipTag,
}

/// The broad-phase surface a distributed rank drives every step
///
/// Typical per-step use:
///
/// ```rust,ignore
/// for record in rank.store().iter() {
///     broad_phase.update(record.id, record.world_aabb(), record.ownership())?;
/// }
/// broad_phase.run();
/// broad_phase.report_pairs(&mut contact_container);
/// ```
#[derive(Debug, Default)]
pub struct DistributedBroadPhase {
    config: BroadPhaseConfig,
    proxies: IndexMap<BodyId, Proxy>,
    active_region: Option<Aabb>,
    pairs: Vec<OverlapPair>,
}

impl DistributedBroadPhase {
    /// Create a facade with the default single-worker engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a facade with an explicit worker configuration.
    pub fn with_config(config: BroadPhaseConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// The engine configuration
    pub fn config(&self) -> &BroadPhaseConfig {
        &self.config
    }

    /// Number of registered proxies
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    /// `true` if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a body's collision geometry.
    ///
    /// # Errors
    ///
    /// `AlreadyRegistered` if the id is present; a local caller error,
    /// not fatal to the run.
    pub fn add(&mut self, id: BodyId, aabb: Aabb, tag: OwnershipTag) -> Result<()> {
        if self.proxies.contains_key(&id) {
            return Err(Error::AlreadyRegistered(id));
        }
        self.proxies.insert(id, Proxy { aabb, tag });
        Ok(())
    }

    /// Unregister a body.
    ///
    /// # Errors
    ///
    /// `NotRegistered` if the id is absent; removal is not idempotent
    /// by contract, so a double remove is reported.
    pub fn remove(&mut self, id: BodyId) -> Result<()> {
        self.proxies
            .shift_remove(&id)
            .map(|_| ())
            .ok_or(Error::NotRegistered(id))
    }

    /// Refresh a registered body's geometry and ownership tag.
    ///
    /// # Errors
    ///
    /// `NotRegistered` if the id is absent.
    pub fn update(&mut self, id: BodyId, aabb: Aabb, tag: OwnershipTag) -> Result<()> {
        let proxy = self.proxies.get_mut(&id).ok_or(Error::NotRegistered(id))?;
        *proxy = Proxy { aabb, tag };
        Ok(())
    }

    /// `true` if `id` is registered
    pub fn contains(&self, id: BodyId) -> bool {
        self.proxies.contains_key(&id)
    }

    /// All registered body ids, in registration order
    pub fn ids(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.proxies.keys().copied()
    }

    // ========================================================================
    // Active-region filter
    // ========================================================================

    /// Enable the active-region filter.
    ///
    /// # Errors
    ///
    /// `InvalidActiveRegion` for a zero-volume box (an inconsistent
    /// filter configuration, rejected before it can run).
    pub fn set_active_region(&mut self, region: Aabb) -> Result<()> {
        if region.is_degenerate() {
            return Err(Error::InvalidActiveRegion);
        }
        self.active_region = Some(region);
        Ok(())
    }

    /// Disable the active-region filter.
    pub fn clear_active_region(&mut self) {
        self.active_region = None;
    }

    /// The current filter box; `None` means filtering is disabled.
    pub fn active_region(&self) -> Option<Aabb> {
        self.active_region
    }

    // ========================================================================
    // Pairing
    // ========================================================================

    /// Run pair generation over the currently registered bodies.
    ///
    /// Excluded from pairing:
    /// - bodies tagged `Foreign` (logically owned elsewhere; their
    ///   stale local geometry must not produce contacts), and
    /// - when the active-region filter is set, bodies whose extent
    ///   does not intersect the filter box.
    pub fn run(&mut self) {
        let eligible: Vec<(BodyId, Aabb)> = self
            .proxies
            .iter()
            .filter(|(_, proxy)| proxy.tag != OwnershipTag::Foreign)
            .filter(|(_, proxy)| match &self.active_region {
                Some(region) => region.overlaps(&proxy.aabb),
                None => true,
            })
            .map(|(id, proxy)| (*id, proxy.aabb))
            .collect();

        self.pairs = sweep::sweep_pairs(&eligible, self.config.workers());
        debug!(
            registered = self.proxies.len(),
            eligible = eligible.len(),
            pairs = self.pairs.len(),
            "broad-phase run complete"
        );
    }

    /// The pairs found by the most recent [`run`](Self::run).
    ///
    /// Canonical unordered form, ascending, duplicate-free. Cleared
    /// and recomputed by every run.
    pub fn overlapping_pairs(&self) -> &[OverlapPair] {
        &self.pairs
    }

    /// Ids of registered bodies whose extents intersect `aabb`.
    ///
    /// Drives selective activation and deactivation of distant bodies;
    /// ignores ownership tags and the active-region filter.
    pub fn query_aabb(&self, aabb: &Aabb) -> Vec<BodyId> {
        self.proxies
            .iter()
            .filter(|(_, proxy)| proxy.aabb.overlaps(aabb))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Stream the most recent pair list into a consumer: `begin`,
    /// `add` once per pair, `end`.
    pub fn report_pairs(&self, consumer: &mut dyn PairConsumer) {
        consumer.begin(self.pairs.len());
        for pair in &self.pairs {
            consumer.add(pair);
        }
        consumer.end();
    }
}
