//! Inter-domain body migration (spillover)
//!
//! As bodies move, their residency changes: a body may leave the local
//! region entirely (it must be handed to the rank(s) that now cover
//! it), or newly straddle into a neighbor that needs a slave replica.
//! This round streams such bodies through the body codec, exchanges
//! them with all neighbors, inserts arrivals under their original
//! global id, and garbage-collects records the local rank no longer
//! has any responsibility for.
//!
//! The round is collective like synchronization: every rank sends one
//! `Migrate` packet (possibly empty) to every neighbor and receives one
//! back. Receipt of all neighbor packets is the round-completion
//! acknowledgment that gates removal of foreign records: a body that
//! re-enters the local region in the same step it left is simply
//! reclassified on arrival of its refreshed state and kept, so nothing
//! is ever removed twice.

use crate::{
    classify, BodyCodec, DomainConfig, DomainDescriptor, Error, MigratedBody, Packet, Result,
    Transport,
};
use indexmap::IndexMap;
use tessel_core::{Aabb, BodyId, BodyRecord, BodyStore, OwnershipTag, RankId};
use tracing::{debug, trace};

/// One ownership-tag change observed during reclassification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagTransition {
    /// The retagged body
    pub body: BodyId,
    /// Tag before reclassification
    pub from: OwnershipTag,
    /// Tag after reclassification
    pub to: OwnershipTag,
}

/// What one migration round did on this rank
#[derive(Debug, Clone, Default)]
pub struct MigrationOutcome {
    /// Bodies encoded and sent, with their destination ranks
    /// (fan-out: a body overlapping several regions goes to all of
    /// them in the same round)
    pub sent: Vec<(BodyId, Vec<RankId>)>,
    /// Bodies inserted or refreshed from neighbor packets
    pub received: Vec<BodyId>,
    /// Foreign records dropped after the round completed
    pub dropped: Vec<BodyId>,
}

impl MigrationOutcome {
    /// `true` if the round moved nothing in either direction
    pub fn is_quiet(&self) -> bool {
        self.sent.is_empty() && self.received.is_empty() && self.dropped.is_empty()
    }
}

/// Re-run the ownership classifier over every local record.
///
/// Pure retagging: no record is created or removed here. Returns the
/// transitions so the driver can log them and the migration round can
/// act on them. Extents are inflated by the configured ghost margin
/// before residency is tested.
pub fn reclassify(
    store: &mut BodyStore,
    descriptor: &DomainDescriptor,
    config: &DomainConfig,
) -> Vec<TagTransition> {
    let mut transitions = Vec::new();
    for record in store.iter_mut() {
        let extent = record.world_aabb().inflate(config.ghost_margin);
        let tag = classify(
            &extent,
            record.state.reference_point(),
            descriptor,
            config.tie_break,
        );
        let old = record.ownership();
        if tag != old {
            record.set_ownership(tag);
            transitions.push(TagTransition {
                body: record.id,
                from: old,
                to: tag,
            });
        }
    }
    transitions
}

/// Run one migration round.
///
/// Call after [`reclassify`] so the tags reflect post-integration
/// geometry; `transitions` is that call's return value. `prev_extents`
/// holds each body's bounding extent as of the previous round; a
/// master's body is streamed to a neighbor only when its extent
/// overlaps that neighbor *now* but did not before (the neighbor
/// cannot hold a replica it was never sent). Bodies absent from the
/// map are treated as new and fanned out to every overlapped neighbor.
///
/// Foreign bodies are handed off only by their previous *owner*, and
/// only when no rank covering the new position already held a replica
/// (an existing replica holder reclassifies itself master on its own,
/// so a message would create a second claimant). An ex-slave going
/// foreign just drops its replica after the round. Consequently the
/// same body arriving twice in one round, or arriving for a body the
/// receiver claims authority over, means two ranks believed they owned
/// it: a fatal ownership ambiguity.
///
/// # Errors
///
/// All errors are fatal: an owned body leaving the world with no
/// covering neighbor, a body arriving at a rank its extent does not
/// reach, duplicate or authority-violating arrivals, codec failures,
/// and transport failures.
pub fn exchange(
    store: &mut BodyStore,
    descriptor: &DomainDescriptor,
    codec: &dyn BodyCodec,
    transport: &mut dyn Transport,
    tick: u64,
    config: &DomainConfig,
    transitions: &[TagTransition],
    prev_extents: &IndexMap<BodyId, Aabb>,
) -> Result<MigrationOutcome> {
    let mut outgoing: IndexMap<RankId, Vec<MigratedBody>> = descriptor
        .neighbor_ranks()
        .map(|rank| (rank, Vec::new()))
        .collect();
    let mut outcome = MigrationOutcome::default();

    for record in store.iter() {
        let extent = record.world_aabb().inflate(config.ghost_margin);
        let targets: Vec<RankId> = match record.ownership() {
            // The body left us entirely. Hand it off if we were its
            // owner and nobody covering it holds a replica yet.
            OwnershipTag::Foreign => {
                let was_owned = transitions
                    .iter()
                    .find(|t| t.body == record.id)
                    .map(|t| t.from.is_owned())
                    .unwrap_or(true);
                if !was_owned {
                    // Ex-slave: the master elsewhere keeps
                    // responsibility; just drop after the round.
                    Vec::new()
                } else {
                    let overlapped = descriptor.ranks_overlapping(&extent);
                    if overlapped.is_empty() {
                        return Err(Error::MigrationTargetMissing { body: record.id });
                    }
                    let prev = prev_extents
                        .get(&record.id)
                        .map(|aabb| aabb.inflate(config.ghost_margin));
                    let replica_survives = prev.map_or(false, |prev| {
                        overlapped.iter().any(|rank| {
                            let neighbor = descriptor
                                .neighbor(*rank)
                                .expect("overlap set comes from the adjacency list");
                            prev.overlaps(&neighbor.region)
                        })
                    });
                    if replica_survives {
                        // A covering rank already holds a replica and
                        // will claim mastership by classification.
                        Vec::new()
                    } else {
                        overlapped
                    }
                }
            }
            // Masters create replicas on newly-overlapped neighbors;
            // neighbors already overlapped last round hold one.
            OwnershipTag::SharedMaster => {
                let prev = prev_extents
                    .get(&record.id)
                    .map(|aabb| aabb.inflate(config.ghost_margin));
                descriptor
                    .ranks_overlapping(&extent)
                    .into_iter()
                    .filter(|rank| {
                        let neighbor = descriptor
                            .neighbor(*rank)
                            .expect("overlap set comes from the adjacency list");
                        match &prev {
                            Some(prev) => !prev.overlaps(&neighbor.region),
                            None => true,
                        }
                    })
                    .collect()
            }
            // Interior bodies overlap no neighbor; slaves are
            // replicated by their master.
            OwnershipTag::Interior | OwnershipTag::SharedSlave => Vec::new(),
        };

        if targets.is_empty() {
            continue;
        }
        let buf = codec.encode(&record.state)?;
        for target in &targets {
            outgoing
                .get_mut(target)
                .expect("outgoing map covers all neighbors")
                .push(MigratedBody {
                    id: record.id,
                    buf: buf.clone(),
                });
        }
        trace!(body = %record.id, ?targets, "streaming body to neighbors");
        outcome.sent.push((record.id, targets));
    }

    // Always send, even empty: the packet doubles as the
    // round-completion acknowledgment.
    for (rank, bodies) in outgoing {
        let packet = Packet::Migrate { tick, bodies };
        transport.send(rank, packet.encode()?)?;
    }

    let mut arrivals: IndexMap<BodyId, RankId> = IndexMap::new();
    for neighbor in descriptor.neighbors() {
        let bytes = transport.recv(neighbor.rank)?;
        let (got_tick, bodies) = match Packet::decode(&bytes)? {
            Packet::Migrate { tick, bodies } => (tick, bodies),
            Packet::Sync { .. } => {
                return Err(Error::UnexpectedPacket {
                    from: neighbor.rank,
                    expected: "migrate",
                })
            }
        };
        if got_tick != tick {
            return Err(Error::TickMismatch {
                expected: tick,
                got: got_tick,
                from: neighbor.rank,
            });
        }

        for incoming in bodies {
            if let Some(first_sender) = arrivals.insert(incoming.id, neighbor.rank) {
                // Two senders handing off the same body means two ranks
                // believed they owned it.
                return Err(Error::OwnershipConflict {
                    body: incoming.id,
                    ranks: vec![first_sender, neighbor.rank],
                });
            }
            let state = codec.decode(&incoming.buf)?;
            let extent = state.world_aabb().inflate(config.ghost_margin);
            let tag = classify(
                &extent,
                state.reference_point(),
                descriptor,
                config.tie_break,
            );
            if tag == OwnershipTag::Foreign {
                return Err(Error::MisdirectedMigration {
                    body: incoming.id,
                    from: neighbor.rank,
                });
            }

            match store.get_mut(incoming.id) {
                None => {
                    // Global identifier preserved across the transfer
                    store.insert(BodyRecord::new(incoming.id, state, tag))?;
                    outcome.received.push(incoming.id);
                }
                Some(held) if held.ownership().is_owned() => {
                    return Err(Error::OwnershipConflict {
                        body: incoming.id,
                        ranks: vec![descriptor.rank(), neighbor.rank],
                    });
                }
                Some(held) => {
                    // Replica refresh, or a foreign record whose body
                    // re-entered this step: retag and keep.
                    held.state = state;
                    held.set_ownership(tag);
                    outcome.received.push(incoming.id);
                }
            }
        }
    }

    // Round complete: every neighbor packet arrived, so every foreign
    // record has been delivered and can be dropped.
    let foreign: Vec<BodyId> = store
        .iter()
        .filter(|r| r.ownership() == OwnershipTag::Foreign)
        .map(|r| r.id)
        .collect();
    for id in foreign {
        store.remove(id);
        outcome.dropped.push(id);
    }

    debug!(
        rank = %descriptor.rank(),
        tick,
        sent = outcome.sent.len(),
        received = outcome.received.len(),
        dropped = outcome.dropped.len(),
        "migration round complete"
    );
    Ok(outcome)
}
