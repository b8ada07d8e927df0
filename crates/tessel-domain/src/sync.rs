//! Inter-domain state synchronization
//!
//! Replicated copies of a shared body integrate independently on every
//! rank that holds them, so the copies accumulate small floating-point
//! divergence each step. This round makes every replica numerically
//! identical again, using the master's values as ground truth: each
//! rank batches the state of its shared masters into one packet per
//! relevant neighbor, and every received update overwrites the local
//! slave replica unconditionally.
//!
//! The round is collective and barrier-like: a rank sends one `Sync`
//! packet (possibly empty) to *every* neighbor and expects one back
//! from every neighbor, so a missing packet is always detectable and
//! fatal. Updates for independent bodies are unordered within a round;
//! every slave replica is fully updated before the round returns.

use crate::{DomainDescriptor, Error, Packet, Result, StateUpdate, Transport};
use indexmap::IndexMap;
use tessel_core::{BodyStore, OwnershipTag, RankId};
use tracing::{debug, warn};

/// Counters from one synchronization round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Updates sent to neighbors (sum over packets)
    pub sent: usize,
    /// Updates applied to local slave replicas
    pub applied: usize,
}

/// Run one synchronization round.
///
/// Callers must have completed the migration round for this step first:
/// migration is what guarantees that every neighbor a master's extent
/// overlaps actually holds a slave replica to overwrite.
///
/// # Errors
///
/// All errors are fatal distributed-consistency or transport failures:
/// an update naming a body this rank also claims authority over, an
/// update for a replica this rank does not hold, a packet from the
/// wrong step, or a failed exchange.
pub fn exchange(
    store: &mut BodyStore,
    descriptor: &DomainDescriptor,
    transport: &mut dyn Transport,
    tick: u64,
) -> Result<SyncOutcome> {
    let mut outgoing: IndexMap<RankId, Vec<StateUpdate>> = descriptor
        .neighbor_ranks()
        .map(|rank| (rank, Vec::new()))
        .collect();

    for record in store.masters() {
        let extent = record.world_aabb();
        let update = StateUpdate {
            id: record.id,
            pose: record.state.pose,
            velocity: record.state.velocity,
        };
        for neighbor in descriptor.neighbors() {
            if neighbor.region.overlaps(&extent) {
                outgoing
                    .get_mut(&neighbor.rank)
                    .expect("outgoing map covers all neighbors")
                    .push(update.clone());
            }
        }
    }

    let mut outcome = SyncOutcome::default();

    // Every neighbor gets a packet, even an empty one: receivers must
    // be able to tell "no shared bodies" apart from a lost message.
    for (rank, updates) in outgoing {
        outcome.sent += updates.len();
        let packet = Packet::Sync { tick, updates };
        transport.send(rank, packet.encode()?)?;
    }

    for neighbor in descriptor.neighbors() {
        let bytes = transport.recv(neighbor.rank)?;
        let (got_tick, updates) = match Packet::decode(&bytes)? {
            Packet::Sync { tick, updates } => (tick, updates),
            Packet::Migrate { .. } => {
                return Err(Error::UnexpectedPacket {
                    from: neighbor.rank,
                    expected: "sync",
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

        for update in updates {
            let Some(record) = store.get_mut(update.id) else {
                return Err(Error::MissingReplica {
                    body: update.id,
                    from: neighbor.rank,
                });
            };
            match record.ownership() {
                OwnershipTag::SharedSlave => {
                    record.state.pose = update.pose;
                    record.state.velocity = update.velocity;
                    outcome.applied += 1;
                }
                OwnershipTag::Interior | OwnershipTag::SharedMaster => {
                    return Err(Error::OwnershipConflict {
                        body: update.id,
                        ranks: vec![descriptor.rank(), neighbor.rank],
                    });
                }
                OwnershipTag::Foreign => {
                    // Migration drops foreign records before sync runs;
                    // a standalone caller may still hit this.
                    warn!(body = %update.id, "sync update for a foreign record, skipping");
                }
            }
        }
    }

    debug!(
        rank = %descriptor.rank(),
        tick,
        sent = outcome.sent,
        applied = outcome.applied,
        "synchronization round complete"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Decomposition, MemoryMesh};
    use glam::DVec3;
    use tessel_core::{Aabb, BodyId, BodyRecord, BodyState, Pose, ShapeRef, Velocity};

    fn two_rank_world() -> (DomainDescriptor, DomainDescriptor) {
        let world = Aabb::new(DVec3::ZERO, DVec3::new(20.0, 10.0, 10.0));
        let mut descriptors = Decomposition::grid(world, 2, 1, 1)
            .unwrap()
            .into_descriptors();
        let r1 = descriptors.pop().unwrap();
        let r0 = descriptors.pop().unwrap();
        (r0, r1)
    }

    fn body(position: DVec3) -> BodyState {
        BodyState {
            pose: Pose::at(position),
            velocity: Velocity::default(),
            half_extents: DVec3::splat(0.5),
            shape: ShapeRef::Sphere { radius: 0.5 },
            material: "steel".to_string(),
        }
    }

    #[test]
    fn test_master_state_overwrites_slave() {
        let (d0, d1) = two_rank_world();
        let mut endpoints = MemoryMesh::connect(2);
        let mut e1 = endpoints.pop().unwrap();
        let mut e0 = endpoints.pop().unwrap();

        // Straddling body: master copy on rank 0, drifted slave on rank 1
        let master_state = body(DVec3::new(9.8, 5.0, 5.0));
        let mut drifted = master_state.clone();
        drifted.pose.position.x += 1.0e-9;
        drifted.velocity.linear.y = 1.0e-10;

        let mut store0 = BodyStore::new();
        store0
            .insert(BodyRecord::new(
                BodyId(1),
                master_state.clone(),
                OwnershipTag::SharedMaster,
            ))
            .unwrap();
        let mut store1 = BodyStore::new();
        store1
            .insert(BodyRecord::new(
                BodyId(1),
                drifted,
                OwnershipTag::SharedSlave,
            ))
            .unwrap();

        let t = std::thread::spawn(move || {
            let outcome = exchange(&mut store1, &d1, &mut e1, 1).unwrap();
            (store1, outcome)
        });
        let outcome0 = exchange(&mut store0, &d0, &mut e0, 1).unwrap();
        let (store1, outcome1) = t.join().unwrap();

        assert_eq!(outcome0.sent, 1);
        assert_eq!(outcome0.applied, 0);
        assert_eq!(outcome1.applied, 1);

        // Replica is now bit-identical to the master
        let replica = store1.get(BodyId(1)).unwrap();
        assert_eq!(replica.state.pose, master_state.pose);
        assert_eq!(replica.state.velocity, master_state.velocity);
    }

    #[test]
    fn test_empty_round_completes() {
        let (d0, d1) = two_rank_world();
        let mut endpoints = MemoryMesh::connect(2);
        let mut e1 = endpoints.pop().unwrap();
        let mut e0 = endpoints.pop().unwrap();

        let mut store0 = BodyStore::new();
        let mut store1 = BodyStore::new();

        let t = std::thread::spawn(move || exchange(&mut store1, &d1, &mut e1, 3).unwrap());
        let outcome = exchange(&mut store0, &d0, &mut e0, 3).unwrap();
        let other = t.join().unwrap();

        assert_eq!(outcome, SyncOutcome::default());
        assert_eq!(other, SyncOutcome::default());
    }

    #[test]
    fn test_update_for_owned_body_is_ownership_conflict() {
        let (d0, _) = two_rank_world();
        let mut endpoints = MemoryMesh::connect(2);
        let mut e1 = endpoints.pop().unwrap();
        let mut e0 = endpoints.pop().unwrap();

        // Rank 1 (handcrafted) claims mastership of a body rank 0
        // holds as Interior.
        let crafted = Packet::Sync {
            tick: 1,
            updates: vec![StateUpdate {
                id: BodyId(7),
                pose: Pose::at(DVec3::new(9.0, 5.0, 5.0)),
                velocity: Velocity::default(),
            }],
        };
        e1.send(RankId(0), crafted.encode().unwrap()).unwrap();

        let mut store0 = BodyStore::new();
        store0
            .insert(BodyRecord::new(
                BodyId(7),
                body(DVec3::new(5.0, 5.0, 5.0)),
                OwnershipTag::Interior,
            ))
            .unwrap();

        let err = exchange(&mut store0, &d0, &mut e0, 1).unwrap_err();
        assert!(matches!(
            err,
            Error::OwnershipConflict { body: BodyId(7), .. }
        ));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_update_for_unknown_body_is_missing_replica() {
        let (d0, _) = two_rank_world();
        let mut endpoints = MemoryMesh::connect(2);
        let mut e1 = endpoints.pop().unwrap();
        let mut e0 = endpoints.pop().unwrap();

        let crafted = Packet::Sync {
            tick: 1,
            updates: vec![StateUpdate {
                id: BodyId(9),
                pose: Pose::at(DVec3::new(9.0, 5.0, 5.0)),
                velocity: Velocity::default(),
            }],
        };
        e1.send(RankId(0), crafted.encode().unwrap()).unwrap();

        let mut store0 = BodyStore::new();
        let err = exchange(&mut store0, &d0, &mut e0, 1).unwrap_err();
        assert!(matches!(err, Error::MissingReplica { body: BodyId(9), .. }));
    }

    #[test]
    fn test_stale_tick_is_lock_step_violation() {
        let (d0, _) = two_rank_world();
        let mut endpoints = MemoryMesh::connect(2);
        let mut e1 = endpoints.pop().unwrap();
        let mut e0 = endpoints.pop().unwrap();

        let crafted = Packet::Sync {
            tick: 4,
            updates: vec![],
        };
        e1.send(RankId(0), crafted.encode().unwrap()).unwrap();

        let mut store0 = BodyStore::new();
        let err = exchange(&mut store0, &d0, &mut e0, 5).unwrap_err();
        assert!(matches!(
            err,
            Error::TickMismatch {
                expected: 5,
                got: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_migrate_packet_mid_sync_is_unexpected() {
        let (d0, _) = two_rank_world();
        let mut endpoints = MemoryMesh::connect(2);
        let mut e1 = endpoints.pop().unwrap();
        let mut e0 = endpoints.pop().unwrap();

        let crafted = Packet::Migrate {
            tick: 1,
            bodies: vec![],
        };
        e1.send(RankId(0), crafted.encode().unwrap()).unwrap();

        let mut store0 = BodyStore::new();
        let err = exchange(&mut store0, &d0, &mut e0, 1).unwrap_err();
        assert!(matches!(err, Error::UnexpectedPacket { .. }));
    }
}
