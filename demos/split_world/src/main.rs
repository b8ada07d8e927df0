//! Two-rank demo: a world split down the middle, with bodies drifting
//! across the boundary.
//!
//! Each rank runs on its own thread with an in-process mesh transport.
//! Watch the log for ownership transitions, replica fan-out, and the
//! final handoff as bodies cross from rank 0 into rank 1; the run ends
//! with a rank-ordered AABB/state dump on stdout.

use glam::DVec3;
use std::sync::mpsc;
use tessel_broadphase::DistributedBroadPhase;
use tessel_core::{BodyId, BodyState, Pose, RankId, ShapeRef, Velocity};
use tessel_domain::{
    BincodeCodec, DecompositionSpec, DomainConfig, DomainRank, Error, MemoryMesh,
};
use tessel_trace::OrderedDump;
use tracing::info;

const STEPS: usize = 12;
const DT: f64 = 0.5;

fn body(position: DVec3, velocity: DVec3) -> BodyState {
    BodyState {
        pose: Pose::at(position),
        velocity: Velocity::linear(velocity),
        half_extents: DVec3::splat(0.5),
        shape: ShapeRef::Sphere { radius: 0.5 },
        material: "steel".to_string(),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let spec = DecompositionSpec::from_ron_str(
        "(world_min: (0.0, 0.0, 0.0), world_max: (40.0, 20.0, 20.0), cells: (2, 1, 1))",
    )
    .expect("demo decomposition spec is valid");
    let decomposition = spec.build().expect("demo decomposition builds");

    let endpoints = MemoryMesh::connect(decomposition.len());
    let (dump_tx, dump_rx) = mpsc::channel();

    let handles: Vec<_> = decomposition
        .into_descriptors()
        .into_iter()
        .zip(endpoints)
        .map(|(descriptor, endpoint)| {
            let dump_tx = dump_tx.clone();
            std::thread::spawn(move || run_rank_thread(descriptor, endpoint, dump_tx))
        })
        .collect();
    drop(dump_tx);

    let mut dump = OrderedDump::new();
    for (rank, store, pairs) in dump_rx {
        dump.record_aabb(rank, &store);
        dump.record_state(rank, &store);
        dump.record_pairs(rank, &pairs);
    }
    for handle in handles {
        handle.join().expect("rank thread panicked");
    }

    println!("{}", dump.to_string_ordered());
}

fn run_rank_thread(
    descriptor: tessel_domain::DomainDescriptor,
    endpoint: tessel_domain::MeshEndpoint,
    dump_tx: mpsc::Sender<(
        RankId,
        tessel_core::BodyStore,
        Vec<tessel_broadphase::OverlapPair>,
    )>,
) {
    let mut rank = DomainRank::new(
        descriptor,
        DomainConfig::default(),
        Box::new(endpoint),
        Box::new(BincodeCodec::new()),
    );

    seed_bodies(&mut rank);

    let mut broad_phase = DistributedBroadPhase::new();

    for _ in 0..STEPS {
        // Local integration: every held replica advances the same way
        rank.integrate_with(|_, state| {
            let step = state.velocity.linear * DT;
            state.pose.position += step;
        });

        let report = rank.end_of_step().expect("step completes");
        for transition in &report.transitions {
            info!(
                rank = %rank.rank(),
                body = %transition.body,
                from = %transition.from,
                to = %transition.to,
                "ownership transition"
            );
        }

        // Refresh broad-phase proxies from the post-step store
        sync_broad_phase(&mut broad_phase, &rank);
        broad_phase.run();
        if !broad_phase.overlapping_pairs().is_empty() {
            info!(
                rank = %rank.rank(),
                pairs = broad_phase.overlapping_pairs().len(),
                "overlap candidates"
            );
        }
    }

    let pairs = broad_phase.overlapping_pairs().to_vec();
    let _ = dump_tx.send((rank.rank(), rank.store().clone(), pairs));
}

/// Initial placement: every rank scans the same global body list and
/// keeps whatever is local to it.
fn seed_bodies(rank: &mut DomainRank) {
    let initial = [
        // Drifts from rank 0 across the boundary at x = 20
        (BodyId(1), body(DVec3::new(16.0, 10.0, 10.0), DVec3::new(2.0, 0.0, 0.0))),
        // A slow pair near the middle of rank 0
        (BodyId(2), body(DVec3::new(8.0, 10.0, 10.0), DVec3::new(0.2, 0.0, 0.0))),
        (BodyId(3), body(DVec3::new(8.9, 10.0, 10.0), DVec3::new(0.2, 0.0, 0.0))),
        // Stationary resident of rank 1
        (BodyId(4), body(DVec3::new(30.0, 10.0, 10.0), DVec3::ZERO)),
    ];

    for (id, state) in initial {
        match rank.insert_body(id, state) {
            Ok(tag) => info!(rank = %rank.rank(), body = %id, %tag, "seeded"),
            Err(Error::OutsideRegion(_)) => {}
            Err(e) => panic!("seeding failed: {e}"),
        }
    }
}

fn sync_broad_phase(broad_phase: &mut DistributedBroadPhase, rank: &DomainRank) {
    // Drop proxies for bodies that migrated away or were deleted
    let stale: Vec<BodyId> = broad_phase
        .ids()
        .filter(|id| !rank.store().contains(*id))
        .collect();
    for id in stale {
        broad_phase.remove(id).expect("stale proxy was registered");
    }

    for record in rank.store().iter() {
        let aabb = record.world_aabb();
        let tag = record.ownership();
        if broad_phase.contains(record.id) {
            broad_phase
                .update(record.id, aabb, tag)
                .expect("proxy is registered");
        } else {
            broad_phase
                .add(record.id, aabb, tag)
                .expect("proxy was not registered");
        }
    }
}
