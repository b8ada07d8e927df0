//! Sort-and-sweep pair generation
//!
//! The engine sorts proxies by their minimum x coordinate (with id
//! tie-breaks for determinism) and scans forward: once a candidate's
//! interval start passes the current proxy's interval end, no later
//! candidate can overlap on x and the inner scan stops. Near-linear
//! when the true overlap count is small and motion is coherent; any
//! broad phase degenerates to quadratic when everything overlaps.
//!
//! The scan is embarrassingly parallel over the outer index, so with
//! more than one worker the outer range is chunked across scoped
//! threads. Parallelism stays confined to this rank; results are
//! merged and re-sorted so the output is identical for any worker
//! count.

use crate::OverlapPair;
use tessel_core::{Aabb, BodyId};

/// Proxies below this count are swept serially regardless of the
/// configured worker count; thread startup would dominate.
const PARALLEL_THRESHOLD: usize = 256;

/// Compute all overlapping pairs among `items`.
///
/// Returns the canonical, ascending-sorted, duplicate-free pair list.
pub(crate) fn sweep_pairs(items: &[(BodyId, Aabb)], workers: usize) -> Vec<OverlapPair> {
    let mut sorted: Vec<(BodyId, Aabb)> = items.to_vec();
    sorted.sort_by(|a, b| {
        a.1.min()
            .x
            .total_cmp(&b.1.min().x)
            .then(a.0.cmp(&b.0))
    });

    let mut pairs = if workers <= 1 || sorted.len() < PARALLEL_THRESHOLD {
        scan_range(&sorted, 0, sorted.len())
    } else {
        scan_parallel(&sorted, workers)
    };

    pairs.sort_unstable();
    pairs.dedup();
    pairs
}

/// Scan outer indices `start..end` against the sorted proxy list.
fn scan_range(sorted: &[(BodyId, Aabb)], start: usize, end: usize) -> Vec<OverlapPair> {
    let mut out = Vec::new();
    for i in start..end {
        let (id_a, box_a) = &sorted[i];
        for (id_b, box_b) in &sorted[i + 1..] {
            // Sorted by min x: once past our max x, nothing later can
            // overlap on x.
            if box_b.min().x > box_a.max().x {
                break;
            }
            if box_a.overlaps(box_b) {
                out.push(OverlapPair::new(*id_a, *id_b));
            }
        }
    }
    out
}

/// Chunk the outer range across scoped worker threads.
///
/// Each worker scans its own outer indices but the full tail of the
/// sorted list, so pairs spanning a chunk boundary are still found.
fn scan_parallel(sorted: &[(BodyId, Aabb)], workers: usize) -> Vec<OverlapPair> {
    let chunk = sorted.len().div_ceil(workers);
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|w| {
                let start = w * chunk;
                let end = ((w + 1) * chunk).min(sorted.len());
                scope.spawn(move || {
                    if start >= end {
                        Vec::new()
                    } else {
                        scan_range(sorted, start, end)
                    }
                })
            })
            .collect();

        let mut out = Vec::new();
        for handle in handles {
            out.extend(handle.join().expect("sweep worker panicked"));
        }
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    fn unit_box(id: u64, x: f64) -> (BodyId, Aabb) {
        (
            BodyId(id),
            Aabb::from_center_half_extents(DVec3::new(x, 0.0, 0.0), DVec3::splat(0.5)),
        )
    }

    #[test]
    fn test_disjoint_boxes_no_pairs() {
        let items = vec![unit_box(1, 0.0), unit_box(2, 5.0), unit_box(3, 10.0)];
        assert!(sweep_pairs(&items, 1).is_empty());
    }

    #[test]
    fn test_overlapping_chain() {
        // 0 overlaps 1, 1 overlaps 2, but 0 does not reach 2
        let items = vec![unit_box(1, 0.0), unit_box(2, 0.8), unit_box(3, 1.6)];
        let pairs = sweep_pairs(&items, 1);
        assert_eq!(
            pairs,
            vec![
                OverlapPair::new(BodyId(1), BodyId(2)),
                OverlapPair::new(BodyId(2), BodyId(3)),
            ]
        );
    }

    #[test]
    fn test_touching_faces_pair_up() {
        let items = vec![unit_box(1, 0.0), unit_box(2, 1.0)];
        assert_eq!(sweep_pairs(&items, 1).len(), 1);
    }

    #[test]
    fn test_output_is_sorted_and_unique() {
        // Everything overlapping everything
        let items: Vec<_> = (0..8).map(|i| unit_box(i, i as f64 * 0.01)).collect();
        let pairs = sweep_pairs(&items, 1);
        assert_eq!(pairs.len(), 8 * 7 / 2);

        let mut sorted = pairs.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(pairs, sorted);
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let mut items = vec![unit_box(3, 1.6), unit_box(1, 0.0), unit_box(2, 0.8)];
        let shuffled = sweep_pairs(&items, 1);
        items.reverse();
        assert_eq!(sweep_pairs(&items, 1), shuffled);
    }

    #[test]
    fn test_parallel_matches_serial() {
        // Dense-enough cluster to cross the parallel threshold
        let items: Vec<_> = (0..400)
            .map(|i| unit_box(i, (i % 37) as f64 * 0.3))
            .collect();
        let serial = sweep_pairs(&items, 1);
        let parallel = sweep_pairs(&items, 4);
        assert_eq!(serial, parallel);
        assert!(!serial.is_empty());
    }
}
