//! Spatial partition descriptors and world decomposition
//!
//! Each rank of a run owns one convex rectangular region of the world
//! plus the adjacency list of neighboring ranks. Descriptors are built
//! once at setup (from a grid decomposition or by hand), validated, and
//! read-only for the rest of the run.
//!
//! # Grid layout
//!
//! [`Decomposition::grid`] splits the world box into an `nx × ny × nz`
//! lattice. Cell `(ix, iy, iz)` maps to rank `ix + nx * (iy + ny * iz)`:
//!
//! ```text
//! nx = 3, ny = 2, nz = 1:
//! ┌─────┬─────┬─────┐
//! │ r3  │ r4  │ r5  │
//! ├─────┼─────┼─────┤
//! │ r0  │ r1  │ r2  │
//! └─────┴─────┴─────┘
//! ```
//!
//! Neighbors are the cells adjacent across a face, edge, or corner
//! (26-adjacency in 3D, fewer at the hull).

use crate::{Error, Result};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use tessel_core::{Aabb, RankId};

/// One adjacent rank and its region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// The neighbor's rank id
    pub rank: RankId,
    /// The neighbor's region
    pub region: Aabb,
}

/// Per-rank view of the decomposition: the local region and the
/// adjacency list. Immutable after setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainDescriptor {
    rank: RankId,
    region: Aabb,
    neighbors: Vec<Neighbor>,
}

impl DomainDescriptor {
    /// Create a descriptor. Structural validation happens when the
    /// descriptor set is assembled into a [`Decomposition`].
    pub fn new(rank: RankId, region: Aabb, neighbors: Vec<Neighbor>) -> Self {
        Self {
            rank,
            region,
            neighbors,
        }
    }

    /// The local rank id
    pub fn rank(&self) -> RankId {
        self.rank
    }

    /// The local region
    pub fn region(&self) -> &Aabb {
        &self.region
    }

    /// All neighbors
    pub fn neighbors(&self) -> &[Neighbor] {
        &self.neighbors
    }

    /// Look up a neighbor by rank
    pub fn neighbor(&self, rank: RankId) -> Option<&Neighbor> {
        self.neighbors.iter().find(|n| n.rank == rank)
    }

    /// `true` if `rank` is in the adjacency list
    pub fn is_neighbor(&self, rank: RankId) -> bool {
        self.neighbor(rank).is_some()
    }

    /// All neighbor rank ids, in adjacency-list order
    pub fn neighbor_ranks(&self) -> impl Iterator<Item = RankId> + '_ {
        self.neighbors.iter().map(|n| n.rank)
    }

    /// Neighbor ranks whose region overlaps `aabb`
    pub fn ranks_overlapping(&self, aabb: &Aabb) -> Vec<RankId> {
        self.neighbors
            .iter()
            .filter(|n| n.region.overlaps(aabb))
            .map(|n| n.rank)
            .collect()
    }

    /// The rank (self or a neighbor) whose region contains `point`
    /// under the half-open containment rule, if any.
    pub fn rank_containing(&self, point: DVec3) -> Option<RankId> {
        if self.region.contains_point(point) {
            return Some(self.rank);
        }
        self.neighbors
            .iter()
            .find(|n| n.region.contains_point(point))
            .map(|n| n.rank)
    }
}

/// The complete, validated set of descriptors for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decomposition {
    descriptors: Vec<DomainDescriptor>,
}

impl Decomposition {
    /// Split `world` into an `nx × ny × nz` grid of domains.
    ///
    /// Cell boundaries are computed as exact fractions of the world
    /// extent, so adjacent regions share faces with no gaps.
    pub fn grid(world: Aabb, nx: u32, ny: u32, nz: u32) -> Result<Self> {
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(Error::InvalidDecomposition(format!(
                "grid cell counts must be positive, got {}x{}x{}",
                nx, ny, nz
            )));
        }
        if world.is_degenerate() {
            return Err(Error::InvalidDecomposition(
                "world box has zero extent along some axis".to_string(),
            ));
        }

        let cell_region = |ix: u32, iy: u32, iz: u32| -> Aabb {
            let lo = DVec3::new(
                fraction(world.min().x, world.max().x, ix, nx),
                fraction(world.min().y, world.max().y, iy, ny),
                fraction(world.min().z, world.max().z, iz, nz),
            );
            let hi = DVec3::new(
                fraction(world.min().x, world.max().x, ix + 1, nx),
                fraction(world.min().y, world.max().y, iy + 1, ny),
                fraction(world.min().z, world.max().z, iz + 1, nz),
            );
            Aabb::new(lo, hi)
        };

        let rank_of = |ix: u32, iy: u32, iz: u32| RankId(ix + nx * (iy + ny * iz));

        let mut descriptors = Vec::with_capacity((nx * ny * nz) as usize);
        for iz in 0..nz {
            for iy in 0..ny {
                for ix in 0..nx {
                    let mut neighbors = Vec::new();
                    for dz in -1i64..=1 {
                        for dy in -1i64..=1 {
                            for dx in -1i64..=1 {
                                if dx == 0 && dy == 0 && dz == 0 {
                                    continue;
                                }
                                let (jx, jy, jz) =
                                    (ix as i64 + dx, iy as i64 + dy, iz as i64 + dz);
                                if jx < 0
                                    || jy < 0
                                    || jz < 0
                                    || jx >= nx as i64
                                    || jy >= ny as i64
                                    || jz >= nz as i64
                                {
                                    continue;
                                }
                                let (jx, jy, jz) = (jx as u32, jy as u32, jz as u32);
                                neighbors.push(Neighbor {
                                    rank: rank_of(jx, jy, jz),
                                    region: cell_region(jx, jy, jz),
                                });
                            }
                        }
                    }
                    neighbors.sort_by_key(|n| n.rank);
                    descriptors.push(DomainDescriptor::new(
                        rank_of(ix, iy, iz),
                        cell_region(ix, iy, iz),
                        neighbors,
                    ));
                }
            }
        }

        // Grid construction is correct by construction, but run the
        // same validation hand-built descriptor sets get.
        Self::from_descriptors(descriptors)
    }

    /// Assemble and validate a hand-built descriptor set.
    ///
    /// Validation failures are fatal configuration errors, reported
    /// before the first step runs.
    pub fn from_descriptors(descriptors: Vec<DomainDescriptor>) -> Result<Self> {
        if descriptors.is_empty() {
            return Err(Error::InvalidDecomposition(
                "decomposition has no domains".to_string(),
            ));
        }

        for d in &descriptors {
            if d.region.is_degenerate() {
                return Err(Error::InvalidDecomposition(format!(
                    "region of {} has zero extent along some axis",
                    d.rank
                )));
            }
        }

        // Unique rank ids
        for (i, a) in descriptors.iter().enumerate() {
            for b in descriptors.iter().skip(i + 1) {
                if a.rank == b.rank {
                    return Err(Error::InvalidDecomposition(format!(
                        "duplicate rank id {}",
                        a.rank
                    )));
                }
                if interiors_overlap(&a.region, &b.region) {
                    return Err(Error::InvalidDecomposition(format!(
                        "regions of {} and {} overlap with positive volume",
                        a.rank, b.rank
                    )));
                }
            }
        }

        // Adjacency structure
        for d in &descriptors {
            for n in &d.neighbors {
                if n.rank == d.rank {
                    return Err(Error::InvalidDecomposition(format!(
                        "{} lists itself as a neighbor",
                        d.rank
                    )));
                }
                let Some(other) = descriptors.iter().find(|o| o.rank == n.rank) else {
                    return Err(Error::InvalidDecomposition(format!(
                        "{} lists unknown neighbor {}",
                        d.rank, n.rank
                    )));
                };
                if other.region != n.region {
                    return Err(Error::InvalidDecomposition(format!(
                        "{} holds a stale region for neighbor {}",
                        d.rank, n.rank
                    )));
                }
                if !other.is_neighbor(d.rank) {
                    return Err(Error::InvalidDecomposition(format!(
                        "adjacency is not symmetric between {} and {}",
                        d.rank, n.rank
                    )));
                }
            }
        }

        Ok(Self { descriptors })
    }

    /// Get the descriptor for a rank
    pub fn descriptor(&self, rank: RankId) -> Option<&DomainDescriptor> {
        self.descriptors.iter().find(|d| d.rank == rank)
    }

    /// All descriptors
    pub fn descriptors(&self) -> &[DomainDescriptor] {
        &self.descriptors
    }

    /// Number of domains
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// `true` if the decomposition holds no domains (never after
    /// successful validation)
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Consume into the descriptor list, e.g. to hand one descriptor to
    /// each rank thread
    pub fn into_descriptors(self) -> Vec<DomainDescriptor> {
        self.descriptors
    }
}

/// RON-loadable decomposition description
///
/// # Example
///
/// ```
/// use tessel_domain::DecompositionSpec;
///
/// let spec = DecompositionSpec::from_ron_str(
///     "(world_min: (0.0, 0.0, 0.0), world_max: (20.0, 10.0, 10.0), cells: (2, 1, 1))",
/// ).unwrap();
/// let decomposition = spec.build().unwrap();
/// assert_eq!(decomposition.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecompositionSpec {
    /// Minimum corner of the world box
    pub world_min: (f64, f64, f64),
    /// Maximum corner of the world box
    pub world_max: (f64, f64, f64),
    /// Grid cell counts along x, y, z
    pub cells: (u32, u32, u32),
}

impl DecompositionSpec {
    /// Parse a spec from a RON string.
    pub fn from_ron_str(s: &str) -> Result<Self> {
        ron::from_str(s).map_err(|e| Error::Config(e.to_string()))
    }

    /// Build and validate the decomposition.
    pub fn build(&self) -> Result<Decomposition> {
        let min = DVec3::new(self.world_min.0, self.world_min.1, self.world_min.2);
        let max = DVec3::new(self.world_max.0, self.world_max.1, self.world_max.2);
        if min.x >= max.x || min.y >= max.y || min.z >= max.z {
            return Err(Error::InvalidDecomposition(
                "world_min must be strictly below world_max on every axis".to_string(),
            ));
        }
        Decomposition::grid(Aabb::new(min, max), self.cells.0, self.cells.1, self.cells.2)
    }
}

/// Interpolated cell boundary: exact at both ends of the world extent.
fn fraction(lo: f64, hi: f64, i: u32, n: u32) -> f64 {
    lo + (hi - lo) * (i as f64 / n as f64)
}

/// Strict overlap: positive-volume intersection. Touching faces do not
/// count, so adjacent regions of a valid decomposition pass.
fn interiors_overlap(a: &Aabb, b: &Aabb) -> bool {
    a.min().x < b.max().x
        && a.max().x > b.min().x
        && a.min().y < b.max().y
        && a.max().y > b.min().y
        && a.min().z < b.max().z
        && a.max().z > b.min().z
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> Aabb {
        Aabb::new(DVec3::ZERO, DVec3::new(20.0, 10.0, 10.0))
    }

    // ========================================================================
    // Grid construction
    // ========================================================================

    #[test]
    fn test_grid_covers_world() {
        let decomposition = Decomposition::grid(world(), 2, 1, 1).unwrap();
        assert_eq!(decomposition.len(), 2);

        let r0 = decomposition.descriptor(RankId(0)).unwrap();
        let r1 = decomposition.descriptor(RankId(1)).unwrap();
        assert_eq!(r0.region().min(), DVec3::ZERO);
        assert_eq!(r0.region().max(), DVec3::new(10.0, 10.0, 10.0));
        assert_eq!(r1.region().min(), DVec3::new(10.0, 0.0, 0.0));
        assert_eq!(r1.region().max(), DVec3::new(20.0, 10.0, 10.0));
    }

    #[test]
    fn test_grid_adjacency_1d() {
        let decomposition = Decomposition::grid(world(), 3, 1, 1).unwrap();

        let r0 = decomposition.descriptor(RankId(0)).unwrap();
        let r1 = decomposition.descriptor(RankId(1)).unwrap();
        let r2 = decomposition.descriptor(RankId(2)).unwrap();

        assert_eq!(r0.neighbor_ranks().collect::<Vec<_>>(), vec![RankId(1)]);
        assert_eq!(
            r1.neighbor_ranks().collect::<Vec<_>>(),
            vec![RankId(0), RankId(2)]
        );
        assert_eq!(r2.neighbor_ranks().collect::<Vec<_>>(), vec![RankId(1)]);
    }

    #[test]
    fn test_grid_adjacency_3d_center_cell() {
        let cube = Aabb::new(DVec3::ZERO, DVec3::splat(30.0));
        let decomposition = Decomposition::grid(cube, 3, 3, 3).unwrap();

        // Rank of cell (1,1,1) = 1 + 3*(1 + 3*1) = 13
        let center = decomposition.descriptor(RankId(13)).unwrap();
        assert_eq!(center.neighbors().len(), 26);

        // Corner cell (0,0,0) has 7 neighbors
        let corner = decomposition.descriptor(RankId(0)).unwrap();
        assert_eq!(corner.neighbors().len(), 7);
    }

    #[test]
    fn test_grid_rejects_zero_cells() {
        let err = Decomposition::grid(world(), 0, 1, 1).unwrap_err();
        assert!(matches!(err, Error::InvalidDecomposition(_)));
    }

    #[test]
    fn test_grid_rejects_degenerate_world() {
        let flat = Aabb::new(DVec3::ZERO, DVec3::new(10.0, 0.0, 10.0));
        let err = Decomposition::grid(flat, 2, 1, 1).unwrap_err();
        assert!(matches!(err, Error::InvalidDecomposition(_)));
    }

    // ========================================================================
    // Validation of hand-built descriptor sets
    // ========================================================================

    fn two_ranks() -> (DomainDescriptor, DomainDescriptor) {
        let left = Aabb::new(DVec3::ZERO, DVec3::new(10.0, 10.0, 10.0));
        let right = Aabb::new(DVec3::new(10.0, 0.0, 0.0), DVec3::new(20.0, 10.0, 10.0));
        (
            DomainDescriptor::new(
                RankId(0),
                left,
                vec![Neighbor {
                    rank: RankId(1),
                    region: right,
                }],
            ),
            DomainDescriptor::new(
                RankId(1),
                right,
                vec![Neighbor {
                    rank: RankId(0),
                    region: left,
                }],
            ),
        )
    }

    #[test]
    fn test_hand_built_valid() {
        let (a, b) = two_ranks();
        assert!(Decomposition::from_descriptors(vec![a, b]).is_ok());
    }

    #[test]
    fn test_rejects_overlapping_regions() {
        let (a, _) = two_ranks();
        let overlapping = DomainDescriptor::new(
            RankId(1),
            Aabb::new(DVec3::new(5.0, 0.0, 0.0), DVec3::new(20.0, 10.0, 10.0)),
            vec![],
        );
        let err = Decomposition::from_descriptors(vec![a, overlapping]).unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn test_rejects_self_neighbor() {
        let region = Aabb::new(DVec3::ZERO, DVec3::ONE);
        let d = DomainDescriptor::new(
            RankId(0),
            region,
            vec![Neighbor {
                rank: RankId(0),
                region,
            }],
        );
        let err = Decomposition::from_descriptors(vec![d]).unwrap_err();
        assert!(err.to_string().contains("itself"));
    }

    #[test]
    fn test_rejects_asymmetric_adjacency() {
        let (a, mut b) = two_ranks();
        b.neighbors.clear();
        let err = Decomposition::from_descriptors(vec![a, b]).unwrap_err();
        assert!(err.to_string().contains("symmetric"));
    }

    #[test]
    fn test_rejects_unknown_neighbor() {
        let (a, _) = two_ranks();
        let err = Decomposition::from_descriptors(vec![a]).unwrap_err();
        assert!(err.to_string().contains("unknown neighbor"));
    }

    #[test]
    fn test_rejects_duplicate_rank() {
        let (a, _) = two_ranks();
        let mut dup = a.clone();
        dup.region = Aabb::new(DVec3::splat(100.0), DVec3::splat(110.0));
        dup.neighbors.clear();
        let mut a2 = a.clone();
        a2.neighbors.clear();
        let err = Decomposition::from_descriptors(vec![a2, dup]).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    // ========================================================================
    // Descriptor queries
    // ========================================================================

    #[test]
    fn test_ranks_overlapping() {
        let decomposition = Decomposition::grid(world(), 2, 1, 1).unwrap();
        let r0 = decomposition.descriptor(RankId(0)).unwrap();

        // Box straddling the x = 10 boundary
        let straddling = Aabb::new(DVec3::new(9.0, 4.0, 4.0), DVec3::new(11.0, 6.0, 6.0));
        assert_eq!(r0.ranks_overlapping(&straddling), vec![RankId(1)]);

        // Box deep inside rank 0
        let interior = Aabb::new(DVec3::new(1.0, 1.0, 1.0), DVec3::new(2.0, 2.0, 2.0));
        assert!(r0.ranks_overlapping(&interior).is_empty());
    }

    #[test]
    fn test_rank_containing_is_unambiguous_on_shared_face() {
        let decomposition = Decomposition::grid(world(), 2, 1, 1).unwrap();
        let r0 = decomposition.descriptor(RankId(0)).unwrap();
        let r1 = decomposition.descriptor(RankId(1)).unwrap();

        // Half-open containment: the shared face at x = 10 belongs to
        // the region whose min face it is.
        let on_face = DVec3::new(10.0, 5.0, 5.0);
        assert_eq!(r0.rank_containing(on_face), Some(RankId(1)));
        assert_eq!(r1.rank_containing(on_face), Some(RankId(1)));
    }

    // ========================================================================
    // RON spec
    // ========================================================================

    #[test]
    fn test_spec_round_trip() {
        let spec = DecompositionSpec::from_ron_str(
            "(world_min: (0.0, 0.0, 0.0), world_max: (20.0, 10.0, 10.0), cells: (2, 1, 1))",
        )
        .unwrap();
        let decomposition = spec.build().unwrap();
        assert_eq!(decomposition.len(), 2);
    }

    #[test]
    fn test_spec_rejects_inverted_world() {
        let spec = DecompositionSpec {
            world_min: (10.0, 0.0, 0.0),
            world_max: (0.0, 10.0, 10.0),
            cells: (2, 1, 1),
        };
        assert!(matches!(
            spec.build().unwrap_err(),
            Error::InvalidDecomposition(_)
        ));
    }
}
