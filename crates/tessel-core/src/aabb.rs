//! Axis-aligned bounding boxes in world coordinates
//!
//! The same type serves three roles: body bounding extents, domain
//! regions, and the broad-phase active-region filter. Domain regions
//! rely on the min-inclusive/max-exclusive point-containment rule so
//! that a lattice of adjacent regions tiles space without any point
//! being contained by two regions.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
///
/// Invariant: `min` components are less than or equal to `max`
/// components. The constructor asserts this.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    min: DVec3,
    max: DVec3,
}

impl Aabb {
    /// Construct an AABB from its minimum and maximum corners.
    ///
    /// # Panics
    ///
    /// Panics if any component of `min` is greater than its counterpart
    /// in `max`.
    pub fn new(min: DVec3, max: DVec3) -> Self {
        assert!(
            min.x <= max.x && min.y <= max.y && min.z <= max.z,
            "invalid AABB: min > max"
        );
        Self { min, max }
    }

    /// Build an AABB centered at `center` with the given half-extents.
    pub fn from_center_half_extents(center: DVec3, half_extents: DVec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// The minimum corner.
    pub fn min(&self) -> DVec3 {
        self.min
    }

    /// The maximum corner.
    pub fn max(&self) -> DVec3 {
        self.max
    }

    /// The center point of the box.
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Half the size of the box along each axis.
    pub fn half_extents(&self) -> DVec3 {
        (self.max - self.min) * 0.5
    }

    /// `true` if the box has zero volume along any axis.
    pub fn is_degenerate(&self) -> bool {
        self.min.x >= self.max.x || self.min.y >= self.max.y || self.min.z >= self.max.z
    }

    /// `true` if this AABB overlaps another.
    ///
    /// Inclusive on faces: touching boxes count as overlapping, so
    /// broad-phase pairing sees bodies in exact contact.
    pub fn overlaps(&self, other: &Self) -> bool {
        !(self.max.x < other.min.x
            || self.min.x > other.max.x
            || self.max.y < other.min.y
            || self.min.y > other.max.y
            || self.max.z < other.min.z
            || self.min.z > other.max.z)
    }

    /// `true` if `point` lies inside the box.
    ///
    /// Min-inclusive, max-exclusive on every axis: a point on the shared
    /// face of two adjacent regions is contained only by the region on
    /// whose *max* face it does NOT lie. Tiled regions therefore contain
    /// every point at most once.
    pub fn contains_point(&self, point: DVec3) -> bool {
        point.x >= self.min.x
            && point.x < self.max.x
            && point.y >= self.min.y
            && point.y < self.max.y
            && point.z >= self.min.z
            && point.z < self.max.z
    }

    /// `true` if `point` lies inside or on the boundary of the box.
    ///
    /// Fully inclusive, unlike [`Aabb::contains_point`]: a point on the
    /// shared face of two adjacent regions is contained by both. The
    /// ownership classifier uses this to *detect* boundary ties, which
    /// its tie-break rule then resolves.
    pub fn contains_point_inclusive(&self, point: DVec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// `true` if `other` lies entirely inside this box (inclusive).
    pub fn contains(&self, other: &Self) -> bool {
        other.min.x >= self.min.x
            && other.min.y >= self.min.y
            && other.min.z >= self.min.z
            && other.max.x <= self.max.x
            && other.max.y <= self.max.y
            && other.max.z <= self.max.z
    }

    /// The union of two AABBs.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Inflate the box by a uniform margin `m` in all directions.
    ///
    /// # Panics
    ///
    /// Panics if a negative margin would invert the box.
    pub fn inflate(&self, m: f64) -> Self {
        let delta = DVec3::splat(m);
        Self::new(self.min - delta, self.max + delta)
    }

    /// The box translated by `offset`.
    pub fn translated(&self, offset: DVec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_at(center: DVec3) -> Aabb {
        Aabb::from_center_half_extents(center, DVec3::splat(0.5))
    }

    #[test]
    fn test_new_valid() {
        let b = Aabb::new(DVec3::ZERO, DVec3::ONE);
        assert_eq!(b.min(), DVec3::ZERO);
        assert_eq!(b.max(), DVec3::ONE);
        assert_eq!(b.center(), DVec3::splat(0.5));
        assert_eq!(b.half_extents(), DVec3::splat(0.5));
    }

    #[test]
    #[should_panic(expected = "invalid AABB")]
    fn test_new_inverted_panics() {
        Aabb::new(DVec3::ONE, DVec3::ZERO);
    }

    #[test]
    fn test_overlap_inclusive_on_faces() {
        let a = Aabb::new(DVec3::ZERO, DVec3::ONE);
        let b = Aabb::new(DVec3::new(1.0, 0.0, 0.0), DVec3::new(2.0, 1.0, 1.0));
        // Touching faces overlap
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));

        let c = Aabb::new(DVec3::new(1.1, 0.0, 0.0), DVec3::new(2.0, 1.0, 1.0));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_contains_point_half_open() {
        let a = Aabb::new(DVec3::ZERO, DVec3::ONE);
        let b = Aabb::new(DVec3::new(1.0, 0.0, 0.0), DVec3::new(2.0, 1.0, 1.0));
        let face_point = DVec3::new(1.0, 0.5, 0.5);

        // The shared face belongs to exactly one region
        assert!(!a.contains_point(face_point));
        assert!(b.contains_point(face_point));
        assert!(a.contains_point(DVec3::splat(0.0)));
        assert!(!a.contains_point(DVec3::splat(1.0)));
    }

    #[test]
    fn test_contains_point_inclusive_sees_ties() {
        let a = Aabb::new(DVec3::ZERO, DVec3::ONE);
        let b = Aabb::new(DVec3::new(1.0, 0.0, 0.0), DVec3::new(2.0, 1.0, 1.0));
        let face_point = DVec3::new(1.0, 0.5, 0.5);

        // Both regions claim the shared face under the inclusive rule
        assert!(a.contains_point_inclusive(face_point));
        assert!(b.contains_point_inclusive(face_point));
    }

    #[test]
    fn test_contains_box() {
        let outer = Aabb::new(DVec3::ZERO, DVec3::splat(10.0));
        let inner = unit_at(DVec3::splat(5.0));
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        // A box contains itself (inclusive)
        assert!(outer.contains(&outer));
    }

    #[test]
    fn test_union_and_inflate() {
        let a = Aabb::new(DVec3::ZERO, DVec3::ONE);
        let b = unit_at(DVec3::splat(3.0));
        let u = a.union(&b);
        assert!(u.contains(&a));
        assert!(u.contains(&b));

        let inflated = a.inflate(0.5);
        assert_eq!(inflated.min(), DVec3::splat(-0.5));
        assert_eq!(inflated.max(), DVec3::splat(1.5));
    }

    #[test]
    fn test_center_of_uneven_box() {
        let b = Aabb::new(DVec3::splat(0.1), DVec3::splat(0.3));
        assert_relative_eq!(b.center().x, 0.2, max_relative = 1.0e-12);
        assert_relative_eq!(b.half_extents().x, 0.1, max_relative = 1.0e-12);
    }

    #[test]
    fn test_translated() {
        let a = Aabb::new(DVec3::ZERO, DVec3::ONE);
        let t = a.translated(DVec3::new(2.0, 0.0, 0.0));
        assert_eq!(t.min(), DVec3::new(2.0, 0.0, 0.0));
        assert_eq!(t.max(), DVec3::new(3.0, 1.0, 1.0));
    }

    #[test]
    fn test_degenerate() {
        let flat = Aabb::new(DVec3::ZERO, DVec3::new(1.0, 0.0, 1.0));
        assert!(flat.is_degenerate());
        assert!(!Aabb::new(DVec3::ZERO, DVec3::ONE).is_degenerate());
    }
}
