//! Canonical unordered overlap pairs

use serde::{Deserialize, Serialize};
use tessel_core::BodyId;

/// An unordered pair of bodies whose bounding extents intersect.
///
/// Canonical form: the smaller id is always first, so `(A, B)` and
/// `(B, A)` construct the same value and a sorted pair list can never
/// contain a duplicate unordered pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OverlapPair {
    a: BodyId,
    b: BodyId,
}

impl OverlapPair {
    /// Build the canonical pair of two distinct bodies.
    ///
    /// # Panics
    ///
    /// Panics if `x == y`; a body does not pair with itself.
    pub fn new(x: BodyId, y: BodyId) -> Self {
        assert!(x != y, "a body cannot overlap itself");
        if x < y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }

    /// The smaller id
    pub fn a(&self) -> BodyId {
        self.a
    }

    /// The larger id
    pub fn b(&self) -> BodyId {
        self.b
    }

    /// `true` if either side is `id`
    pub fn involves(&self, id: BodyId) -> bool {
        self.a == id || self.b == id
    }
}

impl std::fmt::Display for OverlapPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.a, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order() {
        let p1 = OverlapPair::new(BodyId(5), BodyId(2));
        let p2 = OverlapPair::new(BodyId(2), BodyId(5));
        assert_eq!(p1, p2);
        assert_eq!(p1.a(), BodyId(2));
        assert_eq!(p1.b(), BodyId(5));
    }

    #[test]
    fn test_involves() {
        let p = OverlapPair::new(BodyId(1), BodyId(9));
        assert!(p.involves(BodyId(1)));
        assert!(p.involves(BodyId(9)));
        assert!(!p.involves(BodyId(4)));
    }

    #[test]
    #[should_panic(expected = "cannot overlap itself")]
    fn test_self_pair_panics() {
        OverlapPair::new(BodyId(3), BodyId(3));
    }
}
