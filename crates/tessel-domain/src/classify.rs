//! Body ownership classification
//!
//! A pure function over current geometry: given a body's bounding
//! extent, its reference point, and the local partition descriptor, it
//! decides whether the body is interior, shared (master or slave), or
//! foreign to the local rank. No side effects.
//!
//! Determinism matters more than anything else here: every rank that
//! observes the same body must reach the same conclusion about who the
//! master is, because the single-owner invariant of the whole run rests
//! on this function and not on any negotiation between ranks.

use crate::{DomainDescriptor, TieBreak};
use glam::DVec3;
use tessel_core::{Aabb, OwnershipTag, RankId};

/// Classify a body relative to the local rank.
///
/// - `Foreign`: the extent no longer intersects the local region.
/// - `Interior`: the extent lies in the local region and touches no
///   neighbor region.
/// - `SharedMaster` / `SharedSlave`: the extent straddles one or more
///   neighbor regions; the tag depends on whether the local rank is the
///   primary owner (see [`primary_owner`]).
///
/// Calling twice with unchanged geometry and descriptor returns the
/// same tag.
pub fn classify(
    extent: &Aabb,
    reference: DVec3,
    descriptor: &DomainDescriptor,
    tie_break: TieBreak,
) -> OwnershipTag {
    if !extent.overlaps(descriptor.region()) {
        return OwnershipTag::Foreign;
    }

    let straddled: Vec<RankId> = descriptor.ranks_overlapping(extent);
    if straddled.is_empty() {
        return OwnershipTag::Interior;
    }

    let owner = primary_owner(extent, reference, descriptor, tie_break);
    if owner == descriptor.rank() {
        OwnershipTag::SharedMaster
    } else {
        OwnershipTag::SharedSlave
    }
}

/// The designated primary owner of a straddling body.
///
/// The owner is the rank whose region contains the body's reference
/// point. Containment is tested inclusively so a reference point lying
/// exactly on a shared boundary is claimed by every touching region;
/// such ties are resolved by `tie_break` (lowest rank id by default).
///
/// If no candidate region contains the reference point at all (the
/// extent reaches a region the centroid has not entered), the tie-break
/// rule picks among all ranks whose region the extent overlaps. Every
/// branch depends only on geometry and rank ids, never on which rank is
/// asking.
pub fn primary_owner(
    extent: &Aabb,
    reference: DVec3,
    descriptor: &DomainDescriptor,
    tie_break: TieBreak,
) -> RankId {
    // Candidate set: the local rank plus every straddled neighbor.
    let local = descriptor.rank();
    let straddled = descriptor.ranks_overlapping(extent);

    let mut containing: Vec<RankId> = Vec::new();
    if descriptor.region().contains_point_inclusive(reference) {
        containing.push(local);
    }
    for rank in &straddled {
        let neighbor = descriptor
            .neighbor(*rank)
            .expect("straddled ranks come from the adjacency list");
        if neighbor.region.contains_point_inclusive(reference) {
            containing.push(*rank);
        }
    }

    if let Some(owner) = tie_break.pick(containing.iter().copied()) {
        return owner;
    }

    // Reference point outside every candidate region: fall back to the
    // tie-break over the overlap set so all ranks still agree.
    tie_break
        .pick(std::iter::once(local).chain(straddled.iter().copied()))
        .expect("candidate set contains at least the local rank")
}
