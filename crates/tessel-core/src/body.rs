//! Body records and the per-rank body store
//!
//! A body is logically owned by exactly one master rank and possibly
//! replicated on slave ranks. The ownership tag records a body's role
//! relative to the local rank's region; only the ownership classifier
//! and the migration protocol may change it.

use crate::{Aabb, BodyId, Error, Result};
use glam::{DQuat, DVec3};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Position and orientation of a body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// World-space position of the reference point (centroid)
    pub position: DVec3,
    /// World-space orientation
    pub orientation: DQuat,
}

impl Pose {
    /// Create a pose with identity orientation
    pub fn at(position: DVec3) -> Self {
        Self {
            position,
            orientation: DQuat::IDENTITY,
        }
    }
}

/// Linear and angular velocity of a body
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    /// Linear velocity of the reference point
    pub linear: DVec3,
    /// Angular velocity about the reference point
    pub angular: DVec3,
}

impl Velocity {
    /// Create a purely linear velocity
    pub fn linear(v: DVec3) -> Self {
        Self {
            linear: v,
            angular: DVec3::ZERO,
        }
    }
}

/// Reference to a body's collision shape
///
/// Narrow-phase geometry lives in the external collision library; the
/// core only carries enough to rebuild the bounding extent and to hand
/// the body back to the solver after migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeRef {
    /// Sphere with the given radius
    Sphere { radius: f64 },
    /// Box with the given half-extents
    Box { half_extents: DVec3 },
    /// Convex hull registered under an external library id
    Hull { library_id: String },
}

/// Full physics state of a body: everything needed to resume
/// integration on another rank after migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyState {
    /// Current pose
    pub pose: Pose,
    /// Current velocity state
    pub velocity: Velocity,
    /// Half-extents of the world-aligned bounding box
    pub half_extents: DVec3,
    /// Collision shape reference
    pub shape: ShapeRef,
    /// Material identifier in the external material library
    pub material: String,
}

impl BodyState {
    /// The body's current world-space bounding extent.
    ///
    /// Conservative: the half-extents already bound the shape under any
    /// orientation, so the box only translates with the pose.
    pub fn world_aabb(&self) -> Aabb {
        Aabb::from_center_half_extents(self.pose.position, self.half_extents)
    }

    /// The reference point used for ownership decisions (centroid).
    pub fn reference_point(&self) -> DVec3 {
        self.pose.position
    }
}

/// Ownership class of a body relative to the local rank's region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OwnershipTag {
    /// Extent lies entirely within the local region, touching no
    /// neighbor region
    Interior,
    /// Extent straddles one or more neighbor regions and this rank is
    /// the designated primary owner
    SharedMaster,
    /// Extent straddles into the local region from a neighbor that owns
    /// the body as master
    SharedSlave,
    /// Extent no longer intersects the local region; the body must be
    /// migrated out and dropped locally
    Foreign,
}

impl OwnershipTag {
    /// `true` for bodies replicated across ranks
    pub fn is_shared(&self) -> bool {
        matches!(self, OwnershipTag::SharedMaster | OwnershipTag::SharedSlave)
    }

    /// `true` if the local rank is the authoritative owner
    pub fn is_owned(&self) -> bool {
        matches!(self, OwnershipTag::Interior | OwnershipTag::SharedMaster)
    }

    /// Stable encoding used on dump lines: 0 = interior,
    /// 1 = shared master, 2 = shared slave, 3 = foreign.
    pub fn dump_code(&self) -> u8 {
        match self {
            OwnershipTag::Interior => 0,
            OwnershipTag::SharedMaster => 1,
            OwnershipTag::SharedSlave => 2,
            OwnershipTag::Foreign => 3,
        }
    }
}

impl std::fmt::Display for OwnershipTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OwnershipTag::Interior => "interior",
            OwnershipTag::SharedMaster => "shared-master",
            OwnershipTag::SharedSlave => "shared-slave",
            OwnershipTag::Foreign => "foreign",
        };
        write!(f, "{}", s)
    }
}

/// One body as held by the local rank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyRecord {
    /// Global identifier, stable across migration
    pub id: BodyId,
    /// Physics state
    pub state: BodyState,
    /// Ownership class relative to the local region
    ownership: OwnershipTag,
}

impl BodyRecord {
    /// Create a record with the given ownership tag
    pub fn new(id: BodyId, state: BodyState, ownership: OwnershipTag) -> Self {
        Self {
            id,
            state,
            ownership,
        }
    }

    /// The current ownership tag
    pub fn ownership(&self) -> OwnershipTag {
        self.ownership
    }

    /// Retag the record.
    ///
    /// Reserved for the ownership classifier and the migration
    /// protocol; no other component may call this.
    pub fn set_ownership(&mut self, tag: OwnershipTag) {
        self.ownership = tag;
    }

    /// The body's current world-space bounding extent
    pub fn world_aabb(&self) -> Aabb {
        self.state.world_aabb()
    }
}

/// Storage for all bodies held by one rank
///
/// Iteration order is insertion order, so per-step enumeration is
/// deterministic and identical on replay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BodyStore {
    bodies: IndexMap<BodyId, BodyRecord>,
}

impl BodyStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new record.
    ///
    /// Inserting an id that is already present is an error: migration
    /// must never silently duplicate a body.
    pub fn insert(&mut self, record: BodyRecord) -> Result<()> {
        if self.bodies.contains_key(&record.id) {
            return Err(Error::DuplicateBody(record.id));
        }
        self.bodies.insert(record.id, record);
        Ok(())
    }

    /// Get a record by id
    pub fn get(&self, id: BodyId) -> Option<&BodyRecord> {
        self.bodies.get(&id)
    }

    /// Get a mutable record by id
    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut BodyRecord> {
        self.bodies.get_mut(&id)
    }

    /// `true` if the store holds a record for `id`
    pub fn contains(&self, id: BodyId) -> bool {
        self.bodies.contains_key(&id)
    }

    /// Remove a record, returning it if present
    pub fn remove(&mut self, id: BodyId) -> Option<BodyRecord> {
        self.bodies.shift_remove(&id)
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// `true` if the store is empty
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Iterate over all records in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &BodyRecord> {
        self.bodies.values()
    }

    /// Iterate mutably over all records in insertion order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut BodyRecord> {
        self.bodies.values_mut()
    }

    /// All body ids in insertion order
    pub fn ids(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.bodies.keys().copied()
    }

    /// Records the local rank is authoritative for
    /// (`Interior` or `SharedMaster`)
    pub fn owned(&self) -> impl Iterator<Item = &BodyRecord> {
        self.iter().filter(|r| r.ownership().is_owned())
    }

    /// Records tagged `SharedMaster`
    pub fn masters(&self) -> impl Iterator<Item = &BodyRecord> {
        self.iter()
            .filter(|r| r.ownership() == OwnershipTag::SharedMaster)
    }

    /// Records tagged `SharedSlave`
    pub fn slaves(&self) -> impl Iterator<Item = &BodyRecord> {
        self.iter()
            .filter(|r| r.ownership() == OwnershipTag::SharedSlave)
    }
}
