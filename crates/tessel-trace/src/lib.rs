//! Tessel Trace - Rank-ordered diagnostic dump streams
//!
//! An append-only, rank-indexed record stream for debugging,
//! visualization, and postprocessing: one line per body or per pair,
//! ordered by rank within each collective dump. Writing is strictly
//! optional: a failing or slow sink logs a warning and the simulation
//! carries on; nothing here may block or abort a run.
//!
//! Line formats (`shared` is the stable ownership encoding
//! 0 = interior, 1 = shared master, 2 = shared slave, 3 = foreign):
//!
//! ```text
//! aabb:  rank, id, shared, xmin, ymin, zmin, xmax, ymax, zmax
//! state: rank, id, shared, x, y, z, qx, qy, qz, qw
//! pairs: rank, a, b
//! ```

mod dump;

pub use dump::{DumpWriter, OrderedDump};
