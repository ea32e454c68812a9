//! 2D geometry service used by the planner
//!
//! - [`Curve`]: line/arc boundaries with a traversal direction
//! - [`Region`]: areas bounded by anticlockwise outer loops and clockwise holes
//!
//! Boolean set operations go through `geo`, parallel offsets through
//! `cavalier_contours`. Arcs are flattened to lines once they enter a region,
//! with a sagitta of [`ARC_TOLERANCE`].

pub mod curve;
mod offset;
pub mod point;
pub mod region;

pub use curve::{Circle, Curve, Vertex};
pub use point::{BoundingBox, Point};
pub use region::Region;

/// Maximum chord deviation when arcs are approximated by lines (mm)
pub const ARC_TOLERANCE: f64 = 0.01;

/// Regions and loops smaller than this are treated as empty (mm^2)
pub const AREA_EPSILON: f64 = 1e-6;
