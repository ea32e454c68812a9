//! # MillPlan Core
//!
//! Core types shared by the MillPlan crates:
//! - 2D geometry service (curves, regions, offsets, boolean operations)
//! - Tool catalog and stock thickness table
//! - Error types

pub mod data;
pub mod error;
pub mod geometry;

pub use data::{
    CutterSet, StockSelection, StockTable, Tool, ToolCatalog, ToolCategory, BIG_CUTTER_DIAMETER,
};
pub use error::{CatalogError, Error, GeometryError, Result};
pub use geometry::{BoundingBox, Circle, Curve, Point, Region, Vertex};
