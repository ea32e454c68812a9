//! Catalog data: cutting tools and stock sheets

pub mod stock;
pub mod tools;

pub use stock::{StockSelection, StockTable};
pub use tools::{CutterSet, Tool, ToolCatalog, ToolCategory, BIG_CUTTER_DIAMETER};
