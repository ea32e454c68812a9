//! Planning error taxonomy
//!
//! A run records the first of these as its failure and keeps going, with every
//! later stage turned into a no-op, so the user sees one consolidated report.

use thiserror::Error;

/// Errors raised while planning a part
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    /// No tools of a category for the material
    #[error("no {category} found for material: {material}")]
    CatalogMissing { material: String, category: String },

    /// Every tool-holder slot of a category is taken
    #[error("no more {category} available!\ntrying to add: {tool}")]
    SlotsExhausted { category: String, tool: String },

    /// No catalog tool satisfies the depth and diameter limits of a cut
    #[error("no cutters for {operation} ({depth:.3} mm deep)")]
    NoCutterAvailable { operation: String, depth: f64 },

    /// No visible solid in the document
    #[error("No Solid Found!")]
    NoSolidFound,

    /// Part is thicker than every stock sheet of the material
    #[error("part too thick to make: material: {material}, part thickness: {part_thickness}, thickest stock available: {thickest}")]
    PartTooThick {
        material: String,
        part_thickness: f64,
        thickest: f64,
    },

    /// Material has no row in the stock table
    #[error("material not found in stock: {material}")]
    MaterialUnknown { material: String },

    /// Material row lists no thicknesses
    #[error("no stock available for material, material: {material}")]
    NoStockForMaterial { material: String },

    /// Tool index outside the loaded cutter set
    #[error("no {category} with index {index}")]
    UnknownTool { category: String, index: usize },

    /// The post-processor rejected the program
    #[error("post-processing failed: {0}")]
    PostProcess(String),

    /// The host cancelled the run
    #[error("planning cancelled")]
    Cancelled,
}
