//! Error handling for MillPlan
//!
//! Provides error types for the core layer:
//! - Geometry errors (degenerate input to the region/curve service)
//! - Catalog errors (tool catalog loading and validation)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Geometry error type
///
/// Raised when curve or region input cannot be turned into valid geometry.
#[derive(Error, Debug, Clone)]
pub enum GeometryError {
    /// Curve has too few vertices to form the requested shape
    #[error("Degenerate curve: {reason}")]
    DegenerateCurve {
        /// Why the curve was rejected.
        reason: String,
    },

    /// Non-finite coordinate in input
    #[error("Non-finite coordinate ({x}, {y})")]
    NonFinite {
        /// The x coordinate.
        x: f64,
        /// The y coordinate.
        y: f64,
    },

    /// Boolean operation failed even on snapped coordinates
    #[error("Boolean {operation} failed")]
    BooleanFailed {
        /// union, intersect or subtract
        operation: String,
    },

    /// Invalid dimension for a primitive shape
    #[error("Invalid {what}: {value}")]
    InvalidDimension {
        /// The dimension name.
        what: String,
        /// The offending value.
        value: f64,
    },
}

/// Tool catalog error type
///
/// Represents errors found while loading or validating a tool catalog file.
#[derive(Error, Debug, Clone)]
pub enum CatalogError {
    /// The catalog file could not be read
    #[error("Failed to read tool catalog {path}: {reason}")]
    ReadFailed {
        /// The catalog path.
        path: String,
        /// The underlying reason.
        reason: String,
    },

    /// The catalog file could not be parsed
    #[error("Invalid tool catalog: {reason}")]
    Parse {
        /// The parser message.
        reason: String,
    },

    /// Unsupported file extension
    #[error("Tool catalog must be .json or .toml: {path}")]
    UnsupportedFormat {
        /// The catalog path.
        path: String,
    },

    /// Two material entries share a name (case-insensitive)
    #[error("Duplicate material in tool catalog: {material}")]
    DuplicateMaterial {
        /// The duplicated material name.
        material: String,
    },

    /// A tool entry failed validation
    #[error("Invalid tool {index} in {material}/{category}: {reason}")]
    InvalidTool {
        /// The material the tool belongs to.
        material: String,
        /// The category the tool belongs to.
        category: String,
        /// Index of the tool in its category list.
        index: usize,
        /// The reason the tool is invalid.
        reason: String,
    },
}

/// Main error type for MillPlan core
///
/// A unified error type that can represent any error from the core layer.
#[derive(Error, Debug)]
pub enum Error {
    /// Geometry error
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Tool catalog error
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a catalog error
    pub fn is_catalog_error(&self) -> bool {
        matches!(self, Error::Catalog(_))
    }

    /// Check if this is a geometry error
    pub fn is_geometry_error(&self) -> bool {
        matches!(self, Error::Geometry(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
