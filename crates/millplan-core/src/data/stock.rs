//! Stock thickness table
//!
//! Sheet stock is bought in fixed thicknesses per material. The planner picks
//! the thinnest sheet that still covers the part.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MATERIAL_ACETAL: &str = "Acetal";
pub const MATERIAL_POLYPROPYLENE: &str = "PolyPropylene";
pub const MATERIAL_ALU_ALLOY: &str = "Alu Alloy";
pub const MATERIAL_MILD_STEEL: &str = "Mild Steel";

/// Outcome of choosing a stock thickness for a part
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StockSelection {
    /// Thickness to use in mm
    Thickness(f64),
    /// Material has no row in the table
    UnknownMaterial,
    /// Material row lists no thicknesses
    NoStock,
    /// Part is thicker than every available sheet
    TooThick { thickest: f64 },
}

/// Available thicknesses per material name, ascending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Vec<f64>>",
    into = "BTreeMap<String, Vec<f64>>"
)]
pub struct StockTable {
    thicknesses: BTreeMap<String, Vec<f64>>,
}

impl Default for StockTable {
    fn default() -> Self {
        let mut thicknesses = BTreeMap::new();
        thicknesses.insert(
            MATERIAL_ACETAL.to_string(),
            vec![5.0, 6.0, 10.0, 20.0, 30.0, 40.0],
        );
        thicknesses.insert(
            MATERIAL_POLYPROPYLENE.to_string(),
            vec![5.0, 6.0, 9.0, 10.0, 20.0, 30.0, 40.0],
        );
        thicknesses.insert(
            MATERIAL_ALU_ALLOY.to_string(),
            vec![2.0, 3.0, 4.0, 5.0, 6.0, 10.0, 16.0, 20.0, 30.0, 40.0],
        );
        thicknesses.insert(
            MATERIAL_MILD_STEEL.to_string(),
            vec![2.0, 3.0, 4.0, 5.0, 6.0],
        );
        Self { thicknesses }
    }
}

impl From<BTreeMap<String, Vec<f64>>> for StockTable {
    fn from(rows: BTreeMap<String, Vec<f64>>) -> Self {
        let mut table = Self::empty();
        for (material, thicknesses) in rows {
            table.insert(material, thicknesses);
        }
        table
    }
}

impl From<StockTable> for BTreeMap<String, Vec<f64>> {
    fn from(table: StockTable) -> Self {
        table.thicknesses
    }
}

impl StockTable {
    pub fn empty() -> Self {
        Self {
            thicknesses: BTreeMap::new(),
        }
    }

    /// Replace a material row; thicknesses are kept sorted
    pub fn insert(&mut self, material: impl Into<String>, mut thicknesses: Vec<f64>) {
        thicknesses.sort_by(f64::total_cmp);
        self.thicknesses.insert(material.into(), thicknesses);
    }

    pub fn thicknesses(&self, material: &str) -> Option<&[f64]> {
        self.thicknesses.get(material).map(Vec::as_slice)
    }

    pub fn materials(&self) -> impl Iterator<Item = &str> {
        self.thicknesses.keys().map(String::as_str)
    }

    /// Thinnest sheet with `thickness >= part_depth - tolerance`
    pub fn select(&self, material: &str, part_depth: f64, tolerance: f64) -> StockSelection {
        let Some(thicknesses) = self.thicknesses(material) else {
            return StockSelection::UnknownMaterial;
        };
        let Some(&thickest) = thicknesses.last() else {
            return StockSelection::NoStock;
        };
        thicknesses
            .iter()
            .copied()
            .find(|&t| t >= part_depth - tolerance)
            .map_or(StockSelection::TooThick { thickest }, StockSelection::Thickness)
    }
}
