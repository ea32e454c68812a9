//! Tool catalog
//!
//! This module provides:
//! - Tool categories and cutter records
//! - Catalog loading (JSON or TOML) with validation of every entry
//! - Per-material cutter sets and the diameter/depth queries the planner uses

use crate::error::{CatalogError, Error, Result};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::debug;

/// Largest cutter diameter allowed unless the part is marked big and rigid
pub const BIG_CUTTER_DIAMETER: f64 = 6.0;

/// Feed used when a catalog entry gives none (mm/min)
pub const DEFAULT_HFEED: f64 = 200.0;

/// Tool category, which decides the tool-holder slots a tool may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    /// Flat end mill used for profiles and pockets
    SlotCutter,
    /// Twist drill
    Drill,
    /// Anything else
    Undefined,
}

impl ToolCategory {
    /// Plural name as used in catalog sections and messages
    pub fn plural(&self) -> &'static str {
        match self {
            Self::SlotCutter => "slot cutters",
            Self::Drill => "drills",
            Self::Undefined => "tools",
        }
    }
}

impl std::fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SlotCutter => write!(f, "Slot Cutter"),
            Self::Drill => write!(f, "Drill"),
            Self::Undefined => write!(f, "Undefined"),
        }
    }
}

/// Cutter record as written in the catalog file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEntry {
    /// Cutting diameter in mm
    pub diameter: f64,
    /// Usable for secondary, smaller-tool passes
    #[serde(default)]
    pub rest_machining: bool,
    /// Maximum cutting depth in mm
    #[serde(default)]
    pub cutting_length: f64,
    /// Horizontal feed in mm/min
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hfeed: Option<f64>,
    /// Horizontal feed for finishing passes in mm/min
    #[serde(default)]
    pub finish_hfeed: f64,
    /// Spindle speed in rpm
    #[serde(default)]
    pub spin: f64,
    /// Plunge feed in mm/min
    #[serde(default)]
    pub vfeed: f64,
    #[serde(default)]
    pub rough_step_down: f64,
    #[serde(default)]
    pub finish_step_down: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Immutable cutter record used during planning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub diameter: f64,
    pub category: ToolCategory,
    pub rest_machining: bool,
    pub cutting_length: f64,
    pub hfeed: f64,
    pub finish_hfeed: f64,
    pub spin: f64,
    pub vfeed: f64,
    pub rough_step_down: f64,
    pub finish_step_down: f64,
}

impl Tool {
    pub fn new(diameter: f64, category: ToolCategory, cutting_length: f64) -> Self {
        Self {
            diameter,
            category,
            rest_machining: false,
            cutting_length,
            hfeed: DEFAULT_HFEED,
            finish_hfeed: 0.0,
            spin: 0.0,
            vfeed: 0.0,
            rough_step_down: 0.0,
            finish_step_down: 0.0,
        }
    }

    fn from_entry(entry: &ToolEntry, category: ToolCategory) -> Self {
        Self {
            diameter: entry.diameter,
            category,
            rest_machining: entry.rest_machining,
            cutting_length: entry.cutting_length,
            hfeed: entry.hfeed.unwrap_or(DEFAULT_HFEED),
            finish_hfeed: entry.finish_hfeed,
            spin: entry.spin,
            vfeed: entry.vfeed,
            rough_step_down: entry.rough_step_down,
            finish_step_down: entry.finish_step_down,
        }
    }

    pub fn radius(&self) -> f64 {
        self.diameter * 0.5
    }

    /// Feed for finishing passes, falling back to the roughing feed
    pub fn finishing_feed(&self) -> f64 {
        if self.finish_hfeed > 0.0 {
            self.finish_hfeed
        } else {
            self.hfeed
        }
    }

    /// Display name, e.g. "8 mm Slot Cutter"
    pub fn name(&self) -> String {
        match self.category {
            ToolCategory::SlotCutter => format!("{} mm Slot Cutter", self.diameter),
            ToolCategory::Drill => format!("{} mm Drill", self.diameter),
            ToolCategory::Undefined => "Unknown Tool Type".to_string(),
        }
    }
}

/// Tools of one material
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialTools {
    pub name: String,
    #[serde(default)]
    pub slot_cutters: Vec<ToolEntry>,
    #[serde(default)]
    pub drills: Vec<ToolEntry>,
}

impl MaterialTools {
    fn entries(&self, category: ToolCategory) -> &[ToolEntry] {
        match category {
            ToolCategory::SlotCutter => &self.slot_cutters,
            ToolCategory::Drill => &self.drills,
            ToolCategory::Undefined => &[],
        }
    }
}

/// Tool catalog keyed by material and category
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCatalog {
    #[serde(default)]
    pub materials: Vec<MaterialTools>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog from a `.json` or `.toml` file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CatalogError::ReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let catalog: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| CatalogError::Parse {
                reason: e.to_string(),
            })?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content).map_err(|e| CatalogError::Parse {
                reason: e.to_string(),
            })?
        } else {
            return Err(CatalogError::UnsupportedFormat {
                path: path.display().to_string(),
            }
            .into());
        };

        catalog.validate()?;
        debug!(
            "Loaded tool catalog {} with {} materials",
            path.display(),
            catalog.materials.len()
        );
        Ok(catalog)
    }

    /// Parse and validate a JSON catalog
    pub fn from_json_str(content: &str) -> Result<Self> {
        let catalog: Self = serde_json::from_str(content).map_err(|e| CatalogError::Parse {
            reason: e.to_string(),
        })?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let content = if path.extension().is_some_and(|ext| ext == "toml") {
            toml::to_string_pretty(self)
                .map_err(|e| Error::other(format!("Failed to serialize catalog: {}", e)))?
        } else {
            serde_json::to_string_pretty(self)
                .map_err(|e| Error::other(format!("Failed to serialize catalog: {}", e)))?
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check every entry so malformed catalogs fail before planning starts
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for material in &self.materials {
            if !seen.insert(material.name.to_lowercase()) {
                return Err(CatalogError::DuplicateMaterial {
                    material: material.name.clone(),
                }
                .into());
            }
            for category in [ToolCategory::SlotCutter, ToolCategory::Drill] {
                for (index, entry) in material.entries(category).iter().enumerate() {
                    let invalid = |reason: &str| CatalogError::InvalidTool {
                        material: material.name.clone(),
                        category: category.plural().to_string(),
                        index,
                        reason: reason.to_string(),
                    };
                    if !(entry.diameter > 0.0) || !entry.diameter.is_finite() {
                        return Err(invalid("diameter must be > 0").into());
                    }
                    let non_negative = [
                        ("cutting_length", entry.cutting_length),
                        ("finish_hfeed", entry.finish_hfeed),
                        ("spin", entry.spin),
                        ("vfeed", entry.vfeed),
                        ("rough_step_down", entry.rough_step_down),
                        ("finish_step_down", entry.finish_step_down),
                        ("hfeed", entry.hfeed.unwrap_or(DEFAULT_HFEED)),
                    ];
                    for (field, value) in non_negative {
                        if !(value >= 0.0) || !value.is_finite() {
                            return Err(invalid(&format!("{} must be >= 0", field)).into());
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Material names in catalog order
    pub fn material_names(&self) -> Vec<&str> {
        self.materials.iter().map(|m| m.name.as_str()).collect()
    }

    /// Active tools of one category for a material (case-insensitive).
    /// An unknown material or category gives an empty set.
    pub fn load_for_material(&self, category: ToolCategory, material: &str) -> CutterSet {
        let key = material.to_lowercase();
        let tools = self
            .materials
            .iter()
            .filter(|m| m.name.to_lowercase() == key)
            .flat_map(|m| m.entries(category).iter())
            .filter(|entry| entry.active)
            .map(|entry| Tool::from_entry(entry, category))
            .collect();
        CutterSet::new(category, tools)
    }
}

/// Ordered tools of one category for one material
#[derive(Debug, Clone)]
pub struct CutterSet {
    category: ToolCategory,
    tools: Vec<Tool>,
}

impl CutterSet {
    pub fn new(category: ToolCategory, tools: Vec<Tool>) -> Self {
        Self { category, tools }
    }

    pub fn category(&self) -> ToolCategory {
        self.category
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn get(&self, index: usize) -> Option<&Tool> {
        self.tools.get(index)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// One tool index per diameter, largest diameter first.
    ///
    /// A tool qualifies when its cutting length covers `depth`, its diameter is
    /// within `max_diameter` (if given) and, when `require_rest` is set, it is
    /// marked for rest machining. Among qualifying tools of equal diameter the
    /// shortest cutting length wins; equal lengths keep catalog order.
    pub fn best_single_cutters_for(
        &self,
        depth: f64,
        max_diameter: Option<f64>,
        require_rest: bool,
    ) -> Vec<usize> {
        let mut by_diameter: BTreeMap<OrderedFloat<f64>, usize> = BTreeMap::new();
        for (index, tool) in self.tools.iter().enumerate() {
            if max_diameter.is_some_and(|max| tool.diameter > max) {
                continue;
            }
            if tool.cutting_length < depth || (require_rest && !tool.rest_machining) {
                continue;
            }
            by_diameter
                .entry(OrderedFloat(tool.diameter))
                .and_modify(|existing| {
                    if tool.cutting_length < self.tools[*existing].cutting_length {
                        *existing = index;
                    }
                })
                .or_insert(index);
        }
        by_diameter.values().rev().copied().collect()
    }

    /// First tool matching `diameter` within `tolerance` that can cut `depth`
    pub fn tool_of_diameter(&self, diameter: f64, depth: f64, tolerance: f64) -> Option<usize> {
        self.tools.iter().position(|tool| {
            tool.cutting_length >= depth && (tool.diameter - diameter).abs() < tolerance
        })
    }
}
