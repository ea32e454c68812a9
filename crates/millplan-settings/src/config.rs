//! Planner configuration
//!
//! A flat set of keys read once before a planning run and written back only by
//! explicit edits. Supports JSON and TOML files; the default location is the
//! platform config directory.
//!
//! Keys:
//! - Stock placement (`x_margin`, `y_margin`, `material`, `use_part_thickness`)
//! - Holding tabs (`tag_width`, `tag_height`, `tag_angle`, `tag_y_margin`)
//! - Planning switches (`big_rigid_part`, `make_area_operations`, `finish_passes`, `create_gcode`)
//! - Geometry tolerance (`precision`)
//! - Tool catalog location and tool-holder slot lists

use crate::error::{ConfigError, SettingsError, SettingsResult};
use millplan_core::data::stock::{StockTable, MATERIAL_ALU_ALLOY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Keys accepted by [`PlannerConfig::set`] and [`PlannerConfig::get`]
pub const CONFIG_KEYS: &[&str] = &[
    "x_margin",
    "y_margin",
    "material",
    "create_gcode",
    "tag_width",
    "tag_height",
    "tag_angle",
    "tag_y_margin",
    "big_rigid_part",
    "precision",
    "make_area_operations",
    "use_part_thickness",
    "finish_passes",
    "catalog_path",
    "slot_cutter_slots",
    "drill_slots",
];

/// Planner settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Stock margin left and right of the part in mm
    pub x_margin: f64,
    /// Stock margin below and above the part in mm
    pub y_margin: f64,
    /// Material name, used for both the stock table and the tool catalog
    pub material: String,
    /// Run the post-processor after a successful plan
    pub create_gcode: bool,
    /// Holding tab width in mm
    pub tag_width: f64,
    /// Holding tab height in mm
    pub tag_height: f64,
    /// Holding tab ramp angle in degrees
    pub tag_angle: f64,
    /// Distance of the tab scan lines from the profile's top and bottom in mm
    pub tag_y_margin: f64,
    /// Allow cutters above the big-cutter diameter
    pub big_rigid_part: bool,
    /// Geometric tolerance used by every comparison in mm
    pub precision: f64,
    /// Plan pocket levels below the top face
    pub make_area_operations: bool,
    /// Use the part's own depth as stock thickness
    pub use_part_thickness: bool,
    /// Add finishing passes to profiles and pockets
    pub finish_passes: bool,
    /// Tool catalog file (JSON or TOML)
    pub catalog_path: Option<PathBuf>,
    /// Tool-holder slots for slot cutters, in binding order
    pub slot_cutter_slots: Vec<u32>,
    /// Tool-holder slots for drills, in binding order
    pub drill_slots: Vec<u32>,
    /// Available stock thicknesses per material
    pub stock: StockTable,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            x_margin: 20.0,
            y_margin: 3.0,
            material: MATERIAL_ALU_ALLOY.to_string(),
            create_gcode: true,
            tag_width: 5.0,
            tag_height: 1.0,
            tag_angle: 45.0,
            tag_y_margin: 4.0,
            big_rigid_part: false,
            precision: 0.1,
            make_area_operations: true,
            use_part_thickness: false,
            finish_passes: true,
            catalog_path: None,
            slot_cutter_slots: vec![3, 4, 5, 6],
            drill_slots: vec![1, 2, 7, 8, 9],
            stock: StockTable::default(),
        }
    }
}

impl PlannerConfig {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config file location, e.g. `~/.config/millplan/config.toml`
    pub fn default_path() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("millplan").join("config.toml"))
            .ok_or_else(|| {
                SettingsError::NoConfigDirectory("none for this platform".to_string())
            })
    }

    /// Load from `path`, or defaults when the file does not exist yet
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| SettingsError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content)?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.display().to_string()).into());
        };

        config.validate()?;
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::to_string_pretty(self)?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::to_string_pretty(self)?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.display().to_string()).into());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| SettingsError::NoConfigDirectory(e.to_string()))?;
            }
        }
        std::fs::write(path, content)
            .map_err(|source| SettingsError::Write {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        let invalid = |key: &str, reason: &str| {
            Err(SettingsError::InvalidSetting {
                key: key.to_string(),
                reason: reason.to_string(),
            })
        };

        let non_negative = [
            ("x_margin", self.x_margin),
            ("y_margin", self.y_margin),
            ("tag_width", self.tag_width),
            ("tag_height", self.tag_height),
            ("tag_y_margin", self.tag_y_margin),
        ];
        for (key, value) in non_negative {
            if !(value >= 0.0) || !value.is_finite() {
                return invalid(key, "must be >= 0");
            }
        }

        if !(self.precision > 0.0) || !self.precision.is_finite() {
            return invalid("precision", "must be > 0");
        }

        if !(0.0..=90.0).contains(&self.tag_angle) {
            return invalid("tag_angle", "must be between 0 and 90 degrees");
        }

        if self.material.trim().is_empty() {
            return invalid("material", "must not be empty");
        }

        for (key, slots) in [
            ("slot_cutter_slots", &self.slot_cutter_slots),
            ("drill_slots", &self.drill_slots),
        ] {
            let mut sorted = slots.clone();
            sorted.sort_unstable();
            sorted.dedup();
            if sorted.len() != slots.len() {
                return invalid(key, "slot numbers must be unique");
            }
        }
        if self
            .slot_cutter_slots
            .iter()
            .any(|s| self.drill_slots.contains(s))
        {
            return invalid("drill_slots", "slot shared with slot cutters");
        }

        for material in self.stock.materials() {
            let thicknesses = self.stock.thicknesses(material).unwrap_or_default();
            if thicknesses.iter().any(|t| !(*t > 0.0)) {
                return invalid("stock", "thicknesses must be > 0");
            }
        }

        Ok(())
    }

    /// Current value of a key as text
    pub fn get(&self, key: &str) -> SettingsResult<String> {
        let join = |slots: &[u32]| {
            slots
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(",")
        };
        let value = match key {
            "x_margin" => self.x_margin.to_string(),
            "y_margin" => self.y_margin.to_string(),
            "material" => self.material.clone(),
            "create_gcode" => self.create_gcode.to_string(),
            "tag_width" => self.tag_width.to_string(),
            "tag_height" => self.tag_height.to_string(),
            "tag_angle" => self.tag_angle.to_string(),
            "tag_y_margin" => self.tag_y_margin.to_string(),
            "big_rigid_part" => self.big_rigid_part.to_string(),
            "precision" => self.precision.to_string(),
            "make_area_operations" => self.make_area_operations.to_string(),
            "use_part_thickness" => self.use_part_thickness.to_string(),
            "finish_passes" => self.finish_passes.to_string(),
            "catalog_path" => self
                .catalog_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            "slot_cutter_slots" => join(&self.slot_cutter_slots),
            "drill_slots" => join(&self.drill_slots),
            _ => return Err(ConfigError::UnknownKey(key.to_string()).into()),
        };
        Ok(value)
    }

    /// Set one key from text; the edited config is validated before it is kept
    pub fn set(&mut self, key: &str, value: &str) -> SettingsResult<()> {
        let unparsable = || ConfigError::Unparsable {
            key: key.to_string(),
            value: value.to_string(),
        };
        let number = || value.trim().parse::<f64>().map_err(|_| unparsable());
        let flag = || value.trim().parse::<bool>().map_err(|_| unparsable());
        let slots = || {
            value
                .split(',')
                .map(|s| s.trim().parse::<u32>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| unparsable())
        };

        let mut edited = self.clone();
        match key {
            "x_margin" => edited.x_margin = number()?,
            "y_margin" => edited.y_margin = number()?,
            "material" => edited.material = value.trim().to_string(),
            "create_gcode" => edited.create_gcode = flag()?,
            "tag_width" => edited.tag_width = number()?,
            "tag_height" => edited.tag_height = number()?,
            "tag_angle" => edited.tag_angle = number()?,
            "tag_y_margin" => edited.tag_y_margin = number()?,
            "big_rigid_part" => edited.big_rigid_part = flag()?,
            "precision" => edited.precision = number()?,
            "make_area_operations" => edited.make_area_operations = flag()?,
            "use_part_thickness" => edited.use_part_thickness = flag()?,
            "finish_passes" => edited.finish_passes = flag()?,
            "catalog_path" => {
                edited.catalog_path = if value.trim().is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value.trim()))
                }
            }
            "slot_cutter_slots" => edited.slot_cutter_slots = slots()?,
            "drill_slots" => edited.drill_slots = slots()?,
            _ => return Err(ConfigError::UnknownKey(key.to_string()).into()),
        }

        edited.validate()?;
        *self = edited;
        Ok(())
    }
}
