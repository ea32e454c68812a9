//! # MillPlan Settings
//!
//! Planner configuration: loading, saving, validation and key/value editing.

pub mod config;
pub mod error;

pub use config::{PlannerConfig, CONFIG_KEYS};
pub use error::{ConfigError, SettingsError, SettingsResult};
