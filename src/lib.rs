//! # MillPlan
//!
//! Automatic machining-strategy planner for 2.5D parts cut from sheet stock.
//!
//! ## Architecture
//!
//! MillPlan is organized as a workspace with multiple crates:
//!
//! 1. **millplan-core** - Geometry service, tool catalog, stock table, errors
//! 2. **millplan-settings** - Planner configuration files
//! 3. **millplan-planner** - Planning pipeline, rest machining, holes, tabs
//! 4. **millplan** - Command line front end that integrates all crates

pub use millplan_core::{
    BoundingBox, Curve, CutterSet, Point, Region, StockTable, Tool, ToolCatalog, ToolCategory,
};
pub use millplan_planner::{
    Document, MachiningPlanPipeline, Operation, PlanError, PlanHost, PlanOutcome, PostProcessor,
    PrismaticPart, Program, Report, SetupSheet, Stage,
};
pub use millplan_settings::{PlannerConfig, SettingsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging
///
/// Sets up structured logging on stderr with:
/// - Pretty or JSON formatting
/// - RUST_LOG environment variable support
/// - `default_level` when RUST_LOG is not set
pub fn init_logging(default_level: tracing::Level, json: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    if json {
        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_line_number(true)
            .pretty();
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}
