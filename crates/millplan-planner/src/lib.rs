//! # MillPlan Planner
//!
//! Plans 2.5D milling for a part cut from sheet stock:
//! - Picks stock thickness and positions the part in it
//! - Clears pocket levels with rest machining, largest cutter first
//! - Drills or profiles holes and inner cut-outs
//! - Profiles the outside with holding tabs and finishing passes
//! - Binds the tools it uses to tool-holder slots
//!
//! Planning runs through [`MachiningPlanPipeline`], which reports to a
//! [`PlanHost`] and can hand the finished program to a [`PostProcessor`].

pub mod assigner;
pub mod decomposer;
pub mod error;
pub mod features;
pub mod host;
pub mod operation;
pub mod part;
pub mod pipeline;
pub mod session;
pub mod setup_sheet;
pub mod tabs;

pub use assigner::{ProgramTool, ToolAssigner};
pub use decomposer::{residual_area, ProfileRequest, RestOptions, ToolpathDecomposer};
pub use error::PlanError;
pub use features::{Hole, InnerFeatures};
pub use host::{PlanHost, PostProcessor, Report, ScriptedHost};
pub use operation::{
    BottomStyle, CutMode, DrillOperation, Feeds, Operation, PocketOperation, ProfileOperation,
    Tab, ToolSide,
};
pub use part::{Document, MachiningLevel, PartSpec, PrismaticPart, Program, Stock};
pub use pipeline::{LevelReport, MachiningPlanPipeline, PlanOutcome, Stage};
pub use session::PlanningSession;
pub use setup_sheet::SetupSheet;
pub use tabs::{plan_tabs, TabSettings};
