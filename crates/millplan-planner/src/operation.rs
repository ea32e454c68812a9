//! Machining operations emitted by the planner.
//!
//! Operations are plain records: the planner fills them in and appends them to
//! the program; a post-processor turns them into machine code.

use millplan_core::{Curve, Point, Region, Tool};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Roll-on/roll-off radius for every profile (mm)
pub const ROLL_RADIUS: f64 = 0.1;

/// Which side of the curve the cutter runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolSide {
    Inside,
    Outside,
    On,
}

/// Spindle rotation relative to feed direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CutMode {
    Climb,
    Conventional,
}

/// How the bottom of a cut is finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BottomStyle {
    #[default]
    Normal,
    /// Cut through the stock, going below the final depth
    Through,
    /// Floor of a pocket, with a light finishing pass at depth
    Pocket,
}

impl BottomStyle {
    /// Extra depth below the final depth (mm).
    pub fn through_depth(&self) -> f64 {
        match self {
            BottomStyle::Through => 1.0,
            _ => 0.0,
        }
    }

    /// Depth of the finishing pass at the floor (mm).
    pub fn finishing_depth(&self) -> f64 {
        match self {
            BottomStyle::Pocket => 0.1,
            _ => 0.0,
        }
    }
}

/// Holding tab left uncut on a profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    pub position: Point,
    pub width: f64,
    pub height: f64,
    pub angle: f64,
}

/// Feeds and speeds copied from the tool at emission time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Feeds {
    /// Horizontal feed (mm/min)
    pub hfeed: f64,
    /// Vertical feed (mm/min)
    pub vfeed: f64,
    /// Spindle speed (rpm)
    pub spin: f64,
}

impl Feeds {
    pub fn roughing(tool: &Tool) -> Self {
        Self {
            hfeed: tool.hfeed,
            vfeed: tool.vfeed,
            spin: tool.spin,
        }
    }

    pub fn finishing(tool: &Tool) -> Self {
        Self {
            hfeed: tool.finishing_feed(),
            vfeed: tool.vfeed,
            spin: tool.spin,
        }
    }
}

/// Contour cut along a curve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileOperation {
    pub id: Uuid,
    pub title: Option<String>,
    pub curve: Curve,
    pub slot: u32,
    pub tool_diameter: f64,
    pub top_z: f64,
    pub bottom_z: f64,
    pub side: ToolSide,
    /// Roughing pass when true, finishing pass otherwise
    pub rough: bool,
    pub cut_mode: CutMode,
    /// Material left on the wall (mm)
    pub allowance: f64,
    pub step_down: f64,
    pub feeds: Feeds,
    pub roll_radius: f64,
    pub start_point: Option<Point>,
    pub tabs: Vec<Tab>,
    pub bottom: BottomStyle,
}

/// Area clearance of a region
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PocketOperation {
    pub id: Uuid,
    pub title: Option<String>,
    pub region: Region,
    pub slot: u32,
    pub tool_diameter: f64,
    pub step_over: f64,
    pub top_z: f64,
    pub bottom_z: f64,
    pub allowance: f64,
    pub step_down: f64,
    pub feeds: Feeds,
    pub bottom: BottomStyle,
}

/// Peck drilling at a list of points
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrillOperation {
    pub id: Uuid,
    pub title: Option<String>,
    pub points: Vec<Point>,
    pub slot: u32,
    pub tool_diameter: f64,
    pub top_z: f64,
    pub bottom_z: f64,
    pub peck_depth: f64,
    pub feeds: Feeds,
}

/// One entry of the machining program
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    Profile(ProfileOperation),
    Pocket(PocketOperation),
    Drill(DrillOperation),
}

impl Operation {
    pub fn id(&self) -> Uuid {
        match self {
            Operation::Profile(op) => op.id,
            Operation::Pocket(op) => op.id,
            Operation::Drill(op) => op.id,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Operation::Profile(op) => op.title.as_deref(),
            Operation::Pocket(op) => op.title.as_deref(),
            Operation::Drill(op) => op.title.as_deref(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Profile(_) => "Profile",
            Operation::Pocket(_) => "Pocket",
            Operation::Drill(_) => "Drill",
        }
    }

    /// Tool-holder slot the operation cuts with
    pub fn slot(&self) -> u32 {
        match self {
            Operation::Profile(op) => op.slot,
            Operation::Pocket(op) => op.slot,
            Operation::Drill(op) => op.slot,
        }
    }

    pub fn tool_diameter(&self) -> f64 {
        match self {
            Operation::Profile(op) => op.tool_diameter,
            Operation::Pocket(op) => op.tool_diameter,
            Operation::Drill(op) => op.tool_diameter,
        }
    }

    pub fn top_z(&self) -> f64 {
        match self {
            Operation::Profile(op) => op.top_z,
            Operation::Pocket(op) => op.top_z,
            Operation::Drill(op) => op.top_z,
        }
    }

    pub fn bottom_z(&self) -> f64 {
        match self {
            Operation::Profile(op) => op.bottom_z,
            Operation::Pocket(op) => op.bottom_z,
            Operation::Drill(op) => op.bottom_z,
        }
    }

    /// Cut depth from top to bottom (mm)
    pub fn depth(&self) -> f64 {
        self.top_z() - self.bottom_z()
    }
}
