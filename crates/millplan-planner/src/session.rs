//! Run state of one planning pass
//!
//! Everything a run accumulates (machined area, first failure, warnings,
//! emitted operations, slot bindings) lives here and is handed explicitly to
//! each planning component.

use crate::assigner::{ProgramTool, ToolAssigner};
use crate::error::PlanError;
use crate::operation::Operation;
use crate::tabs::TabSettings;
use millplan_core::{CutterSet, GeometryError, Region, BIG_CUTTER_DIAMETER};
use millplan_settings::PlannerConfig;
use tracing::{debug, warn};

/// Mutable state of a single planning run
#[derive(Debug)]
pub struct PlanningSession<'a> {
    config: &'a PlannerConfig,
    slot_cutters: ToolAssigner,
    drills: ToolAssigner,
    thickness: f64,
    area_done: Region,
    failure: Option<PlanError>,
    warnings: Vec<String>,
    operations: Vec<Operation>,
    stored: Vec<Operation>,
}

impl<'a> PlanningSession<'a> {
    pub fn new(config: &'a PlannerConfig, slot_cutters: CutterSet, drills: CutterSet) -> Self {
        Self {
            config,
            slot_cutters: ToolAssigner::new(slot_cutters, config.slot_cutter_slots.clone()),
            drills: ToolAssigner::new(drills, config.drill_slots.clone()),
            thickness: 0.0,
            area_done: Region::empty(),
            failure: None,
            warnings: Vec::new(),
            operations: Vec::new(),
            stored: Vec::new(),
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        self.config
    }

    /// Geometric tolerance ε (mm)
    pub fn tolerance(&self) -> f64 {
        self.config.precision
    }

    /// Stock thickness chosen for the run (mm)
    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    pub fn set_thickness(&mut self, thickness: f64) {
        self.thickness = thickness;
    }

    pub fn finish_passes(&self) -> bool {
        self.config.finish_passes
    }

    pub fn tab_settings(&self) -> TabSettings {
        TabSettings::from_config(self.config)
    }

    pub fn slot_cutters(&self) -> &ToolAssigner {
        &self.slot_cutters
    }

    pub fn slot_cutters_mut(&mut self) -> &mut ToolAssigner {
        &mut self.slot_cutters
    }

    pub fn drills(&self) -> &ToolAssigner {
        &self.drills
    }

    pub fn drills_mut(&mut self) -> &mut ToolAssigner {
        &mut self.drills
    }

    /// Slot cutters that reach `depth`, largest first, capped to
    /// `BIG_CUTTER_DIAMETER` unless the part is big and rigid.
    pub fn sorted_cutters(&self, depth: f64, require_rest: bool) -> Vec<usize> {
        let cap = if self.config.big_rigid_part {
            None
        } else {
            Some(BIG_CUTTER_DIAMETER)
        };
        self.slot_cutters
            .cutters()
            .best_single_cutters_for(depth, cap, require_rest)
    }

    /// Region machined by the levels planned so far
    pub fn area_done(&self) -> &Region {
        &self.area_done
    }

    pub fn reset_area_done(&mut self) {
        self.area_done = Region::empty();
    }

    /// Add a level's region to the machined area.
    pub fn mark_done(&mut self, area: &Region) {
        let previous = self.area_done.clone();
        let merged = previous.try_union(area);
        self.area_done = self.checked_region("machined area", merged, &previous);
    }

    /// Unwrap a boolean result; on failure keep `fallback` and warn the user
    /// that `context` is approximate.
    pub fn checked_region(
        &mut self,
        context: &str,
        result: Result<Region, GeometryError>,
        fallback: &Region,
    ) -> Region {
        match result {
            Ok(region) => region,
            Err(err) => {
                self.warn(format!("{}: {}, result may be inaccurate", context, err));
                fallback.clone()
            }
        }
    }

    /// Record a run failure. Only the first one is kept.
    pub fn fail(&mut self, error: PlanError) {
        if self.failure.is_none() {
            warn!("Planning failed: {}", error);
            self.failure = Some(error);
        } else {
            debug!("Ignoring later failure: {}", error);
        }
    }

    pub fn failure(&self) -> Option<&PlanError> {
        self.failure.as_ref()
    }

    pub fn has_failed(&self) -> bool {
        self.failure.is_some()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Append an operation, either straight to the program queue or to the
    /// stored list committed after the inner profiles.
    pub fn emit(&mut self, operation: Operation, store: bool) {
        debug!(
            "{} {} ({} mm, slot {})",
            if store { "Storing" } else { "Adding" },
            operation.title().unwrap_or(operation.kind()),
            operation.tool_diameter(),
            operation.slot()
        );
        if store {
            self.stored.push(operation);
        } else {
            self.operations.push(operation);
        }
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn stored_operations(&self) -> &[Operation] {
        &self.stored
    }

    /// Move the stored operations behind the ones already queued.
    pub fn flush_stored(&mut self) {
        let stored = std::mem::take(&mut self.stored);
        self.operations.extend(stored);
    }

    pub fn take_operations(&mut self) -> Vec<Operation> {
        std::mem::take(&mut self.operations)
    }

    /// Staged tools of both categories ordered by slot
    pub fn take_staged_tools(&mut self) -> Vec<ProgramTool> {
        let mut tools = self.slot_cutters.take_staged();
        tools.extend(self.drills.take_staged());
        tools.sort_by_key(|tool| tool.slot);
        tools
    }
}
