//! Machining plan pipeline
//!
//! A run walks a fixed sequence of stages. Once a stage records a failure
//! every later stage is skipped, but the run still reaches the report so the
//! host always hears the outcome. Operations and the tools they use are only
//! added to the program together, when the run finished without a failure.

use crate::decomposer::{ProfileRequest, RestOptions, ToolpathDecomposer};
use crate::error::PlanError;
use crate::features::InnerFeatures;
use crate::host::{PlanHost, PostProcessor, Report};
use crate::operation::{BottomStyle, ToolSide};
use crate::part::{Document, MachiningLevel, Stock};
use crate::session::PlanningSession;
use chrono::{DateTime, Utc};
use millplan_core::{Point, Region, StockSelection, ToolCatalog, ToolCategory};
use millplan_settings::PlannerConfig;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Height above the part for rapid moves (mm)
pub const CLEARANCE_ABOVE_PART: f64 = 5.0;

/// Label of the undo entry a run creates
pub const HISTORY_LABEL: &str = "Create Operations";

const OVERWRITE_QUESTION: &str =
    "The program already has operations. Do you want to continue and overwrite them?";

/// Stages of a planning run, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Idle,
    ToolsLoaded,
    PartLocated,
    StockAdded,
    PartPositioned,
    ShadowComputed,
    LevelsPlanned,
    InnersPlanned,
    OutsidePlanned,
    ToolsFinalized,
    GcodeGenerated,
    Done,
    Failed,
}

impl Stage {
    /// Progress reported when the stage is entered
    pub fn percent(&self) -> u32 {
        match self {
            Stage::Idle => 0,
            Stage::ToolsLoaded => 5,
            Stage::PartLocated => 10,
            Stage::StockAdded => 15,
            Stage::PartPositioned => 20,
            Stage::ShadowComputed => 25,
            Stage::LevelsPlanned => 60,
            Stage::InnersPlanned => 80,
            Stage::OutsidePlanned => 90,
            Stage::ToolsFinalized => 95,
            Stage::GcodeGenerated => 98,
            Stage::Done | Stage::Failed => 100,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Idle => "idle",
            Stage::ToolsLoaded => "tools loaded",
            Stage::PartLocated => "part located",
            Stage::StockAdded => "stock added",
            Stage::PartPositioned => "part positioned",
            Stage::ShadowComputed => "shadow computed",
            Stage::LevelsPlanned => "levels planned",
            Stage::InnersPlanned => "inner profiles planned",
            Stage::OutsidePlanned => "outside profiles planned",
            Stage::ToolsFinalized => "tools finalized",
            Stage::GcodeGenerated => "output generated",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        write!(f, "{}", label)
    }
}

/// Machined area after one pocket level
#[derive(Debug, Clone)]
pub struct LevelReport {
    pub name: String,
    pub top_z: f64,
    /// Area of the cumulative machined region after this level
    pub area_done: f64,
    /// Area no rest machining cutter reached
    pub leftover: f64,
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub started_at: DateTime<Utc>,
    pub stage: Stage,
    pub stages: Vec<Stage>,
    pub failure: Option<PlanError>,
    pub warnings: Vec<String>,
    pub levels: Vec<LevelReport>,
    pub operations_added: usize,
    pub tools_added: usize,
}

impl PlanOutcome {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Runs the planning stages for the first visible solid of a document
pub struct MachiningPlanPipeline<'a> {
    config: &'a PlannerConfig,
    catalog: &'a ToolCatalog,
    stage: Stage,
    stages: Vec<Stage>,
    levels: Vec<LevelReport>,
    solid: Option<usize>,
    shadow: Region,
}

impl<'a> MachiningPlanPipeline<'a> {
    pub fn new(config: &'a PlannerConfig, catalog: &'a ToolCatalog) -> Self {
        Self {
            config,
            catalog,
            stage: Stage::Idle,
            stages: vec![Stage::Idle],
            levels: Vec::new(),
            solid: None,
            shadow: Region::empty(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Plan the document. Returns `Cancelled` if the host cancels, after
    /// restoring the document to its state before the run.
    pub fn run(
        &mut self,
        document: &mut Document,
        host: &mut dyn PlanHost,
        post: Option<&mut dyn PostProcessor>,
    ) -> Result<PlanOutcome, PlanError> {
        let started_at = Utc::now();
        let timer = Instant::now();
        info!("Planning part for material {}", self.config.material);
        document.start_history(HISTORY_LABEL);

        let slot_cutters = self
            .catalog
            .load_for_material(ToolCategory::SlotCutter, &self.config.material);
        let drills = self
            .catalog
            .load_for_material(ToolCategory::Drill, &self.config.material);
        let mut session = PlanningSession::new(self.config, slot_cutters, drills);
        let mut operations_added = 0;
        let mut tools_added = 0;

        self.enter(Stage::ToolsLoaded, &session, host, document)?;
        if session.slot_cutters().cutters().is_empty() {
            session.fail(PlanError::CatalogMissing {
                material: self.config.material.clone(),
                category: ToolCategory::SlotCutter.plural().to_string(),
            });
        }

        self.enter(Stage::PartLocated, &session, host, document)?;
        if !session.has_failed() {
            self.solid = document.first_visible_solid();
            if self.solid.is_none() {
                session.fail(PlanError::NoSolidFound);
            }
        }
        if !session.has_failed() && !document.program.operations.is_empty() {
            if host.confirm(OVERWRITE_QUESTION) {
                info!("Clearing existing program");
                document.program.clear();
            } else {
                info!("Appending to existing program");
            }
        }

        self.enter(Stage::StockAdded, &session, host, document)?;
        if !session.has_failed() {
            self.add_stock(&mut session, document);
        }

        self.enter(Stage::PartPositioned, &session, host, document)?;
        if !session.has_failed() {
            self.move_part(&session, document);
        }

        self.enter(Stage::ShadowComputed, &session, host, document)?;
        if !session.has_failed() {
            self.make_shadow(&mut session, document);
        }

        self.enter(Stage::LevelsPlanned, &session, host, document)?;
        if !session.has_failed() && self.config.make_area_operations {
            self.make_patch_operations(&mut session, document);
        }

        self.enter(Stage::InnersPlanned, &session, host, document)?;
        if !session.has_failed() {
            self.cut_shadow_inners(&mut session);
        }
        session.flush_stored();

        self.enter(Stage::OutsidePlanned, &session, host, document)?;
        if !session.has_failed() {
            self.cut_outside(&mut session);
        }

        self.enter(Stage::ToolsFinalized, &session, host, document)?;
        if session.has_failed() {
            debug!(
                "Discarding {} planned operations after failure",
                session.operations().len()
            );
        } else {
            let tools = session.take_staged_tools();
            tools_added = tools.len();
            document.program.tools.extend(tools);
            operations_added = commit_operations(&mut session, document);
        }

        if self.config.create_gcode && !session.has_failed() {
            if let Some(post) = post {
                self.enter(Stage::GcodeGenerated, &session, host, document)?;
                info!("Running post-processor {}", post.name());
                match post.process(&document.program) {
                    Ok(output) => document.program.output = Some(output),
                    Err(err) => session.fail(err),
                }
            }
        }

        let final_stage = if session.has_failed() {
            Stage::Failed
        } else {
            Stage::Done
        };
        self.advance(final_stage, host);
        report(&session, host);

        info!(
            "Planning {} after {:.2}s: {} operations, {} tools",
            final_stage,
            timer.elapsed().as_secs_f64(),
            operations_added,
            tools_added
        );

        Ok(PlanOutcome {
            started_at,
            stage: final_stage,
            stages: self.stages.clone(),
            failure: session.failure().cloned(),
            warnings: session.warnings().to_vec(),
            levels: std::mem::take(&mut self.levels),
            operations_added,
            tools_added,
        })
    }

    /// Move to the next stage unless the host cancelled the run.
    fn enter(
        &mut self,
        next: Stage,
        session: &PlanningSession<'_>,
        host: &mut dyn PlanHost,
        document: &mut Document,
    ) -> Result<(), PlanError> {
        if host.is_cancelled() {
            warn!("Planning cancelled before {}", next);
            document.undo();
            self.stage = Stage::Failed;
            self.stages.push(Stage::Failed);
            return Err(PlanError::Cancelled);
        }
        if session.has_failed() {
            debug!("Skipping {} after failure", next);
            if self.stage != Stage::Failed {
                self.advance(Stage::Failed, host);
            }
            return Ok(());
        }
        self.advance(next, host);
        Ok(())
    }

    fn advance(&mut self, next: Stage, host: &mut dyn PlanHost) {
        if self.stage == next {
            return;
        }
        debug!("Stage {} -> {}", self.stage, next);
        self.stage = next;
        self.stages.push(next);
        host.progress(next.percent(), &next.to_string());
    }

    fn add_stock(&self, session: &mut PlanningSession<'_>, document: &mut Document) {
        let Some(index) = self.solid else { return };
        let bounds = document.solids[index].bounding_box();
        let depth = bounds.depth();
        let material = &self.config.material;

        let thickness = match self
            .config
            .stock
            .select(material, depth, session.tolerance())
        {
            StockSelection::UnknownMaterial => {
                session.fail(PlanError::MaterialUnknown {
                    material: material.clone(),
                });
                return;
            }
            StockSelection::NoStock => {
                session.fail(PlanError::NoStockForMaterial {
                    material: material.clone(),
                });
                return;
            }
            _ if self.config.use_part_thickness => depth,
            StockSelection::Thickness(thickness) => thickness,
            StockSelection::TooThick { thickest } => {
                session.fail(PlanError::PartTooThick {
                    material: material.clone(),
                    part_thickness: depth,
                    thickest,
                });
                return;
            }
        };

        let width = bounds.plan.width() + 2.0 * self.config.x_margin;
        let height = bounds.plan.height() + 2.0 * self.config.y_margin;
        info!(
            "Stock: {} {:.1} x {:.1} x {:.1} mm",
            material, width, height, thickness
        );
        session.set_thickness(thickness);
        document.program.stock = Some(Stock {
            material: material.clone(),
            width,
            height,
            thickness,
            outline: Region::rectangle(Point::new(0.0, 0.0), Point::new(width, height)),
        });
    }

    fn move_part(&self, session: &PlanningSession<'_>, document: &mut Document) {
        let Some(index) = self.solid else { return };
        let part = &mut document.solids[index];
        let bounds = part.bounding_box();
        let dx = self.config.x_margin - bounds.plan.min_x;
        let dy = self.config.y_margin - bounds.plan.min_y;
        let dz = -bounds.min_z - session.thickness();
        debug!("Moving part by ({:.3}, {:.3}, {:.3})", dx, dy, dz);
        part.translate(dx, dy, dz);
    }

    fn make_shadow(&mut self, session: &mut PlanningSession<'_>, document: &mut Document) {
        let Some(index) = self.solid else { return };
        let part = &document.solids[index];
        self.shadow = part.shadow();
        let bounds = part.bounding_box();
        let clearance = bounds.max_z + CLEARANCE_ABOVE_PART;
        document.program.clearance_height = Some(clearance);

        let outline = self
            .shadow
            .bounding_box()
            .expanded(self.config.x_margin, self.config.y_margin);
        if let Some(stock) = document.program.stock.as_mut() {
            stock.outline = Region::rectangle(outline.min(), outline.max());
        }
        debug!(
            "Shadow has {} boundaries, clearance height {:.3}",
            self.shadow.num_curves(),
            clearance
        );
        session.reset_area_done();
    }

    /// Merge levels whose tops lie within the tolerance of each other.
    fn combine_levels(levels: Vec<MachiningLevel>, tolerance: f64) -> Vec<MachiningLevel> {
        let mut combined: Vec<MachiningLevel> = Vec::new();
        for level in levels {
            match combined.last_mut() {
                Some(last) if (last.top_z - level.top_z).abs() <= tolerance => {
                    last.area = last.area.union(&level.area);
                }
                _ => combined.push(level),
            }
        }
        combined
    }

    fn make_patch_operations(&mut self, session: &mut PlanningSession<'_>, document: &Document) {
        let Some(index) = self.solid else { return };
        let tolerance = session.tolerance();
        let levels =
            Self::combine_levels(document.solids[index].machining_areas(tolerance), tolerance);
        debug!("{} machining levels", levels.len());

        let mut number = 1;
        for level in levels {
            if session.has_failed() {
                break;
            }
            let area = level.area.subtract(session.area_done());
            if level.top_z < -tolerance {
                let name = format!("Level {}", number);
                number += 1;
                if area.is_empty() {
                    debug!("{} is covered by shallower levels", name);
                    continue;
                }
                let cutters = session.sorted_cutters(level.top_z.abs(), true);
                let options = RestOptions {
                    name: name.clone(),
                    bottom: BottomStyle::Pocket,
                    finish_pass: session.finish_passes(),
                    store: true,
                };
                let leftover = ToolpathDecomposer::new(session).rest_machine(
                    &area,
                    &cutters,
                    0.0,
                    level.top_z,
                    &options,
                );
                let leftover_area = leftover.area();
                if !leftover.is_empty() && !session.has_failed() {
                    let widest = leftover
                        .max_cutter_diameter(tolerance)
                        .map(|d| format!(", widest gap {:.2} mm", d))
                        .unwrap_or_default();
                    session.warn(format!(
                        "{}: {:.2} mm^2 at z = {:.3} could not be machined{}",
                        name, leftover_area, level.top_z, widest
                    ));
                }
                session.mark_done(&area);
                self.levels.push(LevelReport {
                    name,
                    top_z: level.top_z,
                    area_done: session.area_done().area(),
                    leftover: leftover_area,
                });
            } else {
                session.mark_done(&area);
            }
        }
    }

    fn cut_shadow_inners(&self, session: &mut PlanningSession<'_>) {
        let inners: Vec<_> = self
            .shadow
            .curves()
            .into_iter()
            .filter(|curve| curve.is_clockwise())
            .collect();
        debug!("{} inner boundaries", inners.len());
        let features =
            InnerFeatures::extract(&inners, 0.0, -session.thickness(), session.tolerance());
        features.plan(session);
    }

    fn cut_outside(&self, session: &mut PlanningSession<'_>) {
        let mut decomposer = ToolpathDecomposer::new(session);
        for curve in self
            .shadow
            .curves()
            .into_iter()
            .filter(|curve| !curve.is_clockwise())
        {
            let mut request = ProfileRequest::new("Outside", ToolSide::Outside);
            request.bottom = BottomStyle::Through;
            request.start_middle_left = true;
            request.finish_pass = true;
            request.tabs = true;
            decomposer.profile_curve(&curve, &request);
        }
    }
}

fn commit_operations(session: &mut PlanningSession<'_>, document: &mut Document) -> usize {
    let operations = session.take_operations();
    let count = operations.len();
    document.program.operations.extend(operations);
    count
}

fn report(session: &PlanningSession<'_>, host: &mut dyn PlanHost) {
    if let Some(failure) = session.failure() {
        host.report(Report::Failure(failure.to_string()));
    } else if !session.warnings().is_empty() {
        host.report(Report::Warnings(session.warnings().join("\n")));
    }
}
