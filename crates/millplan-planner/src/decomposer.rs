//! Profile, rest-machining and pocket decomposition
//!
//! A profile is cut with the largest cutter that reaches the depth. Whatever
//! that cutter cannot reach (inside corners, narrow slots) becomes a residual
//! region, which rest machining clears with progressively smaller cutters:
//! narrow single-loop pieces as inside profiles, everything else as pockets,
//! plus optional finishing passes along the walls of material already cut.

use crate::error::PlanError;
use crate::operation::{
    BottomStyle, CutMode, Feeds, Operation, PocketOperation, ProfileOperation, ToolSide,
    ROLL_RADIUS,
};
use crate::session::PlanningSession;
use crate::tabs::plan_tabs;
use millplan_core::{Curve, Point, Region};
use tracing::debug;
use uuid::Uuid;

/// Material left on the walls by a roughing pass that has a finishing pass
pub const FINISH_ALLOWANCE: f64 = 0.1;

/// Clearance between a profile cutter and the residual it leaves (mm)
const RESIDUAL_CLEARANCE: f64 = 0.1;

/// How a closed or open curve should be profiled
#[derive(Debug, Clone)]
pub struct ProfileRequest {
    pub name: String,
    pub side: ToolSide,
    pub z_top: f64,
    /// Defaults to the bottom of the stock
    pub z_bottom: Option<f64>,
    pub bottom: BottomStyle,
    /// Start at the middle of the left edge of the curve box
    pub start_middle_left: bool,
    pub finish_pass: bool,
    pub tabs: bool,
    /// Hold the operations back until the stored list is flushed
    pub store: bool,
}

impl ProfileRequest {
    pub fn new(name: impl Into<String>, side: ToolSide) -> Self {
        Self {
            name: name.into(),
            side,
            z_top: 0.0,
            z_bottom: None,
            bottom: BottomStyle::Normal,
            start_middle_left: false,
            finish_pass: false,
            tabs: false,
            store: false,
        }
    }
}

/// Parameters of one profile cut with a known cutter
#[derive(Debug, Clone)]
pub struct CutterPass {
    pub title: String,
    pub side: ToolSide,
    pub z_top: f64,
    pub z_bottom: f64,
    pub rough: bool,
    pub allowance: f64,
    pub bottom: BottomStyle,
    pub start_middle_left: bool,
    pub tabs: bool,
    pub store: bool,
}

/// Shared options of a rest-machining call
#[derive(Debug, Clone)]
pub struct RestOptions {
    pub name: String,
    pub bottom: BottomStyle,
    pub finish_pass: bool,
    pub store: bool,
}

/// Area a cutter of `radius` leaves behind when profiling `curve`.
pub fn residual_area(curve: &Curve, side: ToolSide, radius: f64) -> Region {
    let region = Region::from_curve(curve);
    match side {
        ToolSide::Inside => {
            let reached = region.offset(-radius).offset(radius + RESIDUAL_CLEARANCE);
            region.subtract(&reached)
        }
        ToolSide::Outside => region
            .offset(radius)
            .offset(-(radius + RESIDUAL_CLEARANCE))
            .subtract(&region),
        ToolSide::On => Region::empty(),
    }
}

/// Emits operations for profiles, rest machining and pockets into a session
pub struct ToolpathDecomposer<'s, 'a> {
    session: &'s mut PlanningSession<'a>,
}

impl<'s, 'a> ToolpathDecomposer<'s, 'a> {
    pub fn new(session: &'s mut PlanningSession<'a>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &PlanningSession<'a> {
        self.session
    }

    /// Profile a curve with the largest suitable cutter, then rest machine the
    /// residual with the smaller ones. Returns the area nothing could reach.
    pub fn profile_curve(&mut self, curve: &Curve, request: &ProfileRequest) -> Region {
        if self.session.has_failed() {
            return Region::empty();
        }

        let z_bottom = request
            .z_bottom
            .unwrap_or_else(|| -self.session.thickness());
        let depth = request.z_top - z_bottom;
        let mut cutters = self.session.sorted_cutters(depth, false);
        if cutters.is_empty() {
            self.session.fail(PlanError::NoCutterAvailable {
                operation: request.name.clone(),
                depth,
            });
            return Region::empty();
        }
        let first = cutters.remove(0);
        let finish = request.finish_pass && self.session.finish_passes();

        let rough = CutterPass {
            title: request.name.clone(),
            side: request.side,
            z_top: request.z_top,
            z_bottom,
            rough: true,
            allowance: if finish { FINISH_ALLOWANCE } else { 0.0 },
            bottom: request.bottom,
            start_middle_left: request.start_middle_left,
            tabs: request.tabs,
            store: request.store,
        };
        self.profile_curve_with_cutter(curve, first, &rough);
        if finish {
            let finishing = CutterPass {
                title: format!("{} Finish Pass", request.name),
                rough: false,
                allowance: 0.0,
                ..rough
            };
            self.profile_curve_with_cutter(curve, first, &finishing);
        }

        let radius = match self.session.slot_cutters().cutters().get(first) {
            Some(tool) => tool.radius(),
            None => return Region::empty(),
        };
        let residual = match request.side {
            ToolSide::Inside => residual_area(&curve.reversed(), ToolSide::Inside, radius),
            side => residual_area(curve, side, radius),
        };

        let options = RestOptions {
            name: format!("{} Rest Machining", request.name),
            bottom: request.bottom,
            finish_pass: finish,
            store: request.store,
        };
        self.rest_machine(&residual, &cutters, request.z_top, z_bottom, &options)
    }

    /// Emit one profile operation with a given cutter.
    pub fn profile_curve_with_cutter(&mut self, curve: &Curve, cutter: usize, pass: &CutterPass) {
        if self.session.has_failed() {
            return;
        }
        let (slot, tool) = match self.session.slot_cutters_mut().add_if_not_added(cutter) {
            Ok((slot, tool)) => (slot, tool.clone()),
            Err(err) => {
                self.session.fail(err);
                return;
            }
        };
        let radius = tool.radius();

        if pass.side == ToolSide::Inside && curve.is_closed() {
            let inner = Region::from_curve(curve).offset(-(radius + RESIDUAL_CLEARANCE));
            if inner.is_empty() {
                debug!(
                    "{} too large for inside profile '{}'",
                    tool.name(),
                    pass.title
                );
                return;
            }
        }

        let start_point = if pass.start_middle_left {
            let bbox = curve.bounding_box();
            (!bbox.is_empty()).then(|| Point::new(bbox.min_x, (bbox.min_y + bbox.max_y) * 0.5))
        } else {
            None
        };
        let tabs = if pass.tabs && curve.is_closed() {
            plan_tabs(curve, radius, &self.session.tab_settings())
        } else {
            Vec::new()
        };

        let operation = ProfileOperation {
            id: Uuid::new_v4(),
            title: Some(pass.title.clone()),
            curve: curve.clone(),
            slot,
            tool_diameter: tool.diameter,
            top_z: pass.z_top,
            bottom_z: pass.z_bottom,
            side: pass.side,
            rough: pass.rough,
            cut_mode: if pass.rough {
                CutMode::Climb
            } else {
                CutMode::Conventional
            },
            allowance: if pass.rough { pass.allowance } else { 0.0 },
            step_down: if pass.rough {
                tool.rough_step_down
            } else {
                tool.finish_step_down
            },
            feeds: if pass.rough {
                Feeds::roughing(&tool)
            } else {
                Feeds::finishing(&tool)
            },
            roll_radius: ROLL_RADIUS,
            start_point,
            tabs,
            bottom: pass.bottom,
        };
        self.session.emit(Operation::Profile(operation), pass.store);
    }

    /// Clear `area` with the given cutters, largest first, skipping tools not
    /// marked for rest machining. Returns the area left unmachined.
    pub fn rest_machine(
        &mut self,
        area: &Region,
        cutters: &[usize],
        z_top: f64,
        z_bottom: f64,
        options: &RestOptions,
    ) -> Region {
        let mut remaining = area.clone();

        for &cutter in cutters {
            if remaining.is_empty() || self.session.has_failed() {
                break;
            }
            let tool = match self.session.slot_cutters().cutters().get(cutter) {
                Some(tool) => tool.clone(),
                None => continue,
            };
            if !tool.rest_machining {
                debug!("{} is not a rest machining tool", tool.name());
                continue;
            }
            let radius = tool.radius();
            let area_done = self.session.area_done().clone();

            // Grow the remaining area up to the walls already machined, but
            // never into them
            let walls_touched = remaining
                .thicken(0.1)
                .normalize()
                .intersect(&area_done)
                .normalize()
                .offset(2.0 * radius + 1.0)
                .normalize();
            let grown = remaining.offset(radius + 1.0);
            let reachable = walls_touched
                .union(&grown)
                .subtract(&area_done)
                .offset(-radius)
                .offset(radius)
                .normalize();

            let finish_curves = if options.finish_pass {
                self.finish_curves(&reachable, &area_done, radius)
            } else {
                Vec::new()
            };

            let allowance = if options.finish_pass {
                FINISH_ALLOWANCE
            } else {
                0.0
            };
            for piece in reachable.split() {
                let profile_only =
                    piece.num_curves() == 1 && piece.offset(-0.95 * tool.diameter).is_empty();
                if profile_only {
                    if let Some(curve) = piece.curves().into_iter().next() {
                        let pass = CutterPass {
                            title: options.name.clone(),
                            side: ToolSide::Inside,
                            z_top,
                            z_bottom,
                            rough: true,
                            allowance,
                            bottom: options.bottom,
                            start_middle_left: false,
                            tabs: false,
                            store: options.store,
                        };
                        self.profile_curve_with_cutter(&curve, cutter, &pass);
                    }
                } else {
                    self.pocket_area(&piece, cutter, z_top, z_bottom, allowance, options);
                }
            }

            for curve in &finish_curves {
                let pass = CutterPass {
                    title: format!("{} Finish Pass", options.name),
                    side: ToolSide::On,
                    z_top,
                    z_bottom,
                    rough: false,
                    allowance: 0.0,
                    bottom: options.bottom,
                    start_middle_left: false,
                    tabs: false,
                    store: options.store,
                };
                self.profile_curve_with_cutter(curve, cutter, &pass);
            }

            let cleared = remaining.try_subtract(&reachable.offset(0.1));
            let context = format!("{} remaining area", options.name);
            remaining = self.session.checked_region(&context, cleared, &remaining);
        }

        remaining
    }

    /// Cutter centre paths that run along walls of already machined material
    fn finish_curves(&self, reachable: &Region, area_done: &Region, radius: f64) -> Vec<Curve> {
        let centre_area = reachable.offset(-radius);
        let walls = area_done.offset(radius + 0.2);
        centre_area
            .curves()
            .iter()
            .flat_map(|curve| walls.inside_curves(&curve.reversed()))
            .collect()
    }

    /// Emit an area clearance for a region, unless the cutter does not fit.
    pub fn pocket_area(
        &mut self,
        region: &Region,
        cutter: usize,
        z_top: f64,
        z_bottom: f64,
        allowance: f64,
        options: &RestOptions,
    ) {
        if self.session.has_failed() {
            return;
        }
        let radius = match self.session.slot_cutters().cutters().get(cutter) {
            Some(tool) => tool.radius(),
            None => return,
        };
        if region.offset(-radius).is_empty() {
            debug!("Cutter too large to pocket '{}'", options.name);
            return;
        }

        let (slot, tool) = match self.session.slot_cutters_mut().add_if_not_added(cutter) {
            Ok((slot, tool)) => (slot, tool.clone()),
            Err(err) => {
                self.session.fail(err);
                return;
            }
        };

        let operation = PocketOperation {
            id: Uuid::new_v4(),
            title: Some(format!("{} Area Clear", options.name)),
            region: region.clone(),
            slot,
            tool_diameter: tool.diameter,
            step_over: radius,
            top_z: z_top,
            bottom_z: z_bottom,
            allowance,
            step_down: tool.rough_step_down,
            feeds: Feeds::roughing(&tool),
            bottom: options.bottom,
        };
        self.session.emit(Operation::Pocket(operation), options.store);
    }
}
