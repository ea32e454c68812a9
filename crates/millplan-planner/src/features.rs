//! Inner boundary features: holes and cut-outs
//!
//! Circular inner boundaries of equal size and depth are clustered into holes
//! and drilled when a drill of that diameter exists, otherwise each hole is
//! profiled as a circle. Every other inner boundary is profiled inside.

use crate::decomposer::{ProfileRequest, ToolpathDecomposer};
use crate::operation::{BottomStyle, DrillOperation, Feeds, Operation, ToolSide};
use crate::session::PlanningSession;
use millplan_core::{BoundingBox, Curve, Point};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Circular holes of one diameter and depth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hole {
    pub diameter: f64,
    pub top_z: f64,
    pub bottom_z: f64,
    pub points: Vec<Point>,
}

impl Hole {
    pub fn new(diameter: f64, top_z: f64, bottom_z: f64, point: Point) -> Self {
        Self {
            diameter,
            top_z,
            bottom_z,
            points: vec![point],
        }
    }

    pub fn depth(&self) -> f64 {
        self.top_z - self.bottom_z
    }

    /// Whether another hole can share this hole's tool and depths
    pub fn matches(&self, other: &Hole, tolerance: f64) -> bool {
        (self.diameter - other.diameter).abs() <= tolerance
            && (self.top_z - other.top_z).abs() <= tolerance
            && (self.bottom_z - other.bottom_z).abs() <= tolerance
    }

    /// Take over the points of `other` if it matches.
    pub fn try_merge(&mut self, other: &Hole, tolerance: f64) -> bool {
        if !self.matches(other, tolerance) {
            return false;
        }
        self.points.extend_from_slice(&other.points);
        true
    }

    /// Order points along the wider axis of their box, row by row.
    pub fn sort_points(&mut self) {
        let mut bbox = BoundingBox::empty();
        for p in &self.points {
            bbox.insert(*p);
        }
        let (axis, other) = if bbox.width() > bbox.height() {
            (Point::new(1.0, 0.0), Point::new(0.0, 1.0))
        } else {
            (Point::new(0.0, 1.0), Point::new(1.0, 0.0))
        };
        self.points.sort_by(|a, b| {
            let ka = a.dot(axis) + 1000.0 * a.dot(other);
            let kb = b.dot(axis) + 1000.0 * b.dot(other);
            ka.total_cmp(&kb)
        });
    }

    /// Clockwise circle around each point, for profiling without a drill
    pub fn curves(&self) -> Vec<Curve> {
        self.points
            .iter()
            .map(|p| Curve::circle(*p, self.diameter * 0.5).reversed())
            .collect()
    }
}

/// Inner boundaries split into holes and other cut-outs
#[derive(Debug, Clone, Default)]
pub struct InnerFeatures {
    pub holes: Vec<Hole>,
    pub curves: Vec<Curve>,
}

impl InnerFeatures {
    /// Classify inner boundaries cut from `top_z` down to `bottom_z`.
    pub fn extract(boundaries: &[Curve], top_z: f64, bottom_z: f64, tolerance: f64) -> Self {
        let mut features = InnerFeatures::default();
        for boundary in boundaries {
            match boundary.as_circle(tolerance) {
                Some(circle) => {
                    let hole = Hole::new(circle.diameter(), top_z, bottom_z, circle.center);
                    features.add_hole(hole, tolerance);
                }
                None => features.curves.push(boundary.clone()),
            }
        }
        for hole in &mut features.holes {
            hole.sort_points();
        }
        features
    }

    fn add_hole(&mut self, hole: Hole, tolerance: f64) {
        if !self
            .holes
            .iter_mut()
            .any(|existing| existing.try_merge(&hole, tolerance))
        {
            self.holes.push(hole);
        }
    }

    /// Emit drills first, then profiles for undrillable holes, then profiles
    /// for the remaining cut-outs.
    pub fn plan(&self, session: &mut PlanningSession<'_>) {
        let tolerance = session.tolerance();
        let mut undrilled: Vec<&Hole> = Vec::new();

        for hole in &self.holes {
            let drill = session
                .drills()
                .cutters()
                .tool_of_diameter(hole.diameter, hole.depth(), tolerance);
            match drill {
                Some(index) => plan_drill(session, hole, index),
                None => {
                    debug!("No {:.3} mm drill, profiling holes", hole.diameter);
                    undrilled.push(hole);
                }
            }
        }

        let mut decomposer = ToolpathDecomposer::new(session);
        for hole in undrilled {
            for curve in hole.curves() {
                let mut request = ProfileRequest::new("Hole", ToolSide::Inside);
                request.z_top = hole.top_z;
                request.z_bottom = Some(hole.bottom_z);
                request.bottom = BottomStyle::Through;
                request.finish_pass = true;
                decomposer.profile_curve(&curve, &request);
            }
        }
        for curve in &self.curves {
            let mut request = ProfileRequest::new("Shadow Inner", ToolSide::Inside);
            request.bottom = BottomStyle::Through;
            request.finish_pass = true;
            decomposer.profile_curve(curve, &request);
        }
    }
}

fn plan_drill(session: &mut PlanningSession<'_>, hole: &Hole, index: usize) {
    if session.has_failed() {
        return;
    }
    let (slot, tool) = match session.drills_mut().add_if_not_added(index) {
        Ok((slot, tool)) => (slot, tool.clone()),
        Err(err) => {
            session.fail(err);
            return;
        }
    };
    let operation = DrillOperation {
        id: Uuid::new_v4(),
        title: None,
        points: hole.points.clone(),
        slot,
        tool_diameter: tool.diameter,
        top_z: hole.top_z,
        bottom_z: hole.bottom_z,
        peck_depth: tool.rough_step_down,
        feeds: Feeds::roughing(&tool),
    };
    session.emit(Operation::Drill(operation), false);
}
