//! Parts, stock and the document the planner writes into
//!
//! A [`PrismaticPart`] is a 2.5D solid: a stack of horizontal faces, each a
//! region at a fixed height, above a flat bottom. That is all the planner
//! needs to know about a solid: the flat areas it must machine down to and
//! the silhouette seen from above.

use crate::assigner::ProgramTool;
use crate::operation::Operation;
use anyhow::{bail, Context, Result};
use millplan_core::{BoundingBox, Curve, Point, Region};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Flat area of a part at a fixed height
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Face {
    pub top_z: f64,
    pub region: Region,
}

/// Region machined down to `top_z`
#[derive(Debug, Clone)]
pub struct MachiningLevel {
    pub top_z: f64,
    pub area: Region,
}

/// 3D box of a part
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartBounds {
    pub plan: BoundingBox,
    pub min_z: f64,
    pub max_z: f64,
}

impl PartBounds {
    pub fn depth(&self) -> f64 {
        self.max_z - self.min_z
    }
}

/// 2.5D solid made of horizontal faces above a flat bottom
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrismaticPart {
    pub name: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    pub bottom_z: f64,
    pub faces: Vec<Face>,
}

fn default_visible() -> bool {
    true
}

impl PrismaticPart {
    pub fn new(name: impl Into<String>, bottom_z: f64) -> Self {
        Self {
            name: name.into(),
            visible: true,
            bottom_z,
            faces: Vec::new(),
        }
    }

    pub fn add_face(&mut self, top_z: f64, region: Region) {
        self.faces.push(Face { top_z, region });
    }

    /// Silhouette of the part seen from above
    pub fn shadow(&self) -> Region {
        self.faces
            .iter()
            .fold(Region::empty(), |acc, face| acc.union(&face.region))
    }

    pub fn bounding_box(&self) -> PartBounds {
        let mut plan = BoundingBox::empty();
        let mut max_z = self.bottom_z;
        for face in &self.faces {
            plan.merge(&face.region.bounding_box());
            max_z = max_z.max(face.top_z);
        }
        PartBounds {
            plan,
            min_z: self.bottom_z,
            max_z,
        }
    }

    /// Flat areas to machine, highest first. Faces less than `tolerance`
    /// apart in height are left as separate levels.
    pub fn machining_areas(&self, tolerance: f64) -> Vec<MachiningLevel> {
        let mut levels: Vec<MachiningLevel> = self
            .faces
            .iter()
            .filter(|face| face.top_z > self.bottom_z + tolerance && !face.region.is_empty())
            .map(|face| MachiningLevel {
                top_z: face.top_z,
                area: face.region.clone(),
            })
            .collect();
        levels.sort_by(|a, b| b.top_z.total_cmp(&a.top_z));
        levels
    }

    pub fn translate(&mut self, dx: f64, dy: f64, dz: f64) {
        let delta = Point::new(dx, dy);
        for face in &mut self.faces {
            face.region = face.region.translate(delta);
            face.top_z += dz;
        }
        self.bottom_z += dz;
    }

    /// Read a part description from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read part file {}", path.display()))?;
        let spec: PartSpec = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse part file {}", path.display()))?;
        let part = spec.build()?;
        info!(
            "Loaded part '{}' with {} faces from {}",
            part.name,
            part.faces.len(),
            path.display()
        );
        Ok(part)
    }
}

/// JSON description of a part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartSpec {
    pub name: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub bottom_z: f64,
    pub faces: Vec<FaceSpec>,
}

/// One face: boundaries combined by area, holes cut out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceSpec {
    pub z: f64,
    pub boundaries: Vec<BoundarySpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundarySpec {
    #[serde(flatten)]
    pub shape: ShapeSpec,
    /// Subtract from the face instead of adding to it
    #[serde(default)]
    pub hole: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ShapeSpec {
    Rect { min: [f64; 2], max: [f64; 2] },
    Circle { center: [f64; 2], radius: f64 },
    Polyline { points: Vec<[f64; 2]> },
}

impl ShapeSpec {
    fn to_curve(&self) -> Result<Curve> {
        let curve = match self {
            ShapeSpec::Rect { min, max } => {
                if max[0] <= min[0] || max[1] <= min[1] {
                    bail!("Rectangle has no area: {:?} to {:?}", min, max);
                }
                Curve::rectangle(Point::new(min[0], min[1]), Point::new(max[0], max[1]))
            }
            ShapeSpec::Circle { center, radius } => {
                if *radius <= 0.0 || !radius.is_finite() {
                    bail!("Circle radius must be positive, got {}", radius);
                }
                Curve::circle(Point::new(center[0], center[1]), *radius)
            }
            ShapeSpec::Polyline { points } => {
                if points.len() < 3 {
                    bail!("Polyline needs at least 3 points, got {}", points.len());
                }
                let points: Vec<Point> = points.iter().map(|p| Point::new(p[0], p[1])).collect();
                Curve::from_points(&points, true)
            }
        };
        Ok(curve)
    }
}

impl PartSpec {
    pub fn build(&self) -> Result<PrismaticPart> {
        let mut part = PrismaticPart::new(self.name.clone(), self.bottom_z);
        part.visible = self.visible;
        for face in &self.faces {
            if face.z <= self.bottom_z {
                bail!(
                    "Face at z = {} is not above the bottom z = {}",
                    face.z,
                    self.bottom_z
                );
            }
            let mut region = Region::empty();
            for boundary in &face.boundaries {
                let shape = Region::from_curve(&boundary.shape.to_curve()?);
                region = if boundary.hole {
                    region.subtract(&shape)
                } else {
                    region.union(&shape)
                };
            }
            debug!("Face at z = {} with area {:.3}", face.z, region.area());
            part.add_face(face.z, region);
        }
        Ok(part)
    }
}

/// Sheet the part is cut from, top at z = 0, lower left corner at the origin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stock {
    pub material: String,
    pub width: f64,
    pub height: f64,
    pub thickness: f64,
    pub outline: Region,
}

/// Machining program attached to a document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub tools: Vec<ProgramTool>,
    pub stock: Option<Stock>,
    pub clearance_height: Option<f64>,
    pub operations: Vec<Operation>,
    /// Post-processor output
    pub output: Option<String>,
}

impl Program {
    /// Remove tools, stock, operations and output.
    pub fn clear(&mut self) {
        *self = Program::default();
    }

    pub fn tool_in_slot(&self, slot: u32) -> Option<&ProgramTool> {
        self.tools.iter().find(|tool| tool.slot == slot)
    }
}

#[derive(Debug, Clone)]
struct HistoryEntry {
    label: String,
    solids: Vec<PrismaticPart>,
    program: Program,
}

/// Solids and the program built for them, with undo snapshots
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub solids: Vec<PrismaticPart>,
    pub program: Program,
    history: Vec<HistoryEntry>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_solid(solid: PrismaticPart) -> Self {
        Self {
            solids: vec![solid],
            ..Self::default()
        }
    }

    /// Index of the first visible solid
    pub fn first_visible_solid(&self) -> Option<usize> {
        self.solids.iter().position(|solid| solid.visible)
    }

    /// Snapshot the document before a group of changes.
    pub fn start_history(&mut self, label: impl Into<String>) {
        let label = label.into();
        debug!("Starting history entry '{}'", label);
        self.history.push(HistoryEntry {
            label,
            solids: self.solids.clone(),
            program: self.program.clone(),
        });
    }

    /// Restore the latest snapshot, returning its label.
    pub fn undo(&mut self) -> Option<String> {
        let entry = self.history.pop()?;
        self.solids = entry.solids;
        self.program = entry.program;
        info!("Undid '{}'", entry.label);
        Some(entry.label)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stepped_part() -> PrismaticPart {
        let mut part = PrismaticPart::new("step", 0.0);
        let base = Region::rectangle(Point::new(0.0, 0.0), Point::new(50.0, 20.0));
        let top = Region::rectangle(Point::new(0.0, 0.0), Point::new(30.0, 20.0));
        part.add_face(6.0, top.clone());
        part.add_face(3.0, base.subtract(&top));
        part
    }

    #[test]
    fn test_machining_areas_highest_first() {
        let part = stepped_part();
        let levels = part.machining_areas(0.1);
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].top_z, 6.0);
        assert_eq!(levels[1].top_z, 3.0);
        assert!((levels[1].area.area() - 400.0).abs() < 1e-6);
    }

    #[test]
    fn test_shadow_and_bounds() {
        let part = stepped_part();
        assert!((part.shadow().area() - 1000.0).abs() < 1e-6);
        let bounds = part.bounding_box();
        assert_eq!(bounds.depth(), 6.0);
        assert_eq!(bounds.plan.width(), 50.0);
    }

    #[test]
    fn test_translate_moves_faces_and_bottom() {
        let mut part = stepped_part();
        part.translate(20.0, 3.0, -6.0);
        let bounds = part.bounding_box();
        assert_eq!(bounds.plan.min_x, 20.0);
        assert_eq!(bounds.plan.min_y, 3.0);
        assert_eq!(bounds.min_z, -6.0);
        assert_eq!(bounds.max_z, 0.0);
    }

    #[test]
    fn test_part_spec_from_json() {
        let json = r#"{
            "name": "plate",
            "faces": [
                { "z": 6.0, "boundaries": [
                    { "shape": "rect", "min": [0, 0], "max": [100, 40] },
                    { "shape": "circle", "center": [20, 20], "radius": 5, "hole": true }
                ] }
            ]
        }"#;
        let spec: PartSpec = serde_json::from_str(json).unwrap();
        let part = spec.build().unwrap();
        assert!(part.visible);
        let shadow = part.shadow();
        assert_eq!(shadow.num_curves(), 2);
        assert!((shadow.area() - (4000.0 - std::f64::consts::PI * 25.0)).abs() < 0.2);
    }

    #[test]
    fn test_part_spec_rejects_bad_shapes() {
        let json = r#"{ "name": "bad", "faces": [
            { "z": 6.0, "boundaries": [ { "shape": "circle", "center": [0, 0], "radius": -1 } ] }
        ] }"#;
        let spec: PartSpec = serde_json::from_str(json).unwrap();
        assert!(spec.build().is_err());
    }

    #[test]
    fn test_undo_restores_snapshot() {
        let mut doc = Document::with_solid(stepped_part());
        doc.start_history("Create Operations");
        doc.solids[0].translate(1.0, 1.0, 1.0);
        doc.program.clearance_height = Some(5.0);

        assert_eq!(doc.undo().as_deref(), Some("Create Operations"));
        assert_eq!(doc.solids[0].bottom_z, 0.0);
        assert!(doc.program.clearance_height.is_none());
        assert!(doc.undo().is_none());
    }
}
