//! Line/arc boundary curves
//!
//! A [`Curve`] is a sequence of vertices where each vertex carries the bulge of
//! the segment that starts at it (`bulge = tan(sweep / 4)`, zero for a line,
//! positive for an anticlockwise arc). This is the same vertex model the
//! offsetting engine uses, so curves convert to and from offset polylines
//! without loss.

use super::point::{BoundingBox, Point};
use super::ARC_TOLERANCE;
use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Centroid, Coord, Line, LineString, Polygon};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const BULGE_EPSILON: f64 = 1e-9;

/// Curve vertex: position plus bulge of the outgoing segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub pos: Point,
    #[serde(default)]
    pub bulge: f64,
}

impl Vertex {
    pub fn new(x: f64, y: f64, bulge: f64) -> Self {
        Self {
            pos: Point::new(x, y),
            bulge,
        }
    }

    pub fn line(pos: Point) -> Self {
        Self { pos, bulge: 0.0 }
    }

    pub fn is_arc(&self) -> bool {
        self.bulge.abs() > BULGE_EPSILON
    }
}

/// Circle found by [`Curve::as_circle`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point,
    pub radius: f64,
}

impl Circle {
    pub fn diameter(&self) -> f64 {
        self.radius * 2.0
    }
}

/// Arc parameters of one bulged segment
#[derive(Debug, Clone, Copy)]
pub(crate) struct ArcSegment {
    pub center: Point,
    pub radius: f64,
    pub start_angle: f64,
    /// Signed sweep, positive anticlockwise
    pub sweep: f64,
}

impl ArcSegment {
    /// Arc from `start` to `end` with the given bulge, `None` for a degenerate chord
    pub fn from_bulge(start: Point, end: Point, bulge: f64) -> Option<Self> {
        let chord = end - start;
        let chord_len = chord.length();
        if chord_len < 1e-9 || bulge.abs() <= BULGE_EPSILON {
            return None;
        }
        let sweep = 4.0 * bulge.atan();
        let radius = chord_len / (2.0 * (sweep.abs() / 2.0).sin());
        let dist_to_center = radius * (sweep.abs() / 2.0).cos();
        let normal = chord.perpendicular() * (1.0 / chord_len);
        let sign = if bulge > 0.0 { 1.0 } else { -1.0 };
        let mid = start.lerp(end, 0.5);
        let center = mid + normal * (dist_to_center * sign);
        let start_angle = (start.y - center.y).atan2(start.x - center.x);
        Some(Self {
            center,
            radius,
            start_angle,
            sweep,
        })
    }

    pub fn point_at(&self, t: f64) -> Point {
        let angle = self.start_angle + self.sweep * t;
        Point::new(
            self.center.x + self.radius * angle.cos(),
            self.center.y + self.radius * angle.sin(),
        )
    }

    /// Number of chords keeping the sagitta under `tolerance`
    pub fn chord_count(&self, tolerance: f64) -> usize {
        let step = if tolerance < self.radius {
            2.0 * (1.0 - tolerance / self.radius).acos()
        } else {
            PI / 2.0
        };
        // never fewer than eight chords for a full turn
        let step = step.min(PI / 4.0).max(1e-3);
        ((self.sweep.abs() / step).ceil() as usize).clamp(1, 4096)
    }
}

/// Ordered line/arc curve, open or closed
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Curve {
    vertices: Vec<Vertex>,
    closed: bool,
}

impl Curve {
    pub fn new() -> Self {
        Self::default()
    }

    /// Polyline through `points`
    pub fn from_points(points: &[Point], closed: bool) -> Self {
        Self {
            vertices: points.iter().copied().map(Vertex::line).collect(),
            closed,
        }
    }

    pub fn from_vertices(vertices: Vec<Vertex>, closed: bool) -> Self {
        Self { vertices, closed }
    }

    /// Anticlockwise rectangle
    pub fn rectangle(min: Point, max: Point) -> Self {
        Self::from_points(
            &[
                Point::new(min.x, min.y),
                Point::new(max.x, min.y),
                Point::new(max.x, max.y),
                Point::new(min.x, max.y),
            ],
            true,
        )
    }

    /// Anticlockwise circle made of two half arcs, starting at its leftmost point
    pub fn circle(center: Point, radius: f64) -> Self {
        Self {
            vertices: vec![
                Vertex::new(center.x - radius, center.y, 1.0),
                Vertex::new(center.x + radius, center.y, 1.0),
            ],
            closed: true,
        }
    }

    pub fn add_vertex(&mut self, pos: Point, bulge: f64) {
        self.vertices.push(Vertex { pos, bulge });
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn set_closed(&mut self, closed: bool) {
        self.closed = closed;
    }

    pub fn first_point(&self) -> Option<Point> {
        self.vertices.first().map(|v| v.pos)
    }

    /// Segment start vertices paired with their end points
    pub fn segments(&self) -> impl Iterator<Item = (Vertex, Point)> + '_ {
        let n = self.vertices.len();
        let count = if self.closed { n } else { n.saturating_sub(1) };
        (0..count).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n].pos))
    }

    /// Signed enclosed area, positive when anticlockwise; arcs are exact
    pub fn signed_area(&self) -> f64 {
        if self.vertices.len() < 2 {
            return 0.0;
        }
        let mut area = 0.0;
        let n = self.vertices.len();
        for i in 0..n {
            let v = self.vertices[i];
            let end = self.vertices[(i + 1) % n].pos;
            area += 0.5 * v.pos.cross(end);
            if i + 1 < n || self.closed {
                if let Some(arc) = ArcSegment::from_bulge(v.pos, end, v.bulge) {
                    area += 0.5 * arc.radius * arc.radius * (arc.sweep - arc.sweep.sin());
                }
            }
        }
        area
    }

    pub fn is_clockwise(&self) -> bool {
        self.signed_area() < 0.0
    }

    /// Reverse the traversal direction in place
    pub fn reverse(&mut self) {
        *self = self.reversed();
    }

    pub fn reversed(&self) -> Curve {
        let n = self.vertices.len();
        if n < 2 {
            return self.clone();
        }
        let vertices = (0..n)
            .map(|k| {
                let pos = self.vertices[n - 1 - k].pos;
                let bulge = if !self.closed && k == n - 1 {
                    0.0
                } else {
                    -self.vertices[(2 * n - 2 - k) % n].bulge
                };
                Vertex { pos, bulge }
            })
            .collect();
        Curve {
            vertices,
            closed: self.closed,
        }
    }

    /// Line approximation with arc sagitta under `tolerance`.
    /// Closed curves do not repeat their first point.
    pub fn flatten(&self, tolerance: f64) -> Vec<Point> {
        let mut points = Vec::with_capacity(self.vertices.len());
        for (v, end) in self.segments() {
            points.push(v.pos);
            if let Some(arc) = ArcSegment::from_bulge(v.pos, end, v.bulge) {
                let count = arc.chord_count(tolerance);
                for j in 1..count {
                    points.push(arc.point_at(j as f64 / count as f64));
                }
            }
        }
        if !self.closed {
            if let Some(last) = self.vertices.last() {
                points.push(last.pos);
            }
        }
        points
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        for p in self.flatten(ARC_TOLERANCE) {
            bbox.insert(p);
        }
        bbox
    }

    pub fn translate(&mut self, delta: Point) {
        for v in &mut self.vertices {
            v.pos = v.pos + delta;
        }
    }

    /// Test whether this closed curve is a circle within `tolerance`
    pub fn as_circle(&self, tolerance: f64) -> Option<Circle> {
        if !self.closed || self.vertices.len() < 2 {
            return None;
        }

        if self.vertices.iter().all(Vertex::is_arc) {
            let arcs: Vec<ArcSegment> = self
                .segments()
                .filter_map(|(v, end)| ArcSegment::from_bulge(v.pos, end, v.bulge))
                .collect();
            if arcs.len() == self.vertices.len() {
                let first = arcs[0];
                let total_sweep: f64 = arcs.iter().map(|a| a.sweep).sum();
                let same_circle = arcs.iter().all(|a| {
                    a.center.distance(first.center) <= tolerance
                        && (a.radius - first.radius).abs() <= tolerance
                });
                if same_circle && (total_sweep.abs() - 2.0 * PI).abs() < 1e-6 {
                    return Some(Circle {
                        center: first.center,
                        radius: first.radius,
                    });
                }
            }
        }

        let points = self.flatten(tolerance * 0.1);
        if points.len() < 8 {
            return None;
        }
        let ring = LineString::from_iter(points.iter().map(|&p| Coord::from(p)));
        let center = Point::from(Polygon::new(ring, Vec::new()).centroid()?.0);
        let radius = points.iter().map(|p| p.distance(center)).sum::<f64>() / points.len() as f64;
        if radius <= tolerance {
            return None;
        }
        let n = points.len();
        for i in 0..n {
            let a = points[i];
            let b = points[(i + 1) % n];
            if (a.distance(center) - radius).abs() > tolerance {
                return None;
            }
            if (a.lerp(b, 0.5).distance(center) - radius).abs() > tolerance {
                return None;
            }
        }
        Some(Circle { center, radius })
    }

    /// Crossing points with `other`, ordered along this curve
    pub fn intersections(&self, other: &Curve) -> Vec<Point> {
        let theirs: Vec<Line<f64>> = other.to_line_string(ARC_TOLERANCE).lines().collect();

        let mut found: Vec<Point> = Vec::new();
        for ours in self.to_line_string(ARC_TOLERANCE).lines() {
            let start = Point::from(ours.start);
            let mut hits: Vec<Point> = theirs
                .iter()
                .filter_map(|&line| match line_intersection(ours, line)? {
                    LineIntersection::SinglePoint { intersection, .. } => {
                        Some(Point::from(intersection))
                    }
                    LineIntersection::Collinear { .. } => None,
                })
                .collect();
            hits.sort_by(|a, b| a.distance(start).total_cmp(&b.distance(start)));
            for p in hits {
                if found.last().map_or(true, |last| last.distance(p) > 1e-9) {
                    found.push(p);
                }
            }
        }
        found
    }

    /// Flattened path; closed curves repeat their first point at the end
    pub fn to_line_string(&self, tolerance: f64) -> LineString<f64> {
        let mut coords: Vec<Coord<f64>> = self
            .flatten(tolerance)
            .into_iter()
            .map(Coord::from)
            .collect();
        if self.closed {
            if let Some(&first) = coords.first() {
                coords.push(first);
            }
        }
        LineString::new(coords)
    }
}
