//! Areas bounded by closed curves
//!
//! A [`Region`] is an immutable value: every operation returns a new region.
//! Outer loops run anticlockwise, holes clockwise; which hole belongs to which
//! outer loop is implied by containment.

use super::curve::Curve;
use super::offset::offset_loop;
use super::point::{BoundingBox, Point};
use super::{ARC_TOLERANCE, AREA_EPSILON};
use crate::error::GeometryError;
use geo::{
    Area, BooleanOps, Contains, Coord, LineLocatePoint, LineString, MultiLineString,
    MultiPolygon, Polygon,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::panic;
use tracing::{debug, warn};

/// Grid used to snap coordinates when a boolean operation has to be retried
const SNAP_GRID: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
enum BoolOp {
    Union,
    Intersect,
    Subtract,
}

/// 2D area made of outer loops and holes
#[derive(Debug, Clone)]
pub struct Region {
    polygons: MultiPolygon<f64>,
}

impl Default for Region {
    fn default() -> Self {
        Self::empty()
    }
}

impl Region {
    pub fn empty() -> Self {
        Self {
            polygons: MultiPolygon::new(Vec::new()),
        }
    }

    fn from_multi(polygons: MultiPolygon<f64>) -> Self {
        Self {
            polygons: clean_multi(polygons),
        }
    }

    /// Area enclosed by one closed curve, whatever its winding
    pub fn from_curve(curve: &Curve) -> Self {
        match curve_to_polygon(curve) {
            Some(polygon) => Self::from_multi(MultiPolygon::new(vec![polygon])),
            None => Self::empty(),
        }
    }

    /// Region from a set of loops; anticlockwise loops add area, clockwise
    /// loops remove it. Loops are applied largest first so nesting resolves.
    pub fn from_curves(curves: &[Curve]) -> Self {
        let mut loops: Vec<&Curve> = curves
            .iter()
            .filter(|c| {
                if !c.is_closed() {
                    debug!("Ignoring open curve with {} vertices in region", c.len());
                }
                c.is_closed()
            })
            .collect();
        loops.sort_by(|a, b| b.signed_area().abs().total_cmp(&a.signed_area().abs()));

        let mut region = Region::empty();
        for curve in loops {
            let piece = Region::from_curve(curve);
            region = if curve.is_clockwise() {
                region.subtract(&piece)
            } else {
                region.union(&piece)
            };
        }
        region
    }

    pub fn rectangle(min: Point, max: Point) -> Self {
        Self::from_curve(&Curve::rectangle(min, max))
    }

    pub fn circle(center: Point, radius: f64) -> Self {
        Self::from_curve(&Curve::circle(center, radius))
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.0.is_empty()
    }

    pub fn area(&self) -> f64 {
        self.polygons.unsigned_area()
    }

    /// Number of boundary loops, outer and holes
    pub fn num_curves(&self) -> usize {
        self.polygons
            .iter()
            .map(|p| 1 + p.interiors().len())
            .sum()
    }

    /// Boundary loops: outer loops anticlockwise, holes clockwise
    pub fn curves(&self) -> Vec<Curve> {
        let mut curves = Vec::with_capacity(self.num_curves());
        for polygon in self.polygons.iter() {
            let mut outer = ring_to_curve(polygon.exterior());
            if outer.is_clockwise() {
                outer.reverse();
            }
            curves.push(outer);
            for interior in polygon.interiors() {
                let mut hole = ring_to_curve(interior);
                if !hole.is_clockwise() {
                    hole.reverse();
                }
                curves.push(hole);
            }
        }
        curves
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        for polygon in self.polygons.iter() {
            for c in polygon.exterior().coords() {
                bbox.insert(Point::new(c.x, c.y));
            }
        }
        bbox
    }

    pub fn union(&self, other: &Region) -> Region {
        self.try_union(other).unwrap_or_else(|err| {
            warn!("{}, keeping the first operand", err);
            self.clone()
        })
    }

    pub fn intersect(&self, other: &Region) -> Region {
        self.try_intersect(other).unwrap_or_else(|err| {
            warn!("{}, result treated as empty", err);
            Region::empty()
        })
    }

    pub fn subtract(&self, other: &Region) -> Region {
        self.try_subtract(other).unwrap_or_else(|err| {
            warn!("{}, keeping the first operand", err);
            self.clone()
        })
    }

    /// Union that reports a failed boolean instead of approximating it
    pub fn try_union(&self, other: &Region) -> Result<Region, GeometryError> {
        if other.is_empty() {
            return Ok(self.clone());
        }
        if self.is_empty() {
            return Ok(other.clone());
        }
        self.boolean(other, BoolOp::Union)
    }

    pub fn try_intersect(&self, other: &Region) -> Result<Region, GeometryError> {
        if self.is_empty() || other.is_empty() {
            return Ok(Region::empty());
        }
        self.boolean(other, BoolOp::Intersect)
    }

    pub fn try_subtract(&self, other: &Region) -> Result<Region, GeometryError> {
        if self.is_empty() || other.is_empty() {
            return Ok(self.clone());
        }
        self.boolean(other, BoolOp::Subtract)
    }

    fn boolean(&self, other: &Region, op: BoolOp) -> Result<Region, GeometryError> {
        let run = |a: &MultiPolygon<f64>, b: &MultiPolygon<f64>| {
            panic::catch_unwind(panic::AssertUnwindSafe(|| match op {
                BoolOp::Union => a.union(b),
                BoolOp::Intersect => a.intersection(b),
                BoolOp::Subtract => a.difference(b),
            }))
        };

        if let Ok(result) = run(&self.polygons, &other.polygons) {
            return Ok(Region::from_multi(result));
        }

        debug!("Boolean {:?} panicked, retrying on snapped coordinates", op);
        let a = snap_multi(&self.polygons);
        let b = snap_multi(&other.polygons);
        run(&a, &b)
            .map(Region::from_multi)
            .map_err(|_| GeometryError::BooleanFailed {
                operation: format!("{:?}", op).to_lowercase(),
            })
    }

    /// Offset every boundary; positive distances grow the area, negative shrink it
    pub fn offset(&self, distance: f64) -> Region {
        if self.is_empty() || distance == 0.0 {
            return self.clone();
        }

        let mut result = Region::empty();
        for polygon in self.polygons.iter() {
            let mut outer = ring_to_curve(polygon.exterior());
            if outer.is_clockwise() {
                outer.reverse();
            }
            let solid = offset_loop(&outer, distance)
                .iter()
                .fold(Region::empty(), |acc, c| acc.union(&Region::from_curve(c)));
            if solid.is_empty() {
                continue;
            }

            let mut holes = Region::empty();
            for interior in polygon.interiors() {
                let mut hole = ring_to_curve(interior);
                if !hole.is_clockwise() {
                    hole.reverse();
                }
                for c in offset_loop(&hole, distance) {
                    holes = holes.union(&Region::from_curve(&c));
                }
            }

            result = result.union(&solid.subtract(&holes));
        }
        result
    }

    /// Band of width `2 * distance` around every boundary
    pub fn thicken(&self, distance: f64) -> Region {
        self.offset(distance).subtract(&self.offset(-distance))
    }

    /// Remove duplicate and collinear vertices and sliver loops before further
    /// boolean work
    pub fn normalize(&self) -> Region {
        let polygons = self
            .polygons
            .iter()
            .filter_map(|polygon| {
                let exterior = simplify_ring(polygon.exterior())?;
                let interiors = polygon
                    .interiors()
                    .iter()
                    .filter_map(simplify_ring)
                    .collect();
                Some(Polygon::new(exterior, interiors))
            })
            .collect();
        Region::from_multi(MultiPolygon::new(polygons))
    }

    /// Connected components, each with its own holes
    pub fn split(&self) -> Vec<Region> {
        self.polygons
            .iter()
            .map(|p| Region {
                polygons: MultiPolygon::new(vec![p.clone()]),
            })
            .collect()
    }

    pub fn translate(&self, delta: Point) -> Region {
        let moved = self
            .polygons
            .iter()
            .map(|polygon| {
                let shift = |ring: &LineString<f64>| {
                    LineString::new(
                        ring.coords()
                            .map(|c| Coord {
                                x: c.x + delta.x,
                                y: c.y + delta.y,
                            })
                            .collect(),
                    )
                };
                Polygon::new(
                    shift(polygon.exterior()),
                    polygon.interiors().iter().map(shift).collect(),
                )
            })
            .collect();
        Region {
            polygons: MultiPolygon::new(moved),
        }
    }

    /// Strictly inside; points on a boundary are not contained
    pub fn contains_point(&self, p: Point) -> bool {
        self.polygons.contains(&geo::Point::from(Coord::from(p)))
    }

    /// Pieces of `curve` lying inside this region, in curve order
    pub fn inside_curves(&self, curve: &Curve) -> Vec<Curve> {
        let path = curve.to_line_string(ARC_TOLERANCE);
        if self.is_empty() || path.0.len() < 2 {
            return Vec::new();
        }
        let clipped = self
            .polygons
            .clip(&MultiLineString::new(vec![path.clone()]), false);

        let locate = |p: Point| path.line_locate_point(&geo::Point::from(Coord::from(p)));
        let mut pieces: Vec<(f64, Vec<Point>)> = Vec::new();
        for line in clipped {
            let mut points: Vec<Point> = line.coords().map(|&c| Point::from(c)).collect();
            if points.len() < 2 {
                continue;
            }
            // the clipper does not keep the traversal direction
            let (p, q) = (points[0].lerp(points[1], 0.25), points[0].lerp(points[1], 0.75));
            if let (Some(a), Some(b)) = (locate(p), locate(q)) {
                if b < a {
                    points.reverse();
                }
            }
            let at = locate(points[0]).unwrap_or(0.0);
            pieces.push((at, points));
        }
        pieces.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut joined: Vec<Vec<Point>> = Vec::new();
        for (_, points) in pieces {
            match joined.last_mut() {
                Some(last) if last.last().is_some_and(|&end| end.distance(points[0]) < 1e-9) => {
                    last.extend(points.into_iter().skip(1));
                }
                _ => joined.push(points),
            }
        }

        let seam = Point::from(path.0[0]);
        if curve.is_closed() && joined.len() >= 2 {
            let ends_at_seam = joined
                .last()
                .and_then(|p| p.last())
                .is_some_and(|&end| end.distance(seam) < 1e-9);
            let wraps = ends_at_seam && joined[0][0].distance(seam) < 1e-9;
            if wraps {
                if let Some(mut tail) = joined.pop() {
                    tail.extend(joined[0].iter().skip(1));
                    joined[0] = tail;
                }
            }
        }

        joined
            .into_iter()
            .map(|mut points| {
                let ring = curve.is_closed()
                    && points.len() > 3
                    && points[0].distance(points[points.len() - 1]) < 1e-9;
                if ring {
                    points.pop();
                }
                Curve::from_points(&points, ring)
            })
            .collect()
    }

    /// Largest cutter diameter whose centre still fits somewhere in the region,
    /// found by bisection to within `tolerance`
    pub fn max_cutter_diameter(&self, tolerance: f64) -> Option<f64> {
        if self.is_empty() || tolerance <= 0.0 {
            return None;
        }
        if self.offset(-tolerance * 0.5).is_empty() {
            return None;
        }
        let bbox = self.bounding_box();
        let mut lo = tolerance;
        let mut hi = bbox.width().min(bbox.height()) + tolerance;
        while hi - lo > tolerance {
            let mid = (lo + hi) * 0.5;
            if self.offset(-mid * 0.5).is_empty() {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        Some(lo)
    }
}

impl Serialize for Region {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.curves().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Region {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let curves = Vec::<Curve>::deserialize(deserializer)?;
        Ok(Region::from_curves(&curves))
    }
}

fn ring_to_curve(ring: &LineString<f64>) -> Curve {
    let mut points: Vec<Point> = ring.coords().map(|c| Point::new(c.x, c.y)).collect();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    Curve::from_points(&points, true)
}

fn curve_to_polygon(curve: &Curve) -> Option<Polygon<f64>> {
    let mut points = curve.flatten(ARC_TOLERANCE);
    if points.len() < 3 || points.iter().any(|p| !p.is_finite()) {
        return None;
    }
    if curve.signed_area() < 0.0 {
        points.reverse();
    }
    let coords = points.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
    Some(Polygon::new(LineString::new(coords), Vec::new()))
}

fn ring_area(ring: &LineString<f64>) -> f64 {
    Polygon::new(ring.clone(), Vec::new()).unsigned_area()
}

fn simplify_ring(ring: &LineString<f64>) -> Option<LineString<f64>> {
    let mut points: Vec<Coord<f64>> = Vec::new();
    for c in ring.coords() {
        if points
            .last()
            .map_or(true, |last| (last.x - c.x).hypot(last.y - c.y) > SNAP_GRID)
        {
            points.push(*c);
        }
    }
    while points.len() > 1 {
        let (first, last) = (points[0], points[points.len() - 1]);
        if (first.x - last.x).hypot(first.y - last.y) <= SNAP_GRID {
            points.pop();
        } else {
            break;
        }
    }

    // drop vertices lying on the line through their neighbours
    let mut changed = true;
    while changed && points.len() > 3 {
        changed = false;
        let n = points.len();
        for i in 0..n {
            let prev = points[(i + n - 1) % n];
            let here = points[i];
            let next = points[(i + 1) % n];
            let (dx, dy) = (next.x - prev.x, next.y - prev.y);
            let span = dx.hypot(dy);
            let deviation = if span > 0.0 {
                ((here.x - prev.x) * dy - (here.y - prev.y) * dx).abs() / span
            } else {
                0.0
            };
            if deviation < 1e-7 {
                points.remove(i);
                changed = true;
                break;
            }
        }
    }

    if points.len() < 3 {
        return None;
    }
    let ring = LineString::new(points);
    if ring_area(&ring) < AREA_EPSILON {
        return None;
    }
    Some(ring)
}

fn snap_multi(polygons: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    let snap = |ring: &LineString<f64>| {
        LineString::new(
            ring.coords()
                .map(|c| Coord {
                    x: (c.x / SNAP_GRID).round() * SNAP_GRID,
                    y: (c.y / SNAP_GRID).round() * SNAP_GRID,
                })
                .collect(),
        )
    };
    MultiPolygon::new(
        polygons
            .iter()
            .map(|p| Polygon::new(snap(p.exterior()), p.interiors().iter().map(snap).collect()))
            .collect(),
    )
}

/// Drop slivers left over by boolean operations
fn clean_multi(polygons: MultiPolygon<f64>) -> MultiPolygon<f64> {
    let kept = polygons
        .into_iter()
        .filter(|p| ring_area(p.exterior()) >= AREA_EPSILON)
        .map(|p| {
            let (exterior, interiors) = p.into_inner();
            let interiors = interiors
                .into_iter()
                .filter(|ring| ring_area(ring) >= AREA_EPSILON)
                .collect();
            Polygon::new(exterior, interiors)
        })
        .filter(|p| p.unsigned_area() >= AREA_EPSILON)
        .collect();
    MultiPolygon::new(kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: f64, max: f64) -> Region {
        Region::rectangle(Point::new(min, min), Point::new(max, max))
    }

    #[test]
    fn test_boolean_areas() {
        let a = square(0.0, 10.0);
        let b = Region::rectangle(Point::new(5.0, 0.0), Point::new(15.0, 10.0));
        assert!((a.union(&b).area() - 150.0).abs() < 1e-6);
        assert!((a.intersect(&b).area() - 50.0).abs() < 1e-6);
        assert!((a.subtract(&b).area() - 50.0).abs() < 1e-6);
        assert!(a.subtract(&square(-1.0, 11.0)).is_empty());
    }

    #[test]
    fn test_from_curves_respects_winding() {
        let outer = Curve::rectangle(Point::new(0.0, 0.0), Point::new(20.0, 20.0));
        let hole = Curve::circle(Point::new(10.0, 10.0), 3.0).reversed();
        let region = Region::from_curves(&[hole, outer]);
        assert_eq!(region.num_curves(), 2);
        let expected = 400.0 - std::f64::consts::PI * 9.0;
        assert!((region.area() - expected).abs() < 0.2);

        let curves = region.curves();
        assert!(!curves[0].is_clockwise());
        assert!(curves[1].is_clockwise());
        assert!(curves[1].as_circle(0.1).is_some());
    }

    #[test]
    fn test_offset_grow_and_shrink() {
        let region = square(0.0, 10.0);
        let shrunk = region.offset(-2.0);
        assert!((shrunk.area() - 36.0).abs() < 1e-6);
        let grown = region.offset(1.0);
        let expected = 100.0 + 4.0 * 10.0 + std::f64::consts::PI;
        assert!((grown.area() - expected).abs() < 0.1);
        assert!(region.offset(-5.5).is_empty());
    }

    #[test]
    fn test_offset_shrinks_holes_when_growing() {
        let outer = Curve::rectangle(Point::new(0.0, 0.0), Point::new(20.0, 20.0));
        let hole = Curve::rectangle(Point::new(8.0, 8.0), Point::new(12.0, 12.0)).reversed();
        let region = Region::from_curves(&[outer, hole]);
        assert_eq!(region.offset(3.0).num_curves(), 1);
        assert_eq!(region.offset(1.0).num_curves(), 2);
    }

    #[test]
    fn test_thicken_makes_band() {
        let region = square(0.0, 10.0);
        let band = region.thicken(0.5);
        assert!(band.contains_point(Point::new(0.0, 5.0)));
        assert!(!band.contains_point(Point::new(5.0, 5.0)));
        assert_eq!(band.num_curves(), 2);
    }

    #[test]
    fn test_split_components() {
        let two = square(0.0, 1.0).union(&square(5.0, 6.0));
        let parts = two.split();
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|p| (p.area() - 1.0).abs() < 1e-9));
    }

    #[test]
    fn test_normalize_drops_collinear_points() {
        let curve = Curve::from_points(
            &[
                Point::new(0.0, 0.0),
                Point::new(5.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(0.0, 10.0),
            ],
            true,
        );
        let region = Region::from_curve(&curve).normalize();
        assert_eq!(region.curves()[0].len(), 4);
        assert!((region.area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_inside_curves_clips_to_region() {
        let region = square(0.0, 10.0);
        let line = Curve::from_points(&[Point::new(-5.0, 5.0), Point::new(15.0, 5.0)], false);
        let inside = region.inside_curves(&line);
        assert_eq!(inside.len(), 1);
        let bbox = inside[0].bounding_box();
        assert!((bbox.min_x - 0.0).abs() < 1e-9);
        assert!((bbox.max_x - 10.0).abs() < 1e-9);

        let loop_inside = Curve::rectangle(Point::new(2.0, 2.0), Point::new(4.0, 4.0));
        let kept = region.inside_curves(&loop_inside);
        assert_eq!(kept.len(), 1);
        assert!(kept[0].is_closed());
    }

    #[test]
    fn test_inside_curves_follow_curve_order() {
        let region = square(0.0, 10.0);
        let band = Curve::rectangle(Point::new(-5.0, 2.0), Point::new(15.0, 8.0));
        let inside = region.inside_curves(&band);
        assert_eq!(inside.len(), 2);
        assert!(inside.iter().all(|c| !c.is_closed()));

        let bottom = inside[0].vertices();
        assert!(bottom[0].pos.distance(Point::new(0.0, 2.0)) < 1e-9);
        assert!(bottom[bottom.len() - 1].pos.distance(Point::new(10.0, 2.0)) < 1e-9);
        let top = inside[1].vertices();
        assert!(top[0].pos.distance(Point::new(10.0, 8.0)) < 1e-9);
        assert!(top[top.len() - 1].pos.distance(Point::new(0.0, 8.0)) < 1e-9);
    }

    #[test]
    fn test_boundary_points_are_not_contained() {
        let region = square(0.0, 10.0);
        assert!(region.contains_point(Point::new(5.0, 5.0)));
        assert!(!region.contains_point(Point::new(10.0, 5.0)));
        assert!(!region.contains_point(Point::new(0.0, 0.0)));
        assert!(!region.contains_point(Point::new(11.0, 5.0)));
    }

    #[test]
    fn test_max_cutter_diameter() {
        let slot = Region::rectangle(Point::new(0.0, 0.0), Point::new(50.0, 8.0));
        let d = slot.max_cutter_diameter(0.05).unwrap();
        assert!((d - 8.0).abs() <= 0.1);
        assert!(Region::empty().max_cutter_diameter(0.1).is_none());
    }

    #[test]
    fn test_translate_and_bounding_box() {
        let region = square(0.0, 10.0).translate(Point::new(3.0, -2.0));
        let bbox = region.bounding_box();
        assert_eq!(bbox.min(), Point::new(3.0, -2.0));
        assert_eq!(bbox.max(), Point::new(13.0, 8.0));
    }
}
