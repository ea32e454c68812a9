//! Holding tab placement
//!
//! Tabs sit where horizontal scan lines first meet the cutter centre path of an
//! outside profile. Short parts get one pair on the midline, taller parts one
//! pair near the top edge and one near the bottom edge.

use crate::operation::Tab;
use millplan_core::{BoundingBox, Curve, Point, Region};
use millplan_settings::PlannerConfig;
use tracing::debug;

/// Tab geometry and placement margins
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TabSettings {
    pub width: f64,
    pub height: f64,
    pub angle: f64,
    /// Distance of the scan lines from the top and bottom of the box
    pub y_margin: f64,
}

impl TabSettings {
    pub fn from_config(config: &PlannerConfig) -> Self {
        Self {
            width: config.tag_width,
            height: config.tag_height,
            angle: config.tag_angle,
            y_margin: config.tag_y_margin,
        }
    }

    fn tab_at(&self, position: Point) -> Tab {
        Tab {
            position,
            width: self.width,
            height: self.height,
            angle: self.angle,
        }
    }
}

/// Places tabs on a closed curve profiled with a cutter of `cutter_radius`.
pub fn plan_tabs(curve: &Curve, cutter_radius: f64, settings: &TabSettings) -> Vec<Tab> {
    if !curve.is_closed() {
        debug!("Skipping tabs on open curve");
        return Vec::new();
    }

    let path = Region::from_curve(curve).offset(cutter_radius);
    let boundaries = path.curves();
    let bbox = path.bounding_box();
    if bbox.is_empty() {
        return Vec::new();
    }

    scan_lines(&bbox, settings)
        .into_iter()
        .filter_map(|(start, end)| {
            let hit = first_hit(&boundaries, start, end);
            if hit.is_none() {
                debug!(
                    "No tab intersection for scan line at y = {:.3}",
                    start.y
                );
            }
            hit
        })
        .map(|position| settings.tab_at(position))
        .collect()
}

/// Directed horizontal scan lines across the box.
pub fn scan_lines(bbox: &BoundingBox, settings: &TabSettings) -> Vec<(Point, Point)> {
    let left = bbox.min_x - 1.0;
    let right = bbox.max_x + 1.0;

    let heights = if bbox.height() < 2.0 * settings.y_margin + settings.width {
        vec![(bbox.min_y + bbox.max_y) * 0.5]
    } else {
        vec![bbox.max_y - settings.y_margin, bbox.min_y + settings.y_margin]
    };

    heights
        .into_iter()
        .flat_map(|y| {
            [
                (Point::new(left, y), Point::new(right, y)),
                (Point::new(right, y), Point::new(left, y)),
            ]
        })
        .collect()
}

fn first_hit(boundaries: &[Curve], start: Point, end: Point) -> Option<Point> {
    let line = Curve::from_points(&[start, end], false);
    boundaries
        .iter()
        .flat_map(|boundary| line.intersections(boundary))
        .min_by(|a, b| a.distance(start).total_cmp(&b.distance(start)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> TabSettings {
        TabSettings {
            width: 5.0,
            height: 1.0,
            angle: 45.0,
            y_margin: 4.0,
        }
    }

    #[test]
    fn test_short_box_gets_midline_tabs() {
        let curve = Curve::rectangle(Point::new(0.0, 0.0), Point::new(100.0, 8.0));
        let tabs = plan_tabs(&curve, 0.0, &settings());

        assert_eq!(tabs.len(), 2);
        for tab in &tabs {
            assert!((tab.position.y - 4.0).abs() < 1e-6);
            assert_eq!(tab.width, 5.0);
            assert_eq!(tab.angle, 45.0);
        }
        assert!((tabs[0].position.x - 0.0).abs() < 1e-6);
        assert!((tabs[1].position.x - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_tall_box_gets_four_tabs() {
        let curve = Curve::rectangle(Point::new(0.0, 0.0), Point::new(100.0, 40.0));
        let tabs = plan_tabs(&curve, 3.0, &settings());

        assert_eq!(tabs.len(), 4);
        // Cutter path box runs from -3 to 43
        assert!((tabs[0].position.y - 39.0).abs() < 1e-6);
        assert!((tabs[2].position.y - 1.0).abs() < 1e-6);
        assert!((tabs[0].position.x + 3.0).abs() < 1e-6);
        assert!((tabs[1].position.x - 103.0).abs() < 1e-6);
    }

    #[test]
    fn test_scan_line_directions() {
        let bbox = BoundingBox::from_corners(Point::new(0.0, 0.0), Point::new(10.0, 6.0));
        let lines = scan_lines(&bbox, &settings());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].0, Point::new(-1.0, 3.0));
        assert_eq!(lines[1].0, Point::new(11.0, 3.0));
    }

    #[test]
    fn test_open_curve_has_no_tabs() {
        let curve = Curve::from_points(&[Point::new(0.0, 0.0), Point::new(10.0, 0.0)], false);
        assert!(plan_tabs(&curve, 1.0, &settings()).is_empty());
    }
}
