//! Loop offsetting through cavalier_contours

use super::curve::{Curve, Vertex};
use cavalier_contours::polyline::{PlineSource, PlineSourceMut, PlineVertex, Polyline};
use std::panic;
use tracing::warn;

/// Drop repeated vertices, including a closing vertex equal to the first
fn clean_loop(curve: &Curve) -> Vec<Vertex> {
    let mut cleaned: Vec<Vertex> = Vec::with_capacity(curve.len());
    for v in curve.vertices() {
        match cleaned.last_mut() {
            Some(last) if last.pos.distance(v.pos) < 1e-9 => last.bulge = v.bulge,
            _ => cleaned.push(*v),
        }
    }
    while cleaned.len() > 1 {
        let first = cleaned[0].pos;
        match cleaned.last() {
            Some(last) if last.pos.distance(first) < 1e-9 => {
                cleaned.pop();
            }
            _ => break,
        }
    }
    cleaned
}

pub(crate) fn curve_to_polyline(curve: &Curve) -> Polyline<f64> {
    let mut pline = Polyline::new();
    for v in clean_loop(curve) {
        pline.add_vertex(PlineVertex::new(v.pos.x, v.pos.y, v.bulge));
    }
    pline.set_is_closed(curve.is_closed());
    pline
}

pub(crate) fn polyline_to_curve(pline: &Polyline<f64>) -> Curve {
    let vertices = (0..pline.vertex_count())
        .map(|i| {
            let v = pline.at(i);
            Vertex::new(v.x, v.y, v.bulge)
        })
        .collect();
    Curve::from_vertices(vertices, pline.is_closed())
}

/// Offset a closed loop that has material on its left.
///
/// Positive `grow` moves the loop away from the material side's interior, i.e.
/// outer loops get bigger and hole loops get smaller.
pub(crate) fn offset_loop(curve: &Curve, grow: f64) -> Vec<Curve> {
    let pline = curve_to_polyline(curve);
    if pline.vertex_count() < 2 {
        return Vec::new();
    }

    let result = panic::catch_unwind(panic::AssertUnwindSafe(|| pline.parallel_offset(-grow)));
    match result {
        Ok(offsets) => offsets
            .iter()
            .filter(|p| p.vertex_count() >= 2)
            .map(polyline_to_curve)
            .collect(),
        Err(_) => {
            warn!(
                "Panic during parallel offset of {} vertex loop by {:.3}, keeping loop unchanged",
                pline.vertex_count(),
                grow
            );
            vec![curve.clone()]
        }
    }
}
