//! Hit testing: pixel position → drawing / handle lookup.
//!
//! Works on the store's drawings directly (not on attached primitives) and
//! re-derives geometry through the bridge, so results always match what the
//! current frame shows. Later drawings paint on top, so they win.

use crate::geometry::{channel_geometry, distance_to_segment, handle_positions, horizontal_y, point_in_quad, ray_geometry};
use cm_core::{CoordinateBridge, Drawing, DrawingId, DrawingKind};
use kurbo::Point;

/// Does `pos` touch the body of `drawing`?
///
/// - horizontal line: vertical pixel distance to its y
/// - ray: distance to the edge-extended segment
/// - channel: distance to either boundary line, or anywhere inside the band
pub fn hit_test_drawing(drawing: &Drawing, bridge: &dyn CoordinateBridge, pos: Point, tolerance: f64) -> bool {
    match drawing.kind {
        DrawingKind::HorizontalLine => {
            horizontal_y(&drawing.points, bridge).is_some_and(|y| (pos.y - y).abs() <= tolerance)
        }
        DrawingKind::Ray => ray_geometry(&drawing.points, bridge)
            .is_some_and(|(a, b)| distance_to_segment(pos, a, b) <= tolerance),
        DrawingKind::ParallelChannel => {
            let Some(g) = channel_geometry(&drawing.points, &drawing.style, bridge) else {
                return false;
            };
            distance_to_segment(pos, g.line1.0, g.line1.1) <= tolerance
                || distance_to_segment(pos, g.line2.0, g.line2.1) <= tolerance
                || point_in_quad(pos, &g.quad())
        }
    }
}

/// Index of the handle of `drawing` under `pos`, nearest first.
pub fn hit_test_handle(drawing: &Drawing, bridge: &dyn CoordinateBridge, pos: Point, radius: f64) -> Option<usize> {
    let handles = handle_positions(drawing.kind, &drawing.points, bridge)?;
    handles
        .iter()
        .enumerate()
        .map(|(i, h)| (i, h.distance(pos)))
        .filter(|(_, d)| *d <= radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// Topmost drawing whose body is under `pos`.
pub fn hit_test(drawings: &[Drawing], bridge: &dyn CoordinateBridge, pos: Point, tolerance: f64) -> Option<DrawingId> {
    drawings
        .iter()
        .rev()
        .find(|d| hit_test_drawing(d, bridge, pos, tolerance))
        .map(|d| d.id)
}
