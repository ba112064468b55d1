//! Control-point overlay for the selected drawing.

use crate::frame::{RenderFrame, Shape};
use crate::geometry::handle_positions;
use crate::primitive::{Primitive, RetryBudget};
use cm_core::{Color, CoordinateBridge, DrawingKind, DrawingPoint, DrawingStyle, Points};

const HANDLE_FILL: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);

/// Draws one circle per handle of a drawing. Positions come from
/// [`handle_positions`], the same routine hit testing uses.
pub struct HandleOverlayPrimitive {
    kind: DrawingKind,
    points: Points,
    accent: Color,
    radius: f64,
    retry: RetryBudget,
}

impl HandleOverlayPrimitive {
    pub fn new(kind: DrawingKind, points: &[DrawingPoint], accent: Color, max_retries: u32) -> Self {
        Self {
            kind,
            points: Points::from_slice(points),
            accent,
            radius: 5.0,
            retry: RetryBudget::new(max_retries),
        }
    }

    pub fn kind(&self) -> DrawingKind {
        self.kind
    }
}

impl Primitive for HandleOverlayPrimitive {
    fn points(&self) -> &[DrawingPoint] {
        &self.points
    }

    fn update_points(&mut self, points: &[DrawingPoint]) {
        self.points = Points::from_slice(points);
        self.retry.reset();
    }

    fn update_style(&mut self, style: &DrawingStyle) {
        self.accent = style.line_color;
    }

    fn render(&mut self, bridge: &dyn CoordinateBridge) -> Option<RenderFrame> {
        if self.points.len() != self.kind.required_points() {
            return None;
        }
        let Some(handles) = handle_positions(self.kind, &self.points, bridge) else {
            self.retry.spend();
            return None;
        };
        self.retry.reset();
        Some(RenderFrame {
            shapes: handles
                .into_iter()
                .map(|center| Shape::Handle {
                    center,
                    radius: self.radius,
                    fill: HANDLE_FILL,
                    stroke: self.accent,
                })
                .collect(),
        })
    }

    fn wants_redraw(&self) -> bool {
        self.retry.pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cm_core::testing::FakeBridge;
    use kurbo::Point;

    #[test]
    fn one_circle_per_handle() {
        let bridge = FakeBridge::identity(800.0);
        let mut overlay = HandleOverlayPrimitive::new(
            DrawingKind::Ray,
            &[DrawingPoint::new(10, 20.0), DrawingPoint::new(30, 40.0)],
            Color::rgba(0.0, 0.0, 1.0, 1.0),
            3,
        );
        let frame = overlay.render(&bridge).unwrap();
        let centers: Vec<Point> = frame
            .shapes
            .iter()
            .filter_map(|s| match s {
                Shape::Handle { center, .. } => Some(*center),
                _ => None,
            })
            .collect();
        assert_eq!(centers, vec![Point::new(10.0, 20.0), Point::new(30.0, 40.0)]);
    }

    #[test]
    fn follows_point_updates() {
        let bridge = FakeBridge::identity(800.0);
        let mut overlay = HandleOverlayPrimitive::new(
            DrawingKind::HorizontalLine,
            &[DrawingPoint::new(0, 20.0)],
            Color::rgba(0.0, 0.0, 1.0, 1.0),
            3,
        );
        overlay.update_points(&[DrawingPoint::new(0, 70.0)]);
        let frame = overlay.render(&bridge).unwrap();
        assert!(matches!(
            frame.shapes[0],
            Shape::Handle { center, .. } if center == Point::new(400.0, 70.0)
        ));
    }
}
