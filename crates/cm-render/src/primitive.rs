//! Drawing primitives.
//!
//! A primitive owns one drawing's domain points and style and turns them
//! into a [`RenderFrame`] on every render pass. Geometry is never cached:
//! pan and zoom change the mapping without changing the points.
//!
//! ## Transient unavailability
//!
//! Right after attachment the host may not be laid out and conversions come
//! back `None`. The primitive then draws nothing and asks for a redraw on
//! the next tick, at most `max_retries` times in a row. Malformed point
//! arrays are not transient: they draw nothing and never retry.

use crate::frame::{RenderFrame, Shape, format_price};
use crate::geometry::{channel_geometry, horizontal_y, ray_geometry};
use cm_core::{Color, CoordinateBridge, DrawingKind, DrawingPoint, DrawingStyle, Points, check_cardinality};
use kurbo::Point;

/// Common contract of everything attached to a [`DrawingLayer`](crate::layer::DrawingLayer).
pub trait Primitive {
    fn points(&self) -> &[DrawingPoint];

    fn update_points(&mut self, points: &[DrawingPoint]);

    fn update_style(&mut self, style: &DrawingStyle);

    /// Re-derive pixel geometry for this frame. `None` draws nothing.
    fn render(&mut self, bridge: &dyn CoordinateBridge) -> Option<RenderFrame>;

    /// A conversion failed and a bounded retry is pending.
    fn wants_redraw(&self) -> bool;
}

// ─── Retry budget ────────────────────────────────────────────────────────

/// Counts consecutive frames lost to unavailable conversions.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    max: u32,
    failures: u32,
}

impl RetryBudget {
    pub fn new(max: u32) -> Self {
        Self { max, failures: 0 }
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// Record a lost frame.
    pub fn spend(&mut self) {
        if self.failures > self.max {
            return;
        }
        self.failures += 1;
        if self.failures <= self.max {
            log::trace!("conversion unavailable, retry {}/{}", self.failures, self.max);
        } else {
            log::warn!("coordinate conversion still unavailable after {} retries", self.max);
        }
    }

    /// Another retry tick should be scheduled.
    pub fn pending(&self) -> bool {
        self.failures > 0 && self.failures <= self.max
    }
}

/// Shared bookkeeping of the three drawing primitives.
#[derive(Debug, Clone)]
struct DrawingState {
    kind: DrawingKind,
    points: Points,
    style: DrawingStyle,
    retry: RetryBudget,
}

impl DrawingState {
    fn new(kind: DrawingKind, points: &[DrawingPoint], style: DrawingStyle, max_retries: u32) -> Self {
        Self {
            kind,
            points: Points::from_slice(points),
            style,
            retry: RetryBudget::new(max_retries),
        }
    }

    fn set_points(&mut self, points: &[DrawingPoint]) {
        self.points = Points::from_slice(points);
        self.retry.reset();
    }

    /// Run `build` unless the point array is malformed; account for
    /// unavailable conversions.
    fn render_with(
        &mut self,
        bridge: &dyn CoordinateBridge,
        build: impl FnOnce(&[DrawingPoint], &DrawingStyle, &dyn CoordinateBridge) -> Option<RenderFrame>,
    ) -> Option<RenderFrame> {
        if let Err(e) = check_cardinality(self.kind, &self.points) {
            log::trace!("skip render: {e}");
            return None;
        }
        match build(&self.points, &self.style, bridge) {
            Some(frame) => {
                self.retry.reset();
                Some(frame)
            }
            None => {
                self.retry.spend();
                None
            }
        }
    }
}

fn stroke(from: Point, to: Point, style: &DrawingStyle, dashed: bool) -> Shape {
    Shape::Line {
        from,
        to,
        color: style.line_color,
        width: style.line_width as f64,
        dashed,
    }
}

macro_rules! delegate_primitive {
    ($ty:ty, $build:path) => {
        impl Primitive for $ty {
            fn points(&self) -> &[DrawingPoint] {
                &self.state.points
            }

            fn update_points(&mut self, points: &[DrawingPoint]) {
                self.state.set_points(points);
            }

            fn update_style(&mut self, style: &DrawingStyle) {
                self.state.style = style.clone();
            }

            fn render(&mut self, bridge: &dyn CoordinateBridge) -> Option<RenderFrame> {
                self.state.render_with(bridge, $build)
            }

            fn wants_redraw(&self) -> bool {
                self.state.retry.pending()
            }
        }
    };
}

// ─── Parallel channel ────────────────────────────────────────────────────

/// Two parallel boundary lines, a translucent band between them and a
/// dashed midline.
pub struct ParallelChannelPrimitive {
    state: DrawingState,
}

impl ParallelChannelPrimitive {
    pub fn new(points: &[DrawingPoint], style: DrawingStyle, max_retries: u32) -> Self {
        Self {
            state: DrawingState::new(DrawingKind::ParallelChannel, points, style, max_retries),
        }
    }

    fn build(points: &[DrawingPoint], style: &DrawingStyle, bridge: &dyn CoordinateBridge) -> Option<RenderFrame> {
        let g = channel_geometry(points, style, bridge)?;
        let mut frame = RenderFrame::default();
        if let Some(fill) = style.effective_fill() {
            frame.push(Shape::Polygon {
                corners: g.quad(),
                fill,
            });
        }
        frame.push(stroke(g.line1.0, g.line1.1, style, style.is_dashed()));
        frame.push(stroke(g.line2.0, g.line2.1, style, style.is_dashed()));
        let (m0, m1) = g.midline();
        frame.push(Shape::Line {
            from: m0,
            to: m1,
            color: style.line_color.with_opacity(0.6),
            width: 1.0,
            dashed: true,
        });
        log::trace!("channel offset {:.2}px", g.offset);
        Some(frame)
    }
}

delegate_primitive!(ParallelChannelPrimitive, ParallelChannelPrimitive::build);

// ─── Ray ─────────────────────────────────────────────────────────────────

pub struct RayPrimitive {
    state: DrawingState,
}

impl RayPrimitive {
    pub fn new(points: &[DrawingPoint], style: DrawingStyle, max_retries: u32) -> Self {
        Self {
            state: DrawingState::new(DrawingKind::Ray, points, style, max_retries),
        }
    }

    fn build(points: &[DrawingPoint], style: &DrawingStyle, bridge: &dyn CoordinateBridge) -> Option<RenderFrame> {
        let (a, b) = ray_geometry(points, bridge)?;
        Some(RenderFrame {
            shapes: vec![stroke(a, b, style, style.is_dashed())],
        })
    }
}

delegate_primitive!(RayPrimitive, RayPrimitive::build);

// ─── Horizontal line ─────────────────────────────────────────────────────

/// Full-width line at one price, with an optional price box on the right.
pub struct HorizontalLinePrimitive {
    state: DrawingState,
}

impl HorizontalLinePrimitive {
    pub fn new(points: &[DrawingPoint], style: DrawingStyle, max_retries: u32) -> Self {
        Self {
            state: DrawingState::new(DrawingKind::HorizontalLine, points, style, max_retries),
        }
    }

    fn build(points: &[DrawingPoint], style: &DrawingStyle, bridge: &dyn CoordinateBridge) -> Option<RenderFrame> {
        let y = horizontal_y(points, bridge)?;
        let width = bridge.visible_width();
        let mut frame = RenderFrame::default();
        frame.push(stroke(Point::new(0.0, y), Point::new(width, y), style, style.is_dashed()));
        if style.shows_price_label() {
            frame.push(Shape::PriceLabel {
                y,
                right: width,
                text: format_price(points[0].price),
                background: style.line_color,
                text_color: Color::rgba(1.0, 1.0, 1.0, 1.0),
            });
        }
        Some(frame)
    }
}

delegate_primitive!(HorizontalLinePrimitive, HorizontalLinePrimitive::build);

/// Build the primitive matching `kind`.
pub fn primitive_for(
    kind: DrawingKind,
    points: &[DrawingPoint],
    style: DrawingStyle,
    max_retries: u32,
) -> Box<dyn Primitive> {
    match kind {
        DrawingKind::ParallelChannel => Box::new(ParallelChannelPrimitive::new(points, style, max_retries)),
        DrawingKind::Ray => Box::new(RayPrimitive::new(points, style, max_retries)),
        DrawingKind::HorizontalLine => Box::new(HorizontalLinePrimitive::new(points, style, max_retries)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cm_core::testing::FakeBridge;
    use pretty_assertions::assert_eq;

    #[test]
    fn channel_renders_band_lines_and_midline() {
        let bridge = FakeBridge::identity(800.0);
        let mut prim = ParallelChannelPrimitive::new(
            &[
                DrawingPoint::new(0, 100.0),
                DrawingPoint::new(10, 110.0),
                DrawingPoint::new(0, 90.0),
            ],
            DrawingStyle::default_for(DrawingKind::ParallelChannel),
            3,
        );
        let frame = prim.render(&bridge).unwrap();
        assert!(matches!(frame.shapes[0], Shape::Polygon { .. }));
        let lines: Vec<_> = frame.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], (Point::new(0.0, 100.0), Point::new(10.0, 110.0)));
        assert_eq!(lines[1], (Point::new(0.0, 90.0), Point::new(10.0, 100.0)));
        assert_eq!(lines[2], (Point::new(0.0, 95.0), Point::new(10.0, 105.0)));
    }

    #[test]
    fn horizontal_line_spans_width_with_label() {
        let bridge = FakeBridge::identity(500.0);
        let mut prim = HorizontalLinePrimitive::new(
            &[DrawingPoint::new(1000, 150.25)],
            DrawingStyle::default_for(DrawingKind::HorizontalLine),
            3,
        );
        let frame = prim.render(&bridge).unwrap();
        assert_eq!(
            frame.shapes[0],
            Shape::Line {
                from: Point::new(0.0, 150.25),
                to: Point::new(500.0, 150.25),
                color: Color::from_hex("#787b86").unwrap(),
                width: 1.0,
                dashed: true,
            }
        );
        match &frame.shapes[1] {
            Shape::PriceLabel { text, right, .. } => {
                assert_eq!(text, "150.25");
                assert_eq!(*right, 500.0);
            }
            other => panic!("expected price label, got {other:?}"),
        }
    }

    #[test]
    fn retries_are_bounded() {
        let bridge = FakeBridge::identity(800.0);
        bridge.ready.set(false);
        let mut prim = RayPrimitive::new(
            &[DrawingPoint::new(0, 1.0), DrawingPoint::new(1, 2.0)],
            DrawingStyle::default_for(DrawingKind::Ray),
            3,
        );

        assert!(prim.render(&bridge).is_none());
        assert!(prim.wants_redraw());
        assert!(prim.render(&bridge).is_none());
        assert!(prim.wants_redraw());
        assert!(prim.render(&bridge).is_none());
        assert!(prim.wants_redraw());
        assert!(prim.render(&bridge).is_none());
        assert!(!prim.wants_redraw(), "budget exhausted after 3 retries");
        assert!(prim.render(&bridge).is_none());
        assert!(!prim.wants_redraw());

        bridge.ready.set(true);
        assert!(prim.render(&bridge).is_some());
        assert!(!prim.wants_redraw());
    }

    #[test]
    fn malformed_points_render_nothing_without_retry() {
        let bridge = FakeBridge::identity(800.0);
        let mut prim = primitive_for(
            DrawingKind::ParallelChannel,
            &[DrawingPoint::new(0, 1.0)],
            DrawingStyle::default_for(DrawingKind::ParallelChannel),
            3,
        );
        assert!(prim.render(&bridge).is_none());
        assert!(!prim.wants_redraw());
    }

    #[test]
    fn geometry_follows_mapping_changes() {
        let mut bridge = FakeBridge::identity(800.0);
        let mut prim = RayPrimitive::new(
            &[DrawingPoint::new(0, 10.0), DrawingPoint::new(10, 10.0)],
            DrawingStyle::default_for(DrawingKind::Ray),
            3,
        );
        let before = prim.render(&bridge).unwrap();
        bridge.time_offset = 50.0;
        let after = prim.render(&bridge).unwrap();
        assert_ne!(before, after);
        assert_eq!(after.lines().next().unwrap().0, Point::new(50.0, 10.0));
    }
}
