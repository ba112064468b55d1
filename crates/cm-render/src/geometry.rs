//! Pixel-space geometry for drawings.
//!
//! Everything here is recomputed from domain points on every frame: pan and
//! zoom change the domain→pixel mapping without touching the points, so
//! nothing is cached. Any conversion the bridge cannot answer makes the
//! whole shape `None` for this frame.

use cm_core::{CoordinateBridge, DrawingKind, DrawingPoint, DrawingStyle};
use kurbo::{Point, Vec2};
use smallvec::SmallVec;

/// Below this horizontal span a segment is treated as vertical.
const VERTICAL_EPS: f64 = 1e-9;

// ─── Primitive helpers ───────────────────────────────────────────────────

/// Extend the line through `from` and `to` to `target_x`.
///
/// A vertical segment (`to.x == from.x`) cannot be extended; it yields
/// `(target_x, to.y)`.
pub fn extend_to_x(from: Point, to: Point, target_x: f64) -> Point {
    let dx = to.x - from.x;
    if dx.abs() < VERTICAL_EPS {
        return Point::new(target_x, to.y);
    }
    let t = (target_x - from.x) / dx;
    Point::new(target_x, from.y + t * (to.y - from.y))
}

/// Shortest distance from `p` to the segment `a`–`b`.
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len2 = ab.hypot2();
    if len2 == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Even-odd point-in-polygon test against four corners given in order.
pub fn point_in_quad(p: Point, quad: &[Point; 4]) -> bool {
    let mut inside = false;
    let mut j = quad.len() - 1;
    for i in 0..quad.len() {
        let (a, b) = (quad[i], quad[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn pixel(bridge: &dyn CoordinateBridge, point: DrawingPoint) -> Option<Point> {
    bridge.to_pixel(point).map(Point::from)
}

// ─── Parallel channel ────────────────────────────────────────────────────

/// Vertical pixel distance from line 1 (through `a`, `b`) to `p2`, taken at
/// `p2`'s x. Pixel units only, so parallel lines stay parallel on any price
/// axis.
pub fn channel_offset(a: Point, b: Point, p2: Point) -> f64 {
    p2.y - extend_to_x(a, b, p2.x).y
}

/// Resolved pixel geometry of a parallel channel for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelGeometry {
    pub line1: (Point, Point),
    pub line2: (Point, Point),
    /// Pixel y-offset of line 2 relative to line 1.
    pub offset: f64,
}

impl ChannelGeometry {
    /// Corners of the band, in drawing order.
    pub fn quad(&self) -> [Point; 4] {
        [self.line1.0, self.line1.1, self.line2.1, self.line2.0]
    }

    pub fn midline(&self) -> (Point, Point) {
        (
            self.line1.0.midpoint(self.line2.0),
            self.line1.1.midpoint(self.line2.1),
        )
    }
}

pub fn channel_geometry(
    points: &[DrawingPoint],
    style: &DrawingStyle,
    bridge: &dyn CoordinateBridge,
) -> Option<ChannelGeometry> {
    let [p0, p1, p2] = points else {
        return None;
    };
    let (a, b, c) = (pixel(bridge, *p0)?, pixel(bridge, *p1)?, pixel(bridge, *p2)?);

    let offset = channel_offset(a, b, c);
    let shift = Vec2::new(0.0, offset);

    let (mut left, mut right) = if a.x <= b.x { (a, b) } else { (b, a) };
    if style.extends_left() {
        left = extend_to_x(right, left, 0.0);
    }
    if style.extends_right() {
        right = extend_to_x(left, right, bridge.visible_width());
    }

    Some(ChannelGeometry {
        line1: (left, right),
        line2: (left + shift, right + shift),
        offset,
    })
}

// ─── Ray ─────────────────────────────────────────────────────────────────

/// Line through `p0` and `p1`, from `p0` out to the chart's right edge.
/// A vertical ray is left unextended.
pub fn ray_geometry(points: &[DrawingPoint], bridge: &dyn CoordinateBridge) -> Option<(Point, Point)> {
    let [p0, p1] = points else {
        return None;
    };
    let (a, b) = (pixel(bridge, *p0)?, pixel(bridge, *p1)?);
    if (b.x - a.x).abs() < VERTICAL_EPS {
        return Some((a, b));
    }
    Some((a, extend_to_x(a, b, bridge.visible_width())))
}

// ─── Horizontal line ─────────────────────────────────────────────────────

/// Pixel y of the line; time is ignored.
pub fn horizontal_y(points: &[DrawingPoint], bridge: &dyn CoordinateBridge) -> Option<f64> {
    let [p] = points else {
        return None;
    };
    bridge.price_to_y(p.price)
}

// ─── Handles ─────────────────────────────────────────────────────────────

pub type HandlePositions = SmallVec<[Point; 3]>;

/// Draggable control points of a drawing, in handle-index order.
///
/// - channel: `p0`, `p1`, and line 2's start (`p0` shifted by the pixel offset)
/// - ray: `p0`, `p1`
/// - horizontal line: one handle at the chart's horizontal center
pub fn handle_positions(
    kind: DrawingKind,
    points: &[DrawingPoint],
    bridge: &dyn CoordinateBridge,
) -> Option<HandlePositions> {
    match (kind, points) {
        (DrawingKind::ParallelChannel, [p0, p1, p2]) => {
            let (a, b, c) = (pixel(bridge, *p0)?, pixel(bridge, *p1)?, pixel(bridge, *p2)?);
            let offset = channel_offset(a, b, c);
            Some(SmallVec::from_slice(&[a, b, Point::new(a.x, a.y + offset)]))
        }
        (DrawingKind::Ray, [p0, p1]) => {
            Some(SmallVec::from_slice(&[pixel(bridge, *p0)?, pixel(bridge, *p1)?]))
        }
        (DrawingKind::HorizontalLine, [p]) => {
            let y = bridge.price_to_y(p.price)?;
            Some(SmallVec::from_slice(&[Point::new(bridge.visible_width() / 2.0, y)]))
        }
        _ => None,
    }
}
