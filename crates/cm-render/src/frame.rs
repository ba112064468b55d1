//! Backend-neutral output of one render pass.
//!
//! Primitives describe what to draw as pixel `Shape`s; the Vello painter
//! (`paint.rs`) and the browser Canvas2D painter both consume the same frames.

use cm_core::Color;
use kurbo::Point;

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Line {
        from: Point,
        to: Point,
        color: Color,
        width: f64,
        dashed: bool,
    },
    Polygon {
        corners: [Point; 4],
        fill: Color,
    },
    Handle {
        center: Point,
        radius: f64,
        fill: Color,
        stroke: Color,
    },
    /// Filled price box whose right edge sits on `right`, centered on `y`.
    PriceLabel {
        y: f64,
        right: f64,
        text: String,
        background: Color,
        text_color: Color,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderFrame {
    pub shapes: Vec<Shape>,
}

impl RenderFrame {
    pub fn push(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// All line shapes, in push order.
    pub fn lines(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.shapes.iter().filter_map(|s| match s {
            Shape::Line { from, to, .. } => Some((*from, *to)),
            _ => None,
        })
    }
}

/// Dash pattern for dashed strokes, in pixels.
pub const DASH_PATTERN: [f64; 2] = [6.0, 4.0];

/// Approximate box size of a price label for `text`.
pub fn label_size(text: &str) -> (f64, f64) {
    (text.len() as f64 * 7.0 + 10.0, 18.0)
}

/// Two decimals, the precision the price axis shows.
pub fn format_price(price: f64) -> String {
    format!("{price:.2}")
}
