//! Render frames → Vello drawing commands.
//!
//! Walks the shapes produced by a layer's render pass and emits Vello fills
//! and strokes. Coordinates are already in pixels, so every command uses
//! the identity transform.

use crate::frame::{DASH_PATTERN, RenderFrame, Shape, label_size};
use kurbo::{Affine, BezPath, Circle, Line, Rect, Stroke as KurboStroke};
use peniko::{Color, Fill};
use vello::Scene;

/// Paint every frame of one render pass to a Vello scene.
///
/// Call once per frame with a freshly-cleared `Scene`.
/// The caller presents the scene via wgpu.
pub fn paint_frames(scene: &mut Scene, frames: &[RenderFrame]) {
    for frame in frames {
        for shape in &frame.shapes {
            paint_shape(scene, shape);
        }
    }
}

fn paint_shape(scene: &mut Scene, shape: &Shape) {
    match shape {
        Shape::Line {
            from,
            to,
            color,
            width,
            dashed,
        } => {
            let mut stroke = KurboStroke::new(*width);
            if *dashed {
                stroke = stroke.with_dashes(0.0, DASH_PATTERN);
            }
            scene.stroke(&stroke, Affine::IDENTITY, to_peniko(color), None, &Line::new(*from, *to));
        }

        Shape::Polygon { corners, fill } => {
            let mut path = BezPath::new();
            path.move_to(corners[0]);
            for c in &corners[1..] {
                path.line_to(*c);
            }
            path.close_path();
            scene.fill(Fill::NonZero, Affine::IDENTITY, to_peniko(fill), None, &path);
        }

        Shape::Handle {
            center,
            radius,
            fill,
            stroke,
        } => {
            let circle = Circle::new(*center, *radius);
            scene.fill(Fill::NonZero, Affine::IDENTITY, to_peniko(fill), None, &circle);
            scene.stroke(&KurboStroke::new(1.5), Affine::IDENTITY, to_peniko(stroke), None, &circle);
        }

        Shape::PriceLabel {
            y,
            right,
            text,
            background,
            ..
        } => {
            let (w, h) = label_size(text);
            let rect = Rect::new(right - w, y - h / 2.0, *right, y + h / 2.0);
            scene.fill(Fill::NonZero, Affine::IDENTITY, to_peniko(background), None, &rect);
            log::trace!("LABEL {text:?} at y={y:.1}");
            // Glyph shaping requires a font context; the box alone marks the price.
        }
    }
}

fn to_peniko(color: &cm_core::Color) -> Color {
    let [r, g, b, a] = color.to_rgba8();
    Color::from_rgba8(r, g, b, a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    fn every_shape() -> RenderFrame {
        let blue = cm_core::Color::rgba(0.16, 0.38, 1.0, 1.0);
        RenderFrame {
            shapes: vec![
                Shape::Line {
                    from: Point::new(0.0, 10.0),
                    to: Point::new(100.0, 10.0),
                    color: blue,
                    width: 2.0,
                    dashed: true,
                },
                Shape::Polygon {
                    corners: [
                        Point::new(0.0, 0.0),
                        Point::new(100.0, 0.0),
                        Point::new(100.0, 20.0),
                        Point::new(0.0, 20.0),
                    ],
                    fill: blue.with_opacity(0.1),
                },
                Shape::Handle {
                    center: Point::new(50.0, 10.0),
                    radius: 5.0,
                    fill: cm_core::Color::rgba(1.0, 1.0, 1.0, 1.0),
                    stroke: blue,
                },
                Shape::PriceLabel {
                    y: 10.0,
                    right: 200.0,
                    text: "101.25".into(),
                    background: blue,
                    text_color: cm_core::Color::rgba(1.0, 1.0, 1.0, 1.0),
                },
            ],
        }
    }

    #[test]
    fn paints_every_shape_kind() {
        let mut scene = Scene::new();
        paint_frames(&mut scene, &[]);
        assert!(scene.encoding().is_empty());

        paint_frames(&mut scene, &[every_shape()]);
        assert!(!scene.encoding().is_empty());
    }

    #[test]
    fn converts_colors_to_rgba8() {
        let c = to_peniko(&cm_core::Color::rgba(1.0, 0.0, 0.0, 1.0));
        assert_eq!(c, Color::from_rgba8(255, 0, 0, 255));
    }
}
