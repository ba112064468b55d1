//! Canvas2D software renderer.
//!
//! Paints the render frames of one layer pass onto the chart host's overlay
//! `<canvas>` via `CanvasRenderingContext2d`. Frames are already in pixel
//! space, so painting is a straight walk over the shapes.

use cm_core::Color;
use cm_render::frame::{DASH_PATTERN, label_size};
use cm_render::{RenderFrame, Shape};
use web_sys::CanvasRenderingContext2d;

const LABEL_FONT: &str = "11px -apple-system, BlinkMacSystemFont, sans-serif";

/// Clear the overlay and paint every frame, in order.
pub fn render_frames(ctx: &CanvasRenderingContext2d, frames: &[RenderFrame], width: f64, height: f64) {
    ctx.clear_rect(0.0, 0.0, width, height);
    for frame in frames {
        for shape in &frame.shapes {
            draw_shape(ctx, shape);
        }
    }
}

fn draw_shape(ctx: &CanvasRenderingContext2d, shape: &Shape) {
    match shape {
        Shape::Line {
            from,
            to,
            color,
            width,
            dashed,
        } => {
            ctx.save();
            ctx.set_stroke_style_str(&css_color(color));
            ctx.set_line_width(*width);
            if *dashed {
                let _ = ctx.set_line_dash(&js_sys::Array::of2(
                    &DASH_PATTERN[0].into(),
                    &DASH_PATTERN[1].into(),
                ));
            }
            ctx.begin_path();
            ctx.move_to(from.x, from.y);
            ctx.line_to(to.x, to.y);
            ctx.stroke();
            ctx.restore();
        }

        Shape::Polygon { corners, fill } => {
            ctx.save();
            ctx.set_fill_style_str(&css_color(fill));
            ctx.begin_path();
            ctx.move_to(corners[0].x, corners[0].y);
            for c in &corners[1..] {
                ctx.line_to(c.x, c.y);
            }
            ctx.close_path();
            ctx.fill();
            ctx.restore();
        }

        Shape::Handle {
            center,
            radius,
            fill,
            stroke,
        } => {
            ctx.save();
            ctx.begin_path();
            let _ = ctx.arc(center.x, center.y, *radius, 0.0, std::f64::consts::TAU);
            ctx.set_fill_style_str(&css_color(fill));
            ctx.fill();
            ctx.set_stroke_style_str(&css_color(stroke));
            ctx.set_line_width(1.5);
            ctx.stroke();
            ctx.restore();
        }

        Shape::PriceLabel {
            y,
            right,
            text,
            background,
            text_color,
        } => draw_price_label(ctx, *y, *right, text, background, text_color),
    }
}

/// Filled box flush with the right edge, text centered vertically.
fn draw_price_label(
    ctx: &CanvasRenderingContext2d,
    y: f64,
    right: f64,
    text: &str,
    background: &Color,
    text_color: &Color,
) {
    let (w, h) = label_size(text);
    ctx.save();
    ctx.set_fill_style_str(&css_color(background));
    ctx.fill_rect(right - w, y - h / 2.0, w, h);

    ctx.set_font(LABEL_FONT);
    ctx.set_text_align("right");
    ctx.set_text_baseline("middle");
    ctx.set_fill_style_str(&css_color(text_color));
    let _ = ctx.fill_text(text, right - 5.0, y);
    ctx.restore();
}

/// CSS color string; opaque colors stay hex.
pub fn css_color(color: &Color) -> String {
    let [r, g, b, a] = color.to_rgba8();
    if a == 255 {
        color.to_hex()
    } else {
        format!("rgba({r}, {g}, {b}, {:.3})", a as f64 / 255.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_colors_stay_hex() {
        let c = Color::from_hex("#2962ff").unwrap();
        assert_eq!(css_color(&c), "#2962ff");
    }

    #[test]
    fn translucent_colors_use_rgba() {
        let c = Color::from_hex("#2962ff").unwrap().with_opacity(0.1);
        assert_eq!(css_color(&c), "rgba(41, 98, 255, 0.102)");
    }
}
