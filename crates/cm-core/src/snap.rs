//! OHLC magnet snap.
//!
//! Pulls a cursor-derived price onto the nearest open/high/low/close of the
//! candle under the cursor when that value is drawn within a pixel
//! tolerance of the cursor. Distances are compared in pixels, so the pull
//! feels the same on linear and logarithmic price axes.

use crate::bridge::CoordinateBridge;
use crate::config::InteractionConfig;
use crate::model::DrawingPoint;

/// Snap `raw_price` to the closest OHLC value of the candle nearest `time`
/// if its pixel-y lies within `threshold_px` of `cursor_y`.
pub fn magnet_snap(
    bridge: &dyn CoordinateBridge,
    time: i64,
    raw_price: f64,
    cursor_y: f64,
    threshold_px: f64,
) -> f64 {
    let Some(candle) = bridge.candle_near(time) else {
        return raw_price;
    };

    let nearest = candle
        .quartet()
        .into_iter()
        .filter_map(|price| bridge.price_to_y(price).map(|y| (price, (y - cursor_y).abs())))
        .min_by(|a, b| a.1.total_cmp(&b.1));

    match nearest {
        Some((price, dist)) if dist <= threshold_px => {
            log::trace!("magnet snap {raw_price} -> {price} ({dist:.1}px)");
            price
        }
        _ => raw_price,
    }
}

/// Turn a cursor position into a domain point, applying the magnet when
/// enabled. `None` while the host cannot convert the position.
pub fn snapped_point(
    bridge: &dyn CoordinateBridge,
    config: &InteractionConfig,
    x: f64,
    y: f64,
) -> Option<DrawingPoint> {
    let raw = bridge.to_domain(x, y)?;
    if !config.magnet_enabled {
        return Some(raw);
    }
    let price = magnet_snap(bridge, raw.time, raw.price, y, config.magnet_threshold_px);
    Some(DrawingPoint::new(raw.time, price))
}
