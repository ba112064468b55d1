//! Interaction tuning.
//!
//! Pixel tolerances for hit testing, drag debounce and the OHLC magnet,
//! plus the bounded render-retry budget. Hosts may override any field from
//! JSON; omitted fields keep their defaults.

use crate::error::DrawingError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InteractionConfig {
    /// Max pixel distance from a line that still counts as a hit.
    pub hit_tolerance_px: f64,
    /// Radius of a draggable handle.
    pub handle_radius_px: f64,
    /// Pointer travel before a press becomes a drag.
    pub drag_threshold_px: f64,
    /// Max pixel distance for the OHLC magnet to engage.
    pub magnet_threshold_px: f64,
    pub magnet_enabled: bool,
    /// Frames a primitive retries after a failed conversion.
    pub max_render_retries: u32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            hit_tolerance_px: 6.0,
            handle_radius_px: 10.0,
            drag_threshold_px: 3.0,
            magnet_threshold_px: 15.0,
            magnet_enabled: true,
            max_render_retries: 3,
        }
    }
}

impl InteractionConfig {
    pub fn validate(&self) -> Result<(), DrawingError> {
        let fields = [
            ("hitTolerancePx", self.hit_tolerance_px),
            ("handleRadiusPx", self.handle_radius_px),
            ("dragThresholdPx", self.drag_threshold_px),
            ("magnetThresholdPx", self.magnet_threshold_px),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(DrawingError::InvalidConfig(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: InteractionConfig =
            serde_json::from_str(r#"{"magnetEnabled": false, "hitTolerancePx": 8}"#).unwrap();
        assert!(!config.magnet_enabled);
        assert_eq!(config.hit_tolerance_px, 8.0);
        assert_eq!(config.handle_radius_px, 10.0);
        assert_eq!(config.max_render_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_negative_tolerance() {
        let config = InteractionConfig {
            drag_threshold_px: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DrawingError::InvalidConfig(msg)) if msg.contains("dragThresholdPx")
        ));
    }

    #[test]
    fn rejects_nan() {
        let config = InteractionConfig {
            magnet_threshold_px: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
