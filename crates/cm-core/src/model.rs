//! Drawing data model.
//!
//! A drawing lives in domain space: every anchor is a `(time, price)`
//! pair, never a pixel. Pixel geometry is derived per frame by the render
//! crate through the host's `CoordinateBridge`. The persisted list of
//! drawings belongs to the host; this crate only describes its shape.

use crate::error::DrawingError;
use crate::id::DrawingId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt;

// ─── Colors ──────────────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0], exchanged as a hex string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Helper to parse a single hex digit.
fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();
        let pair = |i: usize| -> Option<f32> {
            Some((hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?) as f32 / 255.0)
        };

        match bytes.len() {
            3 => {
                let short = |i: usize| -> Option<f32> { Some((hex_val(bytes[i])? * 17) as f32 / 255.0) };
                Some(Self::rgba(short(0)?, short(1)?, short(2)?, 1.0))
            }
            6 => Some(Self::rgba(pair(0)?, pair(2)?, pair(4)?, 1.0)),
            8 => Some(Self::rgba(pair(0)?, pair(2)?, pair(4)?, pair(6)?)),
            _ => None,
        }
    }

    /// Lowercase `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// Same color with alpha multiplied by `opacity`.
    pub fn with_opacity(self, opacity: f64) -> Self {
        Self {
            a: self.a * opacity.clamp(0.0, 1.0) as f32,
            ..self
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s)
            .ok_or_else(|| serde::de::Error::custom(DrawingError::InvalidColor(s.clone())))
    }
}

// ─── Points ──────────────────────────────────────────────────────────────

/// A domain-space coordinate: candle timestamp and price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawingPoint {
    pub time: i64,
    pub price: f64,
}

impl DrawingPoint {
    pub const fn new(time: i64, price: f64) -> Self {
        Self { time, price }
    }

    /// Shift by a domain delta.
    pub fn offset(&self, dt: i64, dp: f64) -> Self {
        Self {
            time: self.time + dt,
            price: self.price + dp,
        }
    }
}

/// Anchors of one drawing. Never more than three.
pub type Points = SmallVec<[DrawingPoint; 3]>;

/// Open/high/low/close of a single candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ohlc {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Ohlc {
    pub fn quartet(&self) -> [f64; 4] {
        [self.open, self.high, self.low, self.close]
    }
}

// ─── Drawing kinds & styles ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DrawingKind {
    ParallelChannel,
    Ray,
    HorizontalLine,
}

impl DrawingKind {
    /// Number of anchors (and creation clicks) the kind requires.
    pub const fn required_points(self) -> usize {
        match self {
            DrawingKind::ParallelChannel => 3,
            DrawingKind::Ray => 2,
            DrawingKind::HorizontalLine => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DrawingKind::ParallelChannel => "parallel_channel",
            DrawingKind::Ray => "ray",
            DrawingKind::HorizontalLine => "horizontal_line",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "parallel_channel" | "PARALLEL_CHANNEL" => Some(DrawingKind::ParallelChannel),
            "ray" | "RAY" => Some(DrawingKind::Ray),
            "horizontal_line" | "HORIZONTAL_LINE" => Some(DrawingKind::HorizontalLine),
            _ => None,
        }
    }
}

impl fmt::Display for DrawingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Price axis mapping. Only picks the offset strategy, never changes it:
/// channel offsets are always measured in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceScaleMode {
    #[default]
    Linear,
    Logarithmic,
}

/// Rendering attributes. Optional fields apply to some kinds only and
/// are left out of the JSON form when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingStyle {
    pub line_color: Color,
    pub line_width: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extend_left: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extend_right: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_price_label: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_scale_mode: Option<PriceScaleMode>,
}

const TV_GRAY: Color = Color::rgba(120.0 / 255.0, 123.0 / 255.0, 134.0 / 255.0, 1.0);
const TV_BLUE: Color = Color::rgba(41.0 / 255.0, 98.0 / 255.0, 1.0, 1.0);

impl DrawingStyle {
    /// Plain solid line with no optional attributes.
    pub fn line(color: Color, width: u32) -> Self {
        Self {
            line_color: color,
            line_width: width,
            fill_color: None,
            fill_opacity: None,
            extend_left: None,
            extend_right: None,
            dashed: None,
            show_price_label: None,
            price_scale_mode: None,
        }
    }

    /// Style a freshly created drawing of `kind` receives.
    pub fn default_for(kind: DrawingKind) -> Self {
        match kind {
            DrawingKind::HorizontalLine => Self {
                dashed: Some(true),
                show_price_label: Some(true),
                ..Self::line(TV_GRAY, 1)
            },
            DrawingKind::Ray => Self {
                extend_right: Some(true),
                ..Self::line(TV_BLUE, 2)
            },
            DrawingKind::ParallelChannel => Self {
                fill_color: Some(TV_BLUE),
                fill_opacity: Some(0.1),
                extend_left: Some(false),
                extend_right: Some(false),
                ..Self::line(TV_BLUE, 2)
            },
        }
    }

    pub fn extends_left(&self) -> bool {
        self.extend_left.unwrap_or(false)
    }

    pub fn extends_right(&self) -> bool {
        self.extend_right.unwrap_or(false)
    }

    pub fn is_dashed(&self) -> bool {
        self.dashed.unwrap_or(false)
    }

    pub fn shows_price_label(&self) -> bool {
        self.show_price_label.unwrap_or(false)
    }

    /// Fill color with `fill_opacity` folded into alpha.
    pub fn effective_fill(&self) -> Option<Color> {
        self.fill_color
            .map(|c| c.with_opacity(self.fill_opacity.unwrap_or(1.0)))
    }
}

// ─── Drawings ────────────────────────────────────────────────────────────

/// A persisted drawing, owned by the host's store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawing {
    pub id: DrawingId,
    #[serde(rename = "type")]
    pub kind: DrawingKind,
    pub points: Points,
    pub style: DrawingStyle,
}

impl Drawing {
    pub fn new(id: DrawingId, kind: DrawingKind, points: &[DrawingPoint], style: DrawingStyle) -> Self {
        Self {
            id,
            kind,
            points: Points::from_slice(points),
            style,
        }
    }

    /// Point-count matches the kind's cardinality.
    pub fn validate(&self) -> Result<(), DrawingError> {
        check_cardinality(self.kind, &self.points)
    }
}

/// What the creation flow hands to the host; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreationRequest {
    #[serde(rename = "type")]
    pub kind: DrawingKind,
    pub points: Points,
    pub style: DrawingStyle,
}

impl CreationRequest {
    pub fn into_drawing(self, id: DrawingId) -> Drawing {
        Drawing {
            id,
            kind: self.kind,
            points: self.points,
            style: self.style,
        }
    }
}

pub fn check_cardinality(kind: DrawingKind, points: &[DrawingPoint]) -> Result<(), DrawingError> {
    let expected = kind.required_points();
    if points.len() == expected {
        Ok(())
    } else {
        Err(DrawingError::WrongPointCount {
            kind,
            expected,
            found: points.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn hex_parse_and_emit() {
        let c = Color::from_hex("#787b86").unwrap();
        assert_eq!(c.to_hex(), "#787b86");
        assert_eq!(Color::from_hex("fff").unwrap().to_hex(), "#ffffff");
        assert_eq!(Color::from_hex("#2962FF80").unwrap().to_hex(), "#2962ff80");
        assert!(Color::from_hex("#12345").is_none());
        assert!(Color::from_hex("#zzzzzz").is_none());
    }

    #[test]
    fn horizontal_default_style_json() {
        let style = DrawingStyle::default_for(DrawingKind::HorizontalLine);
        assert_eq!(
            serde_json::to_value(&style).unwrap(),
            json!({
                "lineColor": "#787b86",
                "lineWidth": 1,
                "dashed": true,
                "showPriceLabel": true
            })
        );
    }

    #[test]
    fn drawing_json_uses_type_field() {
        let d = Drawing::new(
            DrawingId::intern("r1"),
            DrawingKind::Ray,
            &[DrawingPoint::new(0, 100.0), DrawingPoint::new(10, 110.0)],
            DrawingStyle::default_for(DrawingKind::Ray),
        );
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["type"], json!("RAY"));
        assert_eq!(v["id"], json!("r1"));
        assert_eq!(v["points"][1], json!({"time": 10, "price": 110.0}));

        let back: Drawing = serde_json::from_value(v).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn cardinality_guard() {
        let ok = [DrawingPoint::new(0, 1.0)];
        assert!(check_cardinality(DrawingKind::HorizontalLine, &ok).is_ok());
        let err = check_cardinality(DrawingKind::ParallelChannel, &ok).unwrap_err();
        assert_eq!(
            err,
            DrawingError::WrongPointCount {
                kind: DrawingKind::ParallelChannel,
                expected: 3,
                found: 1
            }
        );
    }

    #[test]
    fn fill_opacity_folds_into_alpha() {
        let style = DrawingStyle::default_for(DrawingKind::ParallelChannel);
        let fill = style.effective_fill().unwrap();
        assert!((fill.a - 0.1).abs() < 1e-6);
    }
}
