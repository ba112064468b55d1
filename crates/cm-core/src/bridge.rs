//! Host capability contract.
//!
//! The chart host (series renderer, time/price scales, DOM events) is not
//! part of Chartmark. Controllers and primitives talk to it only through
//! [`CoordinateBridge`], so tests can drive them with a fake.
//!
//! Every conversion is nullable: `None` means "not renderable this frame"
//! (host not laid out yet, value off-screen), never an error.
//!
//! Registrations and temporary host state are held as guards that undo
//! themselves on drop:
//!
//! | Guard | Acquire | Release |
//! |-------|---------|---------|
//! | [`Subscription`] | `subscribe(kind)` | `unsubscribe(id)` |
//! | [`CursorGuard`] | `set_cursor(new)` | restores the previous cursor |
//! | [`PanZoomLock`] | `set_pan_zoom_enabled(false)` | `set_pan_zoom_enabled(true)` |

use crate::model::{DrawingPoint, Ohlc};
use std::rc::Rc;

/// Pointer/keyboard streams a controller can listen to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PointerMove,
    PointerDown,
    PointerUp,
    Click,
    KeyDown,
}

/// Opaque registration handle returned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Mouse cursors the controllers request from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Default,
    Crosshair,
    Pointer,
    Grab,
    Grabbing,
    Move,
}

impl Cursor {
    /// CSS cursor keyword.
    pub fn css(self) -> &'static str {
        match self {
            Cursor::Default => "default",
            Cursor::Crosshair => "crosshair",
            Cursor::Pointer => "pointer",
            Cursor::Grab => "grab",
            Cursor::Grabbing => "grabbing",
            Cursor::Move => "move",
        }
    }

    pub fn from_css(s: &str) -> Self {
        match s {
            "crosshair" => Cursor::Crosshair,
            "pointer" => Cursor::Pointer,
            "grab" => Cursor::Grab,
            "grabbing" => Cursor::Grabbing,
            "move" => Cursor::Move,
            _ => Cursor::Default,
        }
    }
}

/// Conversions and host toggles consumed by the drawing engine.
///
/// Methods take `&self`; hosts keep their mutable state behind interior
/// mutability, the engine is single-threaded.
pub trait CoordinateBridge {
    fn time_to_x(&self, time: i64) -> Option<f64>;
    fn price_to_y(&self, price: f64) -> Option<f64>;
    fn x_to_time(&self, x: f64) -> Option<i64>;
    fn y_to_price(&self, y: f64) -> Option<f64>;

    /// Width of the plotting area in pixels.
    fn visible_width(&self) -> f64;

    /// OHLC of the candle nearest to `time`, if any data is loaded.
    fn candle_near(&self, time: i64) -> Option<Ohlc>;

    fn subscribe(&self, kind: EventKind) -> SubscriptionId;
    fn unsubscribe(&self, id: SubscriptionId);

    fn set_pan_zoom_enabled(&self, enabled: bool);

    fn cursor(&self) -> Cursor;
    fn set_cursor(&self, cursor: Cursor);

    /// Domain point → pixel `(x, y)`.
    fn to_pixel(&self, point: DrawingPoint) -> Option<(f64, f64)> {
        Some((self.time_to_x(point.time)?, self.price_to_y(point.price)?))
    }

    /// Pixel `(x, y)` → domain point.
    fn to_domain(&self, x: f64, y: f64) -> Option<DrawingPoint> {
        Some(DrawingPoint::new(self.x_to_time(x)?, self.y_to_price(y)?))
    }
}

// ─── Guards ──────────────────────────────────────────────────────────────

/// A live event registration; unsubscribes when dropped.
pub struct Subscription {
    bridge: Rc<dyn CoordinateBridge>,
    id: SubscriptionId,
    kind: EventKind,
}

impl Subscription {
    pub fn new(bridge: &Rc<dyn CoordinateBridge>, kind: EventKind) -> Self {
        let id = bridge.subscribe(kind);
        log::trace!("subscribed {kind:?} as {id:?}");
        Self {
            bridge: Rc::clone(bridge),
            id,
            kind,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        log::trace!("unsubscribed {:?} ({:?})", self.kind, self.id);
        self.bridge.unsubscribe(self.id);
    }
}

/// All registrations one controller holds while active.
#[derive(Default)]
pub struct SubscriptionSet {
    subs: Vec<Subscription>,
}

impl SubscriptionSet {
    pub fn register(bridge: &Rc<dyn CoordinateBridge>, kinds: &[EventKind]) -> Self {
        Self {
            subs: kinds.iter().map(|k| Subscription::new(bridge, *k)).collect(),
        }
    }

    pub fn is_listening(&self, kind: EventKind) -> bool {
        self.subs.iter().any(|s| s.kind() == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    /// Drop every registration now.
    pub fn release(&mut self) {
        self.subs.clear();
    }
}

/// Sets a cursor and puts the previous one back on drop, so nested tool
/// switches compose.
pub struct CursorGuard {
    bridge: Rc<dyn CoordinateBridge>,
    previous: Cursor,
}

impl CursorGuard {
    pub fn set(bridge: &Rc<dyn CoordinateBridge>, cursor: Cursor) -> Self {
        let previous = bridge.cursor();
        bridge.set_cursor(cursor);
        Self {
            bridge: Rc::clone(bridge),
            previous,
        }
    }

    pub fn previous(&self) -> Cursor {
        self.previous
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        self.bridge.set_cursor(self.previous);
    }
}

/// Disables host pan/zoom for the lifetime of a drag.
pub struct PanZoomLock {
    bridge: Rc<dyn CoordinateBridge>,
}

impl PanZoomLock {
    pub fn acquire(bridge: &Rc<dyn CoordinateBridge>) -> Self {
        bridge.set_pan_zoom_enabled(false);
        Self {
            bridge: Rc::clone(bridge),
        }
    }
}

impl Drop for PanZoomLock {
    fn drop(&mut self) {
        self.bridge.set_pan_zoom_enabled(true);
    }
}
