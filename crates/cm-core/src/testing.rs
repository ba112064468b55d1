//! In-memory `CoordinateBridge` for tests.
//!
//! Maps time and price with configurable linear (or logarithmic) scales,
//! counts live subscriptions and records pan/zoom and cursor changes.

use crate::bridge::{CoordinateBridge, Cursor, EventKind, SubscriptionId};
use crate::model::Ohlc;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub enum PriceAxis {
    /// `y = offset + scale * price`
    Linear { scale: f64, offset: f64 },
    /// `y = offset - scale * ln(price)`; non-positive prices are unmappable.
    Log { scale: f64, offset: f64 },
}

pub struct FakeBridge {
    pub time_scale: f64,
    pub time_offset: f64,
    pub axis: PriceAxis,
    pub width: f64,
    /// When false every conversion returns `None`.
    pub ready: Cell<bool>,
    pub candles: RefCell<Vec<(i64, Ohlc)>>,
    subs: RefCell<HashMap<u64, EventKind>>,
    next_sub: Cell<u64>,
    pan_zoom: Cell<bool>,
    pan_zoom_changes: Cell<usize>,
    cursor: Cell<Cursor>,
}

impl Default for FakeBridge {
    fn default() -> Self {
        Self::identity(800.0)
    }
}

impl FakeBridge {
    /// `x = time`, `y = price`.
    pub fn identity(width: f64) -> Self {
        Self {
            time_scale: 1.0,
            time_offset: 0.0,
            axis: PriceAxis::Linear {
                scale: 1.0,
                offset: 0.0,
            },
            width,
            ready: Cell::new(true),
            candles: RefCell::new(Vec::new()),
            subs: RefCell::new(HashMap::new()),
            next_sub: Cell::new(1),
            pan_zoom: Cell::new(true),
            pan_zoom_changes: Cell::new(0),
            cursor: Cell::new(Cursor::Default),
        }
    }

    pub fn with_axis(mut self, axis: PriceAxis) -> Self {
        self.axis = axis;
        self
    }

    pub fn with_time_scale(mut self, scale: f64, offset: f64) -> Self {
        self.time_scale = scale;
        self.time_offset = offset;
        self
    }

    pub fn push_candle(&self, time: i64, open: f64, high: f64, low: f64, close: f64) {
        self.candles.borrow_mut().push((
            time,
            Ohlc {
                open,
                high,
                low,
                close,
            },
        ));
    }

    pub fn live_subscriptions(&self) -> usize {
        self.subs.borrow().len()
    }

    pub fn is_subscribed(&self, kind: EventKind) -> bool {
        self.subs.borrow().values().any(|k| *k == kind)
    }

    pub fn pan_zoom_enabled(&self) -> bool {
        self.pan_zoom.get()
    }

    pub fn pan_zoom_changes(&self) -> usize {
        self.pan_zoom_changes.get()
    }
}

impl CoordinateBridge for FakeBridge {
    fn time_to_x(&self, time: i64) -> Option<f64> {
        self.ready
            .get()
            .then(|| self.time_offset + self.time_scale * time as f64)
    }

    fn price_to_y(&self, price: f64) -> Option<f64> {
        if !self.ready.get() {
            return None;
        }
        match self.axis {
            PriceAxis::Linear { scale, offset } => Some(offset + scale * price),
            PriceAxis::Log { scale, offset } => (price > 0.0).then(|| offset - scale * price.ln()),
        }
    }

    fn x_to_time(&self, x: f64) -> Option<i64> {
        self.ready
            .get()
            .then(|| ((x - self.time_offset) / self.time_scale).round() as i64)
    }

    fn y_to_price(&self, y: f64) -> Option<f64> {
        if !self.ready.get() {
            return None;
        }
        match self.axis {
            PriceAxis::Linear { scale, offset } => Some((y - offset) / scale),
            PriceAxis::Log { scale, offset } => Some(((offset - y) / scale).exp()),
        }
    }

    fn visible_width(&self) -> f64 {
        self.width
    }

    fn candle_near(&self, time: i64) -> Option<Ohlc> {
        self.candles
            .borrow()
            .iter()
            .min_by_key(|(t, _)| (t - time).abs())
            .map(|(_, c)| *c)
    }

    fn subscribe(&self, kind: EventKind) -> SubscriptionId {
        let id = self.next_sub.get();
        self.next_sub.set(id + 1);
        self.subs.borrow_mut().insert(id, kind);
        SubscriptionId(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subs.borrow_mut().remove(&id.0);
    }

    fn set_pan_zoom_enabled(&self, enabled: bool) {
        self.pan_zoom.set(enabled);
        self.pan_zoom_changes.set(self.pan_zoom_changes.get() + 1);
    }

    fn cursor(&self) -> Cursor {
        self.cursor.get()
    }

    fn set_cursor(&self, cursor: Cursor) {
        self.cursor.set(cursor);
    }
}
