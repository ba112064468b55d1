//! JS-backed collaborators.
//!
//! Both wrap a plain JS object and call its methods by name. A missing
//! method or a thrown exception reads as "not available".
//!
//! Host object:
//! `timeToX(t)`, `priceToY(p)`, `xToTime(x)`, `yToPrice(y)` (number | null),
//! `visibleWidth()`, `candleNear(t)` ({open,high,low,close} | null),
//! `subscribe(kind) -> id`, `unsubscribe(id)`, `setPanZoomEnabled(bool)`,
//! `cursor() -> string`, `setCursor(string)`.
//!
//! Store object:
//! `drawings() -> Drawing[]`, `update(requestId, id, points)`,
//! `delete(requestId, id)`, `completed(request)`, `cancelled()`.

use cm_core::{CoordinateBridge, CreationRequest, Cursor, Drawing, DrawingId, DrawingPoint, EventKind, Ohlc, SubscriptionId};
use cm_editor::{CreationSink, DrawingStore, RequestId};
use js_sys::{Array, Function, JSON, Reflect};
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::{JsCast, JsValue};

fn call(target: &JsValue, method: &str, args: &[JsValue]) -> Option<JsValue> {
    let f = Reflect::get(target, &JsValue::from_str(method))
        .ok()?
        .dyn_into::<Function>()
        .ok()?;
    let args: Array = args.iter().collect();
    match f.apply(target, &args) {
        Ok(v) => Some(v),
        Err(e) => {
            log::warn!("{method} threw: {e:?}");
            None
        }
    }
}

fn number(value: JsValue) -> Option<f64> {
    value.as_f64().filter(|v| v.is_finite())
}

fn field(obj: &JsValue, name: &str) -> Option<f64> {
    number(Reflect::get(obj, &JsValue::from_str(name)).ok()?)
}

/// JSON text → JS value, for passing structured data to the page.
fn to_js<T: serde::Serialize>(value: &T) -> JsValue {
    serde_json::to_string(value)
        .ok()
        .and_then(|s| JSON::parse(&s).ok())
        .unwrap_or(JsValue::NULL)
}

pub fn event_kind_name(kind: EventKind) -> &'static str {
    match kind {
        EventKind::PointerMove => "pointerMove",
        EventKind::PointerDown => "pointerDown",
        EventKind::PointerUp => "pointerUp",
        EventKind::Click => "click",
        EventKind::KeyDown => "keyDown",
    }
}

// ─── Host ────────────────────────────────────────────────────────────────

pub struct JsBridge {
    host: JsValue,
}

impl JsBridge {
    pub fn new(host: JsValue) -> Self {
        Self { host }
    }

    fn num(&self, method: &str, arg: f64) -> Option<f64> {
        number(call(&self.host, method, &[JsValue::from_f64(arg)])?)
    }
}

impl CoordinateBridge for JsBridge {
    fn time_to_x(&self, time: i64) -> Option<f64> {
        self.num("timeToX", time as f64)
    }

    fn price_to_y(&self, price: f64) -> Option<f64> {
        self.num("priceToY", price)
    }

    fn x_to_time(&self, x: f64) -> Option<i64> {
        self.num("xToTime", x).map(|t| t.round() as i64)
    }

    fn y_to_price(&self, y: f64) -> Option<f64> {
        self.num("yToPrice", y)
    }

    fn visible_width(&self) -> f64 {
        call(&self.host, "visibleWidth", &[]).and_then(number).unwrap_or(0.0)
    }

    fn candle_near(&self, time: i64) -> Option<Ohlc> {
        let c = call(&self.host, "candleNear", &[JsValue::from_f64(time as f64)])?;
        if c.is_null() || c.is_undefined() {
            return None;
        }
        Some(Ohlc {
            open: field(&c, "open")?,
            high: field(&c, "high")?,
            low: field(&c, "low")?,
            close: field(&c, "close")?,
        })
    }

    fn subscribe(&self, kind: EventKind) -> SubscriptionId {
        let id = call(&self.host, "subscribe", &[JsValue::from_str(event_kind_name(kind))])
            .and_then(number)
            .unwrap_or(0.0);
        SubscriptionId(id as u64)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        call(&self.host, "unsubscribe", &[JsValue::from_f64(id.0 as f64)]);
    }

    fn set_pan_zoom_enabled(&self, enabled: bool) {
        call(&self.host, "setPanZoomEnabled", &[JsValue::from_bool(enabled)]);
    }

    fn cursor(&self) -> Cursor {
        call(&self.host, "cursor", &[])
            .and_then(|v| v.as_string())
            .map_or(Cursor::Default, |s| Cursor::from_css(&s))
    }

    fn set_cursor(&self, cursor: Cursor) {
        call(&self.host, "setCursor", &[JsValue::from_str(cursor.css())]);
    }
}

// ─── Store ───────────────────────────────────────────────────────────────

/// Cloned into each controller; clones share the request counter.
#[derive(Clone)]
pub struct JsStore {
    store: JsValue,
    next_request: Rc<Cell<u64>>,
}

impl JsStore {
    pub fn new(store: JsValue) -> Self {
        Self {
            store,
            next_request: Rc::new(Cell::new(0)),
        }
    }

    fn next_request(&self) -> RequestId {
        let n = self.next_request.get() + 1;
        self.next_request.set(n);
        RequestId(n)
    }
}

impl DrawingStore for JsStore {
    fn drawings(&self) -> Vec<Drawing> {
        let Some(list) = call(&self.store, "drawings", &[]) else {
            return Vec::new();
        };
        let Some(json) = JSON::stringify(&list).ok().and_then(|s| s.as_string()) else {
            return Vec::new();
        };
        match serde_json::from_str(&json) {
            Ok(drawings) => drawings,
            Err(e) => {
                log::warn!("store returned malformed drawings: {e}");
                Vec::new()
            }
        }
    }

    fn update(&mut self, id: DrawingId, points: &[DrawingPoint]) -> RequestId {
        let request = self.next_request();
        call(
            &self.store,
            "update",
            &[
                JsValue::from_f64(request.0 as f64),
                JsValue::from_str(id.as_str()),
                to_js(&points),
            ],
        );
        request
    }

    fn delete(&mut self, id: DrawingId) -> RequestId {
        let request = self.next_request();
        call(
            &self.store,
            "delete",
            &[JsValue::from_f64(request.0 as f64), JsValue::from_str(id.as_str())],
        );
        request
    }
}

impl CreationSink for JsStore {
    fn completed(&mut self, request: CreationRequest) {
        call(&self.store, "completed", &[to_js(&request)]);
    }

    fn cancelled(&mut self) {
        call(&self.store, "cancelled", &[]);
    }
}
