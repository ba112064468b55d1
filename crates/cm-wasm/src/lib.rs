//! WASM bridge for Chartmark: exposes the drawing engine to the browser
//! chart host.
//!
//! Compiled via `wasm-pack build --target web`. The page hands over two JS
//! objects: a *host* (coordinate conversions, event registration, cursor,
//! pan/zoom) and a *store* (persisted drawings and their REST calls).
//! `ChartDrawing` routes DOM events to whichever controller is active and
//! paints the drawing layer onto an overlay canvas.

mod js;
mod render2d;

use cm_core::{CoordinateBridge, DrawingId, DrawingKind, InteractionConfig, PersistError};
use cm_editor::{
    CreationController, DrawingStore, EditController, InputEvent, Modifiers, RequestId, ShortcutAction, ShortcutMap,
};
use cm_render::{DrawingLayer, SharedLayer};
use js::{JsBridge, JsStore};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use web_sys::CanvasRenderingContext2d;

/// The main WASM-facing drawing controller.
///
/// Exactly one controller consumes input at a time: the edit controller
/// by default, a creation controller while a tool is active. The edit
/// controller survives tool sessions so pending update rollbacks are kept.
#[wasm_bindgen]
pub struct ChartDrawing {
    bridge: Rc<dyn CoordinateBridge>,
    layer: SharedLayer,
    store: JsStore,
    config: InteractionConfig,
    edit: EditController<JsStore>,
    creation: Option<CreationController<JsStore>>,
}

#[wasm_bindgen]
impl ChartDrawing {
    #[wasm_bindgen(constructor)]
    pub fn new(host: JsValue, store: JsValue) -> Self {
        console_error_panic_hook_setup();

        let config = InteractionConfig::default();
        let bridge: Rc<dyn CoordinateBridge> = Rc::new(JsBridge::new(host));
        let layer: SharedLayer = Rc::new(RefCell::new(DrawingLayer::new(config.max_render_retries)));
        let store = JsStore::new(store);
        let mut edit = EditController::new(Rc::clone(&bridge), Rc::clone(&layer), store.clone(), config.clone());
        edit.start();

        let mut chart = Self {
            bridge,
            layer,
            store,
            config,
            edit,
            creation: None,
        };
        chart.sync();
        chart
    }

    // ─── Configuration ───────────────────────────────────────────────────

    /// Replace the interaction config. Returns `{"ok":true}` or
    /// `{"ok":false,"error":"..."}`.
    pub fn set_config_json(&mut self, json: &str) -> String {
        let config: InteractionConfig = match serde_json::from_str(json) {
            Ok(c) => c,
            Err(e) => return error_json(&e.to_string()),
        };
        if let Err(e) = config.validate() {
            return error_json(&e.to_string());
        }
        *self.edit.config_mut() = config.clone();
        if let Some(creation) = self.creation.as_mut() {
            *creation.config_mut() = config.clone();
        }
        self.config = config;
        r#"{"ok":true}"#.to_string()
    }

    pub fn get_config_json(&self) -> String {
        serde_json::to_string(&self.config).unwrap_or_default()
    }

    // ─── Store ───────────────────────────────────────────────────────────

    /// Re-read the store's drawings into the layer. Call after the store's
    /// list changed (creation saved, update/delete resolved, reload).
    pub fn sync(&mut self) {
        let drawings = self.store.drawings();
        self.layer.borrow_mut().sync(&drawings);
    }

    /// Outcome of an update the store was asked to persist.
    /// Returns `true` if the drawing was rolled back (re-render).
    pub fn resolve_update(&mut self, request: f64, ok: bool, reason: &str) -> bool {
        self.edit.resolve_update(request_id(request), outcome(ok, reason))
    }

    pub fn resolve_delete(&mut self, request: f64, ok: bool, reason: &str) {
        self.edit.resolve_delete(request_id(request), outcome(ok, reason));
    }

    // ─── Tools ───────────────────────────────────────────────────────────

    /// Start creating a drawing of `name` (`"horizontal_line"`, `"ray"`,
    /// `"parallel_channel"`). Any running tool is stopped first.
    pub fn start_tool(&mut self, name: &str) -> bool {
        let Some(kind) = DrawingKind::from_name(name) else {
            log::warn!("unknown drawing tool {name:?}");
            return false;
        };
        self.begin_creation(kind);
        true
    }

    /// Abandon the active tool without notifying the store.
    pub fn cancel_tool(&mut self) -> bool {
        match self.creation.take() {
            Some(mut creation) => {
                creation.stop();
                drop(creation);
                self.edit.start();
                true
            }
            None => false,
        }
    }

    /// Name of the active tool, or `"select"` while editing.
    pub fn get_tool_name(&self) -> String {
        self.creation
            .as_ref()
            .map_or("select", |c| c.kind().name())
            .to_string()
    }

    pub fn is_magnet_enabled(&self) -> bool {
        self.config.magnet_enabled
    }

    pub fn set_magnet_enabled(&mut self, enabled: bool) {
        self.config.magnet_enabled = enabled;
        self.edit.config_mut().magnet_enabled = enabled;
        if let Some(creation) = self.creation.as_mut() {
            creation.config_mut().magnet_enabled = enabled;
        }
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Get the currently selected drawing ID, or empty string if none.
    pub fn get_selected_id(&self) -> String {
        self.edit
            .selected()
            .map(|id| id.as_str().to_string())
            .unwrap_or_default()
    }

    pub fn select_by_id(&mut self, id: &str) -> bool {
        self.creation.is_none() && self.edit.select(DrawingId::intern(id))
    }

    pub fn deselect(&mut self) -> bool {
        self.edit.deselect()
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// Handle pointer down. Returns a JSON string:
    /// `{"changed":bool,"tool":"<name>","toolSwitched":bool}`
    pub fn handle_pointer_down(&mut self, x: f64, y: f64, shift: bool, ctrl: bool, alt: bool, meta: bool) -> String {
        let modifiers = mods(shift, ctrl, alt, meta);
        self.dispatch(InputEvent::PointerDown { x, y, modifiers })
    }

    pub fn handle_pointer_move(&mut self, x: f64, y: f64, shift: bool, ctrl: bool, alt: bool, meta: bool) -> String {
        let modifiers = mods(shift, ctrl, alt, meta);
        self.dispatch(InputEvent::PointerMove { x, y, modifiers })
    }

    pub fn handle_pointer_up(&mut self, x: f64, y: f64, shift: bool, ctrl: bool, alt: bool, meta: bool) -> String {
        let modifiers = mods(shift, ctrl, alt, meta);
        self.dispatch(InputEvent::PointerUp { x, y, modifiers })
    }

    pub fn handle_click(&mut self, x: f64, y: f64, shift: bool, ctrl: bool, alt: bool, meta: bool) -> String {
        let modifiers = mods(shift, ctrl, alt, meta);
        self.dispatch(InputEvent::Click { x, y, modifiers })
    }

    /// Handle a keyboard event. Tool and magnet shortcuts are handled
    /// here; Delete/Escape go to the active controller.
    pub fn handle_key(&mut self, key: &str, ctrl: bool, shift: bool, alt: bool, meta: bool) -> String {
        let tool_before = self.creation.as_ref().map(|c| c.kind());
        match ShortcutMap::resolve(key, ctrl, shift, alt, meta) {
            Some(ShortcutAction::ToolHorizontalLine) => self.begin_creation(DrawingKind::HorizontalLine),
            Some(ShortcutAction::ToolRay) => self.begin_creation(DrawingKind::Ray),
            Some(ShortcutAction::ToolParallelChannel) => self.begin_creation(DrawingKind::ParallelChannel),
            Some(ShortcutAction::ToggleMagnet) => {
                let enabled = !self.config.magnet_enabled;
                self.set_magnet_enabled(enabled);
            }
            Some(ShortcutAction::Delete | ShortcutAction::Cancel) | None => {
                let modifiers = Modifiers {
                    shift,
                    ctrl,
                    alt,
                    meta,
                };
                return self.dispatch(InputEvent::Key {
                    key: key.to_string(),
                    modifiers,
                });
            }
        }
        let tool_after = self.creation.as_ref().map(|c| c.kind());
        self.status_json(tool_before != tool_after, tool_before != tool_after)
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    /// Paint the layer onto the overlay canvas.
    pub fn render(&self, ctx: &CanvasRenderingContext2d, width: f64, height: f64) {
        let frames = self.layer.borrow_mut().render(self.bridge.as_ref());
        render2d::render_frames(ctx, &frames, width, height);
    }

    /// A primitive skipped a frame and wants another animation tick.
    pub fn wants_redraw(&self) -> bool {
        self.layer.borrow().wants_redraw()
    }
}

impl ChartDrawing {
    fn begin_creation(&mut self, kind: DrawingKind) {
        if let Some(mut previous) = self.creation.take() {
            previous.stop();
        }
        self.edit.stop();
        let mut creation = CreationController::new(
            Rc::clone(&self.bridge),
            Rc::clone(&self.layer),
            self.store.clone(),
            kind,
            self.config.clone(),
        );
        creation.start();
        self.creation = Some(creation);
    }

    /// Route one event to the active controller. A creation that finished
    /// hands input back to the edit controller.
    fn dispatch(&mut self, event: InputEvent) -> String {
        let Some(creation) = self.creation.as_mut() else {
            let changed = self.edit.handle(&event);
            return self.status_json(changed, false);
        };
        let changed = creation.handle(&event);
        if creation.is_active() {
            return self.status_json(changed, false);
        }
        self.creation = None;
        self.sync();
        self.edit.start();
        self.status_json(true, true)
    }

    fn status_json(&self, changed: bool, tool_switched: bool) -> String {
        serde_json::json!({
            "changed": changed,
            "tool": self.get_tool_name(),
            "toolSwitched": tool_switched,
        })
        .to_string()
    }
}

fn mods(shift: bool, ctrl: bool, alt: bool, meta: bool) -> Modifiers {
    Modifiers {
        shift,
        ctrl,
        alt,
        meta,
    }
}

fn request_id(raw: f64) -> RequestId {
    RequestId(raw.max(0.0) as u64)
}

fn outcome(ok: bool, reason: &str) -> Result<(), PersistError> {
    if ok {
        Ok(())
    } else {
        Err(PersistError::Rejected(reason.to_string()))
    }
}

fn error_json(message: &str) -> String {
    serde_json::json!({ "ok": false, "error": message }).to_string()
}

// ─── Panic hook for WASM debugging ───────────────────────────────────────

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Chartmark WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── Standalone helpers (no chart needed) ────────────────────────────────

/// Default style of a drawing type as JSON, or `null` for unknown types.
#[wasm_bindgen]
pub fn default_style_json(kind: &str) -> String {
    DrawingKind::from_name(kind)
        .and_then(|k| serde_json::to_string(&cm_core::DrawingStyle::default_for(k)).ok())
        .unwrap_or_else(|| "null".to_string())
}

/// Check a persisted drawing. Returns `{"ok":true}` or
/// `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate_drawing(json: &str) -> String {
    match serde_json::from_str::<cm_core::Drawing>(json) {
        Ok(d) => match d.validate() {
            Ok(()) => r#"{"ok":true}"#.to_string(),
            Err(e) => error_json(&e.to_string()),
        },
        Err(e) => error_json(&e.to_string()),
    }
}
