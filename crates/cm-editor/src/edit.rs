//! Selection and drag editing of persisted drawings.
//!
//! ```text
//! Deselected ⇄ Selected → PendingDrag → Dragging → Selected
//!                              │ (released under threshold)
//!                              └──────────→ toggle selection
//! ```
//!
//! A press over a drawing only *arms* a drag. Movement past
//! `drag_threshold_px` turns it into a real drag: the drawing is selected,
//! its points are snapshotted, and host pan/zoom is locked for the
//! duration. Releasing sends an update through the store; a later
//! rejection rolls the rendered points back to that snapshot.

use crate::input::InputEvent;
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::store::{DrawingStore, RequestId};
use cm_core::{
    CoordinateBridge, Cursor, CursorGuard, Drawing, DrawingId, DrawingKind, DrawingPoint, EventKind,
    InteractionConfig, PanZoomLock, PersistError, Points, SubscriptionSet, snapped_point,
};
use cm_render::{Attachment, HandleOverlayPrimitive, SharedLayer, hit_test, hit_test_drawing, hit_test_handle};
use kurbo::Point;
use std::rc::Rc;

const EDIT_EVENTS: &[EventKind] = &[
    EventKind::PointerMove,
    EventKind::PointerDown,
    EventKind::PointerUp,
    EventKind::KeyDown,
];

/// Which part of a drawing the pointer grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPart {
    /// Index into the drawing's handle positions.
    Handle(usize),
    Body,
}

/// Observable edit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPhase {
    Deselected,
    Selected(DrawingId),
    PendingDrag(DrawingId),
    Dragging(DrawingId, DragPart),
}

// ─── State ───────────────────────────────────────────────────────────────

/// The selected drawing and its handle overlay.
struct Selection {
    id: DrawingId,
    overlay: Attachment,
}

#[derive(Debug, Clone, Copy)]
struct Grab {
    id: DrawingId,
    kind: DrawingKind,
    part: DragPart,
    origin_px: Point,
    /// Unsnapped domain position of the press.
    origin: DrawingPoint,
}

struct Drag {
    selection: Selection,
    grab: Grab,
    snapshot: Points,
    current: Points,
    _pan_zoom: PanZoomLock,
    _cursor: CursorGuard,
}

enum EditState {
    Deselected,
    Selected(Selection),
    PendingDrag { selection: Option<Selection>, grab: Grab },
    Dragging(Drag),
}

/// An update sent to the store and not yet resolved.
struct InFlight {
    request: RequestId,
    id: DrawingId,
    snapshot: Points,
}

/// Held between `start` and `stop`.
struct Listening {
    subscriptions: SubscriptionSet,
    _cursor: CursorGuard,
}

// ─── Controller ──────────────────────────────────────────────────────────

pub struct EditController<S: DrawingStore> {
    bridge: Rc<dyn CoordinateBridge>,
    layer: SharedLayer,
    store: S,
    config: InteractionConfig,
    state: EditState,
    in_flight: Vec<InFlight>,
    pending_deletes: Vec<(RequestId, DrawingId)>,
    listening: Option<Listening>,
}

impl<S: DrawingStore> EditController<S> {
    pub fn new(bridge: Rc<dyn CoordinateBridge>, layer: SharedLayer, store: S, config: InteractionConfig) -> Self {
        Self {
            bridge,
            layer,
            store,
            config,
            state: EditState::Deselected,
            in_flight: Vec::new(),
            pending_deletes: Vec::new(),
            listening: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut InteractionConfig {
        &mut self.config
    }

    pub fn phase(&self) -> EditPhase {
        match &self.state {
            EditState::Deselected => EditPhase::Deselected,
            EditState::Selected(s) => EditPhase::Selected(s.id),
            EditState::PendingDrag { grab, .. } => EditPhase::PendingDrag(grab.id),
            EditState::Dragging(d) => EditPhase::Dragging(d.grab.id, d.grab.part),
        }
    }

    pub fn selected(&self) -> Option<DrawingId> {
        match &self.state {
            EditState::Deselected => None,
            EditState::Selected(s) => Some(s.id),
            EditState::PendingDrag { selection, .. } => selection.as_ref().map(|s| s.id),
            EditState::Dragging(d) => Some(d.selection.id),
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.is_some()
    }

    /// Updates sent to the store whose outcome is still unknown.
    pub fn in_flight_updates(&self) -> usize {
        self.in_flight.len()
    }

    pub fn start(&mut self) {
        if self.listening.is_some() {
            return;
        }
        self.listening = Some(Listening {
            subscriptions: SubscriptionSet::register(&self.bridge, EDIT_EVENTS),
            _cursor: CursorGuard::set(&self.bridge, Cursor::Default),
        });
        log::debug!("edit controller started");
    }

    /// Roll back any drag, drop the selection and release the host.
    pub fn stop(&mut self) {
        self.rollback_drag();
        self.state = EditState::Deselected;
        if self.listening.take().is_some() {
            log::debug!("edit controller stopped");
        }
    }

    /// Route one input event. Returns `true` if anything visible changed.
    pub fn handle(&mut self, event: &InputEvent) -> bool {
        let Some(listening) = &self.listening else {
            return false;
        };
        if !listening.subscriptions.is_listening(event.kind()) {
            return false;
        }
        match event {
            InputEvent::PointerDown { x, y, .. } => self.on_pointer_down(Point::new(*x, *y)),
            InputEvent::PointerMove { x, y, .. } => self.on_pointer_move(Point::new(*x, *y)),
            InputEvent::PointerUp { .. } => self.on_pointer_up(),
            InputEvent::Key { .. } => match ShortcutMap::resolve_event(event) {
                Some(ShortcutAction::Delete) => self.delete_selected(),
                Some(ShortcutAction::Cancel) => self.cancel(),
                _ => false,
            },
            InputEvent::Click { .. } => false,
        }
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Select `id`, replacing any current selection. Ignored mid-gesture.
    pub fn select(&mut self, id: DrawingId) -> bool {
        if !matches!(self.state, EditState::Deselected | EditState::Selected(_)) {
            return false;
        }
        let Some(drawing) = self.store.get(id) else {
            log::debug!("cannot select {id}: not in store");
            return false;
        };
        drop(self.take_selection());
        self.state = EditState::Selected(self.make_selection(&drawing));
        log::debug!("selected {id}");
        true
    }

    pub fn deselect(&mut self) -> bool {
        match self.take_selection() {
            Some(s) => {
                log::debug!("deselected {}", s.id);
                true
            }
            None => false,
        }
    }

    /// Moves the state out, leaving `Deselected`. Not for use mid-drag.
    fn take_selection(&mut self) -> Option<Selection> {
        match std::mem::replace(&mut self.state, EditState::Deselected) {
            EditState::Deselected => None,
            EditState::Selected(s) => Some(s),
            EditState::PendingDrag { selection, .. } => selection,
            EditState::Dragging(drag) => {
                self.state = EditState::Dragging(drag);
                None
            }
        }
    }

    fn make_selection(&self, drawing: &Drawing) -> Selection {
        let overlay = Attachment::attach(
            &self.layer,
            Box::new(HandleOverlayPrimitive::new(
                drawing.kind,
                &drawing.points,
                drawing.style.line_color,
                self.config.max_render_retries,
            )),
        );
        Selection {
            id: drawing.id,
            overlay,
        }
    }

    // ─── Pointer ─────────────────────────────────────────────────────────

    fn on_pointer_down(&mut self, pos: Point) -> bool {
        if matches!(self.state, EditState::PendingDrag { .. } | EditState::Dragging(_)) {
            return false;
        }
        let drawings = self.store.drawings();
        let host = Rc::clone(&self.bridge);
        let bridge = host.as_ref();
        let mut target: Option<(&Drawing, DragPart)> = None;

        // Handles and body of the selected drawing win over everything else.
        if let Some(id) = self.selected() {
            match drawings.iter().find(|d| d.id == id) {
                Some(d) => {
                    if let Some(i) = hit_test_handle(d, bridge, pos, self.config.handle_radius_px) {
                        target = Some((d, DragPart::Handle(i)));
                    } else if hit_test_drawing(d, bridge, pos, self.config.hit_tolerance_px) {
                        target = Some((d, DragPart::Body));
                    }
                }
                None => {
                    log::debug!("selected drawing {id} left the store");
                    self.deselect();
                }
            }
        }
        if target.is_none() {
            target = hit_test(&drawings, bridge, pos, self.config.hit_tolerance_px)
                .and_then(|id| drawings.iter().find(|d| d.id == id))
                .map(|d| (d, DragPart::Body));
        }

        let Some((drawing, part)) = target else {
            // Press on empty chart space.
            return self.deselect();
        };
        let Some(origin) = bridge.to_domain(pos.x, pos.y) else {
            return false;
        };
        let grab = Grab {
            id: drawing.id,
            kind: drawing.kind,
            part,
            origin_px: pos,
            origin,
        };
        let selection = self.take_selection();
        self.state = EditState::PendingDrag { selection, grab };
        log::debug!("drag armed on {} ({part:?})", grab.id);
        false
    }

    fn on_pointer_move(&mut self, pos: Point) -> bool {
        match &self.state {
            EditState::PendingDrag { grab, .. } => {
                if pos.distance(grab.origin_px) <= self.config.drag_threshold_px {
                    return false;
                }
                self.begin_drag(pos)
            }
            EditState::Dragging(_) => self.update_drag(pos),
            EditState::Deselected | EditState::Selected(_) => {
                let cursor = self.hover_cursor(pos);
                if self.bridge.cursor() != cursor {
                    self.bridge.set_cursor(cursor);
                }
                false
            }
        }
    }

    fn on_pointer_up(&mut self) -> bool {
        match std::mem::replace(&mut self.state, EditState::Deselected) {
            EditState::Dragging(drag) => {
                self.finish_drag(drag);
                true
            }
            // Released under the threshold: a click toggles selection.
            EditState::PendingDrag { selection, grab } => match selection {
                Some(s) if s.id == grab.id => {
                    drop(s);
                    log::debug!("deselected {}", grab.id);
                    true
                }
                other => {
                    drop(other);
                    if let Some(drawing) = self.store.get(grab.id) {
                        self.state = EditState::Selected(self.make_selection(&drawing));
                        log::debug!("selected {}", grab.id);
                    }
                    true
                }
            },
            other => {
                self.state = other;
                false
            }
        }
    }

    fn hover_cursor(&self, pos: Point) -> Cursor {
        let drawings = self.store.drawings();
        let bridge = self.bridge.as_ref();
        if let Some(id) = self.selected()
            && let Some(d) = drawings.iter().find(|d| d.id == id)
        {
            if hit_test_handle(d, bridge, pos, self.config.handle_radius_px).is_some() {
                return Cursor::Grab;
            }
            if hit_test_drawing(d, bridge, pos, self.config.hit_tolerance_px) {
                return Cursor::Move;
            }
        }
        if hit_test(&drawings, bridge, pos, self.config.hit_tolerance_px).is_some() {
            Cursor::Pointer
        } else {
            Cursor::Default
        }
    }

    // ─── Drag lifecycle ──────────────────────────────────────────────────

    fn begin_drag(&mut self, pos: Point) -> bool {
        let EditState::PendingDrag { selection, grab } = std::mem::replace(&mut self.state, EditState::Deselected)
        else {
            return false;
        };
        let Some(drawing) = self.store.get(grab.id) else {
            log::debug!("drag target {} left the store", grab.id);
            if let Some(s) = selection {
                self.state = EditState::Selected(s);
            }
            return false;
        };
        let selection = match selection {
            Some(s) if s.id == grab.id => s,
            other => {
                drop(other);
                self.make_selection(&drawing)
            }
        };
        let snapshot = drawing.points.clone();
        self.state = EditState::Dragging(Drag {
            selection,
            grab,
            current: snapshot.clone(),
            snapshot,
            _pan_zoom: PanZoomLock::acquire(&self.bridge),
            _cursor: CursorGuard::set(&self.bridge, Cursor::Grabbing),
        });
        log::debug!("drag started on {} ({:?})", grab.id, grab.part);
        self.update_drag(pos);
        true
    }

    fn update_drag(&mut self, pos: Point) -> bool {
        let EditState::Dragging(drag) = &mut self.state else {
            return false;
        };
        let bridge = self.bridge.as_ref();
        let next: Points = match drag.grab.part {
            DragPart::Handle(i) => {
                let Some(cursor) = snapped_point(bridge, &self.config, pos.x, pos.y) else {
                    return false;
                };
                let mut pts = drag.current.clone();
                let Some(slot) = pts.get_mut(i) else {
                    return false;
                };
                *slot = match drag.grab.kind {
                    DrawingKind::HorizontalLine => DrawingPoint::new(slot.time, cursor.price),
                    _ => cursor,
                };
                pts
            }
            DragPart::Body => {
                let Some(cursor) = bridge.to_domain(pos.x, pos.y) else {
                    return false;
                };
                let dt = match drag.grab.kind {
                    DrawingKind::HorizontalLine => 0,
                    _ => cursor.time - drag.grab.origin.time,
                };
                let dp = cursor.price - drag.grab.origin.price;
                drag.snapshot.iter().map(|p| p.offset(dt, dp)).collect()
            }
        };
        if next == drag.current {
            return false;
        }
        log::trace!("drag {} -> {:?}", drag.grab.id, next);
        if let Some(p) = self.layer.borrow_mut().drawing_mut(drag.grab.id) {
            p.update_points(&next);
        }
        drag.selection.overlay.update_points(&next);
        drag.current = next;
        true
    }

    fn finish_drag(&mut self, drag: Drag) {
        let Drag {
            selection,
            grab,
            snapshot,
            current,
            _pan_zoom: pan_zoom,
            _cursor: cursor,
        } = drag;
        drop(cursor);
        drop(pan_zoom);

        if current != snapshot {
            let request = self.store.update(grab.id, &current);
            log::debug!("drag on {} committed as {request}", grab.id);
            self.in_flight.push(InFlight {
                request,
                id: grab.id,
                snapshot,
            });
        } else {
            log::debug!("drag on {} ended where it started", grab.id);
        }
        self.state = EditState::Selected(selection);
    }

    /// Put a running drag's points back and return to `Selected`.
    fn rollback_drag(&mut self) -> bool {
        let drag = match std::mem::replace(&mut self.state, EditState::Deselected) {
            EditState::Dragging(drag) => drag,
            other => {
                self.state = other;
                return false;
            }
        };
        if let Some(p) = self.layer.borrow_mut().drawing_mut(drag.grab.id) {
            p.update_points(&drag.snapshot);
        }
        drag.selection.overlay.update_points(&drag.snapshot);
        log::debug!("drag on {} rolled back", drag.grab.id);
        self.state = EditState::Selected(drag.selection);
        true
    }

    // ─── Keyboard ────────────────────────────────────────────────────────

    fn delete_selected(&mut self) -> bool {
        let EditState::Selected(selection) = &self.state else {
            return false;
        };
        let id = selection.id;
        // Cleared before the store answers; a rejected delete leaves
        // nothing selected.
        self.deselect();
        let request = self.store.delete(id);
        log::debug!("delete of {id} sent as {request}");
        self.pending_deletes.push((request, id));
        true
    }

    fn cancel(&mut self) -> bool {
        match std::mem::replace(&mut self.state, EditState::Deselected) {
            EditState::Dragging(drag) => {
                self.state = EditState::Dragging(drag);
                self.rollback_drag()
            }
            EditState::PendingDrag { selection, .. } => {
                if let Some(s) = selection {
                    self.state = EditState::Selected(s);
                }
                true
            }
            EditState::Selected(s) => {
                log::debug!("deselected {}", s.id);
                true
            }
            EditState::Deselected => false,
        }
    }

    // ─── Persistence outcomes ────────────────────────────────────────────

    /// Report the outcome of an update. A rejection restores the rendered
    /// points (and the overlay, if still selected) to the pre-drag
    /// snapshot. Returns `true` if anything was rolled back.
    pub fn resolve_update(&mut self, request: RequestId, result: Result<(), PersistError>) -> bool {
        let Some(pos) = self.in_flight.iter().position(|f| f.request == request) else {
            log::warn!("outcome for unknown update {request}");
            return false;
        };
        let flight = self.in_flight.remove(pos);
        match result {
            Ok(()) => {
                log::debug!("update {request} of {} persisted", flight.id);
                false
            }
            Err(e) => {
                log::warn!("update {request} of {} rejected: {e}", flight.id);
                self.restore_points(flight.id, &flight.snapshot);
                true
            }
        }
    }

    /// Report the outcome of a delete. Selection was already cleared.
    pub fn resolve_delete(&mut self, request: RequestId, result: Result<(), PersistError>) {
        let Some(pos) = self.pending_deletes.iter().position(|(r, _)| *r == request) else {
            log::warn!("outcome for unknown delete {request}");
            return;
        };
        let (_, id) = self.pending_deletes.remove(pos);
        match result {
            Ok(()) => log::debug!("delete {request} of {id} persisted"),
            Err(e) => log::warn!("delete {request} of {id} rejected: {e}"),
        }
    }

    fn restore_points(&mut self, id: DrawingId, points: &[DrawingPoint]) {
        if let Some(p) = self.layer.borrow_mut().drawing_mut(id) {
            p.update_points(points);
        }
        if let EditState::Selected(s) = &self.state
            && s.id == id
        {
            s.overlay.update_points(points);
        }
    }
}

impl<S: DrawingStore> Drop for EditController<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use cm_core::DrawingStyle;
    use cm_core::testing::FakeBridge;
    use cm_render::DrawingLayer;
    use std::cell::RefCell;

    fn setup() -> (Rc<FakeBridge>, SharedLayer, EditController<MemoryStore>) {
        let bridge = Rc::new(FakeBridge::identity(800.0));
        let layer: SharedLayer = Rc::new(RefCell::new(DrawingLayer::new(3)));
        let line = Drawing::new(
            DrawingId::intern("edit_unit_hl"),
            DrawingKind::HorizontalLine,
            &[DrawingPoint::new(0, 200.0)],
            DrawingStyle::default_for(DrawingKind::HorizontalLine),
        );
        let store = MemoryStore::with_drawings(vec![line]);
        layer.borrow_mut().sync(&store.drawings());
        let dyn_bridge: Rc<dyn CoordinateBridge> = bridge.clone();
        let mut edit = EditController::new(dyn_bridge, Rc::clone(&layer), store, InteractionConfig::default());
        edit.start();
        (bridge, layer, edit)
    }

    #[test]
    fn press_on_empty_space_deselects() {
        let (_bridge, _layer, mut edit) = setup();
        assert!(edit.select(DrawingId::intern("edit_unit_hl")));
        edit.handle(&InputEvent::pointer_down(100.0, 500.0));
        assert_eq!(edit.phase(), EditPhase::Deselected);
    }

    #[test]
    fn escape_during_pending_drag_keeps_prior_selection() {
        let (_bridge, _layer, mut edit) = setup();
        let id = DrawingId::intern("edit_unit_hl");
        edit.select(id);
        edit.handle(&InputEvent::pointer_down(100.0, 200.0));
        assert_eq!(edit.phase(), EditPhase::PendingDrag(id));
        edit.handle(&InputEvent::key("Escape"));
        assert_eq!(edit.phase(), EditPhase::Selected(id));
    }

    #[test]
    fn hover_cursor_tracks_targets() {
        let (bridge, _layer, mut edit) = setup();
        edit.handle(&InputEvent::pointer_move(100.0, 202.0));
        assert_eq!(bridge.cursor(), Cursor::Pointer);

        edit.select(DrawingId::intern("edit_unit_hl"));
        edit.handle(&InputEvent::pointer_move(100.0, 202.0));
        assert_eq!(bridge.cursor(), Cursor::Move);
        // The horizontal line's handle sits at mid-width.
        edit.handle(&InputEvent::pointer_move(400.0, 203.0));
        assert_eq!(bridge.cursor(), Cursor::Grab);

        edit.handle(&InputEvent::pointer_move(100.0, 400.0));
        assert_eq!(bridge.cursor(), Cursor::Default);
    }

    #[test]
    fn ignores_events_before_start() {
        let (_bridge, _layer, mut edit) = setup();
        edit.stop();
        assert!(!edit.handle(&InputEvent::pointer_down(100.0, 200.0)));
        assert_eq!(edit.phase(), EditPhase::Deselected);
    }
}
