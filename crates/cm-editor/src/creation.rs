//! Multi-click construction of one drawing.
//!
//! `Idle → Collecting(k of N) → Completed | Cancelled`
//!
//! While collecting, the controller shows a crosshair and keeps a preview
//! primitive in step with the snapped cursor. Reaching N clicks or pressing
//! Escape tears the session down before the sink hears about it.

use crate::input::InputEvent;
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::store::CreationSink;
use cm_core::{
    CoordinateBridge, CreationRequest, Cursor, CursorGuard, DrawingKind, DrawingPoint, DrawingStyle, EventKind,
    InteractionConfig, Points, SubscriptionSet, snapped_point,
};
use cm_render::{Attachment, SharedLayer, primitive_for};
use kurbo::Point;
use std::rc::Rc;

const CREATION_EVENTS: &[EventKind] = &[EventKind::PointerMove, EventKind::Click, EventKind::KeyDown];

/// Observable progress of a creation flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationPhase {
    Idle,
    Collecting { collected: usize, required: usize },
    Completed,
    Cancelled,
}

/// Everything owned while collecting. Dropping it undoes `start`.
struct Session {
    committed: Points,
    preview: Attachment,
    subscriptions: SubscriptionSet,
    _cursor: CursorGuard,
}

enum CreationState {
    Idle,
    Collecting(Session),
    Completed,
    Cancelled,
}

pub struct CreationController<S: CreationSink> {
    bridge: Rc<dyn CoordinateBridge>,
    layer: SharedLayer,
    sink: S,
    kind: DrawingKind,
    config: InteractionConfig,
    state: CreationState,
}

impl<S: CreationSink> CreationController<S> {
    pub fn new(
        bridge: Rc<dyn CoordinateBridge>,
        layer: SharedLayer,
        sink: S,
        kind: DrawingKind,
        config: InteractionConfig,
    ) -> Self {
        Self {
            bridge,
            layer,
            sink,
            kind,
            config,
            state: CreationState::Idle,
        }
    }

    pub fn kind(&self) -> DrawingKind {
        self.kind
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    /// Takes effect from the next pointer event, mid-session included.
    pub fn config_mut(&mut self) -> &mut InteractionConfig {
        &mut self.config
    }

    pub fn phase(&self) -> CreationPhase {
        match &self.state {
            CreationState::Idle => CreationPhase::Idle,
            CreationState::Collecting(s) => CreationPhase::Collecting {
                collected: s.committed.len(),
                required: self.kind.required_points(),
            },
            CreationState::Completed => CreationPhase::Completed,
            CreationState::Cancelled => CreationPhase::Cancelled,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, CreationState::Collecting(_))
    }

    /// Points the preview currently shows. Empty when not collecting or
    /// before the first pointer move.
    pub fn preview_points(&self) -> Vec<DrawingPoint> {
        match &self.state {
            CreationState::Collecting(s) => s.preview.points(),
            _ => Vec::new(),
        }
    }

    /// Begin collecting. A running session is left untouched.
    pub fn start(&mut self) {
        if self.is_active() {
            log::debug!("{} creation already collecting", self.kind);
            return;
        }
        let preview = Attachment::attach(
            &self.layer,
            primitive_for(
                self.kind,
                &[],
                DrawingStyle::default_for(self.kind),
                self.config.max_render_retries,
            ),
        );
        self.state = CreationState::Collecting(Session {
            committed: Points::new(),
            preview,
            subscriptions: SubscriptionSet::register(&self.bridge, CREATION_EVENTS),
            _cursor: CursorGuard::set(&self.bridge, Cursor::Crosshair),
        });
        log::debug!("{} creation started", self.kind);
    }

    /// Tear down without notifying the sink (tool switch, unmount).
    pub fn stop(&mut self) {
        if self.is_active() {
            log::debug!("{} creation stopped", self.kind);
            self.state = CreationState::Idle;
        }
    }

    /// Route one input event. Returns `true` if anything visible changed.
    pub fn handle(&mut self, event: &InputEvent) -> bool {
        let CreationState::Collecting(session) = &self.state else {
            return false;
        };
        if !session.subscriptions.is_listening(event.kind()) {
            return false;
        }
        match event {
            InputEvent::PointerMove { x, y, .. } => self.on_pointer_move(Point::new(*x, *y)),
            InputEvent::Click { x, y, .. } => self.on_click(Point::new(*x, *y)),
            InputEvent::Key { .. } => match ShortcutMap::resolve_event(event) {
                Some(ShortcutAction::Cancel) => {
                    self.cancel();
                    true
                }
                _ => false,
            },
            _ => false,
        }
    }

    fn on_pointer_move(&mut self, pos: Point) -> bool {
        let CreationState::Collecting(session) = &self.state else {
            return false;
        };
        let Some(candidate) = snapped_point(self.bridge.as_ref(), &self.config, pos.x, pos.y) else {
            return false;
        };
        let points = preview_points(self.kind, &session.committed, candidate);
        log::trace!("{} preview {:?}", self.kind, points);
        session.preview.update_points(&points);
        true
    }

    fn on_click(&mut self, pos: Point) -> bool {
        let CreationState::Collecting(session) = &mut self.state else {
            return false;
        };
        let Some(point) = snapped_point(self.bridge.as_ref(), &self.config, pos.x, pos.y) else {
            log::debug!("click at ({:.1}, {:.1}) not convertible, ignored", pos.x, pos.y);
            return false;
        };
        session.committed.push(point);
        let required = self.kind.required_points();
        log::debug!("{} point {}/{required} at {point:?}", self.kind, session.committed.len());

        if session.committed.len() < required {
            let points = preview_points(self.kind, &session.committed, point);
            session.preview.update_points(&points);
            return true;
        }

        let points = std::mem::take(&mut session.committed);
        self.state = CreationState::Completed;
        let request = CreationRequest {
            kind: self.kind,
            points,
            style: DrawingStyle::default_for(self.kind),
        };
        log::debug!("{} creation completed", self.kind);
        self.sink.completed(request);
        true
    }

    fn cancel(&mut self) {
        self.state = CreationState::Cancelled;
        log::debug!("{} creation cancelled", self.kind);
        self.sink.cancelled();
    }
}

/// Tool-specific partial point set shown while collecting. Uncommitted
/// slots follow the cursor; the channel's third slot repeats p0 until the
/// second click lands.
fn preview_points(kind: DrawingKind, committed: &[DrawingPoint], cursor: DrawingPoint) -> Points {
    match (kind, committed) {
        (DrawingKind::HorizontalLine, _) => Points::from_slice(&[cursor]),
        (DrawingKind::Ray, []) => Points::from_slice(&[cursor, cursor]),
        (DrawingKind::Ray, [p0, ..]) => Points::from_slice(&[*p0, cursor]),
        (DrawingKind::ParallelChannel, []) => Points::from_slice(&[cursor, cursor, cursor]),
        (DrawingKind::ParallelChannel, [p0]) => Points::from_slice(&[*p0, cursor, *p0]),
        (DrawingKind::ParallelChannel, [p0, p1, ..]) => Points::from_slice(&[*p0, *p1, cursor]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn p(time: i64, price: f64) -> DrawingPoint {
        DrawingPoint::new(time, price)
    }

    #[test]
    fn channel_preview_duplicates_first_point() {
        let c = p(9, 9.0);
        assert_eq!(
            preview_points(DrawingKind::ParallelChannel, &[], c).to_vec(),
            vec![c, c, c]
        );
        assert_eq!(
            preview_points(DrawingKind::ParallelChannel, &[p(1, 1.0)], c).to_vec(),
            vec![p(1, 1.0), c, p(1, 1.0)]
        );
        assert_eq!(
            preview_points(DrawingKind::ParallelChannel, &[p(1, 1.0), p(2, 2.0)], c).to_vec(),
            vec![p(1, 1.0), p(2, 2.0), c]
        );
    }

    #[test]
    fn ray_preview_anchors_first_point() {
        let c = p(5, 5.0);
        assert_eq!(preview_points(DrawingKind::Ray, &[], c).to_vec(), vec![c, c]);
        assert_eq!(
            preview_points(DrawingKind::Ray, &[p(1, 1.0)], c).to_vec(),
            vec![p(1, 1.0), c]
        );
    }

    #[test]
    fn horizontal_preview_is_the_cursor() {
        let c = p(3, 3.0);
        assert_eq!(preview_points(DrawingKind::HorizontalLine, &[], c).to_vec(), vec![c]);
    }
}
