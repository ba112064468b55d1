//! Integration tests: creation flows (cm-editor).
//!
//! Drives `CreationController` with raw input events against a fake host
//! bridge and checks what reaches the sink, what stays attached to the
//! layer, and what the host is left with afterwards.

use cm_core::testing::FakeBridge;
use cm_core::{CoordinateBridge, CreationRequest, Cursor, DrawingId, DrawingKind, DrawingPoint, EventKind, InteractionConfig};
use cm_editor::{CreationController, CreationPhase, CreationSink, InputEvent};
use cm_render::{DrawingLayer, SharedLayer};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Default)]
struct RecordingSink {
    completed: Vec<CreationRequest>,
    cancelled: usize,
}

impl CreationSink for RecordingSink {
    fn completed(&mut self, request: CreationRequest) {
        self.completed.push(request);
    }

    fn cancelled(&mut self) {
        self.cancelled += 1;
    }
}

struct Fixture {
    bridge: Rc<FakeBridge>,
    layer: SharedLayer,
    creation: CreationController<RecordingSink>,
}

fn fixture(kind: DrawingKind, bridge: FakeBridge) -> Fixture {
    let bridge = Rc::new(bridge);
    let layer: SharedLayer = Rc::new(RefCell::new(DrawingLayer::new(3)));
    let dyn_bridge: Rc<dyn CoordinateBridge> = bridge.clone();
    let creation = CreationController::new(
        dyn_bridge,
        Rc::clone(&layer),
        RecordingSink::default(),
        kind,
        InteractionConfig::default(),
    );
    Fixture { bridge, layer, creation }
}

fn assert_torn_down(f: &Fixture, prior_cursor: Cursor) {
    assert_eq!(f.bridge.live_subscriptions(), 0, "subscriptions leaked");
    assert_eq!(f.layer.borrow().overlay_count(), 0, "preview left attached");
    assert_eq!(f.bridge.cursor(), prior_cursor, "cursor not restored");
}

// ─── Scenarios ──────────────────────────────────────────────────────────

#[test]
fn horizontal_line_single_click() {
    let mut f = fixture(DrawingKind::HorizontalLine, FakeBridge::identity(2000.0));
    f.creation.start();
    f.creation.handle(&InputEvent::click(1000.0, 150.25));

    assert_eq!(f.creation.phase(), CreationPhase::Completed);
    assert_eq!(f.creation.sink().completed.len(), 1);
    let json = serde_json::to_value(&f.creation.sink().completed[0]).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "type": "HORIZONTAL_LINE",
            "points": [{ "time": 1000, "price": 150.25 }],
            "style": {
                "lineColor": "#787b86",
                "lineWidth": 1,
                "dashed": true,
                "showPriceLabel": true
            }
        })
    );
}

#[test]
fn completion_needs_exactly_the_required_clicks() {
    for (kind, required) in [
        (DrawingKind::HorizontalLine, 1),
        (DrawingKind::Ray, 2),
        (DrawingKind::ParallelChannel, 3),
    ] {
        let mut f = fixture(kind, FakeBridge::identity(800.0));
        f.creation.start();
        for i in 0..required {
            assert!(f.creation.sink().completed.is_empty(), "{kind} completed early");
            assert_eq!(
                f.creation.phase(),
                CreationPhase::Collecting {
                    collected: i,
                    required
                }
            );
            f.creation.handle(&InputEvent::click(100.0 + 50.0 * i as f64, 200.0 + 10.0 * i as f64));
        }
        let completed = &f.creation.sink().completed;
        assert_eq!(completed.len(), 1, "{kind}");
        assert_eq!(completed[0].kind, kind);
        assert_eq!(completed[0].points.len(), required, "{kind}");

        // Further clicks go nowhere.
        f.creation.handle(&InputEvent::click(10.0, 10.0));
        assert_eq!(f.creation.sink().completed.len(), 1);
    }
}

#[test]
fn channel_clicks_render_parallel_lines() {
    let mut f = fixture(DrawingKind::ParallelChannel, FakeBridge::identity(800.0));
    f.creation.start();
    f.creation.handle(&InputEvent::click(0.0, 100.0));
    f.creation.handle(&InputEvent::click(10.0, 110.0));
    f.creation.handle(&InputEvent::click(0.0, 90.0));

    let request = f.creation.sink().completed[0].clone();
    assert_eq!(
        request.points.to_vec(),
        vec![
            DrawingPoint::new(0, 100.0),
            DrawingPoint::new(10, 110.0),
            DrawingPoint::new(0, 90.0),
        ]
    );

    let drawing = request.into_drawing(DrawingId::intern("created_channel"));
    let mut layer = DrawingLayer::new(3);
    layer.sync(&[drawing]);
    let frames = layer.render(f.bridge.as_ref());
    let lines: Vec<_> = frames[0].lines().collect();
    let (l1, l2) = (lines[0], lines[1]);
    assert_eq!(l2.0.x, l1.0.x);
    assert_eq!(l2.0.y - l1.0.y, -10.0);
    assert_eq!(l2.1.y - l1.1.y, -10.0);
}

// ─── Preview & snapping ─────────────────────────────────────────────────

#[test]
fn preview_follows_snapped_cursor() {
    let bridge = FakeBridge::identity(800.0);
    bridge.push_candle(100, 60.0, 80.0, 40.0, 70.0);
    let mut f = fixture(DrawingKind::Ray, bridge);
    f.creation.start();

    // 10px from the high: snapped.
    f.creation.handle(&InputEvent::pointer_move(100.0, 90.0));
    assert_eq!(
        f.creation.preview_points(),
        vec![DrawingPoint::new(100, 80.0), DrawingPoint::new(100, 80.0)]
    );

    f.creation.handle(&InputEvent::click(100.0, 90.0));
    // 30px from every candle value: raw.
    f.creation.handle(&InputEvent::pointer_move(300.0, 130.0));
    assert_eq!(
        f.creation.preview_points(),
        vec![DrawingPoint::new(100, 80.0), DrawingPoint::new(300, 130.0)]
    );
}

#[test]
fn magnet_can_be_disabled() {
    let bridge = Rc::new(FakeBridge::identity(800.0));
    bridge.push_candle(100, 60.0, 80.0, 40.0, 70.0);
    let layer: SharedLayer = Rc::new(RefCell::new(DrawingLayer::new(3)));
    let config = InteractionConfig {
        magnet_enabled: false,
        ..InteractionConfig::default()
    };
    let dyn_bridge: Rc<dyn CoordinateBridge> = bridge.clone();
    let mut creation = CreationController::new(
        dyn_bridge,
        layer,
        RecordingSink::default(),
        DrawingKind::HorizontalLine,
        config,
    );
    creation.start();
    creation.handle(&InputEvent::click(100.0, 90.0));
    assert_eq!(creation.sink().completed[0].points[0].price, 90.0);
}

#[test]
fn magnet_toggle_applies_between_clicks() {
    let bridge = FakeBridge::identity(800.0);
    bridge.push_candle(100, 60.0, 80.0, 40.0, 70.0);
    let mut f = fixture(DrawingKind::Ray, bridge);
    f.creation.start();

    f.creation.handle(&InputEvent::click(100.0, 90.0));
    f.creation.config_mut().magnet_enabled = false;
    f.creation.handle(&InputEvent::click(102.0, 90.0));

    assert_eq!(
        f.creation.sink().completed[0].points.to_vec(),
        vec![DrawingPoint::new(100, 80.0), DrawingPoint::new(102, 90.0)]
    );
}

#[test]
fn click_without_conversion_is_ignored() {
    let mut f = fixture(DrawingKind::HorizontalLine, FakeBridge::identity(800.0));
    f.creation.start();
    f.bridge.ready.set(false);
    f.creation.handle(&InputEvent::click(100.0, 100.0));
    assert_eq!(
        f.creation.phase(),
        CreationPhase::Collecting {
            collected: 0,
            required: 1
        }
    );

    f.bridge.ready.set(true);
    f.creation.handle(&InputEvent::click(100.0, 100.0));
    assert_eq!(f.creation.phase(), CreationPhase::Completed);
}

// ─── Teardown ───────────────────────────────────────────────────────────

#[test]
fn completion_tears_down_before_notifying() {
    let mut f = fixture(DrawingKind::Ray, FakeBridge::identity(800.0));
    f.bridge.set_cursor(Cursor::Pointer);
    f.creation.start();
    assert_eq!(f.bridge.cursor(), Cursor::Crosshair);
    assert!(f.bridge.is_subscribed(EventKind::PointerMove));
    assert!(f.bridge.is_subscribed(EventKind::Click));
    assert!(f.bridge.is_subscribed(EventKind::KeyDown));
    assert_eq!(f.layer.borrow().overlay_count(), 1);

    f.creation.handle(&InputEvent::click(10.0, 10.0));
    f.creation.handle(&InputEvent::click(20.0, 20.0));
    assert_torn_down(&f, Cursor::Pointer);
}

#[test]
fn escape_cancels_mid_collection() {
    let mut f = fixture(DrawingKind::ParallelChannel, FakeBridge::identity(800.0));
    f.creation.start();
    f.creation.handle(&InputEvent::click(10.0, 10.0));
    f.creation.handle(&InputEvent::key("Escape"));

    assert_eq!(f.creation.phase(), CreationPhase::Cancelled);
    assert_eq!(f.creation.sink().cancelled, 1);
    assert!(f.creation.sink().completed.is_empty());
    assert_torn_down(&f, Cursor::Default);

    // Dead after cancellation.
    f.creation.handle(&InputEvent::key("Escape"));
    assert_eq!(f.creation.sink().cancelled, 1);
}

#[test]
fn stop_is_silent() {
    let mut f = fixture(DrawingKind::Ray, FakeBridge::identity(800.0));
    f.creation.start();
    f.creation.handle(&InputEvent::click(10.0, 10.0));
    f.creation.stop();

    assert_eq!(f.creation.phase(), CreationPhase::Idle);
    assert_eq!(f.creation.sink().cancelled, 0);
    assert!(f.creation.sink().completed.is_empty());
    assert_torn_down(&f, Cursor::Default);
}

#[test]
fn repeated_cycles_do_not_leak() {
    let mut f = fixture(DrawingKind::HorizontalLine, FakeBridge::identity(800.0));
    for _ in 0..5 {
        f.creation.start();
        f.creation.start();
        f.creation.handle(&InputEvent::pointer_move(50.0, 50.0));
        f.creation.stop();
    }
    assert_torn_down(&f, Cursor::Default);

    f.creation.start();
    assert_eq!(f.bridge.live_subscriptions(), 3);
}

#[test]
fn dropping_the_controller_releases_the_host() {
    let f = fixture(DrawingKind::Ray, FakeBridge::identity(800.0));
    let Fixture {
        bridge,
        layer,
        mut creation,
    } = f;
    creation.start();
    drop(creation);
    assert_eq!(bridge.live_subscriptions(), 0);
    assert!(layer.borrow().is_empty());
    assert_eq!(bridge.cursor(), Cursor::Default);
}
