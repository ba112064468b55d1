//! Series-attached primitive list.
//!
//! The host owns one `DrawingLayer` per chart series. Persisted drawings get
//! a primitive each (kept in step with the store via [`DrawingLayer::sync`]);
//! controllers attach their own overlays (creation preview, selection
//! handles) and must detach them when they stop, otherwise the overlay keeps
//! rendering every frame.

use crate::frame::RenderFrame;
use crate::primitive::{Primitive, primitive_for};
use cm_core::{CoordinateBridge, Drawing, DrawingId, DrawingPoint};
use std::cell::RefCell;
use std::rc::Rc;

/// The layer as shared between the host render loop and controllers.
pub type SharedLayer = Rc<RefCell<DrawingLayer>>;

/// Registration of one attached primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimitiveHandle(u64);

struct Slot {
    handle: PrimitiveHandle,
    /// Persisted drawing this primitive mirrors; `None` for overlays.
    owner: Option<DrawingId>,
    primitive: Box<dyn Primitive>,
}

pub struct DrawingLayer {
    slots: Vec<Slot>,
    next_handle: u64,
    max_retries: u32,
}

impl DrawingLayer {
    pub fn new(max_retries: u32) -> Self {
        Self {
            slots: Vec::new(),
            next_handle: 1,
            max_retries,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Attach a controller-owned overlay.
    pub fn attach(&mut self, primitive: Box<dyn Primitive>) -> PrimitiveHandle {
        self.insert(None, primitive)
    }

    /// Attach a primitive mirroring a persisted drawing.
    pub fn attach_drawing(&mut self, drawing: &Drawing) -> PrimitiveHandle {
        let primitive = primitive_for(drawing.kind, &drawing.points, drawing.style.clone(), self.max_retries);
        self.insert(Some(drawing.id), primitive)
    }

    fn insert(&mut self, owner: Option<DrawingId>, primitive: Box<dyn Primitive>) -> PrimitiveHandle {
        let handle = PrimitiveHandle(self.next_handle);
        self.next_handle += 1;
        self.slots.push(Slot {
            handle,
            owner,
            primitive,
        });
        handle
    }

    /// Returns `false` if the handle was already detached.
    pub fn detach(&mut self, handle: PrimitiveHandle) -> bool {
        let before = self.slots.len();
        self.slots.retain(|s| s.handle != handle);
        before != self.slots.len()
    }

    pub fn get_mut(&mut self, handle: PrimitiveHandle) -> Option<&mut (dyn Primitive + 'static)> {
        self.slots
            .iter_mut()
            .find(|s| s.handle == handle)
            .map(|s| s.primitive.as_mut())
    }

    pub fn get(&self, handle: PrimitiveHandle) -> Option<&(dyn Primitive + 'static)> {
        self.slots
            .iter()
            .find(|s| s.handle == handle)
            .map(|s| s.primitive.as_ref())
    }

    /// The primitive rendering persisted drawing `id`.
    pub fn drawing_mut(&mut self, id: DrawingId) -> Option<&mut (dyn Primitive + 'static)> {
        self.slots
            .iter_mut()
            .find(|s| s.owner == Some(id))
            .map(|s| s.primitive.as_mut())
    }

    pub fn drawing(&self, id: DrawingId) -> Option<&(dyn Primitive + 'static)> {
        self.slots
            .iter()
            .find(|s| s.owner == Some(id))
            .map(|s| s.primitive.as_ref())
    }

    /// Mirror the store's list: attach new drawings, refresh existing ones,
    /// detach drawings that are gone. Overlays are left alone.
    pub fn sync(&mut self, drawings: &[Drawing]) {
        self.slots
            .retain(|s| s.owner.is_none_or(|id| drawings.iter().any(|d| d.id == id)));

        for drawing in drawings {
            if let Err(e) = drawing.validate() {
                log::warn!("drawing {} is malformed: {e}", drawing.id);
            }
            match self.drawing_mut(drawing.id) {
                Some(primitive) => {
                    primitive.update_points(&drawing.points);
                    primitive.update_style(&drawing.style);
                }
                None => {
                    self.attach_drawing(drawing);
                }
            }
        }
    }

    /// One render pass: persisted drawings first, overlays on top.
    pub fn render(&mut self, bridge: &dyn CoordinateBridge) -> Vec<RenderFrame> {
        let (drawings, overlays): (Vec<_>, Vec<_>) =
            self.slots.iter_mut().partition(|s| s.owner.is_some());
        drawings
            .into_iter()
            .chain(overlays)
            .filter_map(|s| s.primitive.render(bridge))
            .collect()
    }

    /// Some primitive lost a frame and wants another tick.
    pub fn wants_redraw(&self) -> bool {
        self.slots.iter().any(|s| s.primitive.wants_redraw())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn overlay_count(&self) -> usize {
        self.slots.iter().filter(|s| s.owner.is_none()).count()
    }
}

// ─── Attachment guard ────────────────────────────────────────────────────

/// An overlay owned by a controller; detached from the layer on drop.
///
/// Must not be dropped while the layer is mutably borrowed.
pub struct Attachment {
    layer: SharedLayer,
    handle: PrimitiveHandle,
}

impl Attachment {
    pub fn attach(layer: &SharedLayer, primitive: Box<dyn Primitive>) -> Self {
        let handle = layer.borrow_mut().attach(primitive);
        Self {
            layer: Rc::clone(layer),
            handle,
        }
    }

    pub fn handle(&self) -> PrimitiveHandle {
        self.handle
    }

    pub fn update_points(&self, points: &[DrawingPoint]) {
        if let Some(p) = self.layer.borrow_mut().get_mut(self.handle) {
            p.update_points(points);
        }
    }

    pub fn points(&self) -> Vec<DrawingPoint> {
        self.layer
            .borrow()
            .get(self.handle)
            .map(|p| p.points().to_vec())
            .unwrap_or_default()
    }
}

impl Drop for Attachment {
    fn drop(&mut self) {
        match self.layer.try_borrow_mut() {
            Ok(mut layer) => {
                layer.detach(self.handle);
            }
            Err(_) => log::warn!("layer busy, overlay {:?} left attached", self.handle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handles::HandleOverlayPrimitive;
    use cm_core::testing::FakeBridge;
    use cm_core::{Color, DrawingKind, DrawingPoint, DrawingStyle};

    fn hline(id: &str, price: f64) -> Drawing {
        Drawing::new(
            DrawingId::intern(id),
            DrawingKind::HorizontalLine,
            &[DrawingPoint::new(0, price)],
            DrawingStyle::default_for(DrawingKind::HorizontalLine),
        )
    }

    #[test]
    fn sync_attaches_updates_and_detaches() {
        let mut layer = DrawingLayer::new(3);
        layer.sync(&[hline("a", 10.0), hline("b", 20.0)]);
        assert_eq!(layer.len(), 2);

        layer.sync(&[hline("b", 25.0)]);
        assert_eq!(layer.len(), 1);
        assert!(layer.drawing(DrawingId::intern("a")).is_none());
        let b = layer.drawing(DrawingId::intern("b")).unwrap();
        assert_eq!(b.points()[0].price, 25.0);
    }

    #[test]
    fn overlays_survive_sync_and_detach_cleanly() {
        let mut layer = DrawingLayer::new(3);
        let overlay = layer.attach(Box::new(HandleOverlayPrimitive::new(
            DrawingKind::HorizontalLine,
            &[DrawingPoint::new(0, 1.0)],
            Color::rgba(0.0, 0.0, 0.0, 1.0),
            3,
        )));
        layer.sync(&[]);
        assert_eq!(layer.overlay_count(), 1);
        assert!(layer.detach(overlay));
        assert!(!layer.detach(overlay));
        assert!(layer.is_empty());
    }

    #[test]
    fn overlays_render_after_drawings() {
        let bridge = FakeBridge::identity(800.0);
        let mut layer = DrawingLayer::new(3);
        layer.attach(Box::new(HandleOverlayPrimitive::new(
            DrawingKind::HorizontalLine,
            &[DrawingPoint::new(0, 1.0)],
            Color::rgba(0.0, 0.0, 0.0, 1.0),
            3,
        )));
        layer.sync(&[hline("c", 5.0)]);
        let frames = layer.render(&bridge);
        assert_eq!(frames.len(), 2);
        assert!(matches!(frames[1].shapes[0], crate::frame::Shape::Handle { .. }));
    }

    #[test]
    fn attachment_detaches_on_drop() {
        let layer: SharedLayer = Rc::new(RefCell::new(DrawingLayer::new(3)));
        {
            let overlay = Attachment::attach(
                &layer,
                Box::new(HandleOverlayPrimitive::new(
                    DrawingKind::HorizontalLine,
                    &[DrawingPoint::new(0, 1.0)],
                    Color::rgba(0.0, 0.0, 0.0, 1.0),
                    3,
                )),
            );
            overlay.update_points(&[DrawingPoint::new(0, 2.0)]);
            assert_eq!(overlay.points(), vec![DrawingPoint::new(0, 2.0)]);
            assert_eq!(layer.borrow().overlay_count(), 1);
        }
        assert!(layer.borrow().is_empty());
    }

    #[test]
    fn redraw_requested_while_host_not_ready() {
        let bridge = FakeBridge::identity(800.0);
        bridge.ready.set(false);
        let mut layer = DrawingLayer::new(3);
        layer.sync(&[hline("d", 5.0)]);
        assert!(layer.render(&bridge).is_empty());
        assert!(layer.wants_redraw());
    }
}
