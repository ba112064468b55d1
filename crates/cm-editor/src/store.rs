//! Persistence collaborators.
//!
//! Controllers never own the drawing list. They read it through
//! [`DrawingStore::drawings`] and request changes; the host persists them
//! asynchronously and reports back with the returned [`RequestId`].

use cm_core::{CreationRequest, Drawing, DrawingId, DrawingPoint, PersistError, Points};
use std::fmt;

/// Correlates an asynchronous update/delete with its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req#{}", self.0)
    }
}

/// Receives the outcome of a creation flow.
pub trait CreationSink {
    /// A finished drawing; the sink assigns its id.
    fn completed(&mut self, request: CreationRequest);

    fn cancelled(&mut self);
}

/// Accessor plus update/delete collaborators for persisted drawings.
pub trait DrawingStore {
    /// Current persisted list, in paint order.
    fn drawings(&self) -> Vec<Drawing>;

    fn update(&mut self, id: DrawingId, points: &[DrawingPoint]) -> RequestId;

    fn delete(&mut self, id: DrawingId) -> RequestId;

    fn get(&self, id: DrawingId) -> Option<Drawing> {
        self.drawings().into_iter().find(|d| d.id == id)
    }
}

// ─── In-memory store ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum PendingRequest {
    Update {
        id: DrawingId,
        points: Points,
        previous: Points,
    },
    Delete {
        drawing: Drawing,
        index: usize,
    },
}

/// A store without a backend. Changes apply immediately and stay pending
/// until [`MemoryStore::accept`] or [`MemoryStore::reject`]; rejecting
/// reverts the list.
#[derive(Debug, Default)]
pub struct MemoryStore {
    drawings: Vec<Drawing>,
    pending: Vec<(RequestId, PendingRequest)>,
    next_request: u64,
    cancellations: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_drawings(drawings: Vec<Drawing>) -> Self {
        Self {
            drawings,
            ..Self::default()
        }
    }

    pub fn insert(&mut self, drawing: Drawing) {
        self.drawings.push(drawing);
    }

    pub fn pending(&self) -> impl Iterator<Item = &(RequestId, PendingRequest)> {
        self.pending.iter()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn cancellations(&self) -> usize {
        self.cancellations
    }

    /// Mark `request` persisted.
    pub fn accept(&mut self, request: RequestId) -> Result<(), PersistError> {
        self.take(request).map(|_| ())
    }

    /// Revert `request` and return the error to hand to the controller.
    pub fn reject(&mut self, request: RequestId, reason: &str) -> PersistError {
        match self.take(request) {
            Ok(PendingRequest::Update { id, previous, .. }) => {
                if let Some(d) = self.drawings.iter_mut().find(|d| d.id == id) {
                    d.points = previous;
                }
            }
            Ok(PendingRequest::Delete { drawing, index }) => {
                let index = index.min(self.drawings.len());
                self.drawings.insert(index, drawing);
            }
            Err(e) => return e,
        }
        PersistError::Rejected(reason.to_owned())
    }

    fn take(&mut self, request: RequestId) -> Result<PendingRequest, PersistError> {
        let pos = self
            .pending
            .iter()
            .position(|(r, _)| *r == request)
            .ok_or_else(|| PersistError::Rejected(format!("unknown request {request}")))?;
        Ok(self.pending.remove(pos).1)
    }

    fn next_request(&mut self) -> RequestId {
        self.next_request += 1;
        RequestId(self.next_request)
    }
}

impl DrawingStore for MemoryStore {
    fn drawings(&self) -> Vec<Drawing> {
        self.drawings.clone()
    }

    fn update(&mut self, id: DrawingId, points: &[DrawingPoint]) -> RequestId {
        let request = self.next_request();
        if let Some(d) = self.drawings.iter_mut().find(|d| d.id == id) {
            let previous = std::mem::replace(&mut d.points, Points::from_slice(points));
            self.pending.push((
                request,
                PendingRequest::Update {
                    id,
                    points: Points::from_slice(points),
                    previous,
                },
            ));
        } else {
            log::warn!("update for unknown drawing {id}");
        }
        request
    }

    fn delete(&mut self, id: DrawingId) -> RequestId {
        let request = self.next_request();
        if let Some(index) = self.drawings.iter().position(|d| d.id == id) {
            let drawing = self.drawings.remove(index);
            self.pending.push((request, PendingRequest::Delete { drawing, index }));
        } else {
            log::warn!("delete for unknown drawing {id}");
        }
        request
    }
}

impl CreationSink for MemoryStore {
    fn completed(&mut self, request: CreationRequest) {
        let id = DrawingId::with_prefix("drawing");
        log::debug!("stored new {} as {id}", request.kind);
        self.drawings.push(request.into_drawing(id));
    }

    fn cancelled(&mut self) {
        self.cancellations += 1;
    }
}
