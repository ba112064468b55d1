pub mod bridge;
pub mod config;
pub mod error;
pub mod id;
pub mod model;
pub mod snap;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use bridge::{
    CoordinateBridge, Cursor, CursorGuard, EventKind, PanZoomLock, Subscription, SubscriptionId,
    SubscriptionSet,
};
pub use config::InteractionConfig;
pub use error::{DrawingError, PersistError};
pub use id::DrawingId;
pub use model::*;
pub use snap::{magnet_snap, snapped_point};
