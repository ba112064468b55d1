pub mod frame;
pub mod geometry;
pub mod handles;
pub mod hit;
pub mod layer;
pub mod paint;
pub mod primitive;

pub use frame::{RenderFrame, Shape};
pub use handles::HandleOverlayPrimitive;
pub use hit::{hit_test, hit_test_drawing, hit_test_handle};
pub use layer::{Attachment, DrawingLayer, PrimitiveHandle, SharedLayer};
pub use primitive::{
    HorizontalLinePrimitive, ParallelChannelPrimitive, Primitive, RayPrimitive, RetryBudget,
    primitive_for,
};

// Re-export kurbo's point so downstream crates share one pixel type.
pub use kurbo::Point;
