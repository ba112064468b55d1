pub mod creation;
pub mod edit;
pub mod input;
pub mod shortcuts;
pub mod store;

pub use creation::{CreationController, CreationPhase};
pub use edit::{DragPart, EditController, EditPhase};
pub use input::{InputEvent, Modifiers};
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use store::{CreationSink, DrawingStore, MemoryStore, PendingRequest, RequestId};
