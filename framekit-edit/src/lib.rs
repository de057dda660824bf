//! Editing services built on framekit transforms
//!
//! - [`UndoHistory`]: command stack with merge, limit and redo truncation
//! - [`TransformPropertyBinding`]: numeric position / RPY fields that mirror
//!   a transform and record undoable edits
//! - [`FrameSyncGroup`]: transforms that move together as a rigid set
//! - [`Clock`]: time source used to timestamp edits for merging

pub mod clock;
pub mod frame_properties;
pub mod frame_sync;
pub mod history;

pub use clock::*;
pub use frame_properties::*;
pub use frame_sync::*;
pub use history::*;
