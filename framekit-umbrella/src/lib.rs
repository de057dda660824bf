//! # framekit
//!
//! Interaction core for 3D viewers: a six-handle frame manipulator, a
//! terrain-style camera, frame synchronization and undoable numeric
//! editing of transforms.
//!
//! This is the umbrella crate that re-exports the individual crates. Use the
//! individual crates directly for more granular control over dependencies.
//!
//! ## Quick Start
//!
//! ```rust
//! use framekit::prelude::*;
//!
//! let frame = RigidTransform::identity();
//! let history = UndoHistory::new();
//! let fields = TransformPropertyBinding::new(&frame, Some(history.clone()));
//!
//! fields.set_position([1.0, 0.0, 0.0]);
//! assert!(history.undo());
//! assert_eq!(frame.position(), Point3d::origin());
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: Enables `interact` and `edit`
//! - `interact`: Frame widget, terrain camera, viewport and input routing
//! - `edit`: Frame synchronization, property bindings and undo history
//! - `winit`: Translation of winit window events into input events
//! - `all`: Enables all features

// Re-export core functionality
pub use framekit_core::*;

// Re-export sub-crates
#[cfg(feature = "interact")]
pub use framekit_interact as interact;

#[cfg(feature = "edit")]
pub use framekit_edit as edit;

/// Convenient imports for common use cases
pub mod prelude {
    pub use framekit_core::*;

    #[cfg(feature = "interact")]
    pub use framekit_interact::*;

    #[cfg(feature = "edit")]
    pub use framekit_edit::*;
}
