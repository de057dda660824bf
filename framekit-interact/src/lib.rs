//! Pointer-driven interaction for 3D views
//!
//! This crate turns pointer and keyboard input into edits and camera motion:
//! - Interactive frame widget (translate along axes, in planes, rotate)
//! - Terrain-style camera controller
//! - Camera model and viewport abstraction
//! - Input events, handler trait and session routing
//! - Screen-space picking

pub mod camera;
pub mod frame_widget;
pub mod input;
pub mod picking;
pub mod terrain_camera;
pub mod viewport;
#[cfg(feature = "winit")]
pub mod winit_input;

pub use camera::*;
pub use frame_widget::*;
pub use input::*;
pub use picking::*;
pub use terrain_camera::*;
pub use viewport::*;
#[cfg(feature = "winit")]
pub use winit_input::*;
