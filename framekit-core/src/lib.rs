//! Core data structures for framekit
//!
//! This crate provides the pieces every other framekit crate builds on:
//! the observable [`RigidTransform`], pose helpers, intersection math,
//! scene bounds and the scoped suspension guards.

pub mod error;
pub mod geometry;
pub mod intersect;
pub mod rigid_transform;
pub mod suspend;
pub mod transform;

pub use error::*;
pub use geometry::*;
pub use intersect::*;
pub use rigid_transform::*;
pub use suspend::*;
pub use transform::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Isometry3, Point2, UnitQuaternion};
