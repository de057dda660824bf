//! Viewport abstraction consumed by the interaction core

use std::cell::{Cell, RefCell};

use nalgebra::{Matrix4, Point2, Vector4};

use framekit_core::{Bounds, Point3d, Ray};

use crate::camera::Camera;

/// What the core needs from the host's rendered view
///
/// Display coordinates have their origin at the bottom-left corner; depth
/// runs from 0 at the near plane to 1 at the far plane. Methods take
/// `&self` because hosts share one viewport between several handlers on a
/// single thread; implementations use interior mutability for the camera.
pub trait Viewport {
    /// Snapshot of the active camera
    fn camera(&self) -> Camera;

    /// Replace the active camera
    fn set_camera(&self, camera: Camera);

    /// Size in pixels (width, height)
    fn size(&self) -> (u32, u32);

    /// Ask for a redraw; repeated requests before the next frame coalesce
    fn request_render(&self);

    /// Unproject a display point at the given depth
    fn display_to_world(&self, display: &Point2<f64>, depth: f64) -> Option<Point3d>;

    /// Project a world point to display x, y and depth
    fn world_to_display(&self, world: &Point3d) -> Option<Point3d>;

    /// Bounds of the visible scene, used to fit the clipping range
    fn scene_bounds(&self) -> Option<Bounds> {
        None
    }

    /// Ray from the near plane to the far plane through a display point
    fn display_ray(&self, display: &Point2<f64>) -> Option<Ray> {
        let near = self.display_to_world(display, 0.0)?;
        let far = self.display_to_world(display, 1.0)?;
        let ray = Ray::new(near, far);
        ray.is_valid().then_some(ray)
    }

    fn height(&self) -> f64 {
        f64::from(self.size().1)
    }

    /// Length of the viewport diagonal in pixels
    fn diagonal(&self) -> f64 {
        let (w, h) = self.size();
        f64::from(w).hypot(f64::from(h))
    }

    /// Recompute the camera clipping range from the current scene bounds
    fn reset_clipping_range(&self) {
        if let Some(bounds) = self.scene_bounds() {
            let mut camera = self.camera();
            if camera.reset_clipping_range(&bounds) {
                self.set_camera(camera);
            }
        }
    }
}

/// Coalesces render requests into at most one pending redraw
#[derive(Debug, Default)]
pub struct RenderScheduler {
    pending: Cell<bool>,
    requests: Cell<u64>,
}

impl RenderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.pending.set(true);
        self.requests.set(self.requests.get() + 1);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get()
    }

    /// Called by the host once per frame tick; returns whether to redraw
    pub fn take_pending(&self) -> bool {
        self.pending.replace(false)
    }

    /// Total number of requests received, coalesced or not
    pub fn request_count(&self) -> u64 {
        self.requests.get()
    }
}

/// A viewport that derives its projection from the camera matrices
///
/// Useful for hosts that render with their own pipeline (wgpu, OpenGL) and
/// for headless drivers and tests.
#[derive(Debug)]
pub struct ProjectedViewport {
    camera: RefCell<Camera>,
    size: Cell<(u32, u32)>,
    scene_bounds: Cell<Option<Bounds>>,
    renders: RenderScheduler,
}

impl ProjectedViewport {
    pub fn new(camera: Camera, width: u32, height: u32) -> Self {
        Self {
            camera: RefCell::new(camera),
            size: Cell::new((width.max(1), height.max(1))),
            scene_bounds: Cell::new(None),
            renders: RenderScheduler::new(),
        }
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.size.set((width.max(1), height.max(1)));
        self.renders.request();
    }

    pub fn set_scene_bounds(&self, bounds: Option<Bounds>) {
        self.scene_bounds.set(bounds);
    }

    pub fn renders(&self) -> &RenderScheduler {
        &self.renders
    }

    pub fn aspect_ratio(&self) -> f64 {
        let (w, h) = self.size.get();
        f64::from(w) / f64::from(h)
    }

    /// Combined projection * view matrix
    pub fn view_projection(&self) -> Matrix4<f64> {
        let camera = self.camera.borrow();
        camera.projection_matrix(self.aspect_ratio()) * camera.view_matrix()
    }
}

impl Viewport for ProjectedViewport {
    fn camera(&self) -> Camera {
        self.camera.borrow().clone()
    }

    fn set_camera(&self, camera: Camera) {
        *self.camera.borrow_mut() = camera;
    }

    fn size(&self) -> (u32, u32) {
        self.size.get()
    }

    fn request_render(&self) {
        self.renders.request();
    }

    fn display_to_world(&self, display: &Point2<f64>, depth: f64) -> Option<Point3d> {
        let (w, h) = self.size.get();
        let ndc = Vector4::new(
            2.0 * display.x / f64::from(w) - 1.0,
            2.0 * display.y / f64::from(h) - 1.0,
            2.0 * depth - 1.0,
            1.0,
        );
        let inverse = self.view_projection().try_inverse()?;
        let world = Point3d::from_homogeneous(inverse * ndc)?;
        world.iter().all(|c| c.is_finite()).then_some(world)
    }

    fn world_to_display(&self, world: &Point3d) -> Option<Point3d> {
        let (w, h) = self.size.get();
        let clip = self.view_projection() * world.to_homogeneous();
        if clip.w.abs() <= f64::EPSILON {
            return None;
        }
        let ndc = clip.xyz() / clip.w;
        let display = Point3d::new(
            (ndc.x + 1.0) * 0.5 * f64::from(w),
            (ndc.y + 1.0) * 0.5 * f64::from(h),
            (ndc.z + 1.0) * 0.5,
        );
        display.iter().all(|c| c.is_finite()).then_some(display)
    }

    fn scene_bounds(&self) -> Option<Bounds> {
        self.scene_bounds.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use framekit_core::Vector3d;

    fn viewport() -> ProjectedViewport {
        ProjectedViewport::new(Camera::default(), 800, 600)
    }

    #[test]
    fn test_focal_point_projects_to_center() {
        let view = viewport();
        let display = view.world_to_display(&Point3d::origin()).unwrap();
        assert_relative_eq!(display.x, 400.0, epsilon = 1e-9);
        assert_relative_eq!(display.y, 300.0, epsilon = 1e-9);
        assert!(display.z > 0.0 && display.z < 1.0);
    }

    #[test]
    fn test_display_world_round_trip() {
        let view = viewport();
        let world = Point3d::new(0.7, -0.3, 1.2);
        let display = view.world_to_display(&world).unwrap();
        let back = view
            .display_to_world(&Point2::new(display.x, display.y), display.z)
            .unwrap();
        assert_relative_eq!(back, world, epsilon = 1e-6);
    }

    #[test]
    fn test_display_ray_points_into_scene() {
        let view = viewport();
        let ray = view.display_ray(&Point2::new(400.0, 300.0)).unwrap();
        let dir = ray.direction().normalize();
        assert_relative_eq!(dir, -Vector3d::z(), epsilon = 1e-9);
    }

    #[test]
    fn test_display_y_axis_points_up() {
        let view = viewport();
        let above = view.world_to_display(&Point3d::new(0.0, 1.0, 0.0)).unwrap();
        assert!(above.y > 300.0);
    }

    #[test]
    fn test_render_requests_coalesce() {
        let view = viewport();
        view.request_render();
        view.request_render();
        assert_eq!(view.renders().request_count(), 2);
        assert!(view.renders().take_pending());
        assert!(!view.renders().take_pending());
    }

    #[test]
    fn test_reset_clipping_range_uses_scene_bounds() {
        let view = viewport();
        view.reset_clipping_range();
        assert_eq!(view.camera().clipping_range, Camera::default().clipping_range);

        view.set_scene_bounds(Some(Bounds::default()));
        view.reset_clipping_range();
        let (near, far) = view.camera().clipping_range;
        assert!(near > 8.0 && far < 12.0);
    }
}
