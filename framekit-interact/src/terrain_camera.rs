//! Terrain-style camera control
//!
//! Left drag orbits around the focal point keeping world Z up, right drag
//! zooms, middle drag or Shift + left drag pans, the wheel zooms in steps.
//! `f` flies to the pick target under the cursor and `r` frames the scene.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use framekit_core::{Bounds, Error, Point3d, Result, Vector3d, GEOMETRY_EPSILON};

use crate::camera::{Camera, Projection};
use crate::input::{InteractionHandler, Key, KeyEvent, PointerButton, PointerEvent, WheelEvent};
use crate::picking::{GeometricPicker, PickService, PickShape};
use crate::viewport::Viewport;

/// Distance the camera is pushed back along +Z when it sits on its focal point
const RESCUE_DISTANCE: f64 = 10.0;

/// Above this |z| of the view direction the view-up reference switches from
/// world Z to a horizontal vector
const POLE_BAND: f64 = 0.9;

/// Half view angle in degrees used to place a parallel camera on reset
const PARALLEL_RESET_HALF_ANGLE: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainCameraConfig {
    /// Degrees of azimuth/elevation per pixel of drag
    pub rotation_factor: f64,
    /// Fraction of the distance zoomed per pixel of drag
    pub zoom_factor: f64,
    /// Fraction of the distance zoomed per wheel notch
    pub wheel_zoom_step: f64,
    /// Let the elevation run past the poles, turning the view upside down
    pub allow_inversion: bool,
    /// Elevation clamp in degrees when inversion is off
    pub elevation_limit: f64,
    /// Half-width in degrees of the zone around the poles that is jumped over
    pub gimbal_lock_epsilon: f64,
    pub min_distance: f64,
    /// Fraction of the way the camera moves towards a zoom-to target
    pub zoom_to_fraction: f64,
}

impl Default for TerrainCameraConfig {
    fn default() -> Self {
        Self {
            rotation_factor: 0.3,
            zoom_factor: 0.01,
            wheel_zoom_step: 0.1,
            allow_inversion: false,
            elevation_limit: 85.0,
            gimbal_lock_epsilon: 1.0,
            min_distance: 1e-6,
            zoom_to_fraction: 0.7,
        }
    }
}

impl TerrainCameraConfig {
    pub fn validate(&self) -> Result<()> {
        let factors = [self.rotation_factor, self.zoom_factor, self.wheel_zoom_step];
        if !factors.iter().all(|f| f.is_finite()) {
            return Err(Error::InvalidConfig("camera factors must be finite".to_string()));
        }
        if !(0.0..90.0).contains(&self.elevation_limit) {
            return Err(Error::InvalidConfig(format!(
                "elevation limit must lie in [0, 90), got {}",
                self.elevation_limit
            )));
        }
        if !(self.gimbal_lock_epsilon > 0.0 && self.gimbal_lock_epsilon < 45.0) {
            return Err(Error::InvalidConfig(format!(
                "gimbal lock epsilon must lie in (0, 45), got {}",
                self.gimbal_lock_epsilon
            )));
        }
        if !(self.min_distance.is_finite() && self.min_distance > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "minimum distance must be positive, got {}",
                self.min_distance
            )));
        }
        if !(0.0..1.0).contains(&self.zoom_to_fraction) {
            return Err(Error::InvalidConfig(format!(
                "zoom-to fraction must lie in [0, 1), got {}",
                self.zoom_to_fraction
            )));
        }
        Ok(())
    }
}

/// Camera operation bound to the pressed button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraOperation {
    Orbit,
    Zoom,
    Pan,
}

fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = (angle + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 {
        180.0
    } else {
        wrapped
    }
}

fn sign(value: f64) -> f64 {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Azimuth and elevation in degrees of the camera around its focal point
///
/// The elevation of an inverted camera (view-up pointing below the horizon)
/// lies beyond ±90°, so a camera orbiting over a pole keeps a continuous
/// elevation.
pub fn spherical_angles(camera: &Camera) -> (f64, f64) {
    let v = camera.view_plane_normal();
    let azimuth = v.y.atan2(v.x).to_degrees();
    let elevation = v.z.atan2(v.x.hypot(v.y)).to_degrees();
    if camera.view_up.z < 0.0 {
        (wrap_degrees(azimuth + 180.0), sign(elevation) * 180.0 - elevation)
    } else {
        (azimuth, elevation)
    }
}

/// View-up orthogonal to `direction` that keeps the horizon level
///
/// `direction` is the unit vector from the focal point to the camera.
fn terrain_view_up(direction: &Vector3d, azimuth: f64, elevation: f64) -> Vector3d {
    let (a, e) = (azimuth.to_radians(), elevation.to_radians());
    let reference = if direction.z.abs() < POLE_BAND {
        Vector3d::z() * sign(e.cos())
    } else {
        -Vector3d::new(a.cos(), a.sin(), 0.0) * sign(e.sin())
    };

    let up = reference - direction * reference.dot(direction);
    if let Some(up) = up.try_normalize(1e-4) {
        return up;
    }
    let helper = if direction.z.abs() > POLE_BAND {
        Vector3d::x()
    } else {
        Vector3d::z()
    };
    helper
        .cross(direction)
        .try_normalize(GEOMETRY_EPSILON)
        .unwrap_or_else(|| {
            if direction.x.abs() < POLE_BAND {
                Vector3d::x()
            } else {
                Vector3d::y()
            }
        })
}

/// Terrain camera interaction handler
#[derive(Debug, Clone, Default)]
pub struct TerrainCameraController {
    config: TerrainCameraConfig,
    operation: Option<CameraOperation>,
    last_position: Option<Point2<f64>>,
    /// Last known pointer position in display coordinates
    cursor: Option<Point2<f64>>,
    picker: GeometricPicker,
    pick_targets: Vec<PickShape>,
}

impl TerrainCameraController {
    pub fn new(config: TerrainCameraConfig) -> Self {
        Self {
            config,
            operation: None,
            last_position: None,
            cursor: None,
            picker: GeometricPicker::default(),
            pick_targets: Vec::new(),
        }
    }

    /// Shapes the `f` key can fly to
    pub fn set_pick_targets(&mut self, targets: Vec<PickShape>) {
        self.pick_targets = targets;
    }

    pub fn pick_targets(&self) -> &[PickShape] {
        &self.pick_targets
    }

    pub fn config(&self) -> &TerrainCameraConfig {
        &self.config
    }

    pub fn set_allow_inversion(&mut self, allow: bool) {
        self.config.allow_inversion = allow;
    }

    /// Operation of the drag in progress
    pub fn operation(&self) -> Option<CameraOperation> {
        self.operation
    }

    /// Rotate the camera around its focal point by a pointer delta in
    /// display pixels
    pub fn orbit(&self, camera: &mut Camera, dx: f64, dy: f64) {
        if camera.distance() < self.config.min_distance {
            camera.position = camera.focal_point + Vector3d::z() * RESCUE_DISTANCE;
            camera.view_up = Vector3d::z();
        }
        let distance = camera.distance();
        let (azimuth, elevation) = spherical_angles(camera);
        let k = self.config.rotation_factor;
        let azimuth = wrap_degrees(azimuth - dx * k);
        let requested = elevation - dy * k;

        let elevation = if self.config.allow_inversion {
            self.avoid_gimbal_lock(elevation, wrap_degrees(requested))
        } else {
            let limit = self.config.elevation_limit;
            requested.clamp(-limit, limit)
        };

        let (a, e) = (azimuth.to_radians(), elevation.to_radians());
        let direction = Vector3d::new(e.cos() * a.cos(), e.cos() * a.sin(), e.sin());
        camera.position = camera.focal_point + direction * distance;
        camera.view_up = if self.config.allow_inversion {
            terrain_view_up(&direction, azimuth, elevation)
        } else {
            Vector3d::z()
        };

        if direction.z.abs() > POLE_BAND {
            log::trace!("orbit near pole: elevation {:.3}°, azimuth {:.3}°", elevation, azimuth);
        }
    }

    /// Push an elevation that landed near a pole out to the side of the
    /// pole it was heading for
    fn avoid_gimbal_lock(&self, previous: f64, elevation: f64) -> f64 {
        let eps = self.config.gimbal_lock_epsilon;
        for pole in [90.0, -90.0] {
            if (elevation - pole).abs() < eps {
                let rising = if elevation != previous {
                    elevation > previous
                } else {
                    elevation >= pole
                };
                let jumped = if rising { pole + eps } else { pole - eps };
                let jumped = wrap_degrees(jumped);
                log::debug!(
                    "gimbal lock avoidance: elevation {:.3}° -> {:.3}°",
                    elevation,
                    jumped
                );
                return jumped;
            }
        }
        elevation
    }

    /// Zoom by a vertical drag in display pixels; dragging up moves closer
    pub fn zoom(&self, camera: &mut Camera, dy: f64) {
        self.scale_distance(camera, -dy * self.config.zoom_factor);
    }

    /// Zoom by wheel notches; positive notches roll away and move closer
    pub fn wheel_zoom(&self, camera: &mut Camera, notches: f64) {
        self.scale_distance(camera, -notches * self.config.wheel_zoom_step);
    }

    /// Grow the distance (or parallel scale) by `fraction` of itself
    fn scale_distance(&self, camera: &mut Camera, fraction: f64) {
        if !fraction.is_finite() {
            return;
        }
        let min = self.config.min_distance;
        match camera.projection {
            Projection::Parallel { scale } => {
                let base = if scale > min { scale } else { 1.0 };
                camera.projection = Projection::Parallel {
                    scale: (scale + fraction * base).max(min),
                };
            }
            Projection::Perspective { .. } => {
                let distance = camera.distance();
                let base = if distance > min { distance } else { 1.0 };
                let new_distance = (distance + fraction * base).max(min);
                let direction = camera.view_plane_normal();
                camera.position = camera.focal_point + direction * new_distance;
            }
        }
    }

    /// Translate camera and focal point so the scene follows the pointer
    ///
    /// With `constrain` the motion is locked to the dominant screen axis.
    pub fn pan(
        &self,
        view: &dyn Viewport,
        last: &Point2<f64>,
        current: &Point2<f64>,
        constrain: bool,
    ) {
        let mut camera = view.camera();
        let Some(focal) = view.world_to_display(&camera.focal_point) else {
            log::trace!("focal point does not project; skipping pan");
            return;
        };

        let mut current = *current;
        if constrain {
            let delta = current - last;
            if delta.x.abs() >= delta.y.abs() {
                current.y = last.y;
            } else {
                current.x = last.x;
            }
        }

        let (Some(p1), Some(p2)) = (
            view.display_to_world(&current, focal.z),
            view.display_to_world(last, focal.z),
        ) else {
            log::trace!("pan points do not unproject; skipping");
            return;
        };
        let motion = p2 - p1;
        camera.position += motion;
        camera.focal_point += motion;
        view.set_camera(camera);
    }

    /// Jump the focal point to `point` and move the camera part of the way
    /// towards it, keeping the view-up
    ///
    /// Returns `false` when the point is not finite or the camera already
    /// sits on it.
    pub fn zoom_to(&self, camera: &mut Camera, point: &Point3d) -> bool {
        if !point.iter().all(|c| c.is_finite()) {
            return false;
        }
        let offset = point - camera.position;
        if offset.norm() < self.config.min_distance {
            return false;
        }
        camera.position += offset * self.config.zoom_to_fraction;
        camera.focal_point = *point;
        log::debug!(
            "zoom to ({:.3}, {:.3}, {:.3}), distance {:.3}",
            point.x,
            point.y,
            point.z,
            camera.distance()
        );
        true
    }

    /// Pick among the targets under `display` and zoom to the hit point
    pub fn zoom_to_pick(&self, view: &dyn Viewport, display: &Point2<f64>) -> bool {
        let Some(hit) = self.picker.pick(view, display, &self.pick_targets) else {
            log::trace!("nothing to zoom to under ({:.1}, {:.1})", display.x, display.y);
            return false;
        };
        let mut camera = view.camera();
        if !self.zoom_to(&mut camera, &hit.point) {
            return false;
        }
        view.set_camera(camera);
        true
    }

    /// Center the focal point on `bounds` and back the camera off along the
    /// current view direction until the whole box fits the view
    ///
    /// A parallel camera gets its scale set to the bounding radius.
    pub fn reset_camera(&self, camera: &mut Camera, bounds: &Bounds) -> bool {
        if !bounds.is_valid() {
            return false;
        }
        let radius = (bounds.diagonal() / 2.0).max(self.config.min_distance);
        let half_angle = match camera.projection {
            Projection::Perspective { view_angle } => view_angle / 2.0,
            Projection::Parallel { .. } => {
                camera.projection = Projection::Parallel { scale: radius };
                PARALLEL_RESET_HALF_ANGLE
            }
        };
        let sine = half_angle.to_radians().sin();
        if !(sine > GEOMETRY_EPSILON) {
            return false;
        }

        let direction = camera.view_plane_normal();
        camera.focal_point = bounds.center();
        camera.position = camera.focal_point + direction * (radius / sine);
        camera.reset_clipping_range(bounds);
        true
    }

    fn finish(&self, view: &dyn Viewport) {
        view.reset_clipping_range();
        view.request_render();
    }
}

impl InteractionHandler for TerrainCameraController {
    fn on_pointer_down(&mut self, view: &dyn Viewport, event: &PointerEvent) -> bool {
        self.cursor = Some(event.position.to_display(view.height()));
        let operation = match event.button {
            Some(PointerButton::Left) if event.modifiers.shift => CameraOperation::Pan,
            Some(PointerButton::Left) => CameraOperation::Orbit,
            Some(PointerButton::Right) => CameraOperation::Zoom,
            Some(PointerButton::Middle) => CameraOperation::Pan,
            None => return false,
        };
        log::debug!("terrain camera idle -> {:?}", operation);
        self.operation = Some(operation);
        self.last_position = Some(event.position.to_display(view.height()));
        true
    }

    fn on_pointer_move(&mut self, view: &dyn Viewport, event: &PointerEvent) -> bool {
        let current = event.position.to_display(view.height());
        self.cursor = Some(current);
        let Some(operation) = self.operation else {
            return false;
        };
        let Some(last) = self.last_position.replace(current) else {
            return true;
        };
        let (dx, dy) = (current.x - last.x, current.y - last.y);

        match operation {
            CameraOperation::Orbit => {
                let mut camera = view.camera();
                self.orbit(&mut camera, dx, dy);
                view.set_camera(camera);
            }
            CameraOperation::Zoom => {
                let mut camera = view.camera();
                self.zoom(&mut camera, dy);
                view.set_camera(camera);
            }
            CameraOperation::Pan => self.pan(view, &last, &current, event.modifiers.control),
        }
        self.finish(view);
        true
    }

    fn on_pointer_up(&mut self, _view: &dyn Viewport, _event: &PointerEvent) -> bool {
        self.last_position = None;
        match self.operation.take() {
            Some(operation) => {
                log::debug!("terrain camera {:?} -> idle", operation);
                true
            }
            None => false,
        }
    }

    fn on_wheel(&mut self, view: &dyn Viewport, event: &WheelEvent) -> bool {
        let mut camera = view.camera();
        self.wheel_zoom(&mut camera, event.delta);
        view.set_camera(camera);
        self.finish(view);
        true
    }

    fn on_key_down(&mut self, view: &dyn Viewport, event: &KeyEvent) -> bool {
        match event.key {
            Key::Character('f' | 'F') => {
                let zoomed = self
                    .cursor
                    .is_some_and(|cursor| self.zoom_to_pick(view, &cursor));
                if zoomed {
                    self.finish(view);
                }
                true
            }
            Key::Character('r' | 'R') => {
                let bounds = view.scene_bounds().unwrap_or_default();
                let mut camera = view.camera();
                if self.reset_camera(&mut camera, &bounds) {
                    view.set_camera(camera);
                    view.request_render();
                }
                true
            }
            _ => false,
        }
    }

    fn on_focus_lost(&mut self, _view: &dyn Viewport) -> bool {
        self.last_position = None;
        self.operation.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use framekit_core::Point3d;

    fn camera_at(elevation: f64) -> Camera {
        let e = elevation.to_radians();
        Camera::new(
            Point3d::new(10.0 * e.cos(), 0.0, 10.0 * e.sin()),
            Point3d::origin(),
            Vector3d::z(),
        )
    }

    #[test]
    fn test_wrap_degrees() {
        assert_relative_eq!(wrap_degrees(190.0), -170.0);
        assert_relative_eq!(wrap_degrees(-180.0), 180.0);
        assert_relative_eq!(wrap_degrees(45.0), 45.0);
    }

    #[test]
    fn test_orbit_azimuth_keeps_distance() {
        let controller = TerrainCameraController::default();
        let mut camera = camera_at(30.0);
        controller.orbit(&mut camera, -100.0, 0.0);

        let (azimuth, elevation) = spherical_angles(&camera);
        assert_relative_eq!(azimuth, 30.0, epsilon = 1e-9);
        assert_relative_eq!(elevation, 30.0, epsilon = 1e-9);
        assert_relative_eq!(camera.distance(), 10.0, epsilon = 1e-9);
        assert_eq!(camera.view_up, Vector3d::z());
    }

    #[test]
    fn test_orbit_clamps_elevation() {
        let controller = TerrainCameraController::default();
        let mut camera = camera_at(80.0);
        controller.orbit(&mut camera, 0.0, -1000.0);
        let (_, elevation) = spherical_angles(&camera);
        assert_relative_eq!(elevation, 85.0, epsilon = 1e-9);

        controller.orbit(&mut camera, 0.0, 5000.0);
        let (_, elevation) = spherical_angles(&camera);
        assert_relative_eq!(elevation, -85.0, epsilon = 1e-9);
    }

    #[test]
    fn test_orbit_rescues_degenerate_camera() {
        let controller = TerrainCameraController::default();
        let mut camera = Camera::new(Point3d::origin(), Point3d::origin(), Vector3d::y());
        controller.orbit(&mut camera, 0.0, 0.0);
        assert!(camera.distance() > 1.0);
        assert!(camera.position.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_gimbal_jump_direction() {
        let controller = TerrainCameraController::new(TerrainCameraConfig {
            allow_inversion: true,
            ..Default::default()
        });
        assert_relative_eq!(controller.avoid_gimbal_lock(88.0, 89.5), 91.0);
        assert_relative_eq!(controller.avoid_gimbal_lock(92.0, 90.5), 89.0);
        assert_relative_eq!(controller.avoid_gimbal_lock(-88.0, -89.5), -91.0);
        assert_relative_eq!(controller.avoid_gimbal_lock(60.0, 70.0), 70.0);
    }

    #[test]
    fn test_zoom_clamps_to_min_distance() {
        let controller = TerrainCameraController::default();
        let mut camera = Camera::default();
        controller.zoom(&mut camera, 10.0);
        assert_relative_eq!(camera.distance(), 9.0, epsilon = 1e-9);

        controller.zoom(&mut camera, 1000.0);
        assert_relative_eq!(camera.distance(), 1e-6, epsilon = 1e-12);
        assert!(camera.view_vector().norm() > 0.0);
    }

    #[test]
    fn test_wheel_zoom_parallel_scale() {
        let controller = TerrainCameraController::default();
        let mut camera = Camera::default().with_projection(Projection::Parallel { scale: 2.0 });
        controller.wheel_zoom(&mut camera, 1.0);
        let Projection::Parallel { scale } = camera.projection else {
            panic!("projection changed kind");
        };
        assert_relative_eq!(scale, 1.8, epsilon = 1e-12);
        assert_relative_eq!(camera.distance(), 10.0);
    }

    #[test]
    fn test_zoom_to_moves_part_of_the_way() {
        let controller = TerrainCameraController::default();
        let mut camera = Camera::default();
        let target = Point3d::new(1.0, 0.0, 0.0);
        assert!(controller.zoom_to(&mut camera, &target));

        assert_eq!(camera.focal_point, target);
        assert_relative_eq!(
            camera.position.coords,
            Vector3d::new(0.7, 0.0, 3.0),
            epsilon = 1e-12
        );
        assert_eq!(camera.view_up, Vector3d::y());

        let position = camera.position;
        assert!(!controller.zoom_to(&mut camera, &Point3d::new(f64::NAN, 0.0, 0.0)));
        assert_eq!(camera.position, position);
    }

    #[test]
    fn test_reset_camera_frames_bounds() {
        let controller = TerrainCameraController::default();
        let mut camera = camera_at(30.0);
        let direction = camera.view_plane_normal();
        let bounds = Bounds::new(Point3d::new(2.0, 2.0, 0.0), Point3d::new(4.0, 4.0, 2.0));
        assert!(controller.reset_camera(&mut camera, &bounds));

        let radius = bounds.diagonal() / 2.0;
        assert_eq!(camera.focal_point, Point3d::new(3.0, 3.0, 1.0));
        assert_relative_eq!(camera.view_plane_normal(), direction, epsilon = 1e-12);
        assert_relative_eq!(
            camera.distance(),
            radius / 15f64.to_radians().sin(),
            epsilon = 1e-9
        );
        let (near, far) = camera.clipping_range;
        assert!(near < camera.distance() - radius && far > camera.distance() + radius);
    }

    #[test]
    fn test_reset_parallel_camera_sets_scale() {
        let controller = TerrainCameraController::default();
        let mut camera = Camera::default().with_projection(Projection::Parallel { scale: 20.0 });
        assert!(controller.reset_camera(&mut camera, &Bounds::default()));
        let Projection::Parallel { scale } = camera.projection else {
            panic!("projection changed kind");
        };
        assert_relative_eq!(scale, 3f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_config_validation() {
        assert!(TerrainCameraConfig::default().validate().is_ok());
        let bad = TerrainCameraConfig {
            min_distance: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let overshoot = TerrainCameraConfig {
            zoom_to_fraction: 1.0,
            ..Default::default()
        };
        assert!(overshoot.validate().is_err());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: TerrainCameraConfig =
            serde_json::from_str(r#"{ "allow_inversion": true }"#).unwrap();
        assert!(config.allow_inversion);
        assert_eq!(config.elevation_limit, 85.0);
        assert!(config.validate().is_ok());
    }
}
