//! Six-handle manipulator for one rigid transform
//!
//! The widget draws three axes (translate along, rotate about) and three
//! rings (translate in plane, rotate about the ring normal) on top of a
//! [`RigidTransform`]. Hosts render the handles from [`InteractiveFrameWidget::handles`]
//! using the transform's pose; the widget only keeps their colors and
//! visibility current.

use std::fmt;
use std::rc::Rc;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use framekit_core::{
    closest_line_parameter, ray_plane_intersection, signed_screen_angle, Axis, Error, Plane,
    Point3d, Pose, Result, RigidTransform, Vector3d,
};

use crate::input::{InteractionHandler, Key, KeyEvent, PointerButton, PointerEvent};
use crate::picking::{GeometricPicker, PickService, PickShape};
use crate::viewport::Viewport;

/// Axis length as a multiple of the widget scale
const AXIS_LENGTH: f64 = 1.5;

/// Radius of the sphere at the axis tip as a multiple of the widget scale
const AXIS_TIP_RADIUS: f64 = 0.057;

/// Linear color in the range `[0, 1]`
pub type Color = [f64; 3];

/// Arrow-key nudging steps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NudgeConfig {
    /// Translation per key press in world units
    pub linear_step: f64,
    /// Yaw per key press in degrees
    pub angular_step_degrees: f64,
    /// Factor applied to both steps while Control is held
    pub control_multiplier: f64,
}

impl Default for NudgeConfig {
    fn default() -> Self {
        Self {
            linear_step: 0.005,
            angular_step_degrees: 1.0,
            control_multiplier: 5.0,
        }
    }
}

/// Appearance and picking parameters of the frame widget
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameWidgetConfig {
    /// Ring radius in world units; axes are 1.5 times longer
    pub scale: f64,
    /// Pick tolerance as a fraction of the viewport diagonal
    pub pick_tolerance: f64,
    /// Amount added to each color channel of the hovered handle
    pub highlight_delta: f64,
    pub ring_opacity: f64,
    pub nudge: NudgeConfig,
}

impl Default for FrameWidgetConfig {
    fn default() -> Self {
        Self {
            scale: 0.5,
            pick_tolerance: 0.005,
            highlight_delta: 0.3,
            ring_opacity: 0.8,
            nudge: NudgeConfig::default(),
        }
    }
}

impl FrameWidgetConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "widget scale must be positive, got {}",
                self.scale
            )));
        }
        if !(self.pick_tolerance.is_finite() && self.pick_tolerance >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "pick tolerance must be non-negative, got {}",
                self.pick_tolerance
            )));
        }
        let unit = 0.0..=1.0;
        if !unit.contains(&self.ring_opacity) || !unit.contains(&self.highlight_delta) {
            return Err(Error::InvalidConfig(
                "ring opacity and highlight delta must lie in [0, 1]".to_string(),
            ));
        }
        let nudge = &self.nudge;
        if ![nudge.linear_step, nudge.angular_step_degrees, nudge.control_multiplier]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(Error::InvalidConfig("nudge steps must be finite".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Axis,
    Ring,
}

/// Identity of one of the six handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId {
    pub kind: HandleKind,
    pub axis: Axis,
}

impl HandleId {
    pub fn axis(axis: Axis) -> Self {
        Self {
            kind: HandleKind::Axis,
            axis,
        }
    }

    pub fn ring(axis: Axis) -> Self {
        Self {
            kind: HandleKind::Ring,
            axis,
        }
    }
}

/// One pickable shape of the widget
#[derive(Debug, Clone, PartialEq)]
pub struct ManipulatorHandle {
    pub id: HandleId,
    pub base_color: Color,
    /// Color to draw with; differs from `base_color` while highlighted
    pub color: Color,
    pub opacity: f64,
    pub visible: bool,
}

impl ManipulatorHandle {
    fn new(id: HandleId, opacity: f64) -> Self {
        let mut base_color = [0.0; 3];
        base_color[id.axis.index()] = 1.0;
        Self {
            id,
            base_color,
            color: base_color,
            opacity,
            visible: true,
        }
    }

    /// World-space pick shape for a frame at `pose`
    pub fn shape(&self, pose: &Pose, scale: f64) -> PickShape {
        let origin = Point3d::from(pose.translation.vector);
        let direction = pose.rotation * self.id.axis.unit();
        match self.id.kind {
            HandleKind::Axis => PickShape::Segment {
                start: origin,
                end: origin + direction * (AXIS_LENGTH * scale),
                tip_radius: AXIS_TIP_RADIUS * scale,
            },
            HandleKind::Ring => PickShape::Circle {
                center: origin,
                normal: direction,
                radius: scale,
            },
        }
    }
}

/// What a drag currently does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Outside,
    Translating,
    TranslatingInPlane,
    Rotating,
}

/// State of one press-drag-release gesture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionSession {
    pub handle: HandleId,
    pub state: InteractionState,
    /// Display position of the press
    pub press_position: Point2<f64>,
    /// Frame origin at the time of the press
    pub anchor: Point3d,
    pub last_position: Point2<f64>,
}

/// Interactive manipulator bound to one [`RigidTransform`]
pub struct InteractiveFrameWidget {
    transform: RigidTransform,
    config: FrameWidgetConfig,
    handles: Vec<ManipulatorHandle>,
    highlighted: Option<usize>,
    session: Option<InteractionSession>,
    enabled: bool,
    viewports: Vec<Rc<dyn Viewport>>,
    picker: Box<dyn PickService>,
}

impl InteractiveFrameWidget {
    pub fn new(transform: RigidTransform) -> Self {
        Self::with_config(transform, FrameWidgetConfig::default())
    }

    pub fn with_config(transform: RigidTransform, config: FrameWidgetConfig) -> Self {
        let handles = Axis::ALL
            .iter()
            .map(|&axis| ManipulatorHandle::new(HandleId::axis(axis), 1.0))
            .chain(
                Axis::ALL
                    .iter()
                    .map(|&axis| ManipulatorHandle::new(HandleId::ring(axis), config.ring_opacity)),
            )
            .collect();

        Self {
            transform,
            picker: Box::new(GeometricPicker::new(config.pick_tolerance)),
            config,
            handles,
            highlighted: None,
            session: None,
            enabled: true,
            viewports: Vec::new(),
        }
    }

    /// Replace the pick service
    pub fn with_picker(mut self, picker: Box<dyn PickService>) -> Self {
        self.picker = picker;
        self
    }

    pub fn transform(&self) -> &RigidTransform {
        &self.transform
    }

    pub fn config(&self) -> &FrameWidgetConfig {
        &self.config
    }

    pub fn handles(&self) -> &[ManipulatorHandle] {
        &self.handles
    }

    pub fn handle(&self, id: HandleId) -> Option<&ManipulatorHandle> {
        self.handles.iter().find(|h| h.id == id)
    }

    pub fn highlighted(&self) -> Option<HandleId> {
        self.highlighted.and_then(|i| self.handles.get(i)).map(|h| h.id)
    }

    pub fn state(&self) -> InteractionState {
        self.session.map_or(InteractionState::Outside, |s| s.state)
    }

    pub fn session(&self) -> Option<&InteractionSession> {
        self.session.as_ref()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Register a view that must redraw whenever the widget changes
    pub fn attach_viewport(&mut self, viewport: Rc<dyn Viewport>) {
        self.viewports.push(viewport);
    }

    /// Show or hide the handles; a disabled widget ignores input
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.cancel();
            self.set_highlight(None);
        }
        self.enabled = enabled;
        for handle in &mut self.handles {
            handle.visible = enabled;
        }
        self.request_render(None);
    }

    /// Remove the handles and detach from every viewport
    pub fn cleanup(&mut self) {
        self.cancel();
        self.highlighted = None;
        self.handles.clear();
        self.enabled = false;
        self.request_render(None);
        self.viewports.clear();
        log::debug!("frame widget cleaned up");
    }

    /// End the current gesture without further changes
    ///
    /// Returns whether a gesture was active.
    pub fn cancel(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                log::debug!("frame widget {:?} -> Outside", session.state);
                true
            }
            None => false,
        }
    }

    fn request_render(&self, view: Option<&dyn Viewport>) {
        if let Some(view) = view {
            view.request_render();
        }
        for viewport in &self.viewports {
            viewport.request_render();
        }
    }

    fn pick(&self, view: &dyn Viewport, display: &Point2<f64>) -> Option<usize> {
        let pose = self.transform.pose();
        let (indices, shapes): (Vec<usize>, Vec<PickShape>) = self
            .handles
            .iter()
            .enumerate()
            .filter(|(_, h)| h.visible)
            .map(|(i, h)| (i, h.shape(&pose, self.config.scale)))
            .unzip();
        let hit = self.picker.pick(view, display, &shapes)?;
        indices.get(hit.index).copied()
    }

    /// Move the highlight; returns whether anything changed
    fn set_highlight(&mut self, index: Option<usize>) -> bool {
        if self.highlighted == index {
            return false;
        }
        if let Some(handle) = self.highlighted.and_then(|i| self.handles.get_mut(i)) {
            handle.color = handle.base_color;
        }
        let delta = self.config.highlight_delta;
        if let Some(handle) = index.and_then(|i| self.handles.get_mut(i)) {
            handle.color = handle.base_color.map(|c| (c + delta).min(1.0));
        }
        self.highlighted = index;
        true
    }

    fn translate_along_axis(
        &self,
        view: &dyn Viewport,
        session: &InteractionSession,
        current: &Point2<f64>,
    ) -> bool {
        let axis = self.transform.world_axis(session.handle.axis);
        let step = (|| {
            let previous = view.display_ray(&session.last_position)?;
            let current = view.display_ray(current)?;
            let t_previous = closest_line_parameter(&previous, &session.anchor, &axis)?;
            let t_current = closest_line_parameter(&current, &session.anchor, &axis)?;
            Some(axis * (t_current - t_previous))
        })();
        match step {
            Some(delta) if delta == Vector3d::zeros() => false,
            Some(delta) => self.transform.translate_world(&delta),
            None => {
                log::trace!("pointer ray parallel to {:?} axis; skipping", session.handle.axis);
                false
            }
        }
    }

    fn translate_in_plane(
        &self,
        view: &dyn Viewport,
        session: &InteractionSession,
        current: &Point2<f64>,
    ) -> bool {
        let plane = Plane::new(session.anchor, self.transform.world_axis(session.handle.axis));
        let step = (|| {
            let previous = view.display_ray(&session.last_position)?;
            let previous = ray_plane_intersection(&previous, &plane)?;
            let current = ray_plane_intersection(&view.display_ray(current)?, &plane)?;
            Some(current - previous)
        })();
        match step {
            Some(delta) if delta == Vector3d::zeros() => false,
            Some(delta) => self.transform.translate_world(&delta),
            None => {
                log::trace!("pointer ray parallel to the drag plane; skipping");
                false
            }
        }
    }

    fn rotate_about_axis(
        &self,
        view: &dyn Viewport,
        session: &InteractionSession,
        current: &Point2<f64>,
    ) -> bool {
        let center = self.transform.position();
        let axis = self.transform.world_axis(session.handle.axis);
        let angle = view.world_to_display(&center).and_then(|c| {
            signed_screen_angle(&Point2::new(c.x, c.y), &session.last_position, current)
        });
        let Some(angle) = angle else {
            log::trace!("pointer on the rotation center; skipping");
            return false;
        };
        if angle == 0.0 {
            return false;
        }

        // Counter-clockwise on screen is positive about an axis facing the camera
        let facing = view.camera().view_plane_normal().dot(&axis) > 0.0;
        let angle = if facing { angle } else { -angle };
        self.transform.rotate_about_point(&center, &axis, angle)
    }

    fn nudge(&self, event: &KeyEvent) -> bool {
        let nudge = &self.config.nudge;
        let factor = if event.modifiers.control {
            nudge.control_multiplier
        } else {
            1.0
        };
        let linear = nudge.linear_step * factor;
        let angular = (nudge.angular_step_degrees * factor).to_radians();
        let shift = event.modifiers.shift;

        let (offset, yaw) = match event.key {
            Key::ArrowLeft if shift => (Vector3d::zeros(), angular),
            Key::ArrowLeft => (Vector3d::new(0.0, -linear, 0.0), 0.0),
            Key::ArrowRight if shift => (Vector3d::zeros(), -angular),
            Key::ArrowRight => (Vector3d::new(0.0, linear, 0.0), 0.0),
            Key::ArrowUp if shift => (Vector3d::new(0.0, 0.0, linear), 0.0),
            Key::ArrowUp => (Vector3d::new(linear, 0.0, 0.0), 0.0),
            Key::ArrowDown if shift => (Vector3d::new(0.0, 0.0, -linear), 0.0),
            Key::ArrowDown => (Vector3d::new(-linear, 0.0, 0.0), 0.0),
            _ => return false,
        };

        // Yaw first, then translate, both in the frame's own coordinates
        let local =
            Pose::rotation(Vector3d::z() * yaw) * Pose::translation(offset.x, offset.y, offset.z);
        self.transform.pre_multiply(&local);
        true
    }
}

impl InteractionHandler for InteractiveFrameWidget {
    fn on_pointer_down(&mut self, view: &dyn Viewport, event: &PointerEvent) -> bool {
        if !self.enabled || self.session.is_some() {
            return false;
        }
        let Some(button) = event.button else {
            return false;
        };
        let display = event.position.to_display(view.height());
        let Some(index) = self.pick(view, &display) else {
            return false;
        };
        let Some(handle) = self.handles.get(index).map(|h| h.id) else {
            return false;
        };

        let state = match (button, handle.kind) {
            (PointerButton::Left, HandleKind::Axis) => InteractionState::Translating,
            (PointerButton::Left, HandleKind::Ring) => InteractionState::TranslatingInPlane,
            (PointerButton::Right, _) => InteractionState::Rotating,
            (PointerButton::Middle, _) => return false,
        };

        log::debug!("frame widget Outside -> {:?} on {:?}", state, handle);
        self.session = Some(InteractionSession {
            handle,
            state,
            press_position: display,
            anchor: self.transform.position(),
            last_position: display,
        });
        true
    }

    fn on_pointer_move(&mut self, view: &dyn Viewport, event: &PointerEvent) -> bool {
        if !self.enabled {
            return false;
        }
        let display = event.position.to_display(view.height());

        let Some(session) = self.session else {
            let hit = self.pick(view, &display);
            if self.set_highlight(hit) {
                self.request_render(Some(view));
            }
            return hit.is_some();
        };

        let changed = match session.state {
            InteractionState::Translating => self.translate_along_axis(view, &session, &display),
            InteractionState::TranslatingInPlane => {
                self.translate_in_plane(view, &session, &display)
            }
            InteractionState::Rotating => self.rotate_about_axis(view, &session, &display),
            InteractionState::Outside => false,
        };
        if let Some(session) = self.session.as_mut() {
            session.last_position = display;
        }
        if changed {
            self.request_render(Some(view));
        }
        true
    }

    fn on_pointer_up(&mut self, _view: &dyn Viewport, _event: &PointerEvent) -> bool {
        self.cancel()
    }

    fn on_key_down(&mut self, view: &dyn Viewport, event: &KeyEvent) -> bool {
        if !self.enabled {
            return false;
        }
        if event.key == Key::Escape {
            return self.cancel();
        }
        if self.session.is_some() {
            return false;
        }
        let consumed = self.nudge(event);
        if consumed {
            self.request_render(Some(view));
        }
        consumed
    }

    fn on_focus_lost(&mut self, _view: &dyn Viewport) -> bool {
        self.cancel()
    }
}

impl fmt::Debug for InteractiveFrameWidget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractiveFrameWidget")
            .field("transform", &self.transform)
            .field("config", &self.config)
            .field("state", &self.state())
            .field("enabled", &self.enabled)
            .field("viewports", &self.viewports.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::input::{Modifiers, ScreenPoint};
    use crate::viewport::ProjectedViewport;
    use approx::assert_relative_eq;

    fn view() -> ProjectedViewport {
        ProjectedViewport::new(Camera::default(), 800, 600)
    }

    fn screen_of(view: &ProjectedViewport, p: Point3d) -> (f64, f64) {
        let d = view.world_to_display(&p).unwrap();
        let s = ScreenPoint::from_display(&Point2::new(d.x, d.y), view.height());
        (s.x, s.y)
    }

    #[test]
    fn test_default_handles() {
        let widget = InteractiveFrameWidget::new(RigidTransform::identity());
        assert_eq!(widget.handles().len(), 6);
        let ring = widget.handle(HandleId::ring(Axis::Y)).unwrap();
        assert_eq!(ring.base_color, [0.0, 1.0, 0.0]);
        assert_relative_eq!(ring.opacity, 0.8);
        assert_eq!(widget.state(), InteractionState::Outside);
    }

    #[test]
    fn test_hover_highlight_and_restore() {
        let view = view();
        let mut widget = InteractiveFrameWidget::new(RigidTransform::identity());

        let (x, y) = screen_of(&view, Point3d::new(0.65, 0.0, 0.0));
        assert!(widget.on_pointer_move(&view, &PointerEvent::moved(x, y)));
        assert_eq!(widget.highlighted(), Some(HandleId::axis(Axis::X)));
        let handle = widget.handle(HandleId::axis(Axis::X)).unwrap();
        assert_eq!(handle.color, [1.0, 0.3, 0.3]);
        assert!(view.renders().take_pending());

        assert!(!widget.on_pointer_move(&view, &PointerEvent::moved(5.0, 5.0)));
        assert_eq!(widget.highlighted(), None);
        let handle = widget.handle(HandleId::axis(Axis::X)).unwrap();
        assert_eq!(handle.color, handle.base_color);
    }

    #[test]
    fn test_press_on_nothing_not_consumed() {
        let view = view();
        let mut widget = InteractiveFrameWidget::new(RigidTransform::identity());
        let press = PointerEvent::button(5.0, 5.0, PointerButton::Left);
        assert!(!widget.on_pointer_down(&view, &press));
        assert_eq!(widget.state(), InteractionState::Outside);
        assert!(!widget.on_pointer_up(&view, &press));
    }

    #[test]
    fn test_button_selects_mode() {
        let view = view();
        let (x, y) = screen_of(&view, Point3d::new(0.65, 0.0, 0.0));

        let mut widget = InteractiveFrameWidget::new(RigidTransform::identity());
        assert!(widget.on_pointer_down(&view, &PointerEvent::button(x, y, PointerButton::Left)));
        assert_eq!(widget.state(), InteractionState::Translating);
        widget.on_focus_lost(&view);
        assert_eq!(widget.state(), InteractionState::Outside);

        assert!(widget.on_pointer_down(&view, &PointerEvent::button(x, y, PointerButton::Right)));
        assert_eq!(widget.state(), InteractionState::Rotating);

        let escape = KeyEvent::new(Key::Escape, Modifiers::NONE);
        assert!(widget.on_key_down(&view, &escape));
        assert_eq!(widget.state(), InteractionState::Outside);
    }

    #[test]
    fn test_nudge_in_local_frame() {
        let view = view();
        let transform = RigidTransform::from_position_rpy_degrees([0.0; 3], [0.0, 0.0, 90.0]);
        let mut widget = InteractiveFrameWidget::new(transform.clone());

        // Local +X is world +Y after the yaw
        widget.on_key_down(&view, &KeyEvent::new(Key::ArrowUp, Modifiers::NONE));
        assert_relative_eq!(transform.position(), Point3d::new(0.0, 0.005, 0.0), epsilon = 1e-12);

        widget.on_key_down(&view, &KeyEvent::new(Key::ArrowDown, Modifiers::control()));
        assert_relative_eq!(transform.position(), Point3d::new(0.0, -0.02, 0.0), epsilon = 1e-12);

        widget.on_key_down(&view, &KeyEvent::new(Key::ArrowLeft, Modifiers::shift()));
        let (_, _, yaw) = transform.rotation().euler_angles();
        assert_relative_eq!(yaw.to_degrees(), 91.0, epsilon = 1e-9);

        assert!(!widget.on_key_down(&view, &KeyEvent::new(Key::Character('a'), Modifiers::NONE)));
    }

    #[test]
    fn test_disabled_widget_ignores_input() {
        let view = view();
        let mut widget = InteractiveFrameWidget::new(RigidTransform::identity());
        widget.set_enabled(false);
        assert!(widget.handles().iter().all(|h| !h.visible));

        let (x, y) = screen_of(&view, Point3d::new(0.65, 0.0, 0.0));
        assert!(!widget.on_pointer_down(&view, &PointerEvent::button(x, y, PointerButton::Left)));
        assert!(!widget.on_key_down(&view, &KeyEvent::new(Key::ArrowUp, Modifiers::NONE)));
    }

    #[test]
    fn test_cleanup_requests_final_render() {
        let view = Rc::new(view());
        let mut widget = InteractiveFrameWidget::new(RigidTransform::identity());
        widget.attach_viewport(view.clone());
        widget.cleanup();
        assert!(widget.handles().is_empty());
        assert!(view.renders().take_pending());
    }

    #[test]
    fn test_config_validation() {
        assert!(FrameWidgetConfig::default().validate().is_ok());
        let bad = FrameWidgetConfig {
            scale: 0.0,
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(Error::InvalidConfig(_))));
    }
}
