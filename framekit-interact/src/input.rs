//! Input events and the handler interface
//!
//! Hosts deliver pointer positions in top-left-origin pixel coordinates
//! ([`ScreenPoint`]). Everything that talks to the viewport works in
//! bottom-left-origin display coordinates, so handlers convert with
//! [`ScreenPoint::to_display`].

use nalgebra::Point2;

use crate::viewport::Viewport;

/// Pointer position in pixels, origin at the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Flip into the renderer's bottom-left-origin convention
    pub fn to_display(self, viewport_height: f64) -> Point2<f64> {
        Point2::new(self.x, viewport_height - self.y)
    }

    /// Inverse of [`ScreenPoint::to_display`]
    pub fn from_display(display: &Point2<f64>, viewport_height: f64) -> Self {
        Self::new(display.x, viewport_height - display.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys held while an event was generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub control: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        control: false,
        alt: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    pub fn control() -> Self {
        Self {
            control: true,
            ..Self::NONE
        }
    }
}

/// Keys the interaction core reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Escape,
    Character(char),
}

/// Press, move or release of a pointer
///
/// `button` is `None` for plain moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub position: ScreenPoint,
    pub button: Option<PointerButton>,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn new(position: ScreenPoint, button: Option<PointerButton>, modifiers: Modifiers) -> Self {
        Self {
            position,
            button,
            modifiers,
        }
    }

    pub fn moved(x: f64, y: f64) -> Self {
        Self::new(ScreenPoint::new(x, y), None, Modifiers::NONE)
    }

    pub fn button(x: f64, y: f64, button: PointerButton) -> Self {
        Self::new(ScreenPoint::new(x, y), Some(button), Modifiers::NONE)
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Mouse wheel rotation in notches; positive rolls away from the user
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelEvent {
    pub position: ScreenPoint,
    pub delta: f64,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }
}

/// Everything a host can deliver to the interaction core
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown(PointerEvent),
    PointerMove(PointerEvent),
    PointerUp(PointerEvent),
    Wheel(WheelEvent),
    KeyDown(KeyEvent),
    FocusLost,
}

/// Capability interface implemented by the widget and camera controllers
///
/// Every method returns whether the event was consumed. Implementors only
/// override what they care about.
pub trait InteractionHandler {
    fn on_pointer_down(&mut self, _view: &dyn Viewport, _event: &PointerEvent) -> bool {
        false
    }

    fn on_pointer_move(&mut self, _view: &dyn Viewport, _event: &PointerEvent) -> bool {
        false
    }

    fn on_pointer_up(&mut self, _view: &dyn Viewport, _event: &PointerEvent) -> bool {
        false
    }

    fn on_wheel(&mut self, _view: &dyn Viewport, _event: &WheelEvent) -> bool {
        false
    }

    fn on_key_down(&mut self, _view: &dyn Viewport, _event: &KeyEvent) -> bool {
        false
    }

    /// The view lost input focus; any drag in progress must end
    fn on_focus_lost(&mut self, _view: &dyn Viewport) -> bool {
        false
    }
}

/// Routes events to a prioritized list of handlers
///
/// A handler that consumes a press owns the interaction session: it alone
/// receives moves and the release until the session ends. This keeps the
/// frame widget and the camera controller mutually exclusive per drag.
#[derive(Debug, Default)]
pub struct InputRouter {
    owner: Option<usize>,
}

impl InputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the handler owning the current session
    pub fn session_owner(&self) -> Option<usize> {
        self.owner
    }

    pub fn dispatch(
        &mut self,
        handlers: &mut [&mut dyn InteractionHandler],
        view: &dyn Viewport,
        event: &InputEvent,
    ) -> bool {
        match event {
            InputEvent::PointerDown(e) => {
                if let Some(owner) = self.owner {
                    return handlers
                        .get_mut(owner)
                        .map_or(false, |h| h.on_pointer_down(view, e));
                }
                for (index, handler) in handlers.iter_mut().enumerate() {
                    if handler.on_pointer_down(view, e) {
                        log::debug!("handler {} owns the interaction session", index);
                        self.owner = Some(index);
                        return true;
                    }
                }
                false
            }
            InputEvent::PointerMove(e) => match self.owner {
                Some(owner) => handlers
                    .get_mut(owner)
                    .map_or(false, |h| h.on_pointer_move(view, e)),
                None => handlers.iter_mut().any(|h| h.on_pointer_move(view, e)),
            },
            InputEvent::PointerUp(e) => match self.owner.take() {
                Some(owner) => handlers
                    .get_mut(owner)
                    .map_or(false, |h| h.on_pointer_up(view, e)),
                None => handlers.iter_mut().any(|h| h.on_pointer_up(view, e)),
            },
            InputEvent::Wheel(e) => handlers.iter_mut().any(|h| h.on_wheel(view, e)),
            InputEvent::KeyDown(e) => handlers.iter_mut().any(|h| h.on_key_down(view, e)),
            InputEvent::FocusLost => {
                self.owner = None;
                handlers
                    .iter_mut()
                    .fold(false, |consumed, h| h.on_focus_lost(view) || consumed)
            }
        }
    }
}
