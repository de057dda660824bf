//! Translation of winit window events into framekit input events

use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{Key as WinitKey, NamedKey};

use crate::input::{
    InputEvent, Key, KeyEvent, Modifiers, PointerButton, PointerEvent, ScreenPoint, WheelEvent,
};

/// Pixels of touchpad scrolling that count as one wheel notch
const PIXELS_PER_NOTCH: f64 = 100.0;

/// Tracks cursor position and modifier state across winit events
#[derive(Debug, Clone, Copy, Default)]
pub struct WinitInputAdapter {
    cursor: ScreenPoint,
    modifiers: Modifiers,
}

impl WinitInputAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> ScreenPoint {
        self.cursor
    }

    /// Convert one window event; returns `None` for events the interaction
    /// core does not care about
    pub fn translate(&mut self, event: &WindowEvent) -> Option<InputEvent> {
        match event {
            WindowEvent::ModifiersChanged(modifiers) => {
                let state = modifiers.state();
                self.modifiers = Modifiers {
                    shift: state.shift_key(),
                    control: state.control_key(),
                    alt: state.alt_key(),
                };
                None
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = ScreenPoint::new(position.x, position.y);
                Some(InputEvent::PointerMove(PointerEvent::new(self.cursor, None, self.modifiers)))
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = match button {
                    MouseButton::Left => PointerButton::Left,
                    MouseButton::Right => PointerButton::Right,
                    MouseButton::Middle => PointerButton::Middle,
                    _ => return None,
                };
                let pointer = PointerEvent::new(self.cursor, Some(button), self.modifiers);
                Some(match state {
                    ElementState::Pressed => InputEvent::PointerDown(pointer),
                    ElementState::Released => InputEvent::PointerUp(pointer),
                })
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let notches = match delta {
                    MouseScrollDelta::LineDelta(_, y) => f64::from(*y),
                    MouseScrollDelta::PixelDelta(pos) => pos.y / PIXELS_PER_NOTCH,
                };
                Some(InputEvent::Wheel(WheelEvent {
                    position: self.cursor,
                    delta: notches,
                    modifiers: self.modifiers,
                }))
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                let key = match &event.logical_key {
                    WinitKey::Named(NamedKey::ArrowLeft) => Key::ArrowLeft,
                    WinitKey::Named(NamedKey::ArrowRight) => Key::ArrowRight,
                    WinitKey::Named(NamedKey::ArrowUp) => Key::ArrowUp,
                    WinitKey::Named(NamedKey::ArrowDown) => Key::ArrowDown,
                    WinitKey::Named(NamedKey::Escape) => Key::Escape,
                    WinitKey::Character(c) => Key::Character(c.chars().next()?),
                    _ => return None,
                };
                Some(InputEvent::KeyDown(KeyEvent::new(key, self.modifiers)))
            }
            WindowEvent::Focused(false) => Some(InputEvent::FocusLost),
            _ => None,
        }
    }
}
