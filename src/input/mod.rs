//! Input state tracking
//!
//! Frame-coherent key and mouse state fed by the engine's event handler.
//! "Just pressed" / "just released" sets are valid for one frame and
//! cleared by [`Input::end_frame`].

use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, MouseButton};
use winit::keyboard::KeyCode;

/// Input state manager
#[derive(Debug, Default)]
pub struct Input {
    /// Currently pressed keys
    pressed_keys: HashSet<KeyCode>,
    /// Keys that went down this frame
    just_pressed_keys: HashSet<KeyCode>,
    /// Keys that went up this frame
    just_released_keys: HashSet<KeyCode>,
    /// Currently pressed mouse buttons
    pressed_buttons: HashSet<MouseButton>,
    /// Buttons that went down this frame
    just_pressed_buttons: HashSet<MouseButton>,
    /// Buttons that went up this frame
    just_released_buttons: HashSet<MouseButton>,
    /// Current cursor position in window coordinates
    cursor_position: Vec2,
    /// Cursor movement since the last frame
    cursor_delta: Vec2,
}

impl Input {
    /// Create a new input manager
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-frame state; call once at the end of each frame
    pub fn end_frame(&mut self) {
        self.just_pressed_keys.clear();
        self.just_released_keys.clear();
        self.just_pressed_buttons.clear();
        self.just_released_buttons.clear();
        self.cursor_delta = Vec2::ZERO;
    }

    /// Record a keyboard event
    pub fn record_key(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if self.pressed_keys.insert(key) {
                    self.just_pressed_keys.insert(key);
                }
            }
            ElementState::Released => {
                self.pressed_keys.remove(&key);
                self.just_released_keys.insert(key);
            }
        }
    }

    /// Record a mouse button event
    pub fn record_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if self.pressed_buttons.insert(button) {
                    self.just_pressed_buttons.insert(button);
                }
            }
            ElementState::Released => {
                self.pressed_buttons.remove(&button);
                self.just_released_buttons.insert(button);
            }
        }
    }

    /// Record a cursor movement
    pub fn record_cursor(&mut self, position: Vec2) {
        self.cursor_delta += position - self.cursor_position;
        self.cursor_position = position;
    }

    /// Check if a key is currently held
    #[must_use]
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    /// Check if a key went down this frame
    #[must_use]
    pub fn is_key_just_pressed(&self, key: KeyCode) -> bool {
        self.just_pressed_keys.contains(&key)
    }

    /// Check if a key went up this frame
    #[must_use]
    pub fn is_key_just_released(&self, key: KeyCode) -> bool {
        self.just_released_keys.contains(&key)
    }

    /// Check if a mouse button is currently held
    #[must_use]
    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.pressed_buttons.contains(&button)
    }

    /// Check if a mouse button went down this frame
    #[must_use]
    pub fn is_button_just_pressed(&self, button: MouseButton) -> bool {
        self.just_pressed_buttons.contains(&button)
    }

    /// Current cursor position
    #[must_use]
    pub fn cursor_position(&self) -> Vec2 {
        self.cursor_position
    }

    /// Cursor movement accumulated this frame
    #[must_use]
    pub fn cursor_delta(&self) -> Vec2 {
        self.cursor_delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_press_release_cycle() {
        let mut input = Input::new();

        input.record_key(KeyCode::Space, ElementState::Pressed);
        assert!(input.is_key_pressed(KeyCode::Space));
        assert!(input.is_key_just_pressed(KeyCode::Space));

        input.end_frame();
        assert!(input.is_key_pressed(KeyCode::Space));
        assert!(!input.is_key_just_pressed(KeyCode::Space));

        input.record_key(KeyCode::Space, ElementState::Released);
        assert!(!input.is_key_pressed(KeyCode::Space));
        assert!(input.is_key_just_released(KeyCode::Space));
    }

    #[test]
    fn test_repeat_press_is_not_just_pressed_again() {
        let mut input = Input::new();

        input.record_key(KeyCode::KeyW, ElementState::Pressed);
        input.end_frame();
        // OS key repeat sends another press while held
        input.record_key(KeyCode::KeyW, ElementState::Pressed);

        assert!(input.is_key_pressed(KeyCode::KeyW));
        assert!(!input.is_key_just_pressed(KeyCode::KeyW));
    }

    #[test]
    fn test_cursor_delta_accumulates_within_frame() {
        let mut input = Input::new();

        input.record_cursor(Vec2::new(10.0, 0.0));
        input.record_cursor(Vec2::new(15.0, 5.0));
        assert_eq!(input.cursor_delta(), Vec2::new(15.0, 5.0));
        assert_eq!(input.cursor_position(), Vec2::new(15.0, 5.0));

        input.end_frame();
        assert_eq!(input.cursor_delta(), Vec2::ZERO);
        assert_eq!(input.cursor_position(), Vec2::new(15.0, 5.0));
    }

    #[test]
    fn test_mouse_button_tracking() {
        let mut input = Input::new();

        input.record_mouse_button(MouseButton::Left, ElementState::Pressed);
        assert!(input.is_button_pressed(MouseButton::Left));
        assert!(input.is_button_just_pressed(MouseButton::Left));

        input.end_frame();
        input.record_mouse_button(MouseButton::Left, ElementState::Released);
        assert!(!input.is_button_pressed(MouseButton::Left));
    }
}
