//! Frame-coherent mouse state and its mapping onto orbit controls.
//!
//! [`MouseState`] accumulates winit mouse events during a frame;
//! [`MouseState::orbit_input`] turns them into an [`OrbitInput`]:
//! left drag rotates, right or middle drag pans, the wheel zooms.

use glam::Vec2;
use solar_scene::OrbitInput;
use winit::event::{ElementState, MouseButton, MouseScrollDelta};

/// Pixels of a high-resolution scroll that count as one wheel line.
const PIXELS_PER_LINE: f64 = 40.0;

#[derive(Debug, Clone, Copy, Default)]
struct ButtonFrame {
    pressed: bool,
    just_pressed: bool,
    just_released: bool,
}

fn button_index(button: MouseButton) -> Option<usize> {
    match button {
        MouseButton::Left => Some(0),
        MouseButton::Right => Some(1),
        MouseButton::Middle => Some(2),
        _ => None,
    }
}

/// Mouse state for the current frame.
///
/// Forward winit events through the `on_*` methods, read
/// [`orbit_input`](Self::orbit_input), then call
/// [`clear_transients`](Self::clear_transients) once the frame is drawn.
#[derive(Debug, Clone, Default)]
pub struct MouseState {
    position: Option<Vec2>,
    delta: Vec2,
    buttons: [ButtonFrame; 3],
    scroll: f32,
    cursor_in_window: bool,
}

impl MouseState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a `CursorMoved` event (physical pixels).
    pub fn on_cursor_moved(&mut self, x: f64, y: f64) {
        let new_pos = Vec2::new(x as f32, y as f32);
        // The first position after entering has nothing to diff against.
        if let Some(previous) = self.position {
            self.delta += new_pos - previous;
        }
        self.position = Some(new_pos);
    }

    pub fn on_button(&mut self, button: MouseButton, state: ElementState) {
        let Some(idx) = button_index(button) else {
            return;
        };
        match state {
            ElementState::Pressed => {
                self.buttons[idx].pressed = true;
                self.buttons[idx].just_pressed = true;
            }
            ElementState::Released => {
                self.buttons[idx].pressed = false;
                self.buttons[idx].just_released = true;
            }
        }
    }

    pub fn on_scroll(&mut self, delta: MouseScrollDelta) {
        match delta {
            MouseScrollDelta::LineDelta(_x, y) => self.scroll += y,
            MouseScrollDelta::PixelDelta(pos) => self.scroll += (pos.y / PIXELS_PER_LINE) as f32,
        }
    }

    pub fn on_cursor_entered(&mut self) {
        self.cursor_in_window = true;
    }

    pub fn on_cursor_left(&mut self) {
        self.cursor_in_window = false;
        self.position = None;
    }

    /// Clears per-frame delta, scroll and edge flags.
    pub fn clear_transients(&mut self) {
        self.delta = Vec2::ZERO;
        self.scroll = 0.0;
        for b in &mut self.buttons {
            b.just_pressed = false;
            b.just_released = false;
        }
    }

    #[must_use]
    pub fn position(&self) -> Option<Vec2> {
        self.position
    }

    #[must_use]
    pub fn delta(&self) -> Vec2 {
        self.delta
    }

    #[must_use]
    pub fn scroll(&self) -> f32 {
        self.scroll
    }

    #[must_use]
    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        button_index(button).is_some_and(|i| self.buttons[i].pressed)
    }

    #[must_use]
    pub fn just_button_pressed(&self, button: MouseButton) -> bool {
        button_index(button).is_some_and(|i| self.buttons[i].just_pressed)
    }

    #[must_use]
    pub fn just_button_released(&self, button: MouseButton) -> bool {
        button_index(button).is_some_and(|i| self.buttons[i].just_released)
    }

    #[must_use]
    pub fn is_cursor_in_window(&self) -> bool {
        self.cursor_in_window
    }

    /// This frame's orbit gesture. Left drag wins over a simultaneous pan.
    #[must_use]
    pub fn orbit_input(&self) -> OrbitInput {
        let rotating = self.is_button_pressed(MouseButton::Left);
        let panning = !rotating
            && (self.is_button_pressed(MouseButton::Right)
                || self.is_button_pressed(MouseButton::Middle));
        OrbitInput {
            rotate: if rotating { self.delta } else { Vec2::ZERO },
            pan: if panning { self.delta } else { Vec2::ZERO },
            zoom: self.scroll,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dragging(button: MouseButton) -> MouseState {
        let mut ms = MouseState::new();
        ms.on_cursor_moved(100.0, 100.0);
        ms.on_button(button, ElementState::Pressed);
        ms.on_cursor_moved(110.0, 95.0);
        ms
    }

    #[test]
    fn test_delta_is_difference_between_moves() {
        let mut ms = MouseState::new();
        ms.on_cursor_moved(100.0, 200.0);
        ms.clear_transients();
        ms.on_cursor_moved(110.0, 195.0);
        assert_eq!(ms.delta(), Vec2::new(10.0, -5.0));
    }

    #[test]
    fn test_first_move_has_no_delta() {
        let mut ms = MouseState::new();
        ms.on_cursor_moved(300.0, 300.0);
        assert_eq!(ms.delta(), Vec2::ZERO);
    }

    #[test]
    fn test_reentering_window_does_not_jump() {
        let mut ms = MouseState::new();
        ms.on_cursor_moved(10.0, 10.0);
        ms.on_cursor_left();
        ms.on_cursor_entered();
        ms.on_cursor_moved(500.0, 500.0);
        assert_eq!(ms.delta(), Vec2::ZERO);
        assert!(ms.is_cursor_in_window());
    }

    #[test]
    fn test_button_edges_cleared_each_frame() {
        let mut ms = MouseState::new();
        ms.on_button(MouseButton::Left, ElementState::Pressed);
        assert!(ms.just_button_pressed(MouseButton::Left));
        ms.clear_transients();
        assert!(ms.is_button_pressed(MouseButton::Left));
        assert!(!ms.just_button_pressed(MouseButton::Left));
        ms.on_button(MouseButton::Left, ElementState::Released);
        assert!(ms.just_button_released(MouseButton::Left));
        assert!(!ms.is_button_pressed(MouseButton::Left));
    }

    #[test]
    fn test_left_drag_rotates() {
        let input = dragging(MouseButton::Left).orbit_input();
        assert_eq!(input.rotate, Vec2::new(10.0, -5.0));
        assert_eq!(input.pan, Vec2::ZERO);
    }

    #[test]
    fn test_right_and_middle_drag_pan() {
        for button in [MouseButton::Right, MouseButton::Middle] {
            let input = dragging(button).orbit_input();
            assert_eq!(input.pan, Vec2::new(10.0, -5.0));
            assert_eq!(input.rotate, Vec2::ZERO);
        }
    }

    #[test]
    fn test_hover_without_buttons_is_idle() {
        let mut ms = MouseState::new();
        ms.on_cursor_moved(0.0, 0.0);
        ms.on_cursor_moved(50.0, 50.0);
        assert!(ms.orbit_input().is_idle());
    }

    #[test]
    fn test_wheel_zooms_and_pixel_deltas_scale() {
        let mut ms = MouseState::new();
        ms.on_scroll(MouseScrollDelta::LineDelta(0.0, 1.0));
        ms.on_scroll(MouseScrollDelta::PixelDelta(winit::dpi::PhysicalPosition::new(0.0, 20.0)));
        assert!((ms.orbit_input().zoom - 1.5).abs() < f32::EPSILON);
        ms.clear_transients();
        assert_eq!(ms.orbit_input().zoom, 0.0);
    }

    #[test]
    fn test_extra_buttons_ignored() {
        let mut ms = MouseState::new();
        ms.on_button(MouseButton::Back, ElementState::Pressed);
        assert!(!ms.is_button_pressed(MouseButton::Back));
    }
}
