//! Pointer-driven orbit camera.
//!
//! Rotates the camera around a target point on a sphere, zooms by scaling
//! the sphere radius, and pans by sliding the target in the camera's view
//! plane. Works on the camera node's local transform, so the orbit is
//! expressed in the camera pivot's space and keeps following the pivot.

use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};

use crate::transform::Transform;

/// Keeps the polar angle off the poles so look-at stays well defined.
const POLAR_EPSILON: f32 = 1e-3;

/// One frame of pointer input, in physical pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrbitInput {
    /// Drag delta that orbits the camera.
    pub rotate: Vec2,
    /// Drag delta that pans the target.
    pub pan: Vec2,
    /// Wheel steps; positive zooms in.
    pub zoom: f32,
}

impl OrbitInput {
    pub fn is_idle(&self) -> bool {
        self.rotate == Vec2::ZERO && self.pan == Vec2::ZERO && self.zoom == 0.0
    }
}

/// Orbit/zoom/pan controller state.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    /// Point the camera orbits and looks at, in the camera's parent space.
    pub target: Vec3,
    pub min_distance: f32,
    pub max_distance: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub enabled: bool,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            min_distance: 1.5,
            max_distance: 60.0,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            enabled: true,
        }
    }
}

impl OrbitControls {
    /// Apply `input` to `camera`. Returns whether the camera moved.
    pub fn update(
        &mut self,
        camera: &mut Transform,
        fov_y_radians: f32,
        viewport_height: u32,
        input: &OrbitInput,
    ) -> bool {
        if !self.enabled || input.is_idle() {
            return false;
        }
        let height = viewport_height.max(1) as f32;

        let offset = camera.position - self.target;
        let mut radius = offset.length().max(f32::EPSILON);
        let mut azimuth = offset.x.atan2(offset.z);
        let mut polar = polar_angle(offset);

        // A full-height drag turns the camera once around. Dragging down
        // lifts the camera toward the upper pole.
        azimuth -= TAU * input.rotate.x / height * self.rotate_speed;
        polar -= TAU * input.rotate.y / height * self.rotate_speed;
        polar = polar.clamp(POLAR_EPSILON, PI - POLAR_EPSILON);

        if input.zoom != 0.0 {
            radius *= 0.95_f32.powf(input.zoom * self.zoom_speed);
        }
        radius = radius.clamp(self.min_distance, self.max_distance);

        if input.pan != Vec2::ZERO {
            // World units per pixel at the target's depth.
            let per_pixel = 2.0 * radius * (fov_y_radians * 0.5).tan() / height;
            let rotation = camera.rotation.to_quat();
            let right = rotation * Vec3::X;
            let up = rotation * Vec3::Y;
            self.target +=
                (right * -input.pan.x + up * input.pan.y) * per_pixel * self.pan_speed;
        }

        let sin_polar = polar.sin();
        let offset = Vec3::new(
            sin_polar * azimuth.sin(),
            polar.cos(),
            sin_polar * azimuth.cos(),
        ) * radius;
        camera.position = self.target + offset;
        camera.look_at(self.target, Vec3::Y);
        true
    }
}

/// Angle from +Y, accurate near the poles where `acos` loses precision.
fn polar_angle(offset: Vec3) -> f32 {
    Vec2::new(offset.x, offset.z).length().atan2(offset.y)
}
