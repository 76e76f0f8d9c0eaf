//! Perspective camera attached to a scene node.
//!
//! The camera's placement comes from its node's world matrix; this struct
//! only holds the lens and the layer mask.

use glam::{Mat4, Vec3};

use crate::layers::{Layers, RenderLayer};

/// Perspective lens with a visible-layer mask.
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees.
    pub fov_y_degrees: f32,
    /// Width / height.
    pub aspect: f32,
    /// Near clip plane distance (always positive).
    pub near: f32,
    /// Far clip plane distance (always positive, > near).
    pub far: f32,
    /// Layers the camera currently sees. Switched between render passes.
    pub layers: Layers,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self {
            fov_y_degrees: 60.0,
            aspect: 1.0,
            near: 0.1,
            far: 1000.0,
            layers: Layers::only(RenderLayer::Base),
        }
    }
}

impl PerspectiveCamera {
    pub fn new(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov_y_degrees,
            aspect,
            near,
            far,
            ..Self::default()
        }
    }

    pub fn fov_y_radians(&self) -> f32 {
        self.fov_y_degrees.to_radians()
    }

    /// Set aspect to `width / height`. Zero dimensions are treated as 1.
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    /// Reverse-Z projection: near plane maps to depth 1, far to 0.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_radians(), self.aspect, self.far, self.near)
    }

    /// View-projection for a camera placed by `world` (its node's world matrix).
    pub fn view_projection(&self, world: Mat4) -> Mat4 {
        self.projection_matrix() * world.inverse()
    }

    /// Whether an object on `layers` is visible to this camera.
    pub fn sees(&self, layers: Layers) -> bool {
        self.layers.intersects(layers)
    }
}

/// Eye position encoded in a camera world matrix.
pub fn eye_position(world: Mat4) -> Vec3 {
    world.w_axis.truncate()
}
