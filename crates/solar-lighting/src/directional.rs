//! Directional light: the sun, infinitely distant but placed at the sun mesh.
//!
//! Only the direction from [`DirectionalLight::position`] to the target
//! matters for shading. The position also anchors the shadow frustum.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::shadow::ShadowConfig;

/// CPU-side directional light description.
#[derive(Clone, Debug, PartialEq)]
pub struct DirectionalLight {
    /// World position the light shines from.
    pub position: Vec3,
    /// Linear RGB color of the light (not premultiplied by intensity).
    pub color: Vec3,
    pub intensity: f32,
    pub cast_shadow: bool,
    pub shadow: ShadowConfig,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.0, 0.0),
            color: Vec3::ONE,
            intensity: 1.0,
            cast_shadow: false,
            shadow: ShadowConfig::default(),
        }
    }
}

impl DirectionalLight {
    /// Unit vector pointing from the light toward `target`.
    ///
    /// Falls back to straight down when the light sits on the target.
    pub fn direction_towards(&self, target: Vec3) -> Vec3 {
        (target - self.position).try_normalize().unwrap_or(Vec3::NEG_Y)
    }

    /// Build the GPU-side uniform for a light aimed at `target`.
    pub fn to_uniform(&self, target: Vec3) -> DirectionalLightUniform {
        let direction = self.direction_towards(target);
        DirectionalLightUniform {
            direction_intensity: [direction.x, direction.y, direction.z, self.intensity],
            color_padding: [self.color.x, self.color.y, self.color.z, 0.0],
        }
    }
}

/// GPU-side representation, 32 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct DirectionalLightUniform {
    /// xyz = direction the light travels (normalized), w = intensity.
    pub direction_intensity: [f32; 4],
    /// xyz = color (linear RGB), w = padding.
    pub color_padding: [f32; 4],
}
