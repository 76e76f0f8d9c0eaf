//! Everything the mesh shader needs to light a fragment, in one buffer.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::{AmbientLight, DirectionalLight, DirectionalLightUniform, PointLight, PointLightUniform};

/// Packed lighting state, 160 bytes.
///
/// Matches `struct Lighting` in the mesh shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct LightingUniform {
    /// rgb = ambient radiance, w = padding.
    pub ambient: [f32; 4],
    pub sun: DirectionalLightUniform,
    pub point: PointLightUniform,
    pub light_view_proj: [[f32; 4]; 4],
    /// x = shadows enabled (0/1), y = shadow texel size, zw = padding.
    pub shadow_params: [f32; 4],
}

impl LightingUniform {
    /// Pack the lights. `sun_target` is the world position the sun aims at;
    /// `point` is `None` when the point light is not part of the scene.
    pub fn new(
        ambient: &AmbientLight,
        sun: &DirectionalLight,
        sun_target: Vec3,
        point: Option<&PointLight>,
        light_view_proj: Option<Mat4>,
    ) -> Self {
        let radiance = ambient.radiance();
        let point = point.map_or_else(PointLightUniform::default, |p| p.to_uniform(true));
        let (matrix, shadows_on) = match light_view_proj {
            Some(m) if sun.cast_shadow => (m, 1.0),
            _ => (Mat4::IDENTITY, 0.0),
        };
        let texel = 1.0 / sun.shadow.map_size.max(1) as f32;

        Self {
            ambient: [radiance.x, radiance.y, radiance.z, 0.0],
            sun: sun.to_uniform(sun_target),
            point,
            light_view_proj: matrix.to_cols_array_2d(),
            shadow_params: [shadows_on, texel, 0.0, 0.0],
        }
    }
}
