//! Point light with inverse-square falloff.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// CPU-side point light descriptor.
#[derive(Clone, Debug, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    /// Linear RGB color.
    pub color: Vec3,
    pub intensity: f32,
    /// Cutoff distance; 0 means unlimited range.
    pub range: f32,
    pub cast_shadow: bool,
    pub shadow_bias: f32,
    /// Fraction of light removed inside the shadow.
    pub shadow_darkness: f32,
    pub shadow_map_size: u32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            color: Vec3::ONE,
            intensity: 1.0,
            range: 0.0,
            cast_shadow: false,
            shadow_bias: 0.0,
            shadow_darkness: 0.5,
            shadow_map_size: 512,
        }
    }
}

impl PointLight {
    /// Attenuation at `distance` from the light, in `[0.0, 1.0]`.
    ///
    /// Inverse-square (offset by one to avoid the singularity), windowed to
    /// reach exactly zero at [`PointLight::range`] when a range is set.
    pub fn attenuation(&self, distance: f32) -> f32 {
        let inv_sq = 1.0 / (distance * distance + 1.0);
        if self.range <= 0.0 {
            return inv_sq;
        }
        if distance >= self.range {
            return 0.0;
        }
        let ratio = distance / self.range;
        let t = 1.0 - ratio * ratio;
        inv_sq * t * t
    }

    /// GPU-side uniform. A light that is not `enabled` uploads zero intensity.
    pub fn to_uniform(&self, enabled: bool) -> PointLightUniform {
        PointLightUniform {
            position_range: [self.position.x, self.position.y, self.position.z, self.range],
            color_intensity: [
                self.color.x,
                self.color.y,
                self.color.z,
                if enabled { self.intensity } else { 0.0 },
            ],
        }
    }
}

/// Per-light GPU data, 32 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct PointLightUniform {
    /// xyz = world position, w = range (0 = unlimited).
    pub position_range: [f32; 4],
    /// xyz = color (linear RGB), w = intensity (0 when detached).
    pub color_intensity: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_at_distance_zero_has_full_intensity() {
        let light = PointLight::default();
        assert!((light.attenuation(0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_light_beyond_range_has_zero_contribution() {
        let light = PointLight {
            range: 10.0,
            ..Default::default()
        };
        assert_eq!(light.attenuation(10.0), 0.0);
        assert_eq!(light.attenuation(25.0), 0.0);
    }

    #[test]
    fn test_unlimited_range_follows_inverse_square() {
        let light = PointLight::default();
        let near = light.attenuation(3.0);
        let far = light.attenuation(6.0);
        assert!(far < near);
        assert!((near - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_detached_light_uploads_zero_intensity() {
        let light = PointLight {
            intensity: 3.0,
            ..Default::default()
        };
        assert_eq!(light.to_uniform(false).color_intensity[3], 0.0);
        assert_eq!(light.to_uniform(true).color_intensity[3], 3.0);
    }

    #[test]
    fn test_gpu_struct_size() {
        assert_eq!(std::mem::size_of::<PointLightUniform>(), 32);
    }
}
