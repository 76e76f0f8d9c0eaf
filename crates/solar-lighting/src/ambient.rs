//! Uniform ambient term.

use glam::Vec3;

/// Light applied equally to every surface, with no direction and no shadows.
///
/// Keeps the night side of the earth from going fully black.
#[derive(Clone, Debug, PartialEq)]
pub struct AmbientLight {
    pub color: Vec3,
    pub intensity: f32,
}

impl AmbientLight {
    pub fn new(color: Vec3, intensity: f32) -> Self {
        Self { color, intensity }
    }

    /// Color premultiplied by intensity, as the shader consumes it.
    pub fn radiance(&self) -> Vec3 {
        self.color * self.intensity
    }
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self::new(Vec3::ONE, 0.2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_dim_white() {
        let light = AmbientLight::default();
        assert_eq!(light.radiance(), Vec3::splat(0.2));
    }
}
