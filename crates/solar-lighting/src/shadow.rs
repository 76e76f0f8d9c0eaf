//! Shadow map for the sun light.
//!
//! A single orthographic depth map aimed from the light at its target. The
//! frustum depth range is fitted tightly around the target so the full
//! precision of the map covers the earth-moon system rather than the empty
//! space between it and the sun.

use glam::{Mat4, Vec3};

/// Shadow settings for a directional light.
#[derive(Clone, Debug, PartialEq)]
pub struct ShadowConfig {
    /// Width and height of the square depth map in texels.
    pub map_size: u32,
    /// Half the width/height of the orthographic shadow camera.
    pub half_extent: f32,
    /// Depth padded on both sides of the target along the light axis.
    pub margin: f32,
    /// Constant depth bias applied by the shadow pipeline.
    pub depth_bias_constant: i32,
    /// Slope-scaled depth bias applied by the shadow pipeline.
    pub depth_bias_slope: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            map_size: 2048,
            half_extent: 5.0,
            margin: 4.0,
            depth_bias_constant: 2,
            depth_bias_slope: 1.75,
        }
    }
}

/// Light-space view and projection fitted around a target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowFrustum {
    pub view: Mat4,
    pub projection: Mat4,
    /// Distance from the light to the near plane.
    pub near: f32,
    /// Distance from the light to the far plane.
    pub far: f32,
}

impl ShadowFrustum {
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// Fit an orthographic shadow frustum looking from `light_position` at
/// `target`, with near/far bounding the target by `config.margin`.
///
/// Uses reverse-Z like the main camera: the near plane maps to depth 1.0.
pub fn fit_shadow_frustum(light_position: Vec3, target: Vec3, config: &ShadowConfig) -> ShadowFrustum {
    let to_target = target - light_position;
    let distance = to_target.length();
    let direction = to_target.try_normalize().unwrap_or(Vec3::NEG_Y);
    let up = if direction.y.abs() > 0.99 { Vec3::Z } else { Vec3::Y };

    let view = Mat4::look_to_rh(light_position, direction, up);

    let near = (distance - config.margin).max(0.0);
    let far = (distance + config.margin).max(near + f32::EPSILON);
    let e = config.half_extent;
    let projection = Mat4::orthographic_rh(-e, e, -e, e, far, near);

    ShadowFrustum {
        view,
        projection,
        near,
        far,
    }
}

/// Depth texture and comparison sampler the sun's shadow is rendered into.
pub struct ShadowMap {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    /// Comparison sampler for hardware PCF.
    pub sampler: wgpu::Sampler,
    pub size: u32,
}

impl ShadowMap {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
    /// Reverse-Z: 0.0 is the far plane.
    pub const CLEAR_VALUE: f32 = 0.0;

    /// Allocate a `size`×`size` depth map, clamped to the device limit.
    pub fn new(device: &wgpu::Device, size: u32) -> Self {
        let max = device.limits().max_texture_dimension_2d;
        let requested = size;
        let size = requested.clamp(1, max);
        if size != requested {
            log::warn!("shadow map size {requested} clamped to {size}");
        }

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("sun-shadow-map"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sun-shadow-sampler"),
            compare: Some(wgpu::CompareFunction::GreaterEqual),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sun_frustum() -> ShadowFrustum {
        fit_shadow_frustum(
            Vec3::new(-50.0, 20.0, -60.0),
            Vec3::ZERO,
            &ShadowConfig::default(),
        )
    }

    #[test]
    fn test_frustum_tightly_bounds_target_distance() {
        let frustum = sun_frustum();
        let distance = Vec3::new(-50.0, 20.0, -60.0).length();
        assert!((frustum.near - (distance - 4.0)).abs() < 1e-4);
        assert!((frustum.far - (distance + 4.0)).abs() < 1e-4);
    }

    #[test]
    fn test_target_projects_inside_depth_range() {
        let clip = sun_frustum().view_projection() * Vec3::ZERO.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        // Midway between the planes.
        assert!((ndc.z - 0.5).abs() < 1e-3, "depth was {}", ndc.z);
    }

    #[test]
    fn test_reverse_z_near_is_one() {
        let frustum = sun_frustum();
        let light = Vec3::new(-50.0, 20.0, -60.0);
        let toward = (Vec3::ZERO - light).normalize();
        let near_point = light + toward * frustum.near;
        let clip = frustum.view_projection() * near_point.extend(1.0);
        assert!((clip.z / clip.w - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_light_above_target_is_finite() {
        let frustum = fit_shadow_frustum(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO, &ShadowConfig::default());
        let m = frustum.view_projection();
        for col in 0..4 {
            for row in 0..4 {
                assert!(m.col(col)[row].is_finite());
            }
        }
    }

    #[test]
    fn test_light_on_target_clamps_near_to_zero() {
        let frustum = fit_shadow_frustum(Vec3::ZERO, Vec3::ZERO, &ShadowConfig::default());
        assert_eq!(frustum.near, 0.0);
        assert!(frustum.far > frustum.near);
    }

    fn create_test_device() -> Option<wgpu::Device> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok()?;
        let (device, _queue) =
            pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default())).ok()?;
        Some(device)
    }

    #[test]
    fn test_shadow_map_allocates_square_depth_texture() {
        let Some(device) = create_test_device() else {
            return;
        };
        let map = ShadowMap::new(&device, 1024);
        assert_eq!(map.size, 1024);
        assert_eq!(map.texture.width(), 1024);
        assert_eq!(map.texture.height(), 1024);
        assert_eq!(map.texture.format(), ShadowMap::FORMAT);
    }
}
