//! Translate the persisted [`Config`] into the parameter types of the scene,
//! lighting and render crates.

use glam::Vec3;
use solar_config::Config;
use solar_lighting::ShadowConfig;
use solar_render::{BloomConfig, RendererSettings, color_from_rgba};
use solar_scene::{AnimationDeltas, SceneParams};

pub fn shadow_config(config: &Config) -> ShadowConfig {
    let shadow = &config.render.shadow;
    ShadowConfig {
        map_size: shadow.map_size.max(1),
        margin: shadow.frustum_margin,
        ..ShadowConfig::default()
    }
}

pub fn scene_params(config: &Config) -> SceneParams {
    let scene = &config.scene;
    let lighting = &config.lighting;
    SceneParams {
        camera_fov_degrees: scene.camera_fov_degrees,
        camera_near: scene.camera_near,
        camera_far: scene.camera_far,
        camera_position: Vec3::from_array(scene.camera_position),
        ambient_intensity: lighting.ambient_intensity,
        sun_intensity: lighting.sun_intensity,
        point_intensity: lighting.point_intensity,
        shadow: shadow_config(config),
        shadows_enabled: config.render.shadow.enabled,
        attach_point_light: lighting.attach_point_light,
    }
}

pub fn animation_deltas(config: &Config) -> AnimationDeltas {
    let a = &config.animation;
    AnimationDeltas {
        cloud_yaw: a.cloud_yaw,
        moon_pivot_yaw: a.moon_pivot_yaw,
        moon_pivot_pitch: a.moon_pivot_pitch,
        camera_pivot_yaw: a.camera_pivot_yaw,
        galaxy_yaw: a.galaxy_yaw,
    }
}

pub fn bloom_config(config: &Config) -> BloomConfig {
    let bloom = &config.render.bloom;
    BloomConfig {
        threshold: bloom.threshold,
        strength: bloom.strength,
        radius: bloom.radius,
        iterations: bloom.iterations,
    }
}

pub fn renderer_settings(config: &Config) -> RendererSettings {
    RendererSettings {
        asset_dir: config.scene.asset_dir.clone(),
        clear_color: color_from_rgba(config.render.clear_color),
        bloom: bloom_config(config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_agree_across_crates() {
        let config = Config::default();
        assert_eq!(scene_params(&config), SceneParams::default());
        assert_eq!(animation_deltas(&config), AnimationDeltas::default());
        assert_eq!(bloom_config(&config), BloomConfig::default());
        assert_eq!(shadow_config(&config), ShadowConfig::default());
    }

    #[test]
    fn test_renderer_settings_follow_config() {
        let mut config = Config::default();
        config.scene.asset_dir = "/srv/textures".into();
        config.render.clear_color = [0.0, 0.0, 0.1, 1.0];
        let settings = renderer_settings(&config);
        assert_eq!(settings.asset_dir, std::path::PathBuf::from("/srv/textures"));
        assert_eq!(settings.clear_color.b, 0.1);
        assert_eq!(settings.clear_color.a, 1.0);
    }

    #[test]
    fn test_shadow_toggle_and_point_light_flag() {
        let mut config = Config::default();
        config.render.shadow.enabled = false;
        config.lighting.attach_point_light = true;
        let params = scene_params(&config);
        assert!(!params.shadows_enabled);
        assert!(params.attach_point_light);
    }

    #[test]
    fn test_zero_shadow_map_size_clamped() {
        let mut config = Config::default();
        config.render.shadow.map_size = 0;
        assert_eq!(shadow_config(&config).map_size, 1);
    }
}
