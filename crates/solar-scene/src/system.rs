//! Assembly of the solar system scene and its lighting rig.

use glam::{Mat4, Vec3};
use solar_lighting::{
    AmbientLight, DirectionalLight, LightingUniform, PointLight, ShadowConfig, ShadowFrustum,
    fit_shadow_frustum,
};

use crate::camera::PerspectiveCamera;
use crate::graph::{NodeId, SceneGraph, SceneNode};
use crate::layers::RenderLayer;
use crate::mesh::{Geometry, Material, Mesh, Side, color_from_hex};
use crate::viewport::{PhysicalSize, Viewport};

/// Texture file names, resolved against the renderer's asset directory.
pub mod textures {
    pub const GALAXY: &str = "galaxy1.png";
    pub const EARTH: &str = "earthmap1.jpg";
    pub const EARTH_BUMP: &str = "bump.jpg";
    pub const CLOUDS: &str = "earthCloud.png";
    pub const MOON: &str = "moonmap4k.jpg";
    pub const MOON_BUMP: &str = "moonbump4k.jpg";
}

/// Where the sun sits, and where both lights shine from.
pub const SUN_POSITION: Vec3 = Vec3::new(-50.0, 20.0, -60.0);
/// Moon offset from its pivot.
pub const MOON_OFFSET: Vec3 = Vec3::new(3.0, -0.4, 0.0);
pub const SUN_COLOR: u32 = 0xFDB813;

/// Tunables for [`SolarSystem::build`].
#[derive(Debug, Clone, PartialEq)]
pub struct SceneParams {
    pub camera_fov_degrees: f32,
    pub camera_near: f32,
    pub camera_far: f32,
    /// Camera position relative to the camera pivot.
    pub camera_position: Vec3,
    pub ambient_intensity: f32,
    pub sun_intensity: f32,
    pub point_intensity: f32,
    pub shadow: ShadowConfig,
    pub shadows_enabled: bool,
    /// Light with the point light too. Off by default.
    pub attach_point_light: bool,
}

impl Default for SceneParams {
    fn default() -> Self {
        Self {
            camera_fov_degrees: 60.0,
            camera_near: 0.1,
            camera_far: 1000.0,
            camera_position: Vec3::new(8.0, 0.0, 4.0),
            ambient_intensity: 0.2,
            sun_intensity: 2.0,
            point_intensity: 1.0,
            shadow: ShadowConfig::default(),
            shadows_enabled: true,
            attach_point_light: false,
        }
    }
}

/// Lights wired against the scene graph.
#[derive(Debug, Clone)]
pub struct LightingRig {
    pub ambient: AmbientLight,
    /// Shadow-casting sun light, placed at the sun mesh.
    pub sun: DirectionalLight,
    /// Node the sun light aims at.
    pub sun_target: NodeId,
    /// Configured like the others but only lights the scene when
    /// `point_attached` is set.
    pub point: PointLight,
    pub point_attached: bool,
}

impl LightingRig {
    /// The point light, if it is part of the scene.
    pub fn active_point(&self) -> Option<&PointLight> {
        self.point_attached.then_some(&self.point)
    }

    pub fn shadow_frustum(&self, graph: &SceneGraph) -> ShadowFrustum {
        fit_shadow_frustum(
            self.sun.position,
            graph.world_position(self.sun_target),
            &self.sun.shadow,
        )
    }

    pub fn uniform(&self, graph: &SceneGraph) -> LightingUniform {
        let shadow = self
            .sun
            .cast_shadow
            .then(|| self.shadow_frustum(graph).view_projection());
        LightingUniform::new(
            &self.ambient,
            &self.sun,
            graph.world_position(self.sun_target),
            self.active_point(),
            shadow,
        )
    }
}

/// The assembled scene: graph, handles to its named nodes, and lights.
pub struct SolarSystem {
    pub graph: SceneGraph,
    pub sun: NodeId,
    pub galaxy: NodeId,
    pub earth: NodeId,
    pub clouds: NodeId,
    pub moon_pivot: NodeId,
    pub moon: NodeId,
    pub camera_pivot: NodeId,
    pub camera: NodeId,
    pub lights: LightingRig,
}

impl SolarSystem {
    /// Build the full scene for a viewport.
    pub fn build(params: &SceneParams, viewport: &Viewport) -> Self {
        let mut graph = SceneGraph::new();
        let root = graph.root();

        let sun = graph.spawn(
            root,
            SceneNode::mesh(
                "sun",
                Mesh::new(
                    Geometry::Icosahedron {
                        radius: 1.0,
                        detail: 15,
                    },
                    Material::basic(color_from_hex(SUN_COLOR)),
                ),
                RenderLayer::Glow,
            )
            .at(SUN_POSITION),
        );

        let galaxy = graph.spawn(
            root,
            SceneNode::mesh(
                "galaxy",
                Mesh::new(
                    Geometry::sphere(80.0, 64, 64),
                    Material::basic(Vec3::ONE)
                        .with_map(textures::GALAXY)
                        .with_side(Side::Back)
                        .transparent(),
                ),
                RenderLayer::Glow,
            ),
        );

        let earth = graph.spawn(
            root,
            SceneNode::mesh(
                "earth",
                Mesh::new(
                    Geometry::sphere(1.0, 32, 32),
                    Material::phong()
                        .with_map(textures::EARTH)
                        .with_bump(textures::EARTH_BUMP, 0.3),
                )
                .shadowed(),
                RenderLayer::Base,
            ),
        );

        let clouds = graph.spawn(
            root,
            SceneNode::mesh(
                "clouds",
                Mesh::new(
                    Geometry::sphere(1.02, 32, 32),
                    Material::phong().with_map(textures::CLOUDS).transparent(),
                ),
                RenderLayer::Base,
            ),
        );

        let moon_pivot = graph.spawn(earth, SceneNode::pivot("moon-pivot"));
        let moon = graph.spawn(
            moon_pivot,
            SceneNode::mesh(
                "moon",
                Mesh::new(
                    Geometry::sphere(0.27, 32, 32),
                    Material::phong()
                        .with_map(textures::MOON)
                        .with_bump(textures::MOON_BUMP, 0.02),
                )
                .shadowed(),
                RenderLayer::Base,
            )
            .at(MOON_OFFSET),
        );

        let camera_pivot = graph.spawn(earth, SceneNode::pivot("camera-pivot"));
        let lens = PerspectiveCamera::new(
            params.camera_fov_degrees,
            viewport.aspect(),
            params.camera_near,
            params.camera_far,
        );
        let mut camera_node = SceneNode::camera("camera", lens).at(params.camera_position);
        camera_node.transform.look_at(Vec3::ZERO, Vec3::Y);
        let camera = graph.spawn(camera_pivot, camera_node);

        let lights = LightingRig {
            ambient: AmbientLight::new(Vec3::ONE, params.ambient_intensity),
            sun: DirectionalLight {
                position: SUN_POSITION,
                color: Vec3::ONE,
                intensity: params.sun_intensity,
                cast_shadow: params.shadows_enabled,
                shadow: params.shadow.clone(),
            },
            sun_target: earth,
            point: PointLight {
                position: SUN_POSITION,
                color: Vec3::ONE,
                intensity: params.point_intensity,
                cast_shadow: true,
                shadow_bias: 0.00001,
                shadow_darkness: 0.2,
                shadow_map_size: 2048,
                ..PointLight::default()
            },
            point_attached: params.attach_point_light,
        };
        if !lights.point_attached {
            log::debug!("point light configured but not attached to the scene");
        }

        log::info!("Built solar system scene with {} nodes", graph.len());

        Self {
            graph,
            sun,
            galaxy,
            earth,
            clouds,
            moon_pivot,
            moon,
            camera_pivot,
            camera,
            lights,
        }
    }

    pub fn camera(&self) -> Option<&PerspectiveCamera> {
        self.graph.get(self.camera).and_then(|n| n.as_camera())
    }

    pub fn camera_mut(&mut self) -> Option<&mut PerspectiveCamera> {
        self.graph.get_mut(self.camera).and_then(|n| n.as_camera_mut())
    }

    /// Restrict the camera to a single layer.
    pub fn set_camera_layer(&mut self, layer: RenderLayer) {
        if let Some(camera) = self.camera_mut() {
            camera.layers.set(layer);
        }
    }

    /// Keep the camera aspect in step with the output size.
    pub fn resize(&mut self, size: PhysicalSize) {
        if let Some(camera) = self.camera_mut() {
            camera.set_aspect(size.width, size.height);
        }
    }

    pub fn camera_world(&self) -> Mat4 {
        self.graph.world_matrix(self.camera)
    }

    /// View-projection for the current camera placement and lens.
    pub fn camera_view_projection(&self) -> Mat4 {
        self.camera()
            .map_or(Mat4::IDENTITY, |c| c.view_projection(self.camera_world()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;
    use crate::layers::Layers;

    fn build() -> SolarSystem {
        SolarSystem::build(&SceneParams::default(), &Viewport::new(1280, 720, 1.0))
    }

    #[test]
    fn test_hierarchy() {
        let s = build();
        let parent = |id| s.graph.get(id).unwrap().parent();
        let root = Some(s.graph.root());
        assert_eq!(parent(s.sun), root);
        assert_eq!(parent(s.galaxy), root);
        assert_eq!(parent(s.earth), root);
        assert_eq!(parent(s.clouds), root);
        assert_eq!(parent(s.moon_pivot), Some(s.earth));
        assert_eq!(parent(s.moon), Some(s.moon_pivot));
        assert_eq!(parent(s.camera_pivot), Some(s.earth));
        assert_eq!(parent(s.camera), Some(s.camera_pivot));
    }

    #[test]
    fn test_every_mesh_is_on_exactly_one_layer() {
        let s = build();
        let mut count = 0;
        for (_, node, _) in s.graph.meshes() {
            let on_base = node.layers.contains(RenderLayer::Base);
            let on_glow = node.layers.contains(RenderLayer::Glow);
            assert!(on_base ^ on_glow, "{} is on {:#b}", node.name, node.layers.bits());
            count += 1;
        }
        assert_eq!(count, 5);
    }

    #[test]
    fn test_layer_assignment() {
        let s = build();
        let layer = |id| s.graph.get(id).unwrap().layers;
        assert_eq!(layer(s.sun), Layers::only(RenderLayer::Glow));
        assert_eq!(layer(s.galaxy), Layers::only(RenderLayer::Glow));
        for id in [s.earth, s.clouds, s.moon] {
            assert_eq!(layer(id), Layers::only(RenderLayer::Base));
        }
    }

    #[test]
    fn test_materials_and_shadows() {
        let s = build();
        let mesh = |id| s.graph.get(id).unwrap().as_mesh().unwrap().clone();

        let galaxy = mesh(s.galaxy);
        assert_eq!(galaxy.material.side, Side::Back);
        assert!(galaxy.material.transparent);
        assert_eq!(galaxy.geometry.radius(), 80.0);

        let earth = mesh(s.earth);
        assert!(earth.cast_shadow && earth.receive_shadow);
        assert_eq!(earth.material.bump_scale, 0.3);

        let clouds = mesh(s.clouds);
        assert!(clouds.material.transparent);
        assert!(clouds.geometry.radius() > earth.geometry.radius());

        let moon = mesh(s.moon);
        assert!(moon.cast_shadow && moon.receive_shadow);
        assert_eq!(moon.material.map.as_deref(), Some(std::path::Path::new(textures::MOON)));
    }

    #[test]
    fn test_initial_camera_placement() {
        let s = build();
        let node = s.graph.get(s.camera).unwrap();
        assert_eq!(node.transform.position, Vec3::new(8.0, 0.0, 4.0));
        assert!(matches!(node.kind, NodeKind::Camera(_)));
        let forward = node.transform.rotation.to_quat() * Vec3::NEG_Z;
        assert!((forward - Vec3::new(-8.0, 0.0, -4.0).normalize()).length() < 1e-4);
    }

    #[test]
    fn test_resize_to_full_hd_sets_exact_aspect() {
        let mut s = build();
        s.resize(PhysicalSize::new(1920, 1080));
        assert_eq!(s.camera().unwrap().aspect, 1920.0 / 1080.0);
        assert_eq!(
            s.graph.get(s.camera).unwrap().transform.position,
            Vec3::new(8.0, 0.0, 4.0)
        );
    }

    #[test]
    fn test_sun_light_is_colocated_and_targets_earth() {
        let s = build();
        assert_eq!(s.lights.sun.position, s.graph.world_position(s.sun));
        assert_eq!(s.lights.sun_target, s.earth);
        assert!(s.lights.sun.cast_shadow);
        assert_eq!(s.lights.sun.shadow.map_size, 2048);
    }

    #[test]
    fn test_point_light_is_not_attached_by_default() {
        let s = build();
        assert!(s.lights.active_point().is_none());
        let u = s.lights.uniform(&s.graph);
        assert_eq!(u.point.color_intensity[3], 0.0);

        let params = SceneParams {
            attach_point_light: true,
            ..Default::default()
        };
        let lit = SolarSystem::build(&params, &Viewport::new(640, 480, 1.0));
        assert_eq!(lit.lights.uniform(&lit.graph).point.color_intensity[3], 1.0);
    }

    #[test]
    fn test_shadow_frustum_brackets_earth() {
        let s = build();
        let frustum = s.lights.shadow_frustum(&s.graph);
        let distance = SUN_POSITION.length();
        assert!(frustum.near < distance && distance < frustum.far);
    }

    #[test]
    fn test_camera_layer_toggle() {
        let mut s = build();
        s.set_camera_layer(RenderLayer::Glow);
        assert_eq!(s.camera().unwrap().layers, Layers::only(RenderLayer::Glow));
        s.set_camera_layer(RenderLayer::Base);
        assert_eq!(s.camera().unwrap().layers, Layers::only(RenderLayer::Base));
    }
}
