//! Two-pass layer compositing.
//!
//! Every frame runs the same fixed sequence: the camera is switched to the
//! glow layer and that layer goes through bloom onto the output; the depth
//! buffer alone is cleared; the camera is switched to the base layer, which
//! is drawn straight on top. Clearing depth in between means nothing in the
//! glow layer can hide a base-layer mesh.
//!
//! The sequence is written against [`LayerPassTarget`] so it can run on the
//! GPU ([`crate::renderer::GpuFrame`]) or on a CPU framebuffer in tests.

use solar_scene::{RenderLayer, SolarSystem};

/// Something the compositor can draw a frame into.
pub trait LayerPassTarget {
    /// Draw what the camera currently sees through the bloom chain onto the
    /// output, replacing its previous contents.
    fn render_bloom_pass(&mut self, system: &SolarSystem);

    /// Reset depth to the far plane, keeping color.
    fn clear_depth(&mut self);

    /// Draw what the camera currently sees directly onto the output.
    fn render_direct_pass(&mut self, system: &SolarSystem);
}

/// Run the glow pass, the depth clear and the base pass, in that order.
///
/// Leaves the camera seeing only the base layer.
pub fn render_frame<T: LayerPassTarget + ?Sized>(system: &mut SolarSystem, target: &mut T) {
    system.set_camera_layer(RenderLayer::Glow);
    target.render_bloom_pass(system);

    target.clear_depth();

    system.set_camera_layer(RenderLayer::Base);
    target.render_direct_pass(system);
}

#[cfg(test)]
mod tests {
    use solar_scene::{
        Layers, NodeId, SceneParams, Side, SolarSystem, Viewport, eye_position,
    };

    use super::*;

    const WIDTH: usize = 64;
    const HEIGHT: usize = 36;

    /// Coarse CPU rasterizer: every mesh covers the screen-space disc of its
    /// bounding sphere at the depth of its nearest visible surface.
    struct CpuFramebuffer {
        color: Vec<Option<NodeId>>,
        depth: Vec<f32>,
        skip_depth_clear: bool,
        bloom_drawn: Vec<NodeId>,
        direct_drawn: Vec<NodeId>,
        masks_seen: Vec<Layers>,
    }

    impl CpuFramebuffer {
        fn new() -> Self {
            Self {
                color: vec![None; WIDTH * HEIGHT],
                depth: vec![0.0; WIDTH * HEIGHT],
                skip_depth_clear: false,
                bloom_drawn: Vec::new(),
                direct_drawn: Vec::new(),
                masks_seen: Vec::new(),
            }
        }

        fn center(&self) -> Option<NodeId> {
            self.color[(HEIGHT / 2) * WIDTH + WIDTH / 2]
        }

        fn draw_visible(&mut self, system: &SolarSystem) -> Vec<NodeId> {
            let camera = system.camera().expect("scene has a camera");
            self.masks_seen.push(camera.layers);

            let world = system.camera_world();
            let eye = eye_position(world);
            let view_proj = camera.view_projection(world);
            let projection = camera.projection_matrix();
            let tan_half = (camera.fov_y_radians() * 0.5).tan();

            let mut drawn = Vec::new();
            for (id, _node, mesh) in system.graph.visible_meshes(camera.layers) {
                drawn.push(id);
                let center = system.graph.world_position(id);
                let radius = mesh.geometry.radius();
                let distance = (center - eye).length();
                let inside = distance < radius;

                let surface = match mesh.material.side {
                    Side::Front if inside => continue,
                    Side::Front => distance - radius,
                    Side::Back => distance + radius,
                };
                let clip = projection * glam::Vec4::new(0.0, 0.0, -surface.max(camera.near), 1.0);
                let depth = clip.z / clip.w;

                let ndc = view_proj.project_point3(center);
                let px = (ndc.x + 1.0) * 0.5 * WIDTH as f32;
                let py = (1.0 - ndc.y) * 0.5 * HEIGHT as f32;
                let radius_px = radius / (distance * tan_half) * HEIGHT as f32 * 0.5;

                for y in 0..HEIGHT {
                    for x in 0..WIDTH {
                        let dx = x as f32 + 0.5 - px;
                        let dy = y as f32 + 0.5 - py;
                        let covered = inside || dx * dx + dy * dy <= radius_px * radius_px;
                        let i = y * WIDTH + x;
                        if covered && depth >= self.depth[i] {
                            self.depth[i] = depth;
                            self.color[i] = Some(id);
                        }
                    }
                }
            }
            drawn
        }
    }

    impl LayerPassTarget for CpuFramebuffer {
        fn render_bloom_pass(&mut self, system: &SolarSystem) {
            self.color.fill(None);
            self.depth.fill(0.0);
            self.bloom_drawn = self.draw_visible(system);
        }

        fn clear_depth(&mut self) {
            if !self.skip_depth_clear {
                self.depth.fill(0.0);
            }
        }

        fn render_direct_pass(&mut self, system: &SolarSystem) {
            self.direct_drawn = self.draw_visible(system);
        }
    }

    fn scene() -> SolarSystem {
        SolarSystem::build(
            &SceneParams::default(),
            &Viewport::new(WIDTH as u32, HEIGHT as u32, 1.0),
        )
    }

    /// Park the sun halfway between the camera and the earth.
    fn sun_in_front_of_earth(system: &mut SolarSystem) {
        let eye = eye_position(system.camera_world());
        let earth = system.graph.world_position(system.earth);
        if let Some(sun) = system.graph.get_mut(system.sun) {
            sun.transform.position = earth + (eye - earth) * 0.5;
        }
    }

    fn is_base(system: &SolarSystem, id: NodeId) -> bool {
        system
            .graph
            .get(id)
            .is_some_and(|n| n.layers.contains(RenderLayer::Base))
    }

    #[test]
    fn test_base_layer_drawn_over_glow_in_front() {
        let mut system = scene();
        sun_in_front_of_earth(&mut system);
        let mut fb = CpuFramebuffer::new();
        render_frame(&mut system, &mut fb);

        let center = fb.center().expect("center pixel covered");
        assert!(is_base(&system, center));
    }

    #[test]
    fn test_base_layer_drawn_over_glow_behind() {
        let mut system = scene();
        let eye = eye_position(system.camera_world());
        if let Some(sun) = system.graph.get_mut(system.sun) {
            sun.transform.position = -eye * 3.0;
        }
        let mut fb = CpuFramebuffer::new();
        render_frame(&mut system, &mut fb);

        let center = fb.center().expect("center pixel covered");
        assert!(is_base(&system, center));
    }

    #[test]
    fn test_skipping_depth_clear_lets_glow_occlude() {
        let mut system = scene();
        sun_in_front_of_earth(&mut system);
        let mut fb = CpuFramebuffer::new();
        fb.skip_depth_clear = true;
        render_frame(&mut system, &mut fb);

        assert_eq!(fb.center(), Some(system.sun));
    }

    #[test]
    fn test_passes_partition_layers() {
        let mut system = scene();
        let mut fb = CpuFramebuffer::new();
        render_frame(&mut system, &mut fb);

        let mut glow = fb.bloom_drawn.clone();
        glow.sort();
        let mut expected_glow = vec![system.sun, system.galaxy];
        expected_glow.sort();
        assert_eq!(glow, expected_glow);

        let mut base = fb.direct_drawn.clone();
        base.sort();
        let mut expected_base = vec![system.earth, system.clouds, system.moon];
        expected_base.sort();
        assert_eq!(base, expected_base);

        assert!(glow.iter().all(|id| !base.contains(id)));
        assert_eq!(glow.len() + base.len(), system.graph.meshes().count());
    }

    #[test]
    fn test_camera_mask_toggles_between_passes() {
        let mut system = scene();
        let mut fb = CpuFramebuffer::new();
        render_frame(&mut system, &mut fb);

        assert_eq!(
            fb.masks_seen,
            vec![
                Layers::only(RenderLayer::Glow),
                Layers::only(RenderLayer::Base)
            ]
        );
        let camera = system.camera().expect("camera");
        assert_eq!(camera.layers, Layers::only(RenderLayer::Base));
    }

    #[test]
    fn test_galaxy_backdrop_fills_uncovered_pixels() {
        let mut system = scene();
        let mut fb = CpuFramebuffer::new();
        render_frame(&mut system, &mut fb);
        assert_eq!(fb.color[0], Some(system.galaxy));
    }
}
