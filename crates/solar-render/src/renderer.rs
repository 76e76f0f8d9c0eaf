//! GPU renderer for a [`SolarSystem`].
//!
//! Owns every GPU resource the scene needs: one vertex/index buffer pair,
//! object uniform and bind groups per mesh node, the shared camera and
//! lighting uniforms, the sun's shadow map, the bloom chain and the depth
//! buffer. A frame is a shadow pass followed by the layer compositor.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use solar_lighting::ShadowMap;
use solar_scene::{Material, NodeId, SolarSystem, eye_position};

use crate::bloom::{BloomConfig, BloomPipeline};
use crate::buffer::{BufferAllocator, MeshBuffer};
use crate::compositor::{self, LayerPassTarget};
use crate::depth::DepthBuffer;
use crate::gpu::{RenderContext, SurfaceError};
use crate::mesh_pipeline::{CameraUniform, MeshPipelines, ObjectUniform, PipelineKey};
use crate::pass::{DepthLoad, RenderPassBuilder, TRANSPARENT_BLACK};
use crate::shadow_pipeline::{ShadowPipeline, render_shadow_pass};
use crate::texture::{GpuTexture, TextureCache, TextureKind};

/// Format of the offscreen target the glow layer is drawn into.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Renderer settings resolved from the application config.
#[derive(Debug, Clone)]
pub struct RendererSettings {
    /// Directory material texture names are resolved against.
    pub asset_dir: PathBuf,
    /// Color the surface is cleared to before the glow layer lands on it.
    pub clear_color: wgpu::Color,
    pub bloom: BloomConfig,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            asset_dir: PathBuf::from("assets/texture"),
            clear_color: TRANSPARENT_BLACK,
            bloom: BloomConfig::default(),
        }
    }
}

/// GPU state for one mesh node.
struct MeshSlot {
    buffer: MeshBuffer,
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    shadow_bind_group: wgpu::BindGroup,
}

/// Draws a [`SolarSystem`] frame by frame.
pub struct SceneRenderer {
    pipelines: MeshPipelines,
    shadow_pipeline: ShadowPipeline,
    shadow_map: ShadowMap,
    bloom: BloomPipeline,
    depth: DepthBuffer,
    textures: TextureCache,
    slots: HashMap<NodeId, MeshSlot>,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    lighting_buffer: wgpu::Buffer,
    lighting_bind_group: wgpu::BindGroup,
    light_matrix_buffer: wgpu::Buffer,
    shadow_light_bind_group: wgpu::BindGroup,
    surface_format: wgpu::TextureFormat,
    clear_color: wgpu::Color,
}

impl SceneRenderer {
    /// Create the renderer for a window's render context.
    pub fn new(ctx: &RenderContext, system: &SolarSystem, settings: &RendererSettings) -> Self {
        let (width, height) = ctx.size();
        Self::with_target(
            &ctx.device,
            &ctx.queue,
            ctx.surface_format,
            width,
            height,
            system,
            settings,
        )
    }

    /// Create the renderer for any color target of `target_format`.
    pub fn with_target(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        system: &SolarSystem,
        settings: &RendererSettings,
    ) -> Self {
        let mut pipelines = MeshPipelines::new(device);
        let shadow_config = &system.lights.sun.shadow;
        let shadow_pipeline = ShadowPipeline::new(device, shadow_config);
        let shadow_map = ShadowMap::new(device, shadow_config.map_size);
        let bloom = BloomPipeline::new(
            device,
            HDR_FORMAT,
            target_format,
            width,
            height,
            settings.bloom.clone(),
        );
        let depth = DepthBuffer::new(device, width, height);
        let mut textures = TextureCache::new(device);
        let allocator = BufferAllocator::new(device);

        let camera_buffer = allocator.create_uniform(
            "camera-uniform",
            &CameraUniform::new(system.camera_view_projection(), eye_position(system.camera_world())),
        );
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera-bind-group"),
            layout: &pipelines.camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let lighting_buffer =
            allocator.create_uniform("lighting-uniform", &system.lights.uniform(&system.graph));
        let lighting_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lighting-bind-group"),
            layout: &pipelines.lighting_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: lighting_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&shadow_map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&shadow_map.sampler),
                },
            ],
        });

        let light_matrix = system.lights.shadow_frustum(&system.graph).view_projection();
        let light_matrix_buffer =
            allocator.create_uniform("shadow-light-uniform", &light_matrix.to_cols_array_2d());
        let shadow_light_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow-light-bind-group"),
            layout: &shadow_pipeline.light_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: light_matrix_buffer.as_entire_binding(),
            }],
        });

        let mut slots = HashMap::new();
        for (id, node, mesh) in system.graph.meshes() {
            let buffer = allocator.upload_mesh(&node.name, &mesh.geometry.build());

            let uniform = allocator.create_uniform(
                &format!("{}-object-uniform", node.name),
                &ObjectUniform::new(
                    system.graph.world_matrix(id),
                    &mesh.material,
                    mesh.receive_shadow,
                ),
            );

            let (color_map, bump_map) =
                material_textures(&mut textures, device, queue, &settings.asset_dir, &mesh.material);
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{}-object-bind-group", node.name)),
                layout: &pipelines.object_bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&color_map.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&bump_map.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::Sampler(textures.sampler()),
                    },
                ],
            });

            let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{}-shadow-bind-group", node.name)),
                layout: &shadow_pipeline.object_bind_group_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.as_entire_binding(),
                }],
            });

            // One variant per pass target.
            pipelines.prepare(device, PipelineKey::for_material(&mesh.material, HDR_FORMAT));
            pipelines.prepare(device, PipelineKey::for_material(&mesh.material, target_format));

            slots.insert(
                id,
                MeshSlot {
                    buffer,
                    uniform,
                    bind_group,
                    shadow_bind_group,
                },
            );
        }

        log::info!(
            "Scene renderer ready: {} meshes, {} pipelines, {} textures, {}x{}",
            slots.len(),
            pipelines.len(),
            textures.len(),
            width,
            height
        );

        Self {
            pipelines,
            shadow_pipeline,
            shadow_map,
            bloom,
            depth,
            textures,
            slots,
            camera_buffer,
            camera_bind_group,
            lighting_buffer,
            lighting_bind_group,
            light_matrix_buffer,
            shadow_light_bind_group,
            surface_format: target_format,
            clear_color: settings.clear_color,
        }
    }

    /// Resize the depth buffer and bloom targets. Idempotent.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth.resize(device, width, height);
        self.bloom.resize(device, width, height);
    }

    /// Size of the offscreen targets.
    pub fn size(&self) -> (u32, u32) {
        (self.depth.width(), self.depth.height())
    }

    /// Number of textures uploaded so far, fallbacks excluded.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Draw one frame to the window surface and present it.
    ///
    /// A lost or outdated surface is reconfigured and the frame skipped;
    /// the caller sees [`SurfaceError::Reconfigured`].
    pub fn render(&self, ctx: &RenderContext, system: &mut SolarSystem) -> Result<(), SurfaceError> {
        let surface_texture = ctx.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.render_to_view(&ctx.device, &ctx.queue, &view, system);
        surface_texture.present();
        Ok(())
    }

    /// Draw one frame into `target`, which must match the target format and
    /// the size the renderer was last resized to.
    pub fn render_to_view(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
        system: &mut SolarSystem,
    ) {
        self.upload_frame(queue, system);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame-encoder"),
        });

        if system.lights.sun.cast_shadow {
            let casters = system
                .graph
                .meshes()
                .filter(|(_, _, mesh)| mesh.cast_shadow)
                .filter_map(|(id, _, _)| self.slots.get(&id))
                .map(|slot| (&slot.shadow_bind_group, &slot.buffer));
            render_shadow_pass(
                &mut encoder,
                &self.shadow_pipeline,
                &self.shadow_map,
                &self.shadow_light_bind_group,
                casters,
            );
        }

        let mut frame = GpuFrame {
            renderer: self,
            encoder: &mut encoder,
            target,
        };
        compositor::render_frame(system, &mut frame);

        queue.submit(std::iter::once(encoder.finish()));
    }

    fn upload_frame(&self, queue: &wgpu::Queue, system: &SolarSystem) {
        let camera = CameraUniform::new(
            system.camera_view_projection(),
            eye_position(system.camera_world()),
        );
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[camera]));

        let lighting = system.lights.uniform(&system.graph);
        queue.write_buffer(&self.lighting_buffer, 0, bytemuck::cast_slice(&[lighting]));

        let light_matrix = system.lights.shadow_frustum(&system.graph).view_projection();
        queue.write_buffer(
            &self.light_matrix_buffer,
            0,
            bytemuck::cast_slice(&light_matrix.to_cols_array_2d()),
        );

        for (id, _node, mesh) in system.graph.meshes() {
            if let Some(slot) = self.slots.get(&id) {
                let object = ObjectUniform::new(
                    system.graph.world_matrix(id),
                    &mesh.material,
                    mesh.receive_shadow,
                );
                queue.write_buffer(&slot.uniform, 0, bytemuck::cast_slice(&[object]));
            }
        }
    }

    /// Draw the meshes the camera currently sees: opaque first, then
    /// transparent back to front.
    fn draw_visible(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        system: &SolarSystem,
        target_format: wgpu::TextureFormat,
    ) -> usize {
        let Some(camera) = system.camera() else {
            return 0;
        };
        let eye = eye_position(system.camera_world());

        let (mut transparent, opaque): (Vec<_>, Vec<_>) = system
            .graph
            .visible_meshes(camera.layers)
            .partition(|(_, _, mesh)| mesh.material.transparent);
        transparent.sort_by(|(a, _, _), (b, _, _)| {
            let da = system.graph.world_position(*a).distance_squared(eye);
            let db = system.graph.world_position(*b).distance_squared(eye);
            db.total_cmp(&da)
        });

        pass.set_bind_group(0, &self.camera_bind_group, &[]);
        pass.set_bind_group(1, &self.lighting_bind_group, &[]);

        let mut drawn = 0;
        for (id, node, mesh) in opaque.into_iter().chain(transparent) {
            let key = PipelineKey::for_material(&mesh.material, target_format);
            let (Some(pipeline), Some(slot)) = (self.pipelines.get(&key), self.slots.get(&id)) else {
                log::warn!("no GPU state for mesh {:?}; skipping", node.name);
                continue;
            };
            pass.set_pipeline(pipeline);
            pass.set_bind_group(2, &slot.bind_group, &[]);
            slot.buffer.draw(pass);
            drawn += 1;
        }
        drawn
    }
}

/// Resolve a material's color and bump textures, substituting white where
/// the material has none or the file cannot be loaded.
fn material_textures(
    textures: &mut TextureCache,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    asset_dir: &Path,
    material: &Material,
) -> (Arc<GpuTexture>, Arc<GpuTexture>) {
    let mut resolve = |path: Option<&PathBuf>, kind| match path {
        Some(path) => textures.load_or_fallback(device, queue, &asset_dir.join(path), kind),
        None => textures.fallback(device, queue, kind),
    };
    let color = resolve(material.map.as_ref(), TextureKind::Color);
    let bump = resolve(material.bump_map.as_ref(), TextureKind::Data);
    (color, bump)
}

/// One frame's command encoder and output, driven by the compositor.
pub struct GpuFrame<'a> {
    renderer: &'a SceneRenderer,
    encoder: &'a mut wgpu::CommandEncoder,
    target: &'a wgpu::TextureView,
}

impl LayerPassTarget for GpuFrame<'_> {
    fn render_bloom_pass(&mut self, system: &SolarSystem) {
        let renderer = self.renderer;
        {
            let mut pass = RenderPassBuilder::new()
                .clear_color(TRANSPARENT_BLACK)
                .depth(DepthLoad::Clear)
                .label("glow-layer")
                .begin(self.encoder, renderer.bloom.hdr_view(), Some(&renderer.depth));
            let drawn = renderer.draw_visible(&mut pass, system, renderer.bloom.hdr_format());
            log::trace!("glow layer: {drawn} meshes");
        }
        renderer
            .bloom
            .execute(self.encoder, self.target, renderer.clear_color);
    }

    fn clear_depth(&mut self) {
        self.renderer.depth.clear(self.encoder);
    }

    fn render_direct_pass(&mut self, system: &SolarSystem) {
        let renderer = self.renderer;
        let mut pass = RenderPassBuilder::new()
            .load_color()
            .depth(DepthLoad::Load)
            .label("base-layer")
            .begin(self.encoder, self.target, Some(&renderer.depth));
        let drawn = renderer.draw_visible(&mut pass, system, renderer.surface_format);
        log::trace!("base layer: {drawn} meshes");
    }
}
