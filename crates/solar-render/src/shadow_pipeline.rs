//! Depth-only pipeline that renders shadow casters from the sun's point of view.

use std::num::NonZeroU64;

use solar_lighting::{ShadowConfig, ShadowMap};

use crate::buffer::{MeshBuffer, VertexPositionNormalUv};

pub const SHADOW_SHADER_SOURCE: &str = r#"
struct LightMatrix {
    view_proj: mat4x4<f32>,
};

struct Object {
    model: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> light: LightMatrix;

@group(1) @binding(0)
var<uniform> instance: Object;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

@vertex
fn vs_shadow(in: VertexInput) -> @builtin(position) vec4<f32> {
    return light.view_proj * instance.model * vec4<f32>(in.position, 1.0);
}
"#;

/// Depth-only pipeline and the layouts its bind groups are built against.
pub struct ShadowPipeline {
    pub pipeline: wgpu::RenderPipeline,
    /// Light view-projection uniform (group 0).
    pub light_bind_group_layout: wgpu::BindGroupLayout,
    /// Per-object uniform whose first 64 bytes are the model matrix (group 1).
    pub object_bind_group_layout: wgpu::BindGroupLayout,
}

impl ShadowPipeline {
    pub fn new(device: &wgpu::Device, config: &ShadowConfig) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shadow-shader"),
            source: wgpu::ShaderSource::Wgsl(SHADOW_SHADER_SOURCE.into()),
        });

        let uniform_layout = |label, visibility| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(64),
                    },
                    count: None,
                }],
            })
        };
        let light_bind_group_layout = uniform_layout("shadow-light-bgl", wgpu::ShaderStages::VERTEX);
        let object_bind_group_layout =
            uniform_layout("shadow-object-bgl", wgpu::ShaderStages::VERTEX);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("shadow-pipeline-layout"),
            bind_group_layouts: &[&light_bind_group_layout, &object_bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("shadow-depth-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_shadow"),
                buffers: &[VertexPositionNormalUv::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Back faces only: keeps the lit side of each sphere free of acne.
                cull_mode: Some(wgpu::Face::Front),
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: ShadowMap::FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::GreaterEqual,
                stencil: wgpu::StencilState::default(),
                bias: depth_bias(config),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: None,
            multiview_mask: None,
            cache: None,
        });

        Self {
            pipeline,
            light_bind_group_layout,
            object_bind_group_layout,
        }
    }
}

/// Reverse-Z pushes caster depth toward 0.0, so the configured bias is negated.
fn depth_bias(config: &ShadowConfig) -> wgpu::DepthBiasState {
    wgpu::DepthBiasState {
        constant: -config.depth_bias_constant,
        slope_scale: -config.depth_bias_slope,
        clamp: 0.0,
    }
}

/// Render every caster into `shadow_map`, clearing it first.
pub fn render_shadow_pass<'a>(
    encoder: &mut wgpu::CommandEncoder,
    pipeline: &ShadowPipeline,
    shadow_map: &ShadowMap,
    light_bind_group: &wgpu::BindGroup,
    casters: impl IntoIterator<Item = (&'a wgpu::BindGroup, &'a MeshBuffer)>,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("sun-shadow"),
        color_attachments: &[],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: &shadow_map.view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(ShadowMap::CLEAR_VALUE),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });
    pass.set_pipeline(&pipeline.pipeline);
    pass.set_bind_group(0, light_bind_group, &[]);
    for (object_bind_group, mesh) in casters {
        pass.set_bind_group(1, object_bind_group, &[]);
        mesh.draw(&mut pass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::create_test_device_queue;

    #[test]
    fn test_bias_points_toward_far_plane() {
        let bias = depth_bias(&ShadowConfig::default());
        assert_eq!(bias.constant, -2);
        assert!(bias.slope_scale < 0.0);
    }

    #[test]
    fn test_shader_reads_model_matrix() {
        assert!(SHADOW_SHADER_SOURCE.contains("instance.model"));
        assert!(SHADOW_SHADER_SOURCE.contains("fn vs_shadow"));
    }

    #[test]
    fn test_pipeline_builds_and_clears_map() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let pipeline = ShadowPipeline::new(&device, &ShadowConfig::default());
        let map = ShadowMap::new(&device, 256);
        let buffer = crate::buffer::BufferAllocator::new(&device)
            .create_uniform("light", &glam::Mat4::IDENTITY.to_cols_array());
        let light = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout: &pipeline.light_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        let mut encoder =
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        render_shadow_pass(&mut encoder, &pipeline, &map, &light, std::iter::empty());
        queue.submit([encoder.finish()]);
    }
}
