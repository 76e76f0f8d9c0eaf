//! Bloom post-processing for the glow layer.
//!
//! The glow pass renders into an HDR target owned here. [`BloomPipeline::execute`]
//! extracts pixels above a luminance threshold, blurs them down and back up a
//! mip chain, writes the scene to the surface and adds the blurred glow on top.

use bytemuck::{Pod, Zeroable};

/// Bloom settings.
#[derive(Clone, Debug, PartialEq)]
pub struct BloomConfig {
    /// Luminance above which a pixel contributes to the glow.
    pub threshold: f32,
    /// Multiplier on the blurred glow added to the scene.
    pub strength: f32,
    /// Scales the blur tap offsets.
    pub radius: f32,
    /// Number of half-resolution blur levels.
    pub iterations: u32,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            strength: 4.0,
            radius: 1.0,
            iterations: 5,
        }
    }
}

/// GPU uniform for bloom shader parameters.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct BloomParams {
    pub threshold: f32,
    pub strength: f32,
    pub radius: f32,
    /// Normalizes the sum of accumulated blur levels.
    pub level_weight: f32,
}

impl BloomParams {
    fn from_config(config: &BloomConfig) -> Self {
        Self {
            threshold: config.threshold,
            strength: config.strength,
            radius: config.radius,
            level_weight: 1.0 / config.iterations.max(1) as f32,
        }
    }
}

pub const BLOOM_SHADER_SOURCE: &str = r#"
struct BloomParams {
    threshold: f32,
    strength: f32,
    radius: f32,
    level_weight: f32,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

// Edge width of the luminance high pass.
const SMOOTH_WIDTH: f32 = 0.01;

@group(0) @binding(0) var<uniform> params: BloomParams;
@group(1) @binding(0) var input_tex: texture_2d<f32>;
@group(1) @binding(1) var input_sampler: sampler;

@vertex
fn vs_fullscreen(@builtin(vertex_index) idx: u32) -> VertexOutput {
    let uv = vec2<f32>(f32((idx << 1u) & 2u), f32(idx & 2u));
    var out: VertexOutput;
    out.position = vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(uv.x, 1.0 - uv.y);
    return out;
}

@fragment
fn fs_extract(in: VertexOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(input_tex, input_sampler, in.uv);
    let luminance = dot(texel.rgb, vec3<f32>(0.299, 0.587, 0.114));
    let alpha = smoothstep(params.threshold, params.threshold + SMOOTH_WIDTH, luminance);
    return mix(vec4<f32>(0.0), texel, alpha);
}

@fragment
fn fs_downsample(in: VertexOutput) -> @location(0) vec4<f32> {
    let dims = vec2<f32>(textureDimensions(input_tex));
    let texel = params.radius / dims;
    let a = textureSample(input_tex, input_sampler, in.uv + vec2(-texel.x, -texel.y));
    let b = textureSample(input_tex, input_sampler, in.uv + vec2( texel.x, -texel.y));
    let c = textureSample(input_tex, input_sampler, in.uv + vec2(-texel.x,  texel.y));
    let d = textureSample(input_tex, input_sampler, in.uv + vec2( texel.x,  texel.y));
    return (a + b + c + d) * 0.25;
}

@fragment
fn fs_upsample(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(input_tex, input_sampler, in.uv);
}

@fragment
fn fs_resolve(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(input_tex, input_sampler, in.uv);
}

@fragment
fn fs_bloom_composite(in: VertexOutput) -> @location(0) vec4<f32> {
    let bloom = textureSample(input_tex, input_sampler, in.uv);
    return bloom * params.strength * params.level_weight;
}
"#;

/// Size of each blur level: half of the previous one, never below 1×1.
pub fn mip_chain_sizes(width: u32, height: u32, iterations: u32) -> Vec<(u32, u32)> {
    let mut sizes = Vec::with_capacity(iterations as usize);
    let (mut w, mut h) = ((width / 2).max(1), (height / 2).max(1));
    for _ in 0..iterations {
        sizes.push((w, h));
        w = (w / 2).max(1);
        h = (h / 2).max(1);
    }
    sizes
}

/// Additive blend used to accumulate blur levels and the final glow.
const ADDITIVE: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent::OVER,
};

/// Owns the glow HDR target, the blur chain, and the fullscreen pipelines.
pub struct BloomPipeline {
    config: BloomConfig,
    texture_bgl: wgpu::BindGroupLayout,
    extract_pipeline: wgpu::RenderPipeline,
    downsample_pipeline: wgpu::RenderPipeline,
    upsample_pipeline: wgpu::RenderPipeline,
    resolve_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    sampler: wgpu::Sampler,
    params_bind_group: wgpu::BindGroup,
    hdr_view: wgpu::TextureView,
    hdr_bind_group: wgpu::BindGroup,
    hdr_format: wgpu::TextureFormat,
    mip_views: Vec<wgpu::TextureView>,
    mip_bind_groups: Vec<wgpu::BindGroup>,
    size: (u32, u32),
}

impl BloomPipeline {
    /// `hdr_format` is the glow target format (typically `Rgba16Float`),
    /// `surface_format` the swapchain format the result lands in.
    pub fn new(
        device: &wgpu::Device,
        hdr_format: wgpu::TextureFormat,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        config: BloomConfig,
    ) -> Self {
        use wgpu::util::DeviceExt;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("bloom-shader"),
            source: wgpu::ShaderSource::Wgsl(BLOOM_SHADER_SOURCE.into()),
        });

        let params_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bloom-params-bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: std::num::NonZeroU64::new(16),
                },
                count: None,
            }],
        });

        let texture_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bloom-texture-bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("bloom-layout"),
            bind_group_layouts: &[&params_bgl, &texture_bgl],
            immediate_size: 0,
        });

        let fullscreen = |entry: &str, format, blend, label: &str| {
            create_fullscreen_pipeline(device, &shader, &layout, entry, format, blend, label)
        };
        let extract_pipeline = fullscreen("fs_extract", hdr_format, None, "bloom-extract");
        let downsample_pipeline = fullscreen("fs_downsample", hdr_format, None, "bloom-downsample");
        let upsample_pipeline =
            fullscreen("fs_upsample", hdr_format, Some(ADDITIVE), "bloom-upsample");
        let resolve_pipeline = fullscreen("fs_resolve", surface_format, None, "bloom-resolve");
        let composite_pipeline = fullscreen(
            "fs_bloom_composite",
            surface_format,
            Some(ADDITIVE),
            "bloom-composite",
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("bloom-sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("bloom-params"),
            contents: bytemuck::cast_slice(&[BloomParams::from_config(&config)]),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let params_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bloom-params-bg"),
            layout: &params_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: params_buffer.as_entire_binding(),
            }],
        });

        let size = (width.max(1), height.max(1));
        let (hdr_view, hdr_bind_group) =
            create_target(device, &texture_bgl, &sampler, hdr_format, size, "bloom-hdr");
        let (mip_views, mip_bind_groups) =
            create_mip_chain(device, &texture_bgl, &sampler, hdr_format, size, config.iterations);

        log::debug!(
            "Bloom pipeline {}x{} with {} levels",
            size.0,
            size.1,
            mip_views.len()
        );

        Self {
            config,
            texture_bgl,
            extract_pipeline,
            downsample_pipeline,
            upsample_pipeline,
            resolve_pipeline,
            composite_pipeline,
            sampler,
            params_bind_group,
            hdr_view,
            hdr_bind_group,
            hdr_format,
            mip_views,
            mip_bind_groups,
            size,
        }
    }

    /// The glow pass renders into this view.
    pub fn hdr_view(&self) -> &wgpu::TextureView {
        &self.hdr_view
    }

    pub fn hdr_format(&self) -> wgpu::TextureFormat {
        self.hdr_format
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Recreate the HDR target and blur chain. No-op when the size is unchanged.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let size = (width.max(1), height.max(1));
        if size == self.size {
            return;
        }
        self.size = size;
        self.rebuild_targets(device);
    }

    fn rebuild_targets(&mut self, device: &wgpu::Device) {
        let (hdr_view, hdr_bind_group) = create_target(
            device,
            &self.texture_bgl,
            &self.sampler,
            self.hdr_format,
            self.size,
            "bloom-hdr",
        );
        self.hdr_view = hdr_view;
        self.hdr_bind_group = hdr_bind_group;

        let (mip_views, mip_bind_groups) = create_mip_chain(
            device,
            &self.texture_bgl,
            &self.sampler,
            self.hdr_format,
            self.size,
            self.config.iterations,
        );
        self.mip_views = mip_views;
        self.mip_bind_groups = mip_bind_groups;
    }

    /// Extract, blur, then write scene plus glow to `surface_view`.
    ///
    /// The surface is cleared to `clear` before the scene is resolved onto it.
    pub fn execute(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        clear: wgpu::Color,
    ) {
        self.run_pass(
            encoder,
            &self.resolve_pipeline,
            &self.hdr_bind_group,
            surface_view,
            wgpu::LoadOp::Clear(clear),
            "bloom-resolve",
        );

        let levels = self.mip_views.len();
        if levels == 0 {
            return;
        }

        self.run_pass(
            encoder,
            &self.extract_pipeline,
            &self.hdr_bind_group,
            &self.mip_views[0],
            wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            "bloom-extract",
        );

        for i in 1..levels {
            self.run_pass(
                encoder,
                &self.downsample_pipeline,
                &self.mip_bind_groups[i - 1],
                &self.mip_views[i],
                wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                "bloom-downsample",
            );
        }

        for i in (0..levels - 1).rev() {
            self.run_pass(
                encoder,
                &self.upsample_pipeline,
                &self.mip_bind_groups[i + 1],
                &self.mip_views[i],
                wgpu::LoadOp::Load,
                "bloom-upsample",
            );
        }

        self.run_pass(
            encoder,
            &self.composite_pipeline,
            &self.mip_bind_groups[0],
            surface_view,
            wgpu::LoadOp::Load,
            "bloom-composite",
        );
    }

    fn run_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::RenderPipeline,
        texture_bind_group: &wgpu::BindGroup,
        target_view: &wgpu::TextureView,
        load_op: wgpu::LoadOp<wgpu::Color>,
        label: &str,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: load_op,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.params_bind_group, &[]);
        pass.set_bind_group(1, texture_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

fn create_fullscreen_pipeline(
    device: &wgpu::Device,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    fragment_entry: &str,
    target_format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_fullscreen"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format: target_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview_mask: None,
        cache: None,
    })
}

fn create_target(
    device: &wgpu::Device,
    texture_bgl: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    format: wgpu::TextureFormat,
    (width, height): (u32, u32),
    label: &str,
) -> (wgpu::TextureView, wgpu::BindGroup) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout: texture_bgl,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });
    (view, bind_group)
}

fn create_mip_chain(
    device: &wgpu::Device,
    texture_bgl: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    format: wgpu::TextureFormat,
    (width, height): (u32, u32),
    iterations: u32,
) -> (Vec<wgpu::TextureView>, Vec<wgpu::BindGroup>) {
    mip_chain_sizes(width, height, iterations)
        .into_iter()
        .enumerate()
        .map(|(i, size)| {
            log::trace!("Bloom mip {i}: {}x{}", size.0, size.1);
            create_target(device, texture_bgl, sampler, format, size, "bloom-mip")
        })
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::create_test_device_queue;

    #[test]
    fn test_defaults_match_scene_glow() {
        let config = BloomConfig::default();
        assert_eq!(config.threshold, 0.0);
        assert_eq!(config.strength, 4.0);
        assert_eq!(config.radius, 1.0);
        assert_eq!(config.iterations, 5);
    }

    #[test]
    fn test_params_pack_config() {
        let params = BloomParams::from_config(&BloomConfig::default());
        assert_eq!(
            params,
            BloomParams {
                threshold: 0.0,
                strength: 4.0,
                radius: 1.0,
                level_weight: 0.2,
            }
        );
        let none = BloomParams::from_config(&BloomConfig {
            iterations: 0,
            ..Default::default()
        });
        assert!(none.level_weight.is_finite());
    }

    #[test]
    fn test_params_uniform_size() {
        assert_eq!(std::mem::size_of::<BloomParams>(), 16);
    }

    #[test]
    fn test_mip_chain_halves_each_level() {
        assert_eq!(
            mip_chain_sizes(1920, 1080, 5),
            vec![(960, 540), (480, 270), (240, 135), (120, 67), (60, 33)]
        );
    }

    #[test]
    fn test_mip_chain_never_reaches_zero() {
        let sizes = mip_chain_sizes(3, 1, 4);
        assert_eq!(sizes.len(), 4);
        assert!(sizes.iter().all(|&(w, h)| w >= 1 && h >= 1));
        assert!(mip_chain_sizes(800, 600, 0).is_empty());
    }

    #[test]
    fn test_resize_to_same_size_is_noop() {
        let Some((device, _queue)) = create_test_device_queue() else {
            return;
        };
        let mut bloom = BloomPipeline::new(
            &device,
            wgpu::TextureFormat::Rgba16Float,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            640,
            480,
            BloomConfig::default(),
        );
        bloom.resize(&device, 640, 480);
        assert_eq!(bloom.size(), (640, 480));
        bloom.resize(&device, 0, 0);
        assert_eq!(bloom.size(), (1, 1));
    }

    #[test]
    fn test_execute_into_offscreen_target() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let bloom = BloomPipeline::new(
            &device,
            wgpu::TextureFormat::Rgba16Float,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            64,
            64,
            BloomConfig::default(),
        );
        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("bloom-test-target"),
            size: wgpu::Extent3d {
                width: 64,
                height: 64,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        bloom.execute(&mut encoder, &view, wgpu::Color::TRANSPARENT);
        queue.submit([encoder.finish()]);
    }
}
