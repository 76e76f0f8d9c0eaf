//! Image textures: decoding, upload with mipmaps, caching, and fallbacks.
//!
//! [`TextureCache::load_or_fallback`] never fails: a texture that cannot be
//! read or decoded is logged and replaced with a 1×1 white texture, so a
//! missing asset renders untextured instead of stopping the program.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Errors that can occur while loading or creating a texture.
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("failed to load texture {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("texture dimensions must be non-zero, got {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },

    #[error("texture data size ({actual}) does not match expected ({expected}) for {width}x{height}")]
    DataSizeMismatch {
        actual: usize,
        expected: usize,
        width: u32,
        height: u32,
    },
}

/// How texel values are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    /// sRGB-encoded color, linearised on sampling.
    Color,
    /// Linear data such as bump heights.
    Data,
}

impl TextureKind {
    pub fn format(self) -> wgpu::TextureFormat {
        match self {
            TextureKind::Color => wgpu::TextureFormat::Rgba8UnormSrgb,
            TextureKind::Data => wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

/// A sampled GPU texture.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub dimensions: (u32, u32),
    pub kind: TextureKind,
    pub mip_level_count: u32,
}

/// Number of mip levels down to 1×1.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Read and decode an image file into RGBA8.
pub fn decode_rgba(path: &Path) -> Result<image::RgbaImage, TextureError> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|source| TextureError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

const BLIT_SHADER_SOURCE: &str = r#"
@group(0) @binding(0) var src_texture: texture_2d<f32>;
@group(0) @binding(1) var src_sampler: sampler;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) idx: u32) -> VertexOutput {
    let uv = vec2<f32>(f32((idx << 1u) & 2u), f32(idx & 2u));
    var out: VertexOutput;
    out.position = vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(uv.x, 1.0 - uv.y);
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(src_texture, src_sampler, in.uv);
}
"#;

/// Loads textures once per path and hands out shared handles.
pub struct TextureCache {
    textures: HashMap<(PathBuf, TextureKind), Arc<GpuTexture>>,
    fallbacks: HashMap<TextureKind, Arc<GpuTexture>>,
    sampler: wgpu::Sampler,
    blit_shader: wgpu::ShaderModule,
    blit_layout: wgpu::PipelineLayout,
    blit_bind_group_layout: wgpu::BindGroupLayout,
    blit_sampler: wgpu::Sampler,
    blit_pipelines: HashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,
}

impl TextureCache {
    pub fn new(device: &wgpu::Device) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("material-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            ..Default::default()
        });

        let blit_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("blit-bind-group-layout"),
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

        let blit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("blit-shader"),
            source: wgpu::ShaderSource::Wgsl(BLIT_SHADER_SOURCE.into()),
        });

        let blit_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("blit-pipeline-layout"),
            bind_group_layouts: &[&blit_bind_group_layout],
            immediate_size: 0,
        });

        let blit_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("blit-sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            textures: HashMap::new(),
            fallbacks: HashMap::new(),
            sampler,
            blit_shader,
            blit_layout,
            blit_bind_group_layout,
            blit_sampler,
            blit_pipelines: HashMap::new(),
        }
    }

    /// Shared linear sampler for material textures.
    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Load `path`, reusing an earlier upload of the same file and kind.
    pub fn load(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &Path,
        kind: TextureKind,
    ) -> Result<Arc<GpuTexture>, TextureError> {
        let key = (path.to_path_buf(), kind);
        if let Some(existing) = self.textures.get(&key) {
            return Ok(Arc::clone(existing));
        }

        let image = decode_rgba(path)?;
        let (width, height) = image.dimensions();
        let label = path.display().to_string();
        let texture = self.create(device, queue, &label, image.as_raw(), width, height, kind)?;
        self.textures.insert(key, Arc::clone(&texture));
        Ok(texture)
    }

    /// Like [`TextureCache::load`], substituting the white fallback on error.
    pub fn load_or_fallback(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &Path,
        kind: TextureKind,
    ) -> Arc<GpuTexture> {
        match self.load(device, queue, path, kind) {
            Ok(texture) => texture,
            Err(err) => {
                log::warn!("{err}; rendering untextured");
                self.fallback(device, queue, kind)
            }
        }
    }

    /// 1×1 opaque white texture of `kind`.
    pub fn fallback(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        kind: TextureKind,
    ) -> Arc<GpuTexture> {
        if let Some(existing) = self.fallbacks.get(&kind) {
            return Arc::clone(existing);
        }
        let texture = Arc::new(self.upload(device, queue, "fallback-white", &[255; 4], 1, 1, kind));
        self.fallbacks.insert(kind, Arc::clone(&texture));
        texture
    }

    /// Create a texture from RGBA8 pixels, generating mipmaps.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        data: &[u8],
        width: u32,
        height: u32,
        kind: TextureKind,
    ) -> Result<Arc<GpuTexture>, TextureError> {
        validate(data, width, height)?;
        Ok(Arc::new(self.upload(device, queue, label, data, width, height, kind)))
    }

    #[allow(clippy::too_many_arguments)]
    fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        data: &[u8],
        width: u32,
        height: u32,
        kind: TextureKind,
    ) -> GpuTexture {
        let format = kind.format();
        let mip_levels = mip_level_count(width, height);
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: mip_levels,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: None,
            },
            size,
        );

        if mip_levels > 1 {
            self.generate_mipmaps(device, queue, &texture, format, mip_levels);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        log::info!("Created texture '{label}' ({width}x{height}, {mip_levels} mips)");

        GpuTexture {
            texture,
            view,
            dimensions: (width, height),
            kind,
            mip_level_count: mip_levels,
        }
    }

    /// Fill mip levels 1.. by repeatedly blitting the level above.
    fn generate_mipmaps(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texture: &wgpu::Texture,
        format: wgpu::TextureFormat,
        mip_count: u32,
    ) {
        let shader = &self.blit_shader;
        let layout = &self.blit_layout;
        let pipeline = self.blit_pipelines.entry(format).or_insert_with(|| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("mipmap-pipeline"),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: shader,
                    entry_point: Some("vs_main"),
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
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                multiview_mask: None,
                cache: None,
            })
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("mipmap-encoder"),
        });

        for level in 1..mip_count {
            let src_view = texture.create_view(&wgpu::TextureViewDescriptor {
                base_mip_level: level - 1,
                mip_level_count: Some(1),
                ..Default::default()
            });
            let dst_view = texture.create_view(&wgpu::TextureViewDescriptor {
                base_mip_level: level,
                mip_level_count: Some(1),
                ..Default::default()
            });

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("mipmap-bind-group"),
                layout: &self.blit_bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&src_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.blit_sampler),
                    },
                ],
            });

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("mipmap-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &dst_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        queue.submit(std::iter::once(encoder.finish()));
    }
}

fn validate(data: &[u8], width: u32, height: u32) -> Result<(), TextureError> {
    if width == 0 || height == 0 {
        return Err(TextureError::ZeroDimensions { width, height });
    }
    let expected = width as usize * height as usize * 4;
    if data.len() != expected {
        return Err(TextureError::DataSizeMismatch {
            actual: data.len(),
            expected,
            width,
            height,
        });
    }
    Ok(())
}

/// Create a test GPU device and queue. Returns `None` if no GPU is available.
#[cfg(test)]
pub(crate) fn create_test_device_queue() -> Option<(wgpu::Device, wgpu::Queue)> {
    pollster::block_on(async {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok()?;

        adapter
            .request_device(&wgpu::DeviceDescriptor::default())
            .await
            .ok()
    })
}
