//! Forward pipelines for scene meshes.
//!
//! One WGSL module serves every material: `fs_basic` for unlit meshes and
//! `fs_phong` for lit, bump-mapped, shadow-receiving ones. Pipelines are
//! built lazily per [`PipelineKey`] because culling, blending and the color
//! target format vary between meshes and between the two layer passes.
//!
//! Bind groups:
//! - group 0: camera (`CameraUniform`)
//! - group 1: lighting (`LightingUniform`), sun shadow map, comparison sampler
//! - group 2: object (`ObjectUniform`), color map, bump map, sampler

use std::collections::HashMap;
use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use solar_lighting::LightingUniform;
use solar_scene::{Material, Shading, Side};

use crate::buffer::VertexPositionNormalUv;
use crate::depth::DepthBuffer;

/// Camera view-projection and eye position, 80 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    /// xyz = eye position in world space.
    pub position: [f32; 4],
}

impl CameraUniform {
    pub fn new(view_proj: Mat4, eye: Vec3) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            position: [eye.x, eye.y, eye.z, 1.0],
        }
    }
}

/// Per-mesh transform and material constants, 160 bytes.
///
/// `model` comes first so the shadow pipeline can bind the same buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    /// rgb = linear base color, a = opacity.
    pub color: [f32; 4],
    /// x = bump scale, y = receives shadow (0/1), z = shininess.
    pub params: [f32; 4],
}

impl ObjectUniform {
    pub fn new(world: Mat4, material: &Material, receive_shadow: bool) -> Self {
        let normal_matrix = if world.determinant().abs() > f32::EPSILON {
            world.inverse().transpose()
        } else {
            world
        };
        let bump_scale = if material.bump_map.is_some() {
            material.bump_scale
        } else {
            0.0
        };
        Self {
            model: world.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
            color: [
                material.color.x,
                material.color.y,
                material.color.z,
                material.opacity,
            ],
            params: [
                bump_scale,
                if receive_shadow { 1.0 } else { 0.0 },
                material.shininess,
                0.0,
            ],
        }
    }
}

/// Everything that selects a distinct render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub shading: Shading,
    pub side: Side,
    pub transparent: bool,
    pub target_format: wgpu::TextureFormat,
}

impl PipelineKey {
    pub fn for_material(material: &Material, target_format: wgpu::TextureFormat) -> Self {
        Self {
            shading: material.shading,
            side: material.side,
            transparent: material.transparent,
            target_format,
        }
    }

    fn fragment_entry(&self) -> &'static str {
        match self.shading {
            Shading::Basic => "fs_basic",
            Shading::Phong => "fs_phong",
        }
    }

    /// Cull whichever face the material does not show.
    pub fn cull_mode(&self) -> wgpu::Face {
        match self.side {
            Side::Front => wgpu::Face::Back,
            Side::Back => wgpu::Face::Front,
        }
    }

    pub fn blend(&self) -> Option<wgpu::BlendState> {
        self.transparent.then_some(wgpu::BlendState::ALPHA_BLENDING)
    }
}

pub const MESH_SHADER_SOURCE: &str = r#"
const RECIPROCAL_PI: f32 = 0.3183098862;
// Phong default specular color 0x111111, linearised.
const SPECULAR_COLOR: vec3<f32> = vec3<f32>(0.005605);

struct Camera {
    view_proj: mat4x4<f32>,
    position: vec4<f32>,
};

struct DirectionalLight {
    direction_intensity: vec4<f32>,
    color_padding: vec4<f32>,
};

struct PointLight {
    position_range: vec4<f32>,
    color_intensity: vec4<f32>,
};

struct Lighting {
    ambient: vec4<f32>,
    sun: DirectionalLight,
    point: PointLight,
    light_view_proj: mat4x4<f32>,
    shadow_params: vec4<f32>,
};

struct Object {
    model: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
    color: vec4<f32>,
    params: vec4<f32>,
};

@group(0) @binding(0) var<uniform> camera: Camera;

@group(1) @binding(0) var<uniform> lighting: Lighting;
@group(1) @binding(1) var shadow_map: texture_depth_2d;
@group(1) @binding(2) var shadow_sampler: sampler_comparison;

@group(2) @binding(0) var<uniform> instance: Object;
@group(2) @binding(1) var color_map: texture_2d<f32>;
@group(2) @binding(2) var bump_map: texture_2d<f32>;
@group(2) @binding(3) var material_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    let world = instance.model * vec4<f32>(in.position, 1.0);
    var out: VertexOutput;
    out.clip_position = camera.view_proj * world;
    out.world_position = world.xyz;
    out.normal = (instance.normal_matrix * vec4<f32>(in.normal, 0.0)).xyz;
    out.uv = in.uv;
    return out;
}

@fragment
fn fs_basic(in: VertexOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(color_map, material_sampler, in.uv);
    return vec4<f32>(instance.color.rgb * texel.rgb, instance.color.a * texel.a);
}

// Screen-space height gradient of the bump map.
fn bump_gradient(uv: vec2<f32>) -> vec2<f32> {
    let scale = instance.params.x;
    let duv_dx = dpdx(uv);
    let duv_dy = dpdy(uv);
    let h = textureSample(bump_map, material_sampler, uv).x;
    let hx = textureSample(bump_map, material_sampler, uv + duv_dx).x;
    let hy = textureSample(bump_map, material_sampler, uv + duv_dy).x;
    return scale * vec2<f32>(hx - h, hy - h);
}

// Tilt `normal` along the height gradient (derivative bump mapping).
fn perturb_normal(
    sigma_x: vec3<f32>,
    sigma_y: vec3<f32>,
    normal: vec3<f32>,
    gradient: vec2<f32>,
    face: f32,
) -> vec3<f32> {
    let r1 = cross(sigma_y, normal);
    let r2 = cross(normal, sigma_x);
    let det = dot(sigma_x, r1) * face;
    let grad = sign(det) * (gradient.x * r1 + gradient.y * r2);
    let bumped = abs(det) * normal - grad;
    let usable = abs(det) > 1e-12 && dot(bumped, bumped) > 1e-24;
    return select(normal, normalize(bumped), usable);
}

fn sun_shadow(world_position: vec3<f32>) -> f32 {
    if lighting.shadow_params.x < 0.5 || instance.params.y < 0.5 {
        return 1.0;
    }
    let light_clip = lighting.light_view_proj * vec4<f32>(world_position, 1.0);
    let coord = light_clip.xyz / light_clip.w;
    let uv = vec2<f32>(coord.x * 0.5 + 0.5, -coord.y * 0.5 + 0.5);
    if uv.x < 0.0 || uv.x > 1.0 || uv.y < 0.0 || uv.y > 1.0 || coord.z < 0.0 || coord.z > 1.0 {
        return 1.0;
    }

    let texel = lighting.shadow_params.y;
    var lit = 0.0;
    for (var x = -1; x <= 1; x++) {
        for (var y = -1; y <= 1; y++) {
            let offset = vec2<f32>(f32(x), f32(y)) * texel;
            lit += textureSampleCompareLevel(shadow_map, shadow_sampler, uv + offset, coord.z);
        }
    }
    return lit / 9.0;
}

fn point_attenuation(distance: f32, range: f32) -> f32 {
    let inv_sq = 1.0 / (distance * distance + 1.0);
    if range <= 0.0 {
        return inv_sq;
    }
    let ratio = min(distance / range, 1.0);
    let window = 1.0 - ratio * ratio;
    return inv_sq * window * window;
}

fn blinn_phong(light_dir: vec3<f32>, view_dir: vec3<f32>, normal: vec3<f32>) -> vec3<f32> {
    let half_dir = normalize(light_dir + view_dir);
    let n_dot_h = saturate(dot(normal, half_dir));
    let v_dot_h = saturate(dot(view_dir, half_dir));
    let fresnel = SPECULAR_COLOR + (1.0 - SPECULAR_COLOR) * pow(1.0 - v_dot_h, 5.0);
    let shininess = instance.params.z;
    let distribution = RECIPROCAL_PI * (shininess * 0.5 + 1.0) * pow(n_dot_h, shininess);
    return fresnel * 0.25 * distribution;
}

@fragment
fn fs_phong(in: VertexOutput, @builtin(front_facing) front_facing: bool) -> @location(0) vec4<f32> {
    // Derivatives and implicit-lod samples stay in uniform control flow.
    let texel = textureSample(color_map, material_sampler, in.uv);
    let gradient = bump_gradient(in.uv);
    let sigma_x = dpdx(in.world_position);
    let sigma_y = dpdy(in.world_position);

    let face = select(-1.0, 1.0, front_facing);
    let geometric = normalize(in.normal) * face;
    let normal = perturb_normal(sigma_x, sigma_y, geometric, gradient, face);
    let view_dir = normalize(camera.position.xyz - in.world_position);

    var irradiance = lighting.ambient.rgb;
    var specular = vec3<f32>(0.0);

    let sun_dir = -lighting.sun.direction_intensity.xyz;
    let sun_radiance = lighting.sun.color_padding.rgb
        * lighting.sun.direction_intensity.w
        * sun_shadow(in.world_position);
    let sun_irradiance = saturate(dot(normal, sun_dir)) * sun_radiance;
    irradiance += sun_irradiance;
    specular += sun_irradiance * blinn_phong(sun_dir, view_dir, normal);

    let to_point = lighting.point.position_range.xyz - in.world_position;
    let point_dir = normalize(to_point);
    let point_radiance = lighting.point.color_intensity.rgb
        * lighting.point.color_intensity.w
        * point_attenuation(length(to_point), lighting.point.position_range.w);
    let point_irradiance = saturate(dot(normal, point_dir)) * point_radiance;
    irradiance += point_irradiance;
    specular += point_irradiance * blinn_phong(point_dir, view_dir, normal);

    let albedo = instance.color.rgb * texel.rgb;
    let color = albedo * RECIPROCAL_PI * irradiance + specular;
    return vec4<f32>(color, instance.color.a * texel.a);
}
"#;

/// Shared layouts plus the lazily built pipeline variants.
pub struct MeshPipelines {
    shader: wgpu::ShaderModule,
    layout: wgpu::PipelineLayout,
    pub camera_bind_group_layout: wgpu::BindGroupLayout,
    pub lighting_bind_group_layout: wgpu::BindGroupLayout,
    pub object_bind_group_layout: wgpu::BindGroupLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl MeshPipelines {
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mesh-shader"),
            source: wgpu::ShaderSource::Wgsl(MESH_SHADER_SOURCE.into()),
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("mesh-camera-bgl"),
                entries: &[uniform_entry(
                    0,
                    wgpu::ShaderStages::VERTEX_FRAGMENT,
                    std::mem::size_of::<CameraUniform>(),
                )],
            });

        let lighting_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("mesh-lighting-bgl"),
                entries: &[
                    uniform_entry(
                        0,
                        wgpu::ShaderStages::FRAGMENT,
                        std::mem::size_of::<LightingUniform>(),
                    ),
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Depth,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                        count: None,
                    },
                ],
            });

        let object_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("mesh-object-bgl"),
                entries: &[
                    uniform_entry(
                        0,
                        wgpu::ShaderStages::VERTEX_FRAGMENT,
                        std::mem::size_of::<ObjectUniform>(),
                    ),
                    texture_entry(1),
                    texture_entry(2),
                    wgpu::BindGroupLayoutEntry {
                        binding: 3,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mesh-pipeline-layout"),
            bind_group_layouts: &[
                &camera_bind_group_layout,
                &lighting_bind_group_layout,
                &object_bind_group_layout,
            ],
            immediate_size: 0,
        });

        Self {
            shader,
            layout,
            camera_bind_group_layout,
            lighting_bind_group_layout,
            object_bind_group_layout,
            pipelines: HashMap::new(),
        }
    }

    /// Number of pipeline variants built so far.
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Build the pipeline for `key` if it does not exist yet.
    pub fn prepare(&mut self, device: &wgpu::Device, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        log::debug!("Building mesh pipeline {key:?}");
        let pipeline = self.build(device, key);
        self.pipelines.insert(key, pipeline);
    }

    /// A pipeline previously built with [`MeshPipelines::prepare`].
    pub fn get(&self, key: &PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(key)
    }

    fn build(&self, device: &wgpu::Device, key: PipelineKey) -> wgpu::RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("mesh-pipeline"),
            layout: Some(&self.layout),
            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some("vs_main"),
                buffers: &[VertexPositionNormalUv::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(key.cull_mode()),
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(DepthBuffer::stencil_state(true)),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some(key.fragment_entry()),
                targets: &[Some(wgpu::ColorTargetState {
                    format: key.target_format,
                    blend: key.blend(),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview_mask: None,
            cache: None,
        })
    }
}

fn uniform_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    size: usize,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(size as u64),
        },
        count: None,
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}
