//! wgpu rendering for the solar system scene: surface management, mesh and
//! shadow pipelines, textures, bloom, and the two-layer frame compositor.

pub mod bloom;
pub mod buffer;
pub mod compositor;
pub mod depth;
pub mod gpu;
pub mod mesh_pipeline;
pub mod pass;
pub mod renderer;
pub mod shadow_pipeline;
pub mod texture;

pub use bloom::{BloomConfig, BloomPipeline};
pub use buffer::{BufferAllocator, MeshBuffer, VertexPositionNormalUv};
pub use compositor::{LayerPassTarget, render_frame};
pub use depth::DepthBuffer;
pub use gpu::{RenderContext, RenderContextError, SurfaceError, init_render_context_blocking};
pub use mesh_pipeline::{CameraUniform, MeshPipelines, ObjectUniform, PipelineKey};
pub use pass::{DepthLoad, RenderPassBuilder, TRANSPARENT_BLACK, color_from_rgba};
pub use renderer::{GpuFrame, HDR_FORMAT, RendererSettings, SceneRenderer};
pub use shadow_pipeline::ShadowPipeline;
pub use texture::{GpuTexture, TextureCache, TextureError, TextureKind};
