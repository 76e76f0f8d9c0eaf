//! Vertex, index, and uniform buffers.

use bytemuck::{Pod, Zeroable};
use solar_scene::MeshData;

/// Vertex and index buffers for one geometry, ready to draw.
pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl MeshBuffer {
    /// Bind the buffers and draw every index.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

/// Creates GPU buffers on a device.
pub struct BufferAllocator<'a> {
    device: &'a wgpu::Device,
}

impl<'a> BufferAllocator<'a> {
    pub fn new(device: &'a wgpu::Device) -> Self {
        Self { device }
    }

    /// Upload a generated mesh.
    pub fn upload_mesh(&self, label: &str, mesh: &MeshData) -> MeshBuffer {
        let vertices = interleave(mesh);
        MeshBuffer {
            vertex_buffer: self.create_buffer(
                &format!("{label}-vertices"),
                bytemuck::cast_slice(&vertices),
                wgpu::BufferUsages::VERTEX,
            ),
            index_buffer: self.create_buffer(
                &format!("{label}-indices"),
                bytemuck::cast_slice(&mesh.indices),
                wgpu::BufferUsages::INDEX,
            ),
            index_count: mesh.indices.len() as u32,
        }
    }

    /// A uniform buffer initialised with `value`, writable from the queue.
    pub fn create_uniform<T: Pod>(&self, label: &str, value: &T) -> wgpu::Buffer {
        self.create_buffer(
            label,
            bytemuck::bytes_of(value),
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        )
    }

    fn create_buffer(&self, label: &str, contents: &[u8], usage: wgpu::BufferUsages) -> wgpu::Buffer {
        use wgpu::util::DeviceExt;

        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: usage | wgpu::BufferUsages::COPY_DST,
            })
    }
}

/// Position, normal, and UV for lit textured meshes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct VertexPositionNormalUv {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl VertexPositionNormalUv {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<VertexPositionNormalUv>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Interleave a mesh's separate attribute streams into vertices.
pub fn interleave(mesh: &MeshData) -> Vec<VertexPositionNormalUv> {
    mesh.positions
        .iter()
        .zip(&mesh.normals)
        .zip(&mesh.uvs)
        .map(|((position, normal), uv)| VertexPositionNormalUv {
            position: position.to_array(),
            normal: normal.to_array(),
            uv: *uv,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::create_test_device_queue;
    use solar_scene::uv_sphere;

    #[test]
    fn test_vertex_layout_stride() {
        let layout = VertexPositionNormalUv::layout();
        assert_eq!(layout.array_stride, 32);
        assert_eq!(layout.attributes.len(), 3);
        assert_eq!(layout.attributes[2].offset, 24);
    }

    #[test]
    fn test_interleave_keeps_every_vertex() {
        let mesh = uv_sphere(1.0, 8, 6);
        let vertices = interleave(&mesh);
        assert_eq!(vertices.len(), mesh.vertex_count());
        assert_eq!(vertices[3].position, mesh.positions[3].to_array());
        assert_eq!(vertices[3].normal, mesh.normals[3].to_array());
        assert_eq!(vertices[3].uv, mesh.uvs[3]);
    }

    #[test]
    fn test_upload_mesh_counts_indices() {
        let Some((device, _queue)) = create_test_device_queue() else {
            return;
        };
        let mesh = uv_sphere(1.0, 16, 12);
        let buffer = BufferAllocator::new(&device).upload_mesh("sphere", &mesh);
        assert_eq!(buffer.index_count as usize, mesh.indices.len());
        assert_eq!(
            buffer.vertex_buffer.size() as usize,
            mesh.vertex_count() * std::mem::size_of::<VertexPositionNormalUv>()
        );
    }

    #[test]
    fn test_uniform_buffer_usage() {
        let Some((device, _queue)) = create_test_device_queue() else {
            return;
        };
        let buffer = BufferAllocator::new(&device).create_uniform("u", &[0.0f32; 4]);
        assert!(buffer.usage().contains(wgpu::BufferUsages::UNIFORM));
        assert!(buffer.usage().contains(wgpu::BufferUsages::COPY_DST));
    }
}
