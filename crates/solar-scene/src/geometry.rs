//! Procedural sphere meshes.

use std::f32::consts::{PI, TAU};

use glam::Vec3;

/// CPU-side triangle mesh, counter-clockwise front faces.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    /// Unit normals, one per position.
    pub normals: Vec<Vec3>,
    /// Texture coordinates with v = 0 at the north pole (top of the image).
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Latitude/longitude sphere. The seam column is duplicated so the
/// texture wraps cleanly; the degenerate triangles touching the poles are
/// dropped.
pub fn uv_sphere(radius: f32, width_segments: u32, height_segments: u32) -> MeshData {
    let width_segments = width_segments.max(3);
    let height_segments = height_segments.max(2);
    let row = width_segments + 1;

    let mut mesh = MeshData::default();
    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        let theta = v * PI;
        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let phi = u * TAU;
            let normal = Vec3::new(-phi.cos() * theta.sin(), theta.cos(), phi.sin() * theta.sin());
            mesh.positions.push(normal * radius);
            mesh.normals.push(normal);
            mesh.uvs.push([u, v]);
        }
    }

    for iy in 0..height_segments {
        for ix in 0..width_segments {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;
            if iy != 0 {
                mesh.indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height_segments - 1 {
                mesh.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }
    mesh
}

const ICOSAHEDRON_FACES: [[usize; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

fn icosahedron_corners() -> [Vec3; 12] {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
    [
        Vec3::new(-1.0, t, 0.0),
        Vec3::new(1.0, t, 0.0),
        Vec3::new(-1.0, -t, 0.0),
        Vec3::new(1.0, -t, 0.0),
        Vec3::new(0.0, -1.0, t),
        Vec3::new(0.0, 1.0, t),
        Vec3::new(0.0, -1.0, -t),
        Vec3::new(0.0, 1.0, -t),
        Vec3::new(t, 0.0, -1.0),
        Vec3::new(t, 0.0, 1.0),
        Vec3::new(-t, 0.0, -1.0),
        Vec3::new(-t, 0.0, 1.0),
    ]
}

/// Geodesic sphere: every icosahedron face is split into a triangular grid
/// with `detail + 1` segments per edge, then projected onto the sphere.
///
/// Yields `20 * (detail + 1)^2` triangles. Faces do not share vertices.
pub fn icosahedron(radius: f32, detail: u32) -> MeshData {
    let corners = icosahedron_corners();
    let cols = detail as usize + 1;
    let mut mesh = MeshData::default();

    for [ia, ib, ic] in ICOSAHEDRON_FACES {
        let (a, b, c) = (corners[ia], corners[ib], corners[ic]);
        let base = mesh.positions.len() as u32;

        // Row i runs from lerp(a, c) to lerp(b, c) and has cols - i + 1 points.
        let mut row_start = Vec::with_capacity(cols + 1);
        for i in 0..=cols {
            row_start.push(mesh.positions.len() as u32 - base);
            let t = i as f32 / cols as f32;
            let left = a.lerp(c, t);
            let right = b.lerp(c, t);
            let rows = cols - i;
            for j in 0..=rows {
                let p = if rows == 0 {
                    left
                } else {
                    left.lerp(right, j as f32 / rows as f32)
                };
                push_sphere_vertex(&mut mesh, p, radius);
            }
        }

        let at = |i: usize, j: usize| base + row_start[i] + j as u32;
        for i in 0..cols {
            for j in 0..(2 * (cols - i) - 1) {
                let k = j / 2;
                if j % 2 == 0 {
                    mesh.indices.extend_from_slice(&[at(i, k + 1), at(i + 1, k), at(i, k)]);
                } else {
                    mesh.indices
                        .extend_from_slice(&[at(i, k + 1), at(i + 1, k + 1), at(i + 1, k)]);
                }
            }
        }
    }
    mesh
}

fn push_sphere_vertex(mesh: &mut MeshData, p: Vec3, radius: f32) {
    let normal = p.normalize();
    let u = 0.5 + normal.z.atan2(-normal.x) / TAU;
    let v = 0.5 - normal.y.asin() / PI;
    mesh.positions.push(normal * radius);
    mesh.normals.push(normal);
    mesh.uvs.push([u.clamp(0.0, 1.0), v.clamp(0.0, 1.0)]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_on_sphere(mesh: &MeshData, radius: f32) {
        for pos in &mesh.positions {
            assert!(
                (pos.length() - radius).abs() < 1e-4,
                "vertex not on sphere: length = {}",
                pos.length()
            );
        }
    }

    fn assert_indices_valid(mesh: &MeshData) {
        let n = mesh.vertex_count() as u32;
        assert!(mesh.indices.iter().all(|&i| i < n));
    }

    /// Every non-degenerate triangle must face away from the centre.
    fn assert_outward_winding(mesh: &MeshData) {
        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|k| mesh.positions[tri[k] as usize]);
            let n = (b - a).cross(c - a);
            if n.length() < 1e-7 {
                continue;
            }
            let centroid = (a + b + c) / 3.0;
            assert!(n.dot(centroid) > 0.0, "inward-facing triangle {tri:?}");
        }
    }

    #[test]
    fn test_uv_sphere_counts() {
        let mesh = uv_sphere(1.0, 32, 32);
        assert_eq!(mesh.vertex_count(), 33 * 33);
        assert_eq!(mesh.triangle_count(), 2 * 32 * 32 - 2 * 32);
    }

    #[test]
    fn test_uv_sphere_geometry() {
        let mesh = uv_sphere(0.27, 32, 32);
        assert_on_sphere(&mesh, 0.27);
        assert_indices_valid(&mesh);
        assert_outward_winding(&mesh);
    }

    #[test]
    fn test_uv_sphere_north_pole_is_top_of_texture() {
        let mesh = uv_sphere(1.0, 8, 8);
        assert!((mesh.positions[0].y - 1.0).abs() < 1e-6);
        assert_eq!(mesh.uvs[0][1], 0.0);
        let last = mesh.vertex_count() - 1;
        assert_eq!(mesh.uvs[last][1], 1.0);
    }

    #[test]
    fn test_uv_sphere_clamps_tiny_segment_counts() {
        let mesh = uv_sphere(1.0, 0, 0);
        assert!(mesh.triangle_count() > 0);
        assert_indices_valid(&mesh);
    }

    #[test]
    fn test_icosahedron_triangle_count() {
        assert_eq!(icosahedron(1.0, 0).triangle_count(), 20);
        assert_eq!(icosahedron(1.0, 15).triangle_count(), 20 * 16 * 16);
    }

    #[test]
    fn test_icosahedron_geometry() {
        let mesh = icosahedron(2.0, 3);
        assert_on_sphere(&mesh, 2.0);
        assert_indices_valid(&mesh);
        assert_outward_winding(&mesh);
    }

    #[test]
    fn test_uvs_in_range() {
        for mesh in [uv_sphere(1.0, 16, 16), icosahedron(1.0, 4)] {
            for uv in &mesh.uvs {
                assert!((0.0..=1.0).contains(&uv[0]) && (0.0..=1.0).contains(&uv[1]));
            }
        }
    }

    #[test]
    fn test_normals_are_unit_and_radial() {
        let mesh = uv_sphere(3.0, 12, 12);
        for (pos, n) in mesh.positions.iter().zip(&mesh.normals) {
            assert!((n.length() - 1.0).abs() < 1e-5);
            assert!((*pos / 3.0 - *n).length() < 1e-5);
        }
    }
}
