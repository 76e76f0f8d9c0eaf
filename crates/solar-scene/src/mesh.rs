//! Renderable mesh descriptors: what shape, how it is shaded, and which
//! textures feed it. GPU resources are created from these by the renderer.

use std::path::PathBuf;

use glam::Vec3;

use crate::geometry::{MeshData, icosahedron, uv_sphere};

/// Procedural shape of a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    /// Latitude/longitude sphere.
    Sphere {
        radius: f32,
        width_segments: u32,
        height_segments: u32,
    },
    /// Icosahedron with each edge split into `detail + 1` segments and every
    /// vertex pushed out to `radius`.
    Icosahedron { radius: f32, detail: u32 },
}

impl Geometry {
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        Self::Sphere {
            radius,
            width_segments,
            height_segments,
        }
    }

    pub fn radius(&self) -> f32 {
        match *self {
            Geometry::Sphere { radius, .. } | Geometry::Icosahedron { radius, .. } => radius,
        }
    }

    /// Generate vertex and index data.
    pub fn build(&self) -> MeshData {
        match *self {
            Geometry::Sphere {
                radius,
                width_segments,
                height_segments,
            } => uv_sphere(radius, width_segments, height_segments),
            Geometry::Icosahedron { radius, detail } => icosahedron(radius, detail),
        }
    }
}

/// Which faces are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Side {
    #[default]
    Front,
    /// Inside faces only, for backdrops the camera sits within.
    Back,
}

/// Lighting model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shading {
    /// Unlit: color times map.
    Basic,
    /// Lambert diffuse plus Blinn-Phong specular, shadowed.
    Phong,
}

/// Surface appearance of a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub shading: Shading,
    /// Linear RGB base color, multiplied with the map.
    pub color: Vec3,
    pub opacity: f32,
    /// Color map, relative to the asset directory.
    pub map: Option<PathBuf>,
    /// Height map used to perturb normals.
    pub bump_map: Option<PathBuf>,
    pub bump_scale: f32,
    pub shininess: f32,
    pub side: Side,
    /// Alpha-blended and drawn after opaque meshes.
    pub transparent: bool,
}

impl Material {
    pub fn basic(color: Vec3) -> Self {
        Self {
            shading: Shading::Basic,
            color,
            opacity: 1.0,
            map: None,
            bump_map: None,
            bump_scale: 1.0,
            shininess: 30.0,
            side: Side::Front,
            transparent: false,
        }
    }

    pub fn phong() -> Self {
        Self {
            shading: Shading::Phong,
            ..Self::basic(Vec3::ONE)
        }
    }

    pub fn with_map(mut self, path: impl Into<PathBuf>) -> Self {
        self.map = Some(path.into());
        self
    }

    pub fn with_bump(mut self, path: impl Into<PathBuf>, scale: f32) -> Self {
        self.bump_map = Some(path.into());
        self.bump_scale = scale;
        self
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    pub fn transparent(mut self) -> Self {
        self.transparent = true;
        self
    }
}

/// Geometry plus material plus shadow participation.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub geometry: Geometry,
    pub material: Material,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl Mesh {
    pub fn new(geometry: Geometry, material: Material) -> Self {
        Self {
            geometry,
            material,
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    /// Cast into and receive from the sun's shadow map.
    pub fn shadowed(mut self) -> Self {
        self.cast_shadow = true;
        self.receive_shadow = true;
        self
    }
}

/// sRGB hex color (`0xRRGGBB`) to linear RGB.
pub fn color_from_hex(hex: u32) -> Vec3 {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    Vec3::new(channel(16), channel(8), channel(0))
}
