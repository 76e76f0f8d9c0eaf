//! Scene graph, geometry, and the animated solar-system scene.

pub mod animation;
pub mod camera;
pub mod controls;
pub mod geometry;
pub mod graph;
pub mod layers;
pub mod mesh;
pub mod system;
pub mod transform;
pub mod viewport;

pub use animation::{AnimationDeltas, Animator};
pub use camera::{PerspectiveCamera, eye_position};
pub use controls::{OrbitControls, OrbitInput};
pub use geometry::{MeshData, icosahedron, uv_sphere};
pub use graph::{NodeId, NodeKind, SceneError, SceneGraph, SceneNode};
pub use layers::{Layers, RenderLayer};
pub use mesh::{Geometry, Material, Mesh, Shading, Side, color_from_hex};
pub use system::{LightingRig, SceneParams, SolarSystem, textures};
pub use transform::{Euler, Transform};
pub use viewport::{PhysicalSize, Viewport};
