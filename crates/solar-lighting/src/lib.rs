//! Scene lights, the sun's shadow map, and the packed lighting uniform.

mod ambient;
mod directional;
mod point;
mod shadow;
mod uniform;

pub use ambient::AmbientLight;
pub use directional::{DirectionalLight, DirectionalLightUniform};
pub use point::{PointLight, PointLightUniform};
pub use shadow::{ShadowConfig, ShadowFrustum, ShadowMap, fit_shadow_frustum};
pub use uniform::LightingUniform;
