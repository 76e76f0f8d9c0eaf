//! Render layer masks.
//!
//! Every mesh belongs to exactly one [`RenderLayer`]. The camera holds a
//! [`Layers`] mask that is switched between passes to pick which meshes a
//! pass draws.

/// The two layers the frame is split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderLayer {
    /// Drawn directly on top of the glow result.
    Base = 0,
    /// Drawn through the bloom filter first.
    Glow = 1,
}

impl RenderLayer {
    pub const ALL: [RenderLayer; 2] = [RenderLayer::Base, RenderLayer::Glow];

    pub fn index(self) -> u32 {
        self as u32
    }
}

/// 32-bit layer membership mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Layers(u32);

impl Layers {
    /// Member of `layer` only.
    pub fn only(layer: RenderLayer) -> Self {
        Self(1 << layer.index())
    }

    pub fn none() -> Self {
        Self(0)
    }

    /// Replace membership with `layer` alone.
    pub fn set(&mut self, layer: RenderLayer) {
        self.0 = 1 << layer.index();
    }

    pub fn enable(&mut self, layer: RenderLayer) {
        self.0 |= 1 << layer.index();
    }

    pub fn disable(&mut self, layer: RenderLayer) {
        self.0 &= !(1 << layer.index());
    }

    pub fn contains(&self, layer: RenderLayer) -> bool {
        self.0 & (1 << layer.index()) != 0
    }

    /// True when the two masks share at least one layer.
    pub fn intersects(&self, other: Layers) -> bool {
        self.0 & other.0 != 0
    }

    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl Default for Layers {
    fn default() -> Self {
        Self::only(RenderLayer::Base)
    }
}

impl From<RenderLayer> for Layers {
    fn from(layer: RenderLayer) -> Self {
        Self::only(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_base_layer() {
        assert_eq!(Layers::default(), Layers::only(RenderLayer::Base));
        assert_eq!(Layers::default().bits(), 1);
    }

    #[test]
    fn test_set_replaces_membership() {
        let mut mask = Layers::only(RenderLayer::Base);
        mask.set(RenderLayer::Glow);
        assert!(mask.contains(RenderLayer::Glow));
        assert!(!mask.contains(RenderLayer::Base));
    }

    #[test]
    fn test_enable_and_disable() {
        let mut mask = Layers::none();
        mask.enable(RenderLayer::Base);
        mask.enable(RenderLayer::Glow);
        assert_eq!(mask.bits(), 0b11);
        mask.disable(RenderLayer::Base);
        assert_eq!(mask, Layers::only(RenderLayer::Glow));
    }

    #[test]
    fn test_intersects() {
        let glow = Layers::only(RenderLayer::Glow);
        let base = Layers::only(RenderLayer::Base);
        assert!(!glow.intersects(base));
        assert!(glow.intersects(glow));
        assert!(!Layers::none().intersects(glow));
    }
}
