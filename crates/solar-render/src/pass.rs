//! Render pass configuration for the layer passes.
//!
//! [`RenderPassBuilder`] captures how a pass treats the color target (clear
//! or load) and the shared depth buffer, so the glow and base passes differ
//! only in their builder.

use crate::depth::DepthBuffer;

/// Transparent black, the scene's default clear color.
pub const TRANSPARENT_BLACK: wgpu::Color = wgpu::Color::TRANSPARENT;

/// Convert a config `[r, g, b, a]` into a wgpu color.
pub fn color_from_rgba(rgba: [f64; 4]) -> wgpu::Color {
    wgpu::Color {
        r: rgba[0],
        g: rgba[1],
        b: rgba[2],
        a: rgba[3],
    }
}

/// What a pass does with existing depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DepthLoad {
    Clear,
    Load,
}

/// Builder for render pass descriptors with a fluent API.
#[derive(Debug, Clone)]
pub struct RenderPassBuilder {
    color_load: wgpu::LoadOp<wgpu::Color>,
    depth: Option<DepthLoad>,
    label: Option<&'static str>,
}

impl Default for RenderPassBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderPassBuilder {
    /// A pass that clears color to transparent black and has no depth.
    pub fn new() -> Self {
        Self {
            color_load: wgpu::LoadOp::Clear(TRANSPARENT_BLACK),
            depth: None,
            label: None,
        }
    }

    pub fn clear_color(mut self, color: wgpu::Color) -> Self {
        self.color_load = wgpu::LoadOp::Clear(color);
        self
    }

    /// Keep the color target's existing contents.
    pub fn load_color(mut self) -> Self {
        self.color_load = wgpu::LoadOp::Load;
        self
    }

    pub fn depth(mut self, load: DepthLoad) -> Self {
        self.depth = Some(load);
        self
    }

    pub fn label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    pub fn color_load(&self) -> wgpu::LoadOp<wgpu::Color> {
        self.color_load
    }

    pub fn depth_load(&self) -> Option<DepthLoad> {
        self.depth
    }

    /// Begin the pass on `encoder`, drawing into `color_view`. The depth
    /// buffer is attached only when the builder asked for depth.
    pub fn begin<'encoder>(
        &self,
        encoder: &'encoder mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        depth: Option<&DepthBuffer>,
    ) -> wgpu::RenderPass<'encoder> {
        let depth_stencil_attachment = match (self.depth, depth) {
            (Some(DepthLoad::Clear), Some(buffer)) => {
                Some(buffer.attachment(wgpu::LoadOp::Clear(DepthBuffer::CLEAR_VALUE)))
            }
            (Some(DepthLoad::Load), Some(buffer)) => Some(buffer.attachment(wgpu::LoadOp::Load)),
            (Some(_), None) => {
                log::warn!("pass {:?} wants depth but none was provided", self.label);
                None
            }
            (None, _) => None,
        };

        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: self.label,
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: self.color_load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_clears_to_transparent_black() {
        let builder = RenderPassBuilder::new();
        assert_eq!(builder.color_load(), wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT));
        assert!(builder.depth_load().is_none());
    }

    #[test]
    fn test_base_pass_loads_color_and_depth() {
        let builder = RenderPassBuilder::new()
            .load_color()
            .depth(DepthLoad::Load)
            .label("base-layer");
        assert_eq!(builder.color_load(), wgpu::LoadOp::Load);
        assert_eq!(builder.depth_load(), Some(DepthLoad::Load));
        assert_eq!(builder.label, Some("base-layer"));
    }

    #[test]
    fn test_clear_color_is_stored() {
        let builder = RenderPassBuilder::new().clear_color(wgpu::Color::RED);
        assert_eq!(builder.color_load(), wgpu::LoadOp::Clear(wgpu::Color::RED));
    }

    #[test]
    fn test_color_from_rgba() {
        let c = color_from_rgba([0.1, 0.2, 0.3, 0.0]);
        assert_eq!((c.r, c.g, c.b, c.a), (0.1, 0.2, 0.3, 0.0));
    }
}
