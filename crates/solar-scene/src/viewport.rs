//! Output viewport in physical pixels.
//!
//! Resize events from the window feed [`Viewport::handle_resize`], which
//! clamps to at least 1×1 and reports a change only when the size actually
//! moved. Repeating a resize is therefore a no-op.

/// Smallest dimension a viewport is allowed to take.
pub const MIN_DIMENSION: u32 = 1;

/// Width and height in physical pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhysicalSize {
    pub width: u32,
    pub height: u32,
}

impl PhysicalSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(MIN_DIMENSION),
            height: height.max(MIN_DIMENSION),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// Current drawable size plus device pixel ratio.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    size: PhysicalSize,
    /// Physical pixels per logical pixel.
    scale_factor: f64,
}

impl Viewport {
    pub fn new(physical_width: u32, physical_height: u32, scale_factor: f64) -> Self {
        Self {
            size: PhysicalSize::new(physical_width, physical_height),
            scale_factor: sanitize_scale(scale_factor),
        }
    }

    /// Build from a logical size and a device pixel ratio.
    pub fn from_logical(width: f64, height: f64, pixel_ratio: f64) -> Self {
        let ratio = sanitize_scale(pixel_ratio);
        Self::new(
            (width * ratio).round() as u32,
            (height * ratio).round() as u32,
            ratio,
        )
    }

    /// Apply a new physical size. Returns the new size if it changed.
    pub fn handle_resize(&mut self, physical_width: u32, physical_height: u32) -> Option<PhysicalSize> {
        let size = PhysicalSize::new(physical_width, physical_height);
        if size == self.size {
            return None;
        }
        self.size = size;
        Some(size)
    }

    /// Apply a new device pixel ratio together with the resulting size.
    pub fn handle_scale_factor_changed(
        &mut self,
        scale_factor: f64,
        physical_width: u32,
        physical_height: u32,
    ) -> Option<PhysicalSize> {
        self.scale_factor = sanitize_scale(scale_factor);
        self.handle_resize(physical_width, physical_height)
    }

    pub fn size(&self) -> PhysicalSize {
        self.size
    }

    pub fn aspect(&self) -> f32 {
        self.size.aspect()
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn logical_size(&self) -> (f64, f64) {
        (
            self.size.width as f64 / self.scale_factor,
            self.size.height as f64 / self.scale_factor,
        )
    }
}

/// A missing or nonsensical ratio counts as 1.
fn sanitize_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale > 0.0 { scale } else { 1.0 }
}
