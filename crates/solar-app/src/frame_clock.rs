//! Turns redraws into animation ticks.
//!
//! [`TickSource::PerRedraw`] yields exactly one tick per redraw, so the
//! animation speed follows the display refresh rate.
//! [`TickSource::Fixed`] accumulates wall-clock frame time and yields as many
//! whole ticks as fit, carrying the remainder into the next frame.

use std::time::Instant;

use solar_config::{MAX_FIXED_HZ, TickSource};
use tracing::warn;

/// Longest frame the fixed-rate clock will account for. A longer stall
/// (window drag, debugger pause) is clamped instead of replayed.
pub const MAX_FRAME_TIME: f64 = 0.25;

pub struct FrameClock {
    source: TickSource,
    previous_time: Instant,
    accumulator: f64,
    frame_count: u64,
}

impl FrameClock {
    pub fn new(source: TickSource) -> Self {
        if let TickSource::Fixed { hz } = source
            && hz > MAX_FIXED_HZ
        {
            warn!("Fixed tick rate {hz} Hz capped at {MAX_FIXED_HZ} Hz");
        }
        Self {
            source,
            previous_time: Instant::now(),
            accumulator: 0.0,
            frame_count: 0,
        }
    }

    /// Measure time since the previous call and return the ticks to apply.
    pub fn tick(&mut self) -> u32 {
        let now = Instant::now();
        let frame_time = now.duration_since(self.previous_time).as_secs_f64();
        self.previous_time = now;
        self.advance(frame_time)
    }

    /// Account for `frame_time` seconds and return the ticks to apply.
    /// A fixed-rate frame never yields more than
    /// `MAX_FRAME_TIME * MAX_FIXED_HZ` ticks.
    pub fn advance(&mut self, frame_time: f64) -> u32 {
        self.frame_count += 1;
        match self.source {
            TickSource::PerRedraw => 1,
            TickSource::Fixed { hz } => {
                let step = fixed_step(hz);
                let mut frame_time = frame_time.max(0.0);
                if frame_time > MAX_FRAME_TIME {
                    warn!(
                        "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
                        frame_time * 1000.0,
                        MAX_FRAME_TIME * 1000.0
                    );
                    frame_time = MAX_FRAME_TIME;
                }
                self.accumulator += frame_time;

                let ticks = (self.accumulator / step).floor();
                self.accumulator -= ticks * step;
                ticks as u32
            }
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

fn fixed_step(hz: u32) -> f64 {
    1.0 / f64::from(hz.clamp(1, MAX_FIXED_HZ))
}
