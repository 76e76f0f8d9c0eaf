//! Solar system viewer: window, event handling and the redraw loop.

pub mod frame_clock;
pub mod input;
pub mod platform;
pub mod settings;
pub mod window;

pub use window::{AppState, run};
