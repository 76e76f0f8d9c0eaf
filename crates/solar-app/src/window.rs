//! Window creation and event handling via winit.
//!
//! [`AppState`] owns everything the viewer needs (config, scene, animator,
//! orbit controls, GPU context and renderer) and implements winit's
//! [`ApplicationHandler`]. Every redraw advances the animation, applies the
//! frame's mouse gesture to the camera, draws, and requests the next redraw.

use std::sync::Arc;

use solar_config::Config;
use solar_render::{
    RenderContext, RenderContextError, SceneRenderer, SurfaceError, init_render_context_blocking,
};
use solar_scene::{Animator, OrbitControls, PhysicalSize, SolarSystem, Viewport};
use tracing::{debug, error, info, trace, warn};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

use crate::frame_clock::FrameClock;
use crate::input::MouseState;
use crate::settings;

/// Returns [`WindowAttributes`] based on the given configuration.
pub fn window_attributes_from_config(config: &Config) -> WindowAttributes {
    WindowAttributes::default()
        .with_title(config.window.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(
            config.window.width as f64,
            config.window.height as f64,
        ))
        .with_fullscreen(
            config
                .window
                .fullscreen
                .then_some(Fullscreen::Borderless(None)),
        )
}

/// Application context: built once, owns the scene and every GPU resource.
pub struct AppState {
    config: Config,
    window: Option<Arc<Window>>,
    gpu: Option<RenderContext>,
    renderer: Option<SceneRenderer>,
    system: SolarSystem,
    animator: Animator,
    controls: OrbitControls,
    viewport: Viewport,
    mouse: MouseState,
    clock: FrameClock,
}

impl AppState {
    /// Build the scene for the configured window size. GPU state is created
    /// later, once the event loop hands out a window.
    pub fn new(config: Config) -> Self {
        let viewport = Viewport::from_logical(
            f64::from(config.window.width),
            f64::from(config.window.height),
            1.0,
        );
        let system = SolarSystem::build(&settings::scene_params(&config), &viewport);
        let animator = Animator::new(settings::animation_deltas(&config));
        let clock = FrameClock::new(config.animation.tick_source);

        Self {
            config,
            window: None,
            gpu: None,
            renderer: None,
            system,
            animator,
            controls: OrbitControls::default(),
            viewport,
            mouse: MouseState::new(),
            clock,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn system(&self) -> &SolarSystem {
        &self.system
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    /// Apply a new physical window size to the camera, surface, depth buffer
    /// and bloom targets. Repeating the current size does nothing.
    pub fn handle_resize(&mut self, width: u32, height: u32) {
        if let Some(size) = self.viewport.handle_resize(width, height) {
            self.apply_size(size);
            info!("Window resized to {}x{}", size.width, size.height);
        }
    }

    /// Record a new device pixel ratio together with the resulting size.
    pub fn handle_scale_factor_changed(&mut self, scale_factor: f64, width: u32, height: u32) {
        if let Some(size) = self
            .viewport
            .handle_scale_factor_changed(scale_factor, width, height)
        {
            self.apply_size(size);
        }
        info!(
            "Scale factor changed to {:.2}, surface {}x{}",
            self.viewport.scale_factor(),
            self.viewport.size().width,
            self.viewport.size().height
        );
    }

    fn apply_size(&mut self, size: PhysicalSize) {
        self.system.resize(size);
        if let Some(gpu) = &mut self.gpu {
            gpu.resize(size.width, size.height);
            let (w, h) = gpu.size();
            if let Some(renderer) = &mut self.renderer {
                renderer.resize(&gpu.device, w, h);
            }
        }
    }

    /// Advance the scene by this frame's ticks and apply the mouse gesture.
    /// Returns the number of ticks applied.
    pub fn update(&mut self) -> u32 {
        let ticks = self.clock.tick();
        self.animator.step(&mut self.system, ticks);

        let input = self.mouse.orbit_input();
        let fov = self
            .system
            .camera()
            .map_or(std::f32::consts::FRAC_PI_3, |c| c.fov_y_radians());
        let height = self.viewport.size().height;
        if let Some(camera) = self.system.graph.get_mut(self.system.camera)
            && self.controls.update(&mut camera.transform, fov, height, &input)
        {
            trace!(position = ?camera.transform.position, "orbit controls moved camera");
        }
        ticks
    }

    fn initialize_rendering(&mut self, window: Arc<Window>) -> Result<(), RenderContextError> {
        let gpu = init_render_context_blocking(window, self.config.window.vsync)?;
        let renderer = SceneRenderer::new(&gpu, &self.system, &settings::renderer_settings(&self.config));
        self.gpu = Some(gpu);
        self.renderer = Some(renderer);
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        self.update();

        if let (Some(gpu), Some(renderer)) = (&self.gpu, &self.renderer) {
            match renderer.render(gpu, &mut self.system) {
                Ok(()) => {}
                Err(SurfaceError::Reconfigured) => debug!("Surface reconfigured, frame skipped"),
                Err(SurfaceError::OutOfMemory) => {
                    error!("Surface out of memory, shutting down");
                    event_loop.exit();
                }
                Err(e) => warn!("Frame skipped: {e}"),
            }
        }

        self.mouse.clear_transients();
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match event_loop.create_window(window_attributes_from_config(&self.config)) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Window creation failed: {e}");
                event_loop.exit();
                return;
            }
        };

        let inner = window.inner_size();
        self.viewport = Viewport::new(inner.width, inner.height, window.scale_factor());
        self.system.resize(self.viewport.size());
        info!(
            "Window created: {}x{} (scale: {:.2})",
            inner.width,
            inner.height,
            window.scale_factor()
        );

        if let Err(e) = self.initialize_rendering(window.clone()) {
            error!("GPU initialization failed: {e}");
            event_loop.exit();
            return;
        }

        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!(
                    ticks = self.animator.ticks(),
                    frames = self.clock.frame_count(),
                    "Close requested, shutting down"
                );
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                self.handle_resize(new_size.width, new_size.height);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                if let Some(window) = &self.window {
                    let inner = window.inner_size();
                    self.handle_scale_factor_changed(scale_factor, inner.width, inner.height);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse.on_cursor_moved(position.x, position.y);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.mouse.on_button(button, state);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.mouse.on_scroll(delta);
            }
            WindowEvent::CursorEntered { .. } => {
                self.mouse.on_cursor_entered();
            }
            WindowEvent::CursorLeft { .. } => {
                self.mouse.on_cursor_left();
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}

/// Open the window and run the event loop until it exits.
pub fn run(config: Config) -> Result<(), winit::error::EventLoopError> {
    let event_loop = EventLoop::new()?;
    let mut app = AppState::new(config);
    event_loop.run_app(&mut app)
}

#[cfg(test)]
mod tests {
    use solar_config::TickSource;
    use solar_scene::RenderLayer;

    use super::*;

    fn app() -> AppState {
        AppState::new(Config::default())
    }

    #[test]
    fn test_initial_camera() {
        let app = app();
        let camera = app.system().camera().expect("camera");
        assert_eq!(camera.aspect, 1280.0 / 720.0);
        assert!(camera.layers.contains(RenderLayer::Base));
        let node = app.system().graph.get(app.system().camera).expect("node");
        assert_eq!(node.transform.position, glam::Vec3::new(8.0, 0.0, 4.0));
    }

    #[test]
    fn test_resize_updates_aspect_exactly() {
        let mut app = app();
        app.handle_resize(1920, 1080);
        let camera = app.system().camera().expect("camera");
        assert_eq!(camera.aspect, 1920.0 / 1080.0);
    }

    #[test]
    fn test_resize_is_idempotent() {
        let mut app = app();
        app.handle_resize(800, 600);
        let first = app.system().camera().expect("camera").clone();
        app.handle_resize(800, 600);
        assert_eq!(app.system().camera().expect("camera"), &first);
        assert_eq!(app.viewport().size(), PhysicalSize::new(800, 600));
    }

    #[test]
    fn test_zero_size_resize_tolerated() {
        let mut app = app();
        app.handle_resize(0, 0);
        let camera = app.system().camera().expect("camera");
        assert!(camera.aspect.is_finite());
        assert_eq!(camera.aspect, 1.0);
    }

    #[test]
    fn test_scale_factor_change_tracked() {
        let mut app = app();
        app.handle_scale_factor_changed(2.0, 2560, 1440);
        assert_eq!(app.viewport().scale_factor(), 2.0);
        assert_eq!(app.viewport().logical_size(), (1280.0, 720.0));
    }

    #[test]
    fn test_update_per_redraw_steps_one_tick() {
        let mut app = app();
        assert_eq!(app.config().animation.tick_source, TickSource::PerRedraw);
        assert_eq!(app.update(), 1);
        assert_eq!(app.update(), 1);
        assert_eq!(app.animator().ticks(), 2);
    }

    #[test]
    fn test_window_attributes_from_config() {
        let mut config = Config::default();
        config.window.title = "Orrery".into();
        let attrs = window_attributes_from_config(&config);
        assert_eq!(attrs.title, "Orrery");
        assert!(attrs.fullscreen.is_none());
    }
}
