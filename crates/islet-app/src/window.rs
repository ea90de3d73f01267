//! Window creation and event handling via winit.
//!
//! [`App`] implements winit's [`ApplicationHandler`]: it owns the input
//! state, the render gate, and the frame driver, and translates window events
//! into per-frame snapshots. [`run`] starts the event loop and reports any
//! fatal error back to `main`.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use islet_config::Config;
use islet_input::{CameraController, KeyboardState, PointerState, ZoomLimits};

use crate::cancel::RenderGate;
use crate::frame::{FrameDriver, FrameError};

/// Errors that end the application with a non-zero exit.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("{0}")]
    Fatal(String),
}

/// Window attributes derived from config.
pub fn window_attributes_from_config(config: &Config) -> WindowAttributes {
    WindowAttributes::default()
        .with_title(config.window.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(
            f64::from(config.window.width),
            f64::from(config.window.height),
        ))
}

/// Application state driving the whole session.
pub struct App {
    config: Config,
    window: Option<Arc<Window>>,
    driver: Option<FrameDriver>,
    keyboard: KeyboardState,
    pointer: PointerState,
    controller: CameraController,
    gate: RenderGate,
    last_frame: Instant,
    fatal: Option<String>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let controller = CameraController::new(
            ZoomLimits {
                min: config.input.zoom_min,
                max: config.input.zoom_max,
            },
            config.input.pan_sensitivity,
            config.input.key_pan_speed,
        );
        Self {
            config,
            window: None,
            driver: None,
            keyboard: KeyboardState::new(),
            pointer: PointerState::new(),
            controller,
            gate: RenderGate::new(),
            last_frame: Instant::now(),
            fatal: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, message: String) {
        error!("{message}");
        self.gate.close();
        self.fatal = Some(message);
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        if !self.gate.is_open() {
            return;
        }
        let Some(driver) = self.driver.as_mut() else {
            return;
        };

        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32().min(0.25);
        self.last_frame = now;

        let inputs = self.controller.update(&self.keyboard, &self.pointer, dt);
        let result = driver.render(&inputs, dt);
        self.keyboard.clear_transients();
        self.pointer.clear_transients();

        match result {
            Ok(()) => {
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            Err(FrameError::Surface(e)) => {
                // Context loss is terminal; restart the app to resume.
                self.fail(event_loop, format!("render surface failed: {e}"));
            }
            Err(FrameError::Uniform(e)) => {
                self.fail(event_loop, format!("uniform write failed: {e}"));
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.driver.is_some() {
            return;
        }

        let attributes = window_attributes_from_config(&self.config);
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(event_loop, format!("window creation failed: {e}"));
                return;
            }
        };

        match FrameDriver::new(window.clone(), &self.config) {
            Ok(driver) => {
                info!("render context ready");
                self.driver = Some(driver);
                self.last_frame = Instant::now();
                window.request_redraw();
                self.window = Some(window);
            }
            Err(e) => {
                self.fail(event_loop, format!("startup failed: {e}"));
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("close requested");
                self.gate.close();
                if let Some(driver) = self.driver.as_mut() {
                    driver.shutdown();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(driver) = self.driver.as_mut()
                    && let Err(e) = driver.resize(size.width, size.height)
                {
                    self.fail(event_loop, format!("resize failed: {e}"));
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.keyboard.process_event(&event);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.pointer.on_cursor_moved(position.x, position.y);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.pointer.on_button(button, state);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.pointer.on_scroll(delta);
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }
            _ => {}
        }
    }
}

/// Run the application to completion.
pub fn run(config: Config) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.fatal {
        Some(message) => Err(AppError::Fatal(message)),
        None => Ok(()),
    }
}
