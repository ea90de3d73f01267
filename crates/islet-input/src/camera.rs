//! Camera controller: drag to pan, wheel to zoom, WASD to move.
//!
//! Holds the only writable copy of the camera pose. Consumers never read the
//! controller directly; each frame it publishes an immutable [`FrameInputs`]
//! snapshot so simulation passes cannot observe mid-frame mutation.

use glam::{Vec2, Vec3};
use winit::event::MouseButton;
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::keyboard::KeyboardState;
use crate::pointer::PointerState;

/// Wheel-to-zoom divisor: `zoom *= 1 + wheel_pixels / 1000`.
const ZOOM_WHEEL_SCALE: f32 = 1000.0;

/// Camera pose consumed by the LOD update and the composite pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    /// Point on the ocean plane the camera looks at.
    pub target: Vec3,
    /// View height above the plane, fixed; zoom scales the apparent size.
    pub height: f32,
    /// Zoom factor, always within the configured limits.
    pub zoom: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            height: 10.0,
            zoom: 1.0,
        }
    }
}

impl CameraState {
    /// Camera eye position derived from target and height.
    pub fn eye(&self) -> Vec3 {
        self.target + Vec3::new(0.0, self.height, -self.height)
    }
}

/// Zoom clamp bounds. Extreme zoom is undefined territory for the shading
/// math, so the controller enforces these instead of trusting the input.
#[derive(Debug, Clone, Copy)]
pub struct ZoomLimits {
    pub min: f32,
    pub max: f32,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: 0.05,
            max: 20.0,
        }
    }
}

/// Immutable per-frame input snapshot handed to simulation and rendering.
#[derive(Debug, Clone, Copy)]
pub struct FrameInputs {
    pub camera: CameraState,
    /// Rain key held this frame; modulates the erosion rainfall term.
    pub rain: bool,
    /// Wireframe toggle was pressed this frame.
    pub toggle_wireframe: bool,
}

/// Translates pointer/keyboard state into camera pose once per frame.
#[derive(Debug, Clone)]
pub struct CameraController {
    state: CameraState,
    limits: ZoomLimits,
    pan_sensitivity: f32,
    key_pan_speed: f32,
}

impl CameraController {
    pub fn new(limits: ZoomLimits, pan_sensitivity: f32, key_pan_speed: f32) -> Self {
        Self {
            state: CameraState::default(),
            limits,
            pan_sensitivity,
            key_pan_speed,
        }
    }

    /// Current pose (test accessor; frame consumers use the snapshot).
    pub fn state(&self) -> CameraState {
        self.state
    }

    /// Fold one frame of input into the camera pose and return the snapshot.
    ///
    /// Pan distance is divided by zoom so that panning looks equally fast at
    /// any magnification.
    pub fn update(&mut self, keyboard: &KeyboardState, pointer: &PointerState, dt: f32) -> FrameInputs {
        // Exponential wheel zoom, clamped.
        if pointer.scroll() != 0.0 {
            let factor = 1.0 + pointer.scroll() / ZOOM_WHEEL_SCALE;
            self.state.zoom = (self.state.zoom * factor).clamp(self.limits.min, self.limits.max);
        }

        // Drag pan while the left button is held.
        if pointer.is_pressed(MouseButton::Left) {
            let drag = pointer.delta() * self.pan_sensitivity / self.state.zoom;
            self.state.target += Vec3::new(-drag.x, 0.0, -drag.y);
        }

        // Keyboard pan.
        let dir = key_direction(keyboard);
        if dir != Vec2::ZERO {
            let step = dir.normalize() * self.key_pan_speed * dt / self.state.zoom;
            self.state.target += Vec3::new(step.x, 0.0, step.y);
        }

        FrameInputs {
            camera: self.state,
            rain: keyboard.is_pressed(PhysicalKey::Code(KeyCode::KeyE)),
            toggle_wireframe: keyboard.just_pressed(PhysicalKey::Code(KeyCode::KeyF)),
        }
    }
}

fn key_direction(keyboard: &KeyboardState) -> Vec2 {
    let mut dir = Vec2::ZERO;
    if keyboard.is_pressed(PhysicalKey::Code(KeyCode::KeyW)) {
        dir.y += 1.0;
    }
    if keyboard.is_pressed(PhysicalKey::Code(KeyCode::KeyS)) {
        dir.y -= 1.0;
    }
    if keyboard.is_pressed(PhysicalKey::Code(KeyCode::KeyA)) {
        dir.x -= 1.0;
    }
    if keyboard.is_pressed(PhysicalKey::Code(KeyCode::KeyD)) {
        dir.x += 1.0;
    }
    dir
}
