//! Input handling: pure event-to-state translation.
//!
//! Nothing here simulates anything. Winit events are folded into
//! frame-coherent keyboard/pointer state, and [`CameraController`] turns that
//! state into a camera pose plus the rain flag, published once per frame as an
//! immutable [`FrameInputs`] snapshot.

mod camera;
mod keyboard;
mod pointer;

pub use camera::{CameraController, CameraState, FrameInputs, ZoomLimits};
pub use keyboard::{KeyboardState, RawKeyEvent};
pub use pointer::PointerState;
