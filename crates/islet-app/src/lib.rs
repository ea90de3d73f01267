//! Islet application shell.
//!
//! Owns window creation, the winit event loop, and the per-frame driver that
//! ties input, simulation, LOD, and rendering together.

pub mod cancel;
pub mod frame;
pub mod platform;
pub mod window;
