//! GPU terrain and ocean simulation.
//!
//! The simulation state lives entirely in half-float ping-pong textures:
//! a terrain/water/sediment field, a water flux field, and a half-resolution
//! shadow field. Each frame runs a fixed sequence of fullscreen fragment
//! passes over them; island generation runs exactly once at startup.

pub mod field;
pub mod pipeline;
pub mod stability;
pub mod sun;

pub use field::SimulationField;
pub use pipeline::{ErosionPipeline, PassKind, SimParams, StepContext, step_plan};
pub use stability::{StabilityMonitor, StabilityVerdict};
pub use sun::{SUN_PERIOD_FRAMES, sun_direction};
