//! Sun animation.
//!
//! The sun circles the island once per [`SUN_PERIOD_FRAMES`], dipping low
//! but never below the horizon so the shadow march always has a direction
//! to walk.

/// Frames for one full sun revolution at the nominal frame rate.
pub const SUN_PERIOD_FRAMES: u64 = 3600;

const MIN_ELEVATION: f32 = 0.25;
const MAX_ELEVATION: f32 = 0.85;

/// Unit sun direction for a given frame.
pub fn sun_direction(frame: u64) -> [f32; 3] {
    let phase = (frame % SUN_PERIOD_FRAMES) as f32 / SUN_PERIOD_FRAMES as f32;
    let angle = phase * std::f32::consts::TAU;

    // Elevation swings twice per revolution, like a compressed day cycle.
    let elevation =
        MIN_ELEVATION + (MAX_ELEVATION - MIN_ELEVATION) * (0.5 + 0.5 * (2.0 * angle).sin());

    let horizontal = (1.0 - elevation * elevation).sqrt();
    [
        angle.cos() * horizontal,
        elevation,
        angle.sin() * horizontal,
    ]
}
