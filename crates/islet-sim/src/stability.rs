//! Periodic numerical stability check.
//!
//! Explicit grid simulations can blow up silently: heights shoot past any
//! physical bound or turn NaN while the screen just looks wrong. Every few
//! hundred frames the monitor reads the data field back, decodes the
//! half-float height channel, and raises a notification when the field has
//! left its sane range.

use half::f16;
use islet_log::Notifier;

use crate::field::SimulationField;

/// Outcome of scanning the height field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StabilityVerdict {
    Stable { max_height: f32 },
    NonFinite,
    OutOfRange { max_height: f32 },
}

impl StabilityVerdict {
    pub fn is_stable(self) -> bool {
        matches!(self, StabilityVerdict::Stable { .. })
    }
}

/// Scan RGBA16F rows for non-finite or out-of-bound heights.
///
/// `bytes` is a mapped readback buffer with `padded_row` bytes per row; only
/// the r channel (terrain height) is inspected.
fn scan_heights(
    bytes: &[u8],
    width: u32,
    height: u32,
    padded_row: u32,
    height_bound: f32,
) -> StabilityVerdict {
    let mut max_seen = 0.0f32;
    for row in 0..height {
        let start = (row * padded_row) as usize;
        let row_bytes = &bytes[start..start + (width * 8) as usize];
        for pixel in row_bytes.chunks_exact(8) {
            let h = f16::from_le_bytes([pixel[0], pixel[1]]).to_f32();
            if !h.is_finite() {
                return StabilityVerdict::NonFinite;
            }
            max_seen = max_seen.max(h.abs());
        }
    }
    if max_seen > height_bound {
        StabilityVerdict::OutOfRange {
            max_height: max_seen,
        }
    } else {
        StabilityVerdict::Stable {
            max_height: max_seen,
        }
    }
}

/// Schedules and runs the readback check.
pub struct StabilityMonitor {
    interval: u32,
    height_bound: f32,
}

impl StabilityMonitor {
    /// `interval` is in frames; `height_bound` is the largest plausible
    /// terrain magnitude, some slack above the generator's maximum.
    pub fn new(interval: u32, height_bound: f32) -> Self {
        Self {
            interval: interval.max(1),
            height_bound,
        }
    }

    /// Whether this frame is a check frame.
    pub fn due(&self, frame: u64) -> bool {
        frame > 0 && frame % u64::from(self.interval) == 0
    }

    /// Read the data field back and scan it, notifying on instability.
    ///
    /// This stalls on the GPU; it only runs on check frames.
    pub fn check(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        field: &SimulationField,
        notifier: &dyn Notifier,
    ) -> StabilityVerdict {
        let width = field.data().width();
        let height = field.data().height();
        let bytes_per_pixel = field.data().format().bytes_per_pixel();
        let unpadded = width * bytes_per_pixel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("stability-readback"),
            size: u64::from(padded * height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("stability-copy"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: field.data().read_texture(),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        queue.submit([encoder.finish()]);

        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        });

        let verdict = match rx.recv() {
            Ok(Ok(())) => {
                let mapped = slice.get_mapped_range();
                scan_heights(&mapped, width, height, padded, self.height_bound)
            }
            _ => {
                log::warn!("stability readback mapping failed; skipping check");
                return StabilityVerdict::Stable { max_height: 0.0 };
            }
        };

        match verdict {
            StabilityVerdict::NonFinite => {
                notifier.notify("simulation unstable: non-finite heights detected");
            }
            StabilityVerdict::OutOfRange { max_height } => {
                notifier.notify(&format!(
                    "simulation unstable: height {max_height:.1} exceeds bound {:.1}",
                    self.height_bound
                ));
            }
            StabilityVerdict::Stable { .. } => {}
        }
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_row(heights: &[f32], padded_row: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; padded_row];
        for (i, &h) in heights.iter().enumerate() {
            let pixel = &mut bytes[i * 8..i * 8 + 8];
            pixel[0..2].copy_from_slice(&f16::from_f32(h).to_le_bytes());
            // g/b/a left zero
        }
        bytes
    }

    /// In-range heights scan as stable and report the observed maximum.
    #[test]
    fn test_scan_stable() {
        let bytes = encode_row(&[0.5, -1.5, 2.0, 0.0], 256);
        let verdict = scan_heights(&bytes, 4, 1, 256, 4.0);
        assert!(verdict.is_stable());
        assert_eq!(verdict, StabilityVerdict::Stable { max_height: 2.0 });
    }

    /// A NaN anywhere in the field is reported before any range check.
    #[test]
    fn test_scan_non_finite() {
        let bytes = encode_row(&[0.5, f32::NAN, 100.0], 256);
        assert_eq!(
            scan_heights(&bytes, 3, 1, 256, 4.0),
            StabilityVerdict::NonFinite
        );
    }

    /// Heights beyond the bound are out of range, sign ignored.
    #[test]
    fn test_scan_out_of_range() {
        let bytes = encode_row(&[-9.0], 256);
        assert_eq!(
            scan_heights(&bytes, 1, 1, 256, 4.0),
            StabilityVerdict::OutOfRange { max_height: 9.0 }
        );
    }

    /// Row padding bytes are never interpreted as pixels.
    #[test]
    fn test_scan_ignores_padding() {
        let mut bytes = encode_row(&[1.0, 1.0], 256);
        // Poison the padding with what would decode as huge values.
        for b in &mut bytes[16..] {
            *b = 0x7b;
        }
        assert!(scan_heights(&bytes, 2, 1, 256, 4.0).is_stable());
    }

    /// The schedule skips frame zero and fires every interval after.
    #[test]
    fn test_due_schedule() {
        let monitor = StabilityMonitor::new(300, 4.0);
        assert!(!monitor.due(0));
        assert!(!monitor.due(1));
        assert!(!monitor.due(299));
        assert!(monitor.due(300));
        assert!(!monitor.due(301));
        assert!(monitor.due(600));
    }

    /// A zero interval is clamped rather than dividing by zero.
    #[test]
    fn test_zero_interval_is_clamped() {
        let monitor = StabilityMonitor::new(0, 4.0);
        assert!(monitor.due(1));
    }
}
