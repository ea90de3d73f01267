//! Simulation state textures.
//!
//! Channel layout of the data field: r = terrain height, g = water depth,
//! b = suspended sediment, a = rock hardness. The flux field holds water
//! outflow toward the four neighbors (left, right, down, up). Shadow is a
//! single half-float channel at half the simulation resolution.

use islet_render::{PingPongTarget, TargetError, TargetFormat};

/// The three ping-pong fields the simulation passes read and write.
pub struct SimulationField {
    resolution: u32,
    data: PingPongTarget,
    flux: PingPongTarget,
    shadow: PingPongTarget,
}

impl SimulationField {
    /// Allocate all fields up front; any failure aborts startup.
    pub fn new(device: &wgpu::Device, resolution: u32) -> Result<Self, TargetError> {
        let shadow_res = (resolution / 2).max(1);
        Ok(Self {
            resolution,
            data: PingPongTarget::new(
                device,
                "sim-data",
                resolution,
                resolution,
                TargetFormat::HalfFloatRgba,
            )?,
            flux: PingPongTarget::new(
                device,
                "sim-flux",
                resolution,
                resolution,
                TargetFormat::HalfFloatRgba,
            )?,
            shadow: PingPongTarget::new(
                device,
                "sim-shadow",
                shadow_res,
                shadow_res,
                TargetFormat::HalfFloatR,
            )?,
        })
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn data(&self) -> &PingPongTarget {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut PingPongTarget {
        &mut self.data
    }

    pub fn flux(&self) -> &PingPongTarget {
        &self.flux
    }

    pub fn flux_mut(&mut self) -> &mut PingPongTarget {
        &mut self.flux
    }

    pub fn shadow(&self) -> &PingPongTarget {
        &self.shadow
    }

    pub fn shadow_mut(&mut self) -> &mut PingPongTarget {
        &mut self.shadow
    }

    /// Release all GPU textures.
    pub fn destroy(&mut self) -> Result<(), TargetError> {
        self.data.destroy()?;
        self.flux.destroy()?;
        self.shadow.destroy()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use islet_render::gpu::test_support::create_test_device;

    /// Shadow is allocated at half the simulation resolution.
    #[test]
    fn test_field_sizes() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let field = SimulationField::new(&device, 256).unwrap();
        assert_eq!(field.data().width(), 256);
        assert_eq!(field.flux().width(), 256);
        assert_eq!(field.shadow().width(), 128);
        assert_eq!(field.shadow().format(), TargetFormat::HalfFloatR);
    }

    /// Destroying the field twice reports an error from the first target.
    #[test]
    fn test_field_destroy_once() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let mut field = SimulationField::new(&device, 64).unwrap();
        assert!(field.destroy().is_ok());
        assert!(field.destroy().is_err());
    }
}
