//! Double-buffered render targets for iterative simulation passes.
//!
//! Each simulation field keeps two textures of the same size and format.
//! A pass samples the read texture and renders into the write texture, then
//! [`PingPongTarget::swap`] exchanges the roles. Swapping moves an index,
//! never the texture handles, so bind groups built against a role stay valid
//! for that role.

use thiserror::Error;

/// Errors from target allocation and teardown.
#[derive(Debug, Error)]
pub enum TargetError {
    /// The device refused the allocation.
    #[error("failed to allocate target '{label}' ({width}x{height}): {message}")]
    Allocation {
        label: String,
        width: u32,
        height: u32,
        message: String,
    },

    /// destroy() was called more than once.
    #[error("target '{label}' already destroyed")]
    AlreadyDestroyed { label: String },
}

/// Pixel formats the simulation fields use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    /// 8-bit normalized RGBA, for display-ready data.
    ByteRgba,
    /// Half-float RGBA, the main simulation state format.
    HalfFloatRgba,
    /// Half-float single channel, for scalar fields like shadow.
    HalfFloatR,
}

impl TargetFormat {
    pub fn texture_format(self) -> wgpu::TextureFormat {
        match self {
            TargetFormat::ByteRgba => wgpu::TextureFormat::Rgba8Unorm,
            TargetFormat::HalfFloatRgba => wgpu::TextureFormat::Rgba16Float,
            TargetFormat::HalfFloatR => wgpu::TextureFormat::R16Float,
        }
    }

    /// Bytes per pixel, used when sizing readback buffers.
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            TargetFormat::ByteRgba => 4,
            TargetFormat::HalfFloatRgba => 8,
            TargetFormat::HalfFloatR => 2,
        }
    }
}

/// Which of the two internal textures currently holds the readable state.
///
/// Kept separate from the GPU resources so the swap protocol is testable
/// without a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Roles {
    read: usize,
}

impl Roles {
    pub(crate) fn new() -> Self {
        Self { read: 0 }
    }

    pub(crate) fn read(self) -> usize {
        self.read
    }

    pub(crate) fn write(self) -> usize {
        1 - self.read
    }

    pub(crate) fn swap(&mut self) {
        self.read = 1 - self.read;
    }
}

struct Target {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// A pair of same-shaped render targets with read/write roles.
pub struct PingPongTarget {
    label: String,
    targets: [Target; 2],
    roles: Roles,
    width: u32,
    height: u32,
    format: TargetFormat,
    destroyed: bool,
}

impl PingPongTarget {
    /// Allocate both textures up front.
    ///
    /// Allocation runs inside an out-of-memory error scope so an oversized
    /// request fails here with a clear message instead of surfacing later as
    /// an uncaptured device error.
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
        format: TargetFormat,
    ) -> Result<Self, TargetError> {
        let scope = device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

        let make_target = |index: usize| {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some(&format!("{label}-{index}")),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: format.texture_format(),
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            Target { texture, view }
        };
        let targets = [make_target(0), make_target(1)];

        if let Some(error) = pollster::block_on(scope.pop()) {
            return Err(TargetError::Allocation {
                label: label.to_string(),
                width,
                height,
                message: error.to_string(),
            });
        }

        Ok(Self {
            label: label.to_string(),
            targets,
            roles: Roles::new(),
            width,
            height,
            format,
            destroyed: false,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> TargetFormat {
        self.format
    }

    /// View holding the state produced by the previous pass.
    pub fn read_view(&self) -> &wgpu::TextureView {
        &self.targets[self.roles.read()].view
    }

    /// View the next pass renders into.
    pub fn write_view(&self) -> &wgpu::TextureView {
        &self.targets[self.roles.write()].view
    }

    /// Texture currently holding readable state, for readback copies.
    pub fn read_texture(&self) -> &wgpu::Texture {
        &self.targets[self.roles.read()].texture
    }

    /// Index of the current read role, for selecting pre-built bind groups.
    pub fn read_index(&self) -> usize {
        self.roles.read()
    }

    /// Exchange read and write roles after a pass has rendered.
    pub fn swap(&mut self) {
        self.roles.swap();
    }

    /// Color attachment targeting the write texture, cleared or loaded.
    pub fn write_attachment(&self, load: wgpu::LoadOp<wgpu::Color>) -> wgpu::RenderPassColorAttachment<'_> {
        wgpu::RenderPassColorAttachment {
            view: self.write_view(),
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
        }
    }

    /// Release both textures.
    ///
    /// Calling twice is an error rather than a silent no-op, so lifecycle
    /// bugs in the caller surface immediately.
    pub fn destroy(&mut self) -> Result<(), TargetError> {
        if self.destroyed {
            return Err(TargetError::AlreadyDestroyed {
                label: self.label.clone(),
            });
        }
        for target in &self.targets {
            target.texture.destroy();
        }
        self.destroyed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::test_support::create_test_device;

    /// Roles alternate strictly: after each swap the old write texture is
    /// the new read texture.
    #[test]
    fn test_roles_alternate() {
        let mut roles = Roles::new();
        assert_eq!((roles.read(), roles.write()), (0, 1));
        roles.swap();
        assert_eq!((roles.read(), roles.write()), (1, 0));
        roles.swap();
        assert_eq!((roles.read(), roles.write()), (0, 1));
        roles.swap();
        assert_eq!((roles.read(), roles.write()), (1, 0));
    }

    /// Read and write never alias.
    #[test]
    fn test_roles_never_alias() {
        let mut roles = Roles::new();
        for _ in 0..8 {
            assert_ne!(roles.read(), roles.write());
            roles.swap();
        }
    }

    #[test]
    fn test_format_mapping() {
        assert_eq!(
            TargetFormat::HalfFloatRgba.texture_format(),
            wgpu::TextureFormat::Rgba16Float
        );
        assert_eq!(
            TargetFormat::HalfFloatR.texture_format(),
            wgpu::TextureFormat::R16Float
        );
        assert_eq!(
            TargetFormat::ByteRgba.texture_format(),
            wgpu::TextureFormat::Rgba8Unorm
        );
        assert_eq!(TargetFormat::HalfFloatRgba.bytes_per_pixel(), 8);
        assert_eq!(TargetFormat::HalfFloatR.bytes_per_pixel(), 2);
    }

    /// Allocation succeeds at simulation size and the two views are distinct
    /// objects that trade places on swap.
    #[test]
    fn test_swap_exchanges_views() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let mut target =
            PingPongTarget::new(&device, "test-field", 64, 64, TargetFormat::HalfFloatRgba)
                .unwrap();

        assert_eq!(target.read_index(), 0);
        target.swap();
        assert_eq!(target.read_index(), 1);
        target.swap();
        assert_eq!(target.read_index(), 0);
    }

    /// Double destroy is a reported error, not a crash.
    #[test]
    fn test_double_destroy_is_reportable() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let mut target =
            PingPongTarget::new(&device, "test-field", 16, 16, TargetFormat::HalfFloatR).unwrap();

        assert!(target.destroy().is_ok());
        assert!(matches!(
            target.destroy(),
            Err(TargetError::AlreadyDestroyed { .. })
        ));
    }
}
