//! HDR scene target and the final composite pass.
//!
//! Tiles render into a half-float scene target with depth; the composite
//! pass then combines scene color with the simulation's shadow field and
//! tone maps into the window surface. Only these two resources track the
//! window size.

use crate::pingpong::TargetError;
use crate::quad::{FullscreenPass, compose_fullscreen_shader};
use crate::shader::{ShaderError, ShaderLibrary};
use crate::uniforms::{UniformBlock, UniformError, UniformKind, UniformLayout};
use islet_log::Notifier;

/// WGSL fragment source for the composite pass.
pub const COMPOSITE_FRAGMENT_WGSL: &str = include_str!("shaders/composite.wgsl");

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const SCENE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Window-sized HDR color + depth pair the tile pass renders into.
pub struct SceneTarget {
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth: wgpu::Texture,
    depth_view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl SceneTarget {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Result<Self, TargetError> {
        let scope = device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

        let make = |label: &str, format: wgpu::TextureFormat| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: width.max(1),
                    height: height.max(1),
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
        };
        let color = make("scene-color", SCENE_FORMAT);
        let depth = make("scene-depth", DEPTH_FORMAT);

        if let Some(error) = pollster::block_on(scope.pop()) {
            return Err(TargetError::Allocation {
                label: "scene".to_string(),
                width,
                height,
                message: error.to_string(),
            });
        }

        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self {
            color,
            color_view,
            depth,
            depth_view,
            width: width.max(1),
            height: height.max(1),
        })
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        SCENE_FORMAT
    }

    pub fn depth_format(&self) -> wgpu::TextureFormat {
        DEPTH_FORMAT
    }

    pub fn color_view(&self) -> &wgpu::TextureView {
        &self.color_view
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_view
    }

    /// Recreate both textures at the new window size.
    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> Result<(), TargetError> {
        if width.max(1) == self.width && height.max(1) == self.height {
            return Ok(());
        }
        let next = Self::new(device, width, height)?;
        self.color.destroy();
        self.depth.destroy();
        *self = next;
        Ok(())
    }

    /// Attachments for the tile pass, clearing both targets.
    pub fn attachments(
        &self,
        clear: wgpu::Color,
    ) -> (
        wgpu::RenderPassColorAttachment<'_>,
        wgpu::RenderPassDepthStencilAttachment<'_>,
    ) {
        (
            wgpu::RenderPassColorAttachment {
                view: &self.color_view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
            },
            wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            },
        )
    }
}

/// Fullscreen pass combining scene color and shadow into the surface.
pub struct CompositePass {
    pass: FullscreenPass,
    uniforms: UniformBlock,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

impl CompositePass {
    pub fn new(
        device: &wgpu::Device,
        library: &mut ShaderLibrary,
        notifier: &dyn Notifier,
        surface_format: wgpu::TextureFormat,
    ) -> Result<Self, ShaderError> {
        let source = compose_fullscreen_shader(COMPOSITE_FRAGMENT_WGSL);
        let module = library.load_from_source(device, notifier, "composite", &source)?;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("composite-bind-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pass = FullscreenPass::new(
            device,
            "composite",
            &module,
            surface_format,
            &[&bind_group_layout],
        );

        let layout = UniformLayout::new("composite-uniforms")
            .with("u_resolution", UniformKind::Vec2)
            .with("u_zoom", UniformKind::F32)
            .with("u_time", UniformKind::F32)
            .with("u_sun_direction", UniformKind::Vec3)
            .with("u_shadow_strength", UniformKind::F32);
        let uniforms = UniformBlock::new(device, layout);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("composite-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        Ok(Self {
            pass,
            uniforms,
            bind_group_layout,
            sampler,
        })
    }

    /// Stage per-frame uniform values; flushed on encode.
    pub fn set_frame_uniforms(
        &mut self,
        resolution: [f32; 2],
        zoom: f32,
        time: f32,
        sun_direction: [f32; 3],
        shadow_strength: f32,
    ) -> Result<(), UniformError> {
        self.uniforms.set_vec2("u_resolution", resolution)?;
        self.uniforms.set_f32("u_zoom", zoom)?;
        self.uniforms.set_f32("u_time", time)?;
        self.uniforms.set_vec3("u_sun_direction", sun_direction)?;
        self.uniforms.set_f32("u_shadow_strength", shadow_strength)?;
        Ok(())
    }

    /// Record the composite draw into the surface view.
    pub fn encode(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        scene_view: &wgpu::TextureView,
        shadow_view: &wgpu::TextureView,
    ) {
        self.uniforms.upload(queue);

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("composite-bind-group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniforms.buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(scene_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(shadow_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        self.pass.encode(
            encoder,
            "composite",
            wgpu::RenderPassColorAttachment {
                view: surface_view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            },
            &[&bind_group],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::test_support::create_test_device;
    use islet_log::LogNotifier;

    /// SceneTarget clamps degenerate sizes and reports its formats.
    #[test]
    fn test_scene_target_creation_and_resize() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let mut scene = SceneTarget::new(&device, 320, 240).unwrap();
        assert_eq!(scene.format(), wgpu::TextureFormat::Rgba16Float);
        assert_eq!(scene.depth_format(), wgpu::TextureFormat::Depth32Float);

        scene.resize(&device, 640, 480).unwrap();
        assert_eq!((scene.width, scene.height), (640, 480));

        // Same-size resize is a no-op.
        scene.resize(&device, 640, 480).unwrap();

        scene.resize(&device, 0, 0).unwrap();
        assert_eq!((scene.width, scene.height), (1, 1));
    }

    /// The composite shader compiles against the shared vertex prelude and
    /// the pass builds end to end.
    #[test]
    fn test_composite_pass_builds_and_encodes() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let mut library = ShaderLibrary::new();
        let mut composite = CompositePass::new(
            &device,
            &mut library,
            &LogNotifier,
            wgpu::TextureFormat::Rgba8Unorm,
        )
        .unwrap();

        composite
            .set_frame_uniforms([320.0, 240.0], 1.0, 0.0, [0.3, 0.8, 0.5], 0.6)
            .unwrap();

        let scene = SceneTarget::new(&device, 320, 240).unwrap();
        let shadow = crate::pingpong::PingPongTarget::new(
            &device,
            "shadow",
            160,
            120,
            crate::pingpong::TargetFormat::HalfFloatR,
        )
        .unwrap();
        let output = crate::pingpong::PingPongTarget::new(
            &device,
            "output",
            320,
            240,
            crate::pingpong::TargetFormat::ByteRgba,
        )
        .unwrap();

        let mut encoder = device.create_command_encoder(&Default::default());
        composite.encode(
            &device,
            &queue,
            &mut encoder,
            output.write_view(),
            scene.color_view(),
            shadow.read_view(),
        );
        queue.submit([encoder.finish()]);
    }
}
