//! Fullscreen quad passes.
//!
//! Every simulation step and the final composite are fragment shaders run
//! over a quad covering the whole target. [`FullscreenPass`] owns one such
//! pipeline; callers supply the fragment stage appended to the shared vertex
//! prelude via [`compose_fullscreen_shader`].

/// Vertex stage shared by all fullscreen passes.
pub const FULLSCREEN_VERTEX_WGSL: &str = include_str!("shaders/fullscreen.wgsl");

/// Prepend the shared fullscreen vertex stage to a fragment-only source.
pub fn compose_fullscreen_shader(fragment_source: &str) -> String {
    format!("{FULLSCREEN_VERTEX_WGSL}\n{fragment_source}")
}

/// A render pipeline that shades every pixel of its target once.
pub struct FullscreenPass {
    pipeline: wgpu::RenderPipeline,
}

impl FullscreenPass {
    /// Build the pipeline for a composed fullscreen shader module.
    ///
    /// `module` must contain both `vs_main` and `fs_main`; sources built with
    /// [`compose_fullscreen_shader`] always do.
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        module: &wgpu::ShaderModule,
        target_format: wgpu::TextureFormat,
        bind_group_layouts: &[&wgpu::BindGroupLayout],
    ) -> Self {
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{label}-layout")),
            bind_group_layouts,
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        Self { pipeline }
    }

    /// Record one fullscreen draw into `attachment` with the given bind
    /// groups in slot order.
    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        attachment: wgpu::RenderPassColorAttachment<'_>,
        bind_groups: &[&wgpu::BindGroup],
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(attachment)],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(&self.pipeline);
        for (slot, group) in bind_groups.iter().enumerate() {
            pass.set_bind_group(slot as u32, *group, &[]);
        }
        pass.draw(0..6, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::test_support::create_test_device;
    use crate::shader::ShaderLibrary;
    use islet_log::LogNotifier;

    const FLAT_FRAGMENT: &str = r#"
        @fragment
        fn fs_main(in: FullscreenOut) -> @location(0) vec4<f32> {
            return vec4<f32>(in.uv, 0.0, 1.0);
        }
    "#;

    /// The composed source carries both entry points.
    #[test]
    fn test_composed_shader_has_both_stages() {
        let source = compose_fullscreen_shader(FLAT_FRAGMENT);
        assert!(source.contains("fn vs_main"));
        assert!(source.contains("fn fs_main"));
    }

    /// A composed fullscreen shader compiles and builds a pipeline.
    #[test]
    fn test_fullscreen_pipeline_builds() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let mut library = ShaderLibrary::new();
        let source = compose_fullscreen_shader(FLAT_FRAGMENT);
        let module = library
            .load_from_source(&device, &LogNotifier, "uv-fill", &source)
            .unwrap();

        let _pass = FullscreenPass::new(
            &device,
            "uv-fill",
            &module,
            wgpu::TextureFormat::Rgba16Float,
            &[],
        );
    }

    /// Encoding a fullscreen draw into a half-float target submits cleanly.
    #[test]
    fn test_fullscreen_draw_submits() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let mut library = ShaderLibrary::new();
        let source = compose_fullscreen_shader(FLAT_FRAGMENT);
        let module = library
            .load_from_source(&device, &LogNotifier, "uv-fill", &source)
            .unwrap();
        let pass = FullscreenPass::new(
            &device,
            "uv-fill",
            &module,
            wgpu::TextureFormat::Rgba16Float,
            &[],
        );

        let mut target = crate::pingpong::PingPongTarget::new(
            &device,
            "draw-test",
            32,
            32,
            crate::pingpong::TargetFormat::HalfFloatRgba,
        )
        .unwrap();

        let mut encoder = device.create_command_encoder(&Default::default());
        pass.encode(
            &mut encoder,
            "uv-fill",
            target.write_attachment(wgpu::LoadOp::Clear(wgpu::Color::BLACK)),
            &[],
        );
        queue.submit([encoder.finish()]);
        target.swap();
    }
}
