//! Simulation pass ordering and execution.
//!
//! [`step_plan`] is the pure description of what one frame runs; the
//! [`ErosionPipeline`] executes that plan against a [`SimulationField`].
//! Generation runs exactly once, on the first frame. Every other frame is
//! flux, then erosion, then sediment transport, then a few shadow
//! refinement iterations.

use islet_log::Notifier;
use islet_render::{
    FULLSCREEN_VERTEX_WGSL, FullscreenPass, ShaderError, ShaderLibrary, UniformBlock,
    UniformError, UniformKind, UniformLayout,
};
use rand::Rng;

use crate::field::SimulationField;

const SIM_PRELUDE_WGSL: &str = include_str!("shaders/sim_prelude.wgsl");
const GENERATION_WGSL: &str = include_str!("shaders/generation.wgsl");
const FLUX_WGSL: &str = include_str!("shaders/flux.wgsl");
const EROSION_WGSL: &str = include_str!("shaders/erosion.wgsl");
const SEDIMENT_WGSL: &str = include_str!("shaders/sediment.wgsl");
const SHADOW_WGSL: &str = include_str!("shaders/shadow.wgsl");

/// One fullscreen simulation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Generation,
    Flux,
    Erosion,
    Sediment,
    Shadow,
}

/// Ordered passes for one frame.
///
/// Shadow iterations are clamped to 2..=4: fewer never converges while the
/// sun moves, more is wasted work.
pub fn step_plan(first_frame: bool, shadow_iterations: u32) -> Vec<PassKind> {
    let shadow_iterations = shadow_iterations.clamp(2, 4);
    let mut plan = Vec::with_capacity(4 + shadow_iterations as usize);
    if first_frame {
        plan.push(PassKind::Generation);
    }
    plan.extend([PassKind::Flux, PassKind::Erosion, PassKind::Sediment]);
    plan.extend(std::iter::repeat_n(
        PassKind::Shadow,
        shadow_iterations as usize,
    ));
    plan
}

/// Static simulation parameters, fixed for the lifetime of the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct SimParams {
    pub resolution: u32,
    pub shadow_iterations: u32,
    pub rain_rate: f32,
    pub evaporation: f32,
    pub max_height: f32,
    pub seed: f32,
}

impl SimParams {
    /// Pick a fresh island seed.
    pub fn random_seed() -> f32 {
        rand::rng().random_range(0.0..1000.0)
    }
}

/// Per-frame inputs to one simulation step.
#[derive(Debug, Clone, Copy)]
pub struct StepContext {
    pub frame_index: u64,
    pub rain_active: bool,
    pub time: f32,
    pub dt: f32,
    pub sun_direction: [f32; 3],
}

/// The five compiled fullscreen passes plus the shared uniform block.
pub struct ErosionPipeline {
    params: SimParams,
    generation: FullscreenPass,
    flux: FullscreenPass,
    erosion: FullscreenPass,
    sediment: FullscreenPass,
    shadow: FullscreenPass,
    uniforms: UniformBlock,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

fn compose_sim_shader(fragment: &str) -> String {
    format!("{FULLSCREEN_VERTEX_WGSL}\n{SIM_PRELUDE_WGSL}\n{fragment}")
}

fn sim_uniform_layout() -> UniformLayout {
    UniformLayout::new("sim-uniforms")
        .with("u_resolution", UniformKind::Vec2)
        .with("u_seed", UniformKind::F32)
        .with("u_time", UniformKind::F32)
        .with("u_rain", UniformKind::F32)
        .with("u_evaporation", UniformKind::F32)
        .with("u_max_height", UniformKind::F32)
        .with("u_dt", UniformKind::F32)
        .with("u_sun_direction", UniformKind::Vec3)
}

impl ErosionPipeline {
    /// Compile all simulation shaders and build their pipelines.
    ///
    /// A compile failure here is fatal at startup; the notifier still gets
    /// the diagnostic so it reaches the user before the process exits.
    pub fn new(
        device: &wgpu::Device,
        library: &mut ShaderLibrary,
        notifier: &dyn Notifier,
        params: SimParams,
    ) -> Result<Self, ShaderError> {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sim-bind-layout"),
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
                texture_entry(1),
                texture_entry(2),
                texture_entry(3),
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let mut build = |name: &str,
                         fragment: &str,
                         format: wgpu::TextureFormat|
         -> Result<FullscreenPass, ShaderError> {
            let source = compose_sim_shader(fragment);
            let module = library.load_from_source(device, notifier, name, &source)?;
            Ok(FullscreenPass::new(
                device,
                name,
                &module,
                format,
                &[&bind_group_layout],
            ))
        };

        let field_format = wgpu::TextureFormat::Rgba16Float;
        let generation = build("sim-generation", GENERATION_WGSL, field_format)?;
        let flux = build("sim-flux", FLUX_WGSL, field_format)?;
        let erosion = build("sim-erosion", EROSION_WGSL, field_format)?;
        let sediment = build("sim-sediment", SEDIMENT_WGSL, field_format)?;
        let shadow = build("sim-shadow", SHADOW_WGSL, wgpu::TextureFormat::R16Float)?;

        let uniforms = UniformBlock::new(device, sim_uniform_layout());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sim-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        Ok(Self {
            params,
            generation,
            flux,
            erosion,
            sediment,
            shadow,
            uniforms,
            bind_group_layout,
            sampler,
        })
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// Run one frame of simulation passes.
    ///
    /// The bind group is rebuilt before each pass because read roles move
    /// as targets swap.
    pub fn step(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        field: &mut SimulationField,
        ctx: &StepContext,
    ) -> Result<(), UniformError> {
        let resolution = self.params.resolution as f32;
        let rain = if ctx.rain_active {
            self.params.rain_rate
        } else {
            0.0
        };
        self.uniforms
            .set_vec2("u_resolution", [resolution, resolution])?;
        self.uniforms.set_f32("u_seed", self.params.seed)?;
        self.uniforms.set_f32("u_time", ctx.time)?;
        self.uniforms.set_f32("u_rain", rain)?;
        self.uniforms
            .set_f32("u_evaporation", self.params.evaporation)?;
        self.uniforms.set_f32("u_max_height", self.params.max_height)?;
        self.uniforms.set_f32("u_dt", ctx.dt)?;
        self.uniforms
            .set_vec3("u_sun_direction", ctx.sun_direction)?;
        self.uniforms.upload(queue);

        for pass in step_plan(ctx.frame_index == 0, self.params.shadow_iterations) {
            self.encode_pass(device, encoder, field, pass);
        }
        Ok(())
    }

    fn encode_pass(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        field: &mut SimulationField,
        pass: PassKind,
    ) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sim-bind-group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniforms.buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(field.data().read_view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(field.flux().read_view()),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(field.shadow().read_view()),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let clear = wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT);
        let (pipeline, label, target) = match pass {
            PassKind::Generation => (&self.generation, "sim-generation", field.data_mut()),
            PassKind::Flux => (&self.flux, "sim-flux", field.flux_mut()),
            PassKind::Erosion => (&self.erosion, "sim-erosion", field.data_mut()),
            PassKind::Sediment => (&self.sediment, "sim-sediment", field.data_mut()),
            PassKind::Shadow => (&self.shadow, "sim-shadow", field.shadow_mut()),
        };
        pipeline.encode(encoder, label, target.write_attachment(clear), &[&bind_group]);
        target.swap();
    }
}

const fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use islet_log::LogNotifier;
    use islet_render::gpu::test_support::create_test_device;

    /// Generation runs only on the first frame.
    #[test]
    fn test_generation_only_first_frame() {
        let first = step_plan(true, 2);
        assert_eq!(first[0], PassKind::Generation);

        let later = step_plan(false, 2);
        assert!(!later.contains(&PassKind::Generation));
    }

    /// The per-frame order is flux, erosion, sediment, then shadows.
    #[test]
    fn test_pass_order() {
        let plan = step_plan(false, 3);
        assert_eq!(
            plan,
            vec![
                PassKind::Flux,
                PassKind::Erosion,
                PassKind::Sediment,
                PassKind::Shadow,
                PassKind::Shadow,
                PassKind::Shadow,
            ]
        );
    }

    /// Shadow iterations clamp into 2..=4.
    #[test]
    fn test_shadow_iteration_bounds() {
        let count = |n| {
            step_plan(false, n)
                .iter()
                .filter(|p| **p == PassKind::Shadow)
                .count()
        };
        assert_eq!(count(0), 2);
        assert_eq!(count(2), 2);
        assert_eq!(count(4), 4);
        assert_eq!(count(99), 4);
    }

    /// Random seeds land in the documented range and vary.
    #[test]
    fn test_random_seed_range() {
        for _ in 0..32 {
            let seed = SimParams::random_seed();
            assert!((0.0..1000.0).contains(&seed));
        }
    }

    /// All five simulation shaders compile and one full step encodes.
    #[test]
    fn test_pipeline_builds_and_steps() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let mut library = ShaderLibrary::new();
        let params = SimParams {
            resolution: 64,
            shadow_iterations: 2,
            rain_rate: 0.012,
            evaporation: 0.015,
            max_height: 4.0,
            seed: 42.0,
        };
        let mut pipeline =
            ErosionPipeline::new(&device, &mut library, &LogNotifier, params).unwrap();
        let mut field = SimulationField::new(&device, 64).unwrap();

        let ctx = StepContext {
            frame_index: 0,
            rain_active: true,
            time: 0.0,
            dt: 1.0 / 60.0,
            sun_direction: [0.3, 0.8, 0.5],
        };
        let mut encoder = device.create_command_encoder(&Default::default());
        pipeline
            .step(&device, &queue, &mut encoder, &mut field, &ctx)
            .unwrap();
        queue.submit([encoder.finish()]);

        // Generation + erosion + sediment write the data field: 3 swaps.
        assert_eq!(field.data().read_index(), 1);
        // Flux writes once.
        assert_eq!(field.flux().read_index(), 1);
        // Two shadow iterations land back on the first texture.
        assert_eq!(field.shadow().read_index(), 0);
    }
}
