//! Per-frame driver.
//!
//! One [`FrameDriver`] owns every GPU-side subsystem and runs the frame in a
//! fixed order: simulation passes, LOD update, tile pass into the HDR scene
//! target, then the composite pass into the surface. Input arrives as an
//! immutable [`FrameInputs`] snapshot, so nothing mid-frame can change the
//! camera under the renderer.

use std::sync::Arc;
use std::time::Instant;

use glam::{Mat4, Vec3};
use tracing::{info, warn};
use winit::window::Window;

use islet_config::Config;
use islet_input::FrameInputs;
use islet_lod::{ChunkArena, LodSettings, collect_tiles};
use islet_log::LogNotifier;
use islet_render::{
    CompositePass, RenderContext, RenderContextError, SceneTarget, ShaderError, ShaderLibrary,
    SurfaceError, TargetError, TileGlobals, TilePipeline, UniformError,
    init_render_context_blocking,
};
use islet_sim::{ErosionPipeline, SimParams, SimulationField, StabilityMonitor, StepContext,
    sun_direction};

/// Fraction of the shadow field subtracted from scene color.
const SHADOW_STRENGTH: f32 = 0.55;

/// Vertical field of view for the scene camera.
const FOV_Y: f32 = std::f32::consts::FRAC_PI_4;

/// Sky color behind the tiles, in linear HDR.
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.18,
    g: 0.32,
    b: 0.48,
    a: 1.0,
};

/// Startup failures; all fatal.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Context(#[from] RenderContextError),

    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error(transparent)]
    Target(#[from] TargetError),
}

/// Per-frame failures. Surface errors end the session; uniform errors are
/// programming bugs surfaced as values.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error(transparent)]
    Uniform(#[from] UniformError),
}

struct FrameTimeLog {
    interval: u32,
    frames: u32,
    window_start: Instant,
}

impl FrameTimeLog {
    fn new(interval: u32) -> Self {
        Self {
            interval: interval.max(1),
            frames: 0,
            window_start: Instant::now(),
        }
    }

    fn tick(&mut self, tiles: u32) {
        self.frames += 1;
        if self.frames < self.interval {
            return;
        }
        let elapsed = self.window_start.elapsed().as_secs_f64();
        let avg_ms = elapsed * 1000.0 / f64::from(self.frames);
        info!(
            avg_frame_ms = format_args!("{avg_ms:.2}"),
            fps = format_args!("{:.0}", f64::from(self.frames) / elapsed),
            tiles,
            "frame timing"
        );
        self.frames = 0;
        self.window_start = Instant::now();
    }
}

/// Owns GPU context, simulation, LOD tree, and render passes.
pub struct FrameDriver {
    gpu: RenderContext,
    library: ShaderLibrary,
    notifier: LogNotifier,
    field: SimulationField,
    erosion: ErosionPipeline,
    tiles: TilePipeline,
    scene: SceneTarget,
    composite: CompositePass,
    arena: ChunkArena,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    monitor: StabilityMonitor,
    timing: FrameTimeLog,
    world_extent: f32,
    wireframe: bool,
    frame_index: u64,
    start: Instant,
}

impl FrameDriver {
    /// Bring up the GPU and every subsystem from config.
    pub fn new(window: Arc<Window>, config: &Config) -> Result<Self, StartupError> {
        let gpu = init_render_context_blocking(window, config.window.vsync)?;
        let mut library = ShaderLibrary::new();
        let notifier = LogNotifier;

        let seed = config
            .simulation
            .seed
            .unwrap_or_else(SimParams::random_seed);
        info!(seed = f64::from(seed), "island seed");

        let params = SimParams {
            resolution: config.simulation.resolution,
            shadow_iterations: config.simulation.shadow_iterations,
            rain_rate: config.simulation.rain_rate,
            evaporation: config.simulation.evaporation,
            max_height: config.simulation.max_height,
            seed,
        };
        let field = SimulationField::new(&gpu.device, params.resolution)?;
        let erosion = ErosionPipeline::new(&gpu.device, &mut library, &notifier, params)?;

        let scene = SceneTarget::new(
            &gpu.device,
            gpu.surface_config.width,
            gpu.surface_config.height,
        )?;
        let composite = CompositePass::new(&gpu.device, &mut library, &notifier, gpu.surface_format)?;
        let tiles = TilePipeline::new(
            &gpu.device,
            &mut library,
            &notifier,
            scene.format(),
            scene.depth_format(),
            gpu.wireframe_supported,
        )?;

        let settings = LodSettings {
            range0: config.lod.range0,
            max_depth: config.lod.max_depth,
            hysteresis: config.lod.hysteresis,
            tile_size: config.lod.tile_size,
        };
        let world_extent = 2.0 * config.lod.area as f32 * settings.tile_size;
        let arena = ChunkArena::new_area(Vec3::ZERO, config.lod.area, settings);

        let instance_capacity = 256;
        let instance_buffer = create_instance_buffer(&gpu.device, instance_capacity);

        // Generator heights are bounded by max_height; anything past double
        // that is divergence, not terrain.
        let monitor = StabilityMonitor::new(
            config.simulation.stability_check_interval,
            config.simulation.max_height * 2.0,
        );

        let wireframe = config.debug.wireframe && gpu.wireframe_supported;
        if config.debug.wireframe && !gpu.wireframe_supported {
            warn!("wireframe requested but the adapter lacks line polygon mode");
        }

        Ok(Self {
            gpu,
            library,
            notifier,
            field,
            erosion,
            tiles,
            scene,
            composite,
            arena,
            instance_buffer,
            instance_capacity,
            monitor,
            timing: FrameTimeLog::new(config.debug.frame_time_log_interval),
            world_extent,
            wireframe,
            frame_index: 0,
            start: Instant::now(),
        })
    }

    /// Resize the surface and the scene target; simulation buffers keep
    /// their fixed resolution.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), TargetError> {
        self.gpu.resize(width, height);
        self.scene.resize(&self.gpu.device, width, height)
    }

    /// Run one complete frame.
    pub fn render(&mut self, inputs: &FrameInputs, dt: f32) -> Result<(), FrameError> {
        if inputs.toggle_wireframe && self.tiles.wireframe_available() {
            self.wireframe = !self.wireframe;
            info!(wireframe = self.wireframe, "toggled tile wireframe");
        }

        let surface = self.gpu.get_current_texture()?;
        let surface_view = surface
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let time = self.start.elapsed().as_secs_f32();
        let sun = sun_direction(self.frame_index);
        let ctx = StepContext {
            frame_index: self.frame_index,
            rain_active: inputs.rain,
            time,
            dt,
            sun_direction: sun,
        };

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame"),
            });

        self.erosion
            .step(&self.gpu.device, &self.gpu.queue, &mut encoder, &mut self.field, &ctx)?;

        // Zoom pulls the LOD probe toward the target, so magnification and
        // proximity subdivide the same way.
        let camera = inputs.camera;
        let eye = camera.target + (camera.eye() - camera.target) / camera.zoom;
        self.arena.update(eye);
        let instances = collect_tiles(&self.arena);
        self.upload_instances(&instances);

        let aspect =
            self.gpu.surface_config.width as f32 / self.gpu.surface_config.height.max(1) as f32;
        let view = Mat4::look_at_rh(eye, camera.target, Vec3::Y);
        let proj = Mat4::perspective_rh(FOV_Y, aspect, 0.1, 8.0 * self.world_extent);
        self.tiles.upload_globals(
            &self.gpu.queue,
            &TileGlobals {
                view_proj: (proj * view).to_cols_array_2d(),
                sun_direction: sun,
                time,
                camera_pos: eye.to_array(),
                world_extent: self.world_extent,
            },
        );

        let tile_bind_group = self
            .tiles
            .create_bind_group(&self.gpu.device, self.field.data().read_view());
        {
            let (color, depth) = self.scene.attachments(CLEAR_COLOR);
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene-tiles"),
                color_attachments: &[Some(color)],
                depth_stencil_attachment: Some(depth),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            self.tiles.encode(
                &mut pass,
                &tile_bind_group,
                &self.instance_buffer,
                instances.len() as u32,
                self.wireframe,
            );
        }

        self.composite.set_frame_uniforms(
            [
                self.gpu.surface_config.width as f32,
                self.gpu.surface_config.height as f32,
            ],
            camera.zoom,
            time,
            sun,
            SHADOW_STRENGTH,
        )?;
        self.composite.encode(
            &self.gpu.device,
            &self.gpu.queue,
            &mut encoder,
            &surface_view,
            self.scene.color_view(),
            self.field.shadow().read_view(),
        );

        self.gpu.queue.submit([encoder.finish()]);
        surface.present();

        if self.monitor.due(self.frame_index) {
            self.monitor
                .check(&self.gpu.device, &self.gpu.queue, &self.field, &self.notifier);
        }

        self.timing.tick(instances.len() as u32);
        self.frame_index += 1;
        Ok(())
    }

    fn upload_instances(&mut self, instances: &[islet_lod::TileInstance]) {
        if instances.len() > self.instance_capacity {
            self.instance_capacity = instances.len().next_power_of_two();
            self.instance_buffer = create_instance_buffer(&self.gpu.device, self.instance_capacity);
        }
        if !instances.is_empty() {
            self.gpu
                .queue
                .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(instances));
        }
    }

    /// Tear down GPU-side state explicitly before the window goes away.
    pub fn shutdown(&mut self) {
        if let Err(e) = self.field.destroy() {
            warn!("field teardown: {e}");
        }
        info!(
            frames = self.frame_index,
            shaders = self.library.len(),
            "render session ended"
        );
    }
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("tile-instances"),
        size: (capacity * std::mem::size_of::<islet_lod::TileInstance>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
