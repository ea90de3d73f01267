//! Instanced ocean tile rendering.
//!
//! Quadtree leaves all share one flat grid mesh; per-instance data places and
//! scales it. The vertex stage displaces the grid by the simulation
//! heightfield, so a tile's tessellation density is purely a function of its
//! instance scale.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::shader::{ShaderError, ShaderLibrary};
use islet_log::Notifier;

/// Grid segments along each edge of the shared tile mesh.
pub const TILE_SEGMENTS: u32 = 46;

/// WGSL source for the tile pipeline.
pub const TILE_WGSL: &str = include_str!("shaders/tile.wgsl");

/// Per-frame uniforms shared by every tile instance.
///
/// Field order matches the WGSL struct; `world_extent` is the world-space
/// width the heightfield covers.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TileGlobals {
    pub view_proj: [[f32; 4]; 4],
    pub sun_direction: [f32; 3],
    pub time: f32,
    pub camera_pos: [f32; 3],
    pub world_extent: f32,
}

/// Vertex layout of the per-instance buffer: vec3 offset + f32 scale.
pub fn instance_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![1 => Float32x3, 2 => Float32];
    wgpu::VertexBufferLayout {
        array_stride: 16,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &ATTRIBUTES,
    }
}

fn grid_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
    wgpu::VertexBufferLayout {
        array_stride: 8,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRIBUTES,
    }
}

/// Build the shared unit grid mesh centered on the origin.
///
/// Vertices span [-0.5, 0.5] on both axes; instances scale this to tile size.
fn build_grid_mesh(segments: u32) -> (Vec<[f32; 2]>, Vec<u32>) {
    let verts_per_edge = segments + 1;
    let mut vertices = Vec::with_capacity((verts_per_edge * verts_per_edge) as usize);
    for z in 0..verts_per_edge {
        for x in 0..verts_per_edge {
            vertices.push([
                x as f32 / segments as f32 - 0.5,
                z as f32 / segments as f32 - 0.5,
            ]);
        }
    }

    let mut indices = Vec::with_capacity((segments * segments * 6) as usize);
    for z in 0..segments {
        for x in 0..segments {
            let a = z * verts_per_edge + x;
            let b = a + 1;
            let c = a + verts_per_edge;
            let d = c + 1;
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }
    (vertices, indices)
}

/// Fill (and optional wireframe) pipelines for the tile mesh, plus the shared
/// grid buffers and globals uniform.
pub struct TilePipeline {
    fill: wgpu::RenderPipeline,
    line: Option<wgpu::RenderPipeline>,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    globals_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

impl TilePipeline {
    /// Compile the tile shader and build the pipelines.
    ///
    /// The wireframe variant is built only when the device carries
    /// `POLYGON_MODE_LINE`; without it the toggle is silently unavailable.
    pub fn new(
        device: &wgpu::Device,
        library: &mut ShaderLibrary,
        notifier: &dyn Notifier,
        scene_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
        wireframe_supported: bool,
    ) -> Result<Self, ShaderError> {
        let module = library.load_from_source(device, notifier, "tile", TILE_WGSL)?;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tile-bind-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tile-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let make_pipeline = |label: &str, polygon_mode: wgpu::PolygonMode| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[grid_buffer_layout(), instance_buffer_layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: scene_format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    polygon_mode,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: depth_format,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        };

        let fill = make_pipeline("tile-fill", wgpu::PolygonMode::Fill);
        let line = wireframe_supported
            .then(|| make_pipeline("tile-line", wgpu::PolygonMode::Line));

        let (vertices, indices) = build_grid_mesh(TILE_SEGMENTS);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tile-grid-vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tile-grid-indices"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tile-globals"),
            size: std::mem::size_of::<TileGlobals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("tile-height-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        Ok(Self {
            fill,
            line,
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            globals_buffer,
            bind_group_layout,
            sampler,
        })
    }

    pub fn wireframe_available(&self) -> bool {
        self.line.is_some()
    }

    /// Bind group for the current heightfield read texture.
    ///
    /// Rebuilt per frame because the heightfield's read role alternates.
    pub fn create_bind_group(
        &self,
        device: &wgpu::Device,
        height_view: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tile-bind-group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(height_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    pub fn upload_globals(&self, queue: &wgpu::Queue, globals: &TileGlobals) {
        queue.write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(globals));
    }

    /// Record the instanced tile draw into an open render pass.
    pub fn encode<'pass>(
        &'pass self,
        pass: &mut wgpu::RenderPass<'pass>,
        bind_group: &'pass wgpu::BindGroup,
        instance_buffer: &'pass wgpu::Buffer,
        instance_count: u32,
        wireframe: bool,
    ) {
        let pipeline = match (&self.line, wireframe) {
            (Some(line), true) => line,
            _ => &self.fill,
        };
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_vertex_buffer(1, instance_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..instance_count);
    }
}
