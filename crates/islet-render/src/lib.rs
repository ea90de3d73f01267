//! wgpu rendering plumbing: device/surface management, shader compilation
//! with user-visible diagnostics, uniform blocks, ping-pong simulation
//! targets, fullscreen passes, the ocean tile pipeline, and the composite
//! present pass.

pub mod composite;
pub mod gpu;
pub mod pingpong;
pub mod quad;
pub mod shader;
pub mod tiles;
pub mod uniforms;

pub use composite::{CompositePass, SceneTarget};
pub use gpu::{RenderContext, RenderContextError, SurfaceError, init_render_context_blocking};
pub use pingpong::{PingPongTarget, TargetError, TargetFormat};
pub use quad::{FULLSCREEN_VERTEX_WGSL, FullscreenPass, compose_fullscreen_shader};
pub use shader::{ShaderError, ShaderLibrary};
pub use tiles::{TILE_SEGMENTS, TileGlobals, TilePipeline, instance_buffer_layout};
pub use uniforms::{UniformBlock, UniformError, UniformKind, UniformLayout};
