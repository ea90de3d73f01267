//! Level-of-detail quadtree for the ocean tile grid.
//!
//! Chunks subdivide toward the camera and merge away from it, with hysteresis
//! around the thresholds to prevent flicker at the boundary.

mod arena;
mod tiles;

pub use arena::{ChunkArena, ChunkId, ChunkState, LodChunk, LodSettings};
pub use tiles::{TileInstance, collect_tiles};
