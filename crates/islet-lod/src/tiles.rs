//! Leaf chunk collection into GPU-ready tile instances.

use bytemuck::{Pod, Zeroable};

use crate::arena::{ChunkArena, ChunkState};

/// Per-instance data for one drawn ocean tile.
///
/// All tiles share one plane mesh; only the transform differs. Matches the
/// instance vertex buffer layout of the tile pipeline.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TileInstance {
    /// World-space tile center (includes the stitching bias on y).
    pub offset: [f32; 3],
    /// World-space side length: `tile_size / 2^depth`.
    pub scale: f32,
}

/// Collect every visible (leaf) chunk as a tile instance.
///
/// The returned set tiles the root footprint exactly: a subdivided chunk
/// contributes nothing itself, and its four children cover its area.
pub fn collect_tiles(arena: &ChunkArena) -> Vec<TileInstance> {
    let tile_size = arena.settings().tile_size;
    let mut tiles = Vec::new();
    arena.for_each_leaf(|chunk| {
        debug_assert_eq!(chunk.state, ChunkState::Leaf);
        tiles.push(TileInstance {
            offset: chunk.world_position.to_array(),
            scale: chunk.scale * tile_size,
        });
    });
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::LodSettings;
    use glam::Vec3;

    fn area_of(tiles: &[TileInstance]) -> f32 {
        tiles.iter().map(|t| t.scale * t.scale).sum()
    }

    /// Leaf tiles cover the root footprint with no gaps: total area is
    /// conserved through any amount of subdivision.
    #[test]
    fn test_tiles_conserve_area() {
        let settings = LodSettings::default();
        let mut arena = ChunkArena::new_area(Vec3::ZERO, 2, settings);

        let flat = collect_tiles(&arena);
        let total = area_of(&flat);

        arena.update(Vec3::ZERO);
        arena.update(Vec3::ZERO);
        let subdivided = collect_tiles(&arena);

        assert!(subdivided.len() > flat.len());
        let after = area_of(&subdivided);
        assert!(
            (total - after).abs() < total * 1e-4,
            "area changed: {total} -> {after}"
        );
    }

    /// Instances carry the world position including the stitching bias.
    #[test]
    fn test_child_instances_have_vertical_bias() {
        let mut arena = ChunkArena::new_area(Vec3::ZERO, 1, LodSettings::default());
        arena.update(Vec3::ZERO);
        let tiles = collect_tiles(&arena);

        let biased = tiles.iter().filter(|t| t.offset[1] > 0.0).count();
        assert!(biased > 0, "expected subdivided tiles with y bias");
    }

    /// TileInstance is tightly packed for the instance buffer.
    #[test]
    fn test_instance_layout() {
        assert_eq!(std::mem::size_of::<TileInstance>(), 16);
    }
}
