//! Arena-backed chunk quadtree with distance-based subdivide/merge.
//!
//! Chunks live in a flat arena and reference their children by index, so
//! structural changes never walk a recursive ownership chain and the tree
//! shape can be tested without any GPU resources. A chunk is either a leaf
//! (its tile is drawn) or subdivided into exactly four children (its tile is
//! hidden); the [`ChunkState`] enum makes any other combination
//! unrepresentable.

use glam::Vec3;

/// Index of a chunk in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkId(u32);

impl ChunkId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Leaf/subdivided state. Exactly one holds at all times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    /// Tile visible, no children.
    Leaf,
    /// Tile hidden, exactly four children.
    Subdivided([ChunkId; 4]),
}

/// One node of the LOD quadtree.
#[derive(Debug, Clone)]
pub struct LodChunk {
    /// Position relative to the parent chunk.
    pub local_position: Vec3,
    /// Absolute position; immutable after construction.
    pub world_position: Vec3,
    /// 0 = coarsest.
    pub depth: u8,
    /// Tile scale: `1 / 2^depth`.
    pub scale: f32,
    pub state: ChunkState,
}

/// Tuning for subdivide/merge decisions.
#[derive(Debug, Clone)]
pub struct LodSettings {
    /// Subdivide range at depth 0; the range halves per depth level.
    pub range0: f32,
    /// No chunk subdivides beyond this depth.
    pub max_depth: u8,
    /// Margin between the subdivide and merge thresholds.
    pub hysteresis: f32,
    /// World-space side length of a depth-0 tile.
    pub tile_size: f32,
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            range0: 900.0,
            max_depth: 5,
            hysteresis: 0.1,
            tile_size: 200.0,
        }
    }
}

impl LodSettings {
    /// Distance below which a chunk at `depth` subdivides: `range0 / 2^(depth+1)`.
    pub fn range_for_depth(&self, depth: u8) -> f32 {
        self.range0 / (2u32 << depth) as f32
    }
}

/// Fraction of a tile's scale applied as a vertical bias to child tiles so
/// that neighboring depths stitch without visible seams.
pub(crate) const STITCH_BIAS: f32 = 0.25;

/// Flat storage for the quadtree. Freed slots are recycled on merge.
pub struct ChunkArena {
    slots: Vec<Option<LodChunk>>,
    free: Vec<ChunkId>,
    roots: Vec<ChunkId>,
    settings: LodSettings,
}

impl ChunkArena {
    /// Build the root grid: a `(2*area)^2` layer of depth-0 chunks centered on
    /// `center`, tiling the simulated region.
    pub fn new_area(center: Vec3, area: u32, settings: LodSettings) -> Self {
        let mut arena = Self {
            slots: Vec::new(),
            free: Vec::new(),
            roots: Vec::new(),
            settings,
        };

        let size = area as i32;
        let tile = arena.settings.tile_size;
        for x in -size..size {
            for z in -size..size {
                let local = Vec3::new(x as f32 * tile, 0.0, z as f32 * tile);
                let id = arena.insert(LodChunk {
                    local_position: local,
                    world_position: local + center,
                    depth: 0,
                    scale: 1.0,
                    state: ChunkState::Leaf,
                });
                arena.roots.push(id);
            }
        }
        arena
    }

    pub fn settings(&self) -> &LodSettings {
        &self.settings
    }

    pub fn roots(&self) -> &[ChunkId] {
        &self.roots
    }

    /// Borrow a chunk. Panics on a stale id; ids are only handed out by the
    /// arena and invalidated by `merge`, so a miss is a caller bug.
    pub fn get(&self, id: ChunkId) -> &LodChunk {
        self.slots[id.index()].as_ref().expect("stale ChunkId")
    }

    fn get_mut(&mut self, id: ChunkId) -> &mut LodChunk {
        self.slots[id.index()].as_mut().expect("stale ChunkId")
    }

    /// Number of live chunks.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, chunk: LodChunk) -> ChunkId {
        if let Some(id) = self.free.pop() {
            self.slots[id.index()] = Some(chunk);
            id
        } else {
            self.slots.push(Some(chunk));
            ChunkId(self.slots.len() as u32 - 1)
        }
    }

    fn remove(&mut self, id: ChunkId) -> LodChunk {
        let chunk = self.slots[id.index()].take().expect("stale ChunkId");
        self.free.push(id);
        chunk
    }

    /// Per-frame update: subdivide/merge every root toward the camera.
    ///
    /// Recurses only into currently subdivided chunks, so the cost is
    /// proportional to the visible boundary rather than the total tree.
    pub fn update(&mut self, camera_position: Vec3) {
        let roots: Vec<ChunkId> = self.roots.clone();
        for root in roots {
            self.update_chunk(root, camera_position);
        }
    }

    fn update_chunk(&mut self, id: ChunkId, camera: Vec3) {
        let (state, depth, world) = {
            let chunk = self.get(id);
            (chunk.state, chunk.depth, chunk.world_position)
        };

        if let ChunkState::Subdivided(children) = state {
            for child in children {
                self.update_chunk(child, camera);
            }
        }

        let distance = camera.distance(world);
        let range = self.settings.range_for_depth(depth);
        let margin = self.settings.hysteresis;

        match state {
            ChunkState::Leaf => {
                if distance < range - margin && depth < self.settings.max_depth {
                    self.subdivide(id);
                }
            }
            ChunkState::Subdivided(_) => {
                if distance > range + margin {
                    self.merge(id);
                }
            }
        }
    }

    /// Split a leaf into four half-scale children tiling its footprint.
    fn subdivide(&mut self, id: ChunkId) {
        let (world, depth, scale) = {
            let chunk = self.get(id);
            debug_assert_eq!(chunk.state, ChunkState::Leaf, "subdividing a branch");
            (chunk.world_position, chunk.depth, chunk.scale)
        };

        let width = scale * self.settings.tile_size;
        let stitch = STITCH_BIAS * scale;
        let quarter = width / 4.0;

        let offsets = [
            Vec3::new(-quarter, stitch, -quarter),
            Vec3::new(-quarter, stitch, quarter),
            Vec3::new(quarter, stitch, -quarter),
            Vec3::new(quarter, stitch, quarter),
        ];

        let children = offsets.map(|offset| {
            self.insert(LodChunk {
                local_position: offset,
                world_position: world + offset,
                depth: depth + 1,
                scale: scale / 2.0,
                state: ChunkState::Leaf,
            })
        });

        self.get_mut(id).state = ChunkState::Subdivided(children);
    }

    /// Collapse a subdivided chunk back to a leaf, detaching its subtree.
    fn merge(&mut self, id: ChunkId) {
        let ChunkState::Subdivided(children) = self.get(id).state else {
            debug_assert!(false, "merging a leaf");
            return;
        };
        for child in children {
            self.detach(child);
        }
        self.get_mut(id).state = ChunkState::Leaf;
    }

    fn detach(&mut self, id: ChunkId) {
        if let ChunkState::Subdivided(children) = self.get(id).state {
            for child in children {
                self.detach(child);
            }
        }
        self.remove(id);
    }

    /// Visit every live leaf chunk.
    pub fn for_each_leaf(&self, mut f: impl FnMut(&LodChunk)) {
        for &root in &self.roots {
            self.visit_leaves(root, &mut f);
        }
    }

    fn visit_leaves(&self, id: ChunkId, f: &mut impl FnMut(&LodChunk)) {
        let chunk = self.get(id);
        match chunk.state {
            ChunkState::Leaf => f(chunk),
            ChunkState::Subdivided(children) => {
                for child in children {
                    self.visit_leaves(child, f);
                }
            }
        }
    }

    /// Deepest live chunk depth, for debug overlays and tests.
    pub fn max_live_depth(&self) -> u8 {
        let mut max = 0;
        self.for_each_leaf(|chunk| max = max.max(chunk.depth));
        max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(max_depth: u8) -> LodSettings {
        LodSettings {
            range0: 900.0,
            max_depth,
            hysteresis: 0.1,
            tile_size: 200.0,
        }
    }

    fn leaf_count(arena: &ChunkArena) -> usize {
        let mut n = 0;
        arena.for_each_leaf(|_| n += 1);
        n
    }

    /// Range halves per depth level: range0 / 2^(depth+1).
    #[test]
    fn test_range_for_depth() {
        let s = settings(5);
        assert_eq!(s.range_for_depth(0), 450.0);
        assert_eq!(s.range_for_depth(1), 225.0);
        assert_eq!(s.range_for_depth(2), 112.5);
    }

    /// An area of size 1 produces a 2x2 grid of root chunks.
    #[test]
    fn test_root_grid_size() {
        let arena = ChunkArena::new_area(Vec3::ZERO, 1, settings(5));
        assert_eq!(arena.roots().len(), 4);
        assert_eq!(leaf_count(&arena), 4);
    }

    /// Camera at the origin of a 1-area grid subdivides the roots; with
    /// max_depth 1 their four children stay leaves.
    #[test]
    fn test_camera_at_origin_subdivides_roots_once() {
        let mut arena = ChunkArena::new_area(Vec3::ZERO, 1, settings(1));
        arena.update(Vec3::ZERO);

        for &root in &arena.roots().to_vec() {
            let chunk = arena.get(root);
            let ChunkState::Subdivided(children) = chunk.state else {
                panic!("root at {:?} should be subdivided", chunk.world_position);
            };
            for child in children {
                assert_eq!(arena.get(child).state, ChunkState::Leaf);
                assert_eq!(arena.get(child).depth, 1);
            }
        }
    }

    /// No chunk ever exceeds the configured maximum depth, no matter how
    /// close the camera gets.
    #[test]
    fn test_depth_bound_holds() {
        let max_depth = 3;
        let mut arena = ChunkArena::new_area(Vec3::ZERO, 1, settings(max_depth));
        for _ in 0..10 {
            arena.update(Vec3::ZERO);
        }
        assert!(arena.max_live_depth() <= max_depth);
        // And the closest chunk actually reached the bound
        assert_eq!(arena.max_live_depth(), max_depth);
    }

    /// Subdivided chunks hide their tile (no leaf emitted) and expose exactly
    /// four children; leaves have none.
    #[test]
    fn test_leaf_branch_exclusivity() {
        let mut arena = ChunkArena::new_area(Vec3::ZERO, 1, settings(2));
        arena.update(Vec3::ZERO);

        let mut stack: Vec<ChunkId> = arena.roots().to_vec();
        while let Some(id) = stack.pop() {
            match arena.get(id).state {
                ChunkState::Leaf => {}
                ChunkState::Subdivided(children) => {
                    assert_eq!(children.len(), 4);
                    stack.extend(children);
                }
            }
        }
    }

    /// A camera oscillating narrowly around the threshold must not toggle
    /// the chunk state (hysteresis margin absorbs the jitter).
    #[test]
    fn test_hysteresis_prevents_flicker() {
        let s = settings(1);
        let range = s.range_for_depth(0);
        let mut arena = ChunkArena::new_area(Vec3::ZERO, 1, s);
        let root = arena.roots()[0];
        let world = arena.get(root).world_position;

        // Move inside the subdivide threshold: chunk splits.
        let inside = world + Vec3::new(range - 1.0, 0.0, 0.0);
        arena.update(inside);
        assert!(matches!(arena.get(root).state, ChunkState::Subdivided(_)));

        // Jitter within the hysteresis band: state must not change.
        for offset in [0.05f32, -0.05, 0.08, -0.02] {
            let jitter = world + Vec3::new(range + offset, 0.0, 0.0);
            arena.update(jitter);
            assert!(
                matches!(arena.get(root).state, ChunkState::Subdivided(_)),
                "flickered at offset {offset}"
            );
        }

        // Clearly outside the merge threshold: chunk merges.
        let outside = world + Vec3::new(range + 1.0, 0.0, 0.0);
        arena.update(outside);
        assert_eq!(arena.get(root).state, ChunkState::Leaf);
    }

    /// Merging releases the whole subtree and the slots are reused.
    #[test]
    fn test_merge_recycles_slots() {
        let mut arena = ChunkArena::new_area(Vec3::ZERO, 1, settings(3));
        arena.update(Vec3::ZERO);
        let populated = arena.len();
        assert!(populated > 4);

        // Far camera: everything merges back to the 4 roots.
        arena.update(Vec3::new(1.0e6, 0.0, 1.0e6));
        assert_eq!(arena.len(), 4);
        assert_eq!(leaf_count(&arena), 4);

        // Re-subdividing reuses freed slots instead of growing the arena.
        let slots_before = arena.slots.len();
        arena.update(Vec3::ZERO);
        assert_eq!(arena.slots.len(), slots_before);
    }

    /// Children tile the parent footprint: offsets are the four quarter
    /// positions and scale halves.
    #[test]
    fn test_children_tile_parent_footprint() {
        let mut arena = ChunkArena::new_area(Vec3::ZERO, 1, settings(1));
        arena.update(Vec3::ZERO);

        let root = arena.roots()[0];
        let parent = arena.get(root).clone();
        let ChunkState::Subdivided(children) = parent.state else {
            panic!("expected subdivision");
        };

        let quarter = parent.scale * 200.0 / 4.0;
        for child in children {
            let c = arena.get(child);
            assert_eq!(c.scale, parent.scale / 2.0);
            assert_eq!(c.local_position.x.abs(), quarter);
            assert_eq!(c.local_position.z.abs(), quarter);
            assert_eq!(c.local_position.y, STITCH_BIAS * parent.scale);
            assert_eq!(c.world_position, parent.world_position + c.local_position);
        }
    }
}
