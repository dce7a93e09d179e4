use cubelit_blocks::{AIR, BlockId, BlockMeta};
use cubelit_chunk::{Light, Subchunk, SubchunkCoord, SubchunkSource};

/// Which of the 26 surrounding subchunks were missing when a halo was built.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct NeighborMask(pub u32);

impl NeighborMask {
    pub const EMPTY: NeighborMask = NeighborMask(0);

    #[inline]
    pub fn bit(dx: i32, dy: i32, dz: i32) -> u32 {
        debug_assert!((-1..=1).contains(&dx) && (-1..=1).contains(&dy) && (-1..=1).contains(&dz));
        1 << ((dy + 1) * 9 + (dz + 1) * 3 + (dx + 1))
    }

    #[inline]
    pub fn insert(&mut self, dx: i32, dy: i32, dz: i32) {
        self.0 |= Self::bit(dx, dy, dz);
    }

    #[inline]
    pub fn contains(self, dx: i32, dy: i32, dz: i32) -> bool {
        self.0 & Self::bit(dx, dy, dz) != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Offsets of the missing neighbors.
    pub fn offsets(self) -> impl Iterator<Item = (i32, i32, i32)> {
        (0..27).filter(move |i| self.0 & (1 << i) != 0).map(|i| {
            let i = i as i32;
            (i % 3 - 1, i / 9 - 1, (i / 3) % 3 - 1)
        })
    }
}

/// Values substituted for cells whose subchunk isn't loaded.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HaloFiller {
    /// World y below which missing space counts as solid ground.
    pub world_floor_y: i32,
    pub floor_block: BlockId,
    pub default_light: Light,
}

impl Default for HaloFiller {
    fn default() -> Self {
        Self {
            world_floor_y: 0,
            floor_block: 1,
            default_light: Light::FULL_SKY,
        }
    }
}

impl HaloFiller {
    #[inline]
    pub fn cell(&self, world_y: i32) -> (BlockId, Light) {
        if world_y < self.world_floor_y {
            (self.floor_block, Light::DARK)
        } else {
            (AIR, self.default_light)
        }
    }
}

/// Block, metadata and light of a subchunk plus a one-cell border, as one flat
/// `(S+2)³` array indexed by local coordinates in `-1..=S`.
#[derive(Clone, Debug, Default)]
pub struct NeighborHalo {
    size: usize,
    stride: usize,
    coord: Option<SubchunkCoord>,
    blocks: Vec<BlockId>,
    meta: Vec<BlockMeta>,
    light: Vec<u8>,
    missing: NeighborMask,
}

impl NeighborHalo {
    pub fn new(size: usize) -> Self {
        let mut h = Self::default();
        h.resize(size);
        h
    }

    /// Keeps the allocation when the size is unchanged.
    pub fn resize(&mut self, size: usize) {
        let stride = size + 2;
        let n = stride * stride * stride;
        self.size = size;
        self.stride = stride;
        self.blocks.resize(n, AIR);
        self.meta.resize(n, 0);
        self.light.resize(n, 0);
        self.coord = None;
        self.missing = NeighborMask::EMPTY;
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn coord(&self) -> Option<SubchunkCoord> {
        self.coord
    }

    #[inline]
    pub fn missing(&self) -> NeighborMask {
        self.missing
    }

    #[inline]
    pub fn index(&self, x: i32, y: i32, z: i32) -> usize {
        let s = self.stride as i32;
        debug_assert!([x, y, z].iter().all(|&c| c >= -1 && c < s - 1), "halo index ({x}, {y}, {z})");
        ((y + 1) * s * s + (z + 1) * s + (x + 1)) as usize
    }

    #[inline]
    pub fn block(&self, x: i32, y: i32, z: i32) -> BlockId {
        self.blocks[self.index(x, y, z)]
    }

    #[inline]
    pub fn meta(&self, x: i32, y: i32, z: i32) -> BlockMeta {
        self.meta[self.index(x, y, z)]
    }

    #[inline]
    pub fn light(&self, x: i32, y: i32, z: i32) -> u8 {
        self.light[self.index(x, y, z)]
    }

    /// Copies the center subchunk and the touching layers of its 26 neighbors.
    /// Missing neighbors get filler values and are recorded in the mask.
    pub fn fill<S: SubchunkSource + ?Sized>(
        &mut self,
        coord: SubchunkCoord,
        src: &S,
        filler: &HaloFiller,
    ) -> NeighborMask {
        let size = src.subchunk_size();
        if size != self.size {
            self.resize(size);
        }
        self.coord = Some(coord);
        self.missing = NeighborMask::EMPTY;
        let s = size as i32;
        let (_, oy, _) = coord.origin(size);
        for dy in -1..=1 {
            for dz in -1..=1 {
                for dx in -1..=1 {
                    let (hx, sx) = span(dx, s);
                    let (hy, sy) = span(dy, s);
                    let (hz, sz) = span(dz, s);
                    match src.subchunk(coord.offset(dx, dy, dz)) {
                        Some(sub) => self.copy_region(sub, [hx, hy, hz], [sx, sy, sz]),
                        None => {
                            if (dx, dy, dz) != (0, 0, 0) {
                                self.missing.insert(dx, dy, dz);
                            }
                            for y in hy.clone() {
                                let (b, l) = filler.cell(oy + y);
                                for z in hz.clone() {
                                    for x in hx.clone() {
                                        let i = self.index(x, y, z);
                                        self.blocks[i] = b;
                                        self.meta[i] = 0;
                                        self.light[i] = l.0;
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        self.missing
    }

    fn copy_region(
        &mut self,
        sub: &Subchunk,
        halo: [std::ops::Range<i32>; 3],
        src: [std::ops::Range<i32>; 3],
    ) {
        let [hx, hy, hz] = halo;
        let [sx, sy, sz] = src;
        let len = hx.len();
        for (y, ly) in hy.zip(sy) {
            for (z, lz) in hz.clone().zip(sz.clone()) {
                let d = self.index(hx.start, y, z);
                let s = sub.idx(sx.start as usize, ly as usize, lz as usize);
                self.blocks[d..d + len].copy_from_slice(&sub.blocks()[s..s + len]);
                self.meta[d..d + len].copy_from_slice(&sub.metas()[s..s + len]);
                self.light[d..d + len].copy_from_slice(&sub.lights()[s..s + len]);
            }
        }
    }

    /// Debug view: every cell at maximum light.
    pub fn apply_fullbright(&mut self) {
        self.light.fill(Light::MAX.0);
    }

    /// True when all six face neighbors of the cell satisfy `pred`.
    #[inline]
    pub fn axis_neighbors_all(&self, x: i32, y: i32, z: i32, mut pred: impl FnMut(BlockId) -> bool) -> bool {
        pred(self.block(x, y + 1, z))
            && pred(self.block(x, y - 1, z))
            && pred(self.block(x + 1, y, z))
            && pred(self.block(x - 1, y, z))
            && pred(self.block(x, y, z + 1))
            && pred(self.block(x, y, z - 1))
    }
}

// Halo range and source range along one axis for neighbor offset `d`.
#[inline]
fn span(d: i32, s: i32) -> (std::ops::Range<i32>, std::ops::Range<i32>) {
    match d {
        -1 => (-1..0, s - 1..s),
        0 => (0..s, 0..s),
        _ => (s..s + 1, 0..1),
    }
}
