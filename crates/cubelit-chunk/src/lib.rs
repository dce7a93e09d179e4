//! Subchunk storage: block ids, metadata and packed light for one cubic section.
#![forbid(unsafe_code)]

mod light;
mod store;

pub use light::Light;
pub use store::{SubchunkMap, SubchunkSource};

use std::fmt;

use cubelit_blocks::{AIR, BlockId, BlockMeta};

/// Edge length used unless configured otherwise.
pub const DEFAULT_SIZE: usize = 16;
/// Largest edge the packed vertex position range can address.
pub const MAX_SIZE: usize = 200;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct SubchunkCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl SubchunkCoord {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// World coordinate of local cell (0,0,0).
    #[inline]
    pub fn origin(self, size: usize) -> (i32, i32, i32) {
        let s = size as i32;
        (self.x * s, self.y * s, self.z * s)
    }

    /// Owning subchunk and local cell of a world position.
    #[inline]
    pub fn from_world(wx: i32, wy: i32, wz: i32, size: usize) -> (Self, [usize; 3]) {
        let s = size as i32;
        let coord = Self::new(wx.div_euclid(s), wy.div_euclid(s), wz.div_euclid(s));
        let local = [
            wx.rem_euclid(s) as usize,
            wy.rem_euclid(s) as usize,
            wz.rem_euclid(s) as usize,
        ];
        (coord, local)
    }

    /// The 26 surrounding coordinates, offsets in `-1..=1` (x fastest, then z, then y).
    pub fn neighbors(self) -> impl Iterator<Item = (i32, i32, i32, SubchunkCoord)> {
        (-1..=1).flat_map(move |dy| {
            (-1..=1).flat_map(move |dz| {
                (-1..=1).filter_map(move |dx| {
                    if dx == 0 && dy == 0 && dz == 0 {
                        None
                    } else {
                        Some((dx, dy, dz, self.offset(dx, dy, dz)))
                    }
                })
            })
        })
    }
}

impl fmt::Display for SubchunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[derive(Clone, Debug)]
pub struct Subchunk {
    size: usize,
    blocks: Vec<BlockId>,
    meta: Vec<BlockMeta>,
    light: Vec<u8>,
    non_air: usize,
    empty: bool,
}

impl Subchunk {
    /// All-air subchunk under open sky.
    ///
    /// # Panics
    /// If `size` is outside `1..=MAX_SIZE`.
    pub fn new(size: usize) -> Self {
        assert!(
            (1..=MAX_SIZE).contains(&size),
            "subchunk size {size} outside 1..={MAX_SIZE}"
        );
        let n = size * size * size;
        Subchunk {
            size,
            blocks: vec![AIR; n],
            meta: vec![0; n],
            light: vec![Light::FULL_SKY.0; n],
            non_air: 0,
            empty: true,
        }
    }

    /// Builds from linear arrays, padding or truncating them to `size³`. The empty flag is
    /// taken as given, even when it disagrees with the blocks.
    pub fn from_raw_parts(
        size: usize,
        mut blocks: Vec<BlockId>,
        mut meta: Vec<BlockMeta>,
        mut light: Vec<u8>,
        empty: bool,
    ) -> Self {
        let mut s = Self::new(size);
        let n = size * size * size;
        blocks.resize(n, AIR);
        meta.resize(n, 0);
        light.resize(n, Light::FULL_SKY.0);
        s.non_air = blocks.iter().filter(|&&b| b != AIR).count();
        s.blocks = blocks;
        s.meta = meta;
        s.light = light;
        s.empty = empty;
        s
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        (y * self.size + z) * self.size + x
    }

    #[inline]
    pub fn block(&self, x: usize, y: usize, z: usize) -> BlockId {
        self.blocks[self.idx(x, y, z)]
    }

    #[inline]
    pub fn meta(&self, x: usize, y: usize, z: usize) -> BlockMeta {
        self.meta[self.idx(x, y, z)]
    }

    #[inline]
    pub fn light(&self, x: usize, y: usize, z: usize) -> Light {
        Light(self.light[self.idx(x, y, z)])
    }

    #[inline]
    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    #[inline]
    pub fn metas(&self) -> &[BlockMeta] {
        &self.meta
    }

    #[inline]
    pub fn lights(&self) -> &[u8] {
        &self.light
    }

    pub fn set_block(&mut self, x: usize, y: usize, z: usize, id: BlockId, meta: BlockMeta) {
        let i = self.idx(x, y, z);
        let was_air = self.blocks[i] == AIR;
        match (was_air, id == AIR) {
            (true, false) => self.non_air += 1,
            (false, true) => self.non_air -= 1,
            _ => {}
        }
        self.blocks[i] = id;
        self.meta[i] = meta;
        self.empty = self.non_air == 0;
    }

    #[inline]
    pub fn set_light(&mut self, x: usize, y: usize, z: usize, light: Light) {
        let i = self.idx(x, y, z);
        self.light[i] = light.0;
    }

    pub fn fill_light(&mut self, light: Light) {
        self.light.fill(light.0);
    }

    /// Cached "contains only air" flag.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    #[inline]
    pub fn non_air_count(&self) -> usize {
        self.non_air
    }

    /// Whether the cached empty flag matches the block contents.
    #[inline]
    pub fn is_consistent(&self) -> bool {
        self.empty == (self.non_air == 0)
    }
}
