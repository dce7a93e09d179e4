use hashbrown::HashMap;

use cubelit_blocks::{AIR, BlockId, BlockMeta};

use crate::{Light, Subchunk, SubchunkCoord};

/// Read access to loaded subchunks; `None` means not loaded.
pub trait SubchunkSource {
    fn subchunk_size(&self) -> usize;
    fn subchunk(&self, coord: SubchunkCoord) -> Option<&Subchunk>;
}

/// Loaded subchunks keyed by coordinate.
#[derive(Clone, Debug)]
pub struct SubchunkMap {
    size: usize,
    map: HashMap<SubchunkCoord, Subchunk>,
}

impl SubchunkMap {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            map: HashMap::new(),
        }
    }

    /// Returns the subchunk back when its size does not match the map.
    pub fn insert(&mut self, coord: SubchunkCoord, sub: Subchunk) -> Result<(), Subchunk> {
        if sub.size() != self.size {
            return Err(sub);
        }
        self.map.insert(coord, sub);
        Ok(())
    }

    pub fn remove(&mut self, coord: SubchunkCoord) -> Option<Subchunk> {
        self.map.remove(&coord)
    }

    #[inline]
    pub fn get(&self, coord: SubchunkCoord) -> Option<&Subchunk> {
        self.map.get(&coord)
    }

    #[inline]
    pub fn get_mut(&mut self, coord: SubchunkCoord) -> Option<&mut Subchunk> {
        self.map.get_mut(&coord)
    }

    #[inline]
    pub fn contains(&self, coord: SubchunkCoord) -> bool {
        self.map.contains_key(&coord)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn coords(&self) -> impl Iterator<Item = SubchunkCoord> + '_ {
        self.map.keys().copied()
    }

    /// Block at a world position; unloaded space reads as air.
    pub fn block_world(&self, wx: i32, wy: i32, wz: i32) -> BlockId {
        let (coord, [x, y, z]) = SubchunkCoord::from_world(wx, wy, wz, self.size);
        self.get(coord).map_or(AIR, |s| s.block(x, y, z))
    }

    /// Writes one cell. Returns the owning coordinate, or `None` if it isn't loaded.
    pub fn set_block_world(
        &mut self,
        wx: i32,
        wy: i32,
        wz: i32,
        id: BlockId,
        meta: BlockMeta,
    ) -> Option<SubchunkCoord> {
        let (coord, [x, y, z]) = SubchunkCoord::from_world(wx, wy, wz, self.size);
        let sub = self.map.get_mut(&coord)?;
        sub.set_block(x, y, z, id, meta);
        Some(coord)
    }

    pub fn set_light_world(&mut self, wx: i32, wy: i32, wz: i32, light: Light) -> bool {
        let (coord, [x, y, z]) = SubchunkCoord::from_world(wx, wy, wz, self.size);
        match self.map.get_mut(&coord) {
            Some(sub) => {
                sub.set_light(x, y, z, light);
                true
            }
            None => false,
        }
    }
}

impl SubchunkSource for SubchunkMap {
    #[inline]
    fn subchunk_size(&self) -> usize {
        self.size
    }

    #[inline]
    fn subchunk(&self, coord: SubchunkCoord) -> Option<&Subchunk> {
        self.get(coord)
    }
}
