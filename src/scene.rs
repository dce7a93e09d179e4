use cubelit_blocks::{AIR, BlockId, BlockRegistry};
use cubelit_chunk::{Light, Subchunk, SubchunkCoord};
use fastnoise_lite::{FastNoiseLite, NoiseType};

use crate::config::ConfigError;

/// Ids the demo terrain is built from.
#[derive(Copy, Clone, Debug)]
pub struct SceneBlocks {
    pub stone: BlockId,
    pub dirt: BlockId,
    pub grass: BlockId,
    pub sand: BlockId,
    pub water: BlockId,
    pub flower: BlockId,
    pub wheat: BlockId,
    pub fire: BlockId,
}

impl SceneBlocks {
    pub fn resolve(reg: &BlockRegistry) -> Result<Self, ConfigError> {
        let id = |name: &str| reg.id_by_name(name).ok_or_else(|| ConfigError::UnknownBlock(name.to_string()));
        Ok(Self {
            stone: id("stone")?,
            dirt: id("dirt")?,
            grass: id("grass")?,
            sand: id("sand")?,
            water: id("water")?,
            flower: id("flower")?,
            wheat: id("wheat")?,
            fire: id("fire")?,
        })
    }
}

/// Heightmap terrain spanning `(2r+1)² × layers` subchunks, x/z centered on the origin.
#[derive(Copy, Clone, Debug)]
pub struct Scene {
    pub size: usize,
    pub radius: i32,
    pub layers: i32,
    pub seed: i32,
}

impl Scene {
    pub fn coords(&self) -> impl Iterator<Item = SubchunkCoord> + '_ {
        (0..self.layers).flat_map(move |cy| {
            (-self.radius..=self.radius).flat_map(move |cz| {
                (-self.radius..=self.radius).map(move |cx| SubchunkCoord::new(cx, cy, cz))
            })
        })
    }

    fn height_range(&self) -> (i32, i32) {
        let top = self.layers * self.size as i32;
        ((top as f32 * 0.15) as i32, (top as f32 * 0.7) as i32)
    }

    fn sea_level(&self) -> i32 {
        let (min_h, max_h) = self.height_range();
        min_h + (max_h - min_h) / 3
    }

    /// Generates every subchunk. Sky light falls off by 2 per block under the surface;
    /// fire cells carry full block light.
    pub fn generate(&self, blocks: &SceneBlocks) -> Vec<(SubchunkCoord, Subchunk)> {
        let mut noise = FastNoiseLite::with_seed(self.seed);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_frequency(Some(0.02));
        let (min_h, max_h) = self.height_range();
        let sea = self.sea_level();
        let s = self.size as i32;

        self.coords()
            .map(|coord| {
                let mut sub = Subchunk::new(self.size);
                let (ox, oy, oz) = coord.origin(self.size);
                for lz in 0..s {
                    for lx in 0..s {
                        let (wx, wz) = (ox + lx, oz + lz);
                        let h = noise.get_noise_2d(wx as f32, wz as f32);
                        let height = ((h + 1.0) * 0.5 * (max_h - min_h) as f32) as i32 + min_h;
                        let height = height.max(1);
                        for ly in 0..s {
                            let wy = oy + ly;
                            let id = column_block(blocks, wx, wy, wz, height, sea);
                            let (x, y, z) = (lx as usize, ly as usize, lz as usize);
                            if id != AIR {
                                sub.set_block(x, y, z, id, decoration_meta(blocks, id, wx, wz));
                            }
                            let depth = height.max(sea) - wy;
                            let sky = if depth > 0 { 15 - (depth * 2).min(15) as u8 } else { 15 };
                            let block = if id == blocks.fire { 15 } else { 0 };
                            sub.set_light(x, y, z, Light::new(sky, block));
                        }
                    }
                }
                (coord, sub)
            })
            .collect()
    }
}

fn scatter(wx: i32, wz: i32) -> u32 {
    let h = (wx as u32).wrapping_mul(0x9E37_79B1) ^ (wz as u32).wrapping_mul(0x85EB_CA77);
    h ^ (h >> 15)
}

fn column_block(b: &SceneBlocks, wx: i32, wy: i32, wz: i32, height: i32, sea: i32) -> BlockId {
    let beach = height <= sea + 1;
    if wy < height {
        if wy == height - 1 {
            if beach { b.sand } else { b.grass }
        } else if wy + 3 >= height {
            if beach { b.sand } else { b.dirt }
        } else {
            b.stone
        }
    } else if wy < sea {
        b.water
    } else if wy == height && !beach {
        match scatter(wx, wz) % 97 {
            0..=5 => b.flower,
            6..=9 => b.wheat,
            10 => b.fire,
            _ => AIR,
        }
    } else {
        AIR
    }
}

fn decoration_meta(b: &SceneBlocks, id: BlockId, wx: i32, wz: i32) -> u8 {
    if id == b.wheat { (scatter(wz, wx) % 8) as u8 } else { 0 }
}
