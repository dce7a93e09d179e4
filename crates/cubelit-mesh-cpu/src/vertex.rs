use bytemuck::{Pod, Zeroable};
use cubelit_blocks::Direction;
use cubelit_geom::Vec3;

use crate::constants::{AO_MASK, AO_SHIFT, DIR_MASK, POS_BIAS, POS_SCALE, UV_SCALE};

/// 12-byte GPU vertex.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct PackedVertex {
    pub pos: [u16; 3],
    pub uv: [u16; 2],
    /// Direction code in bits 0..3, AO level in bits 3..5.
    pub dir_ao: u8,
    /// Sky nibble high, block nibble low.
    pub light: u8,
}

/// A vertex expanded the way the shader expands it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DecodedVertex {
    pub pos: Vec3,
    pub uv: [f32; 2],
    pub dir: Direction,
    pub ao: u8,
    pub sky: u8,
    pub block: u8,
}

#[inline]
pub fn quantize_pos(p: f32) -> u16 {
    let raw = ((p + POS_BIAS) * POS_SCALE).round();
    debug_assert!(
        (0.0..=u16::MAX as f32).contains(&raw),
        "position {p} out of fixed-point range"
    );
    raw.clamp(0.0, u16::MAX as f32) as u16
}

#[inline]
pub fn dequantize_pos(raw: u16) -> f32 {
    raw as f32 / POS_SCALE - POS_BIAS
}

#[inline]
pub fn quantize_uv(t: f32) -> u16 {
    (t * UV_SCALE).round().clamp(0.0, UV_SCALE) as u16
}

impl PackedVertex {
    pub fn new(pos: Vec3, uv: [f32; 2], dir: Direction, ao: u8, light: u8) -> Self {
        debug_assert!(ao <= 3);
        PackedVertex {
            pos: [quantize_pos(pos.x), quantize_pos(pos.y), quantize_pos(pos.z)],
            uv: [quantize_uv(uv[0]), quantize_uv(uv[1])],
            dir_ao: (dir as u8 & DIR_MASK) | ((ao.min(3) << AO_SHIFT) & AO_MASK),
            light,
        }
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        Direction::from_index((self.dir_ao & DIR_MASK) as usize)
    }

    #[inline]
    pub fn ao(&self) -> u8 {
        (self.dir_ao & AO_MASK) >> AO_SHIFT
    }

    pub fn decode(&self) -> DecodedVertex {
        DecodedVertex {
            pos: Vec3::new(
                dequantize_pos(self.pos[0]),
                dequantize_pos(self.pos[1]),
                dequantize_pos(self.pos[2]),
            ),
            uv: [self.uv[0] as f32 / UV_SCALE, self.uv[1] as f32 / UV_SCALE],
            dir: self.direction(),
            ao: self.ao(),
            sky: self.light >> 4,
            block: self.light & 0x0F,
        }
    }
}
