//! Fixed-point scales shared with the vertex shader. Changing any of these breaks decoding.

/// Position units per block.
pub const POS_SCALE: f32 = 256.0;
/// Added before quantizing so the one-cell halo (and a bit more) stays non-negative.
pub const POS_BIAS: f32 = 16.0;
/// Normalized atlas UV 1.0.
pub const UV_SCALE: f32 = 65535.0;

/// Low three bits of the `dir_ao` byte.
pub const DIR_MASK: u8 = 0b0000_0111;
pub const AO_SHIFT: u8 = 3;
pub const AO_MASK: u8 = 0b0001_1000;

/// Indices per quad (two triangles).
pub(crate) const QUAD_INDICES: usize = 6;
