use serde::Deserialize;

/// Index into the block property table. `0` is always air.
pub type BlockId = u16;
/// Per-voxel auxiliary byte (orientation, growth stage, colour variant).
pub type BlockMeta = u8;

pub const AIR: BlockId = 0;

/// Face direction. The numeric value is the 3-bit code written into packed vertices.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Direction {
    PosY = 0,
    NegY = 1,
    PosX = 2,
    NegX = 3,
    PosZ = 4,
    NegZ = 5,
    /// Decorative geometry not aligned with a cube face; never neighbor-culled.
    None = 6,
}

impl Direction {
    pub const AXES: [Direction; 6] = [
        Direction::PosY,
        Direction::NegY,
        Direction::PosX,
        Direction::NegX,
        Direction::PosZ,
        Direction::NegZ,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Inverse of `index`; out-of-range codes map to `None`.
    #[inline]
    pub fn from_index(i: usize) -> Direction {
        match i {
            0 => Direction::PosY,
            1 => Direction::NegY,
            2 => Direction::PosX,
            3 => Direction::NegX,
            4 => Direction::PosZ,
            5 => Direction::NegZ,
            _ => Direction::None,
        }
    }

    /// Grid step `(dx,dy,dz)` out through this face.
    #[inline]
    pub fn delta(self) -> (i32, i32, i32) {
        match self {
            Direction::PosY => (0, 1, 0),
            Direction::NegY => (0, -1, 0),
            Direction::PosX => (1, 0, 0),
            Direction::NegX => (-1, 0, 0),
            Direction::PosZ => (0, 0, 1),
            Direction::NegZ => (0, 0, -1),
            Direction::None => (0, 0, 0),
        }
    }

    #[inline]
    pub fn opposite(self) -> Direction {
        match self {
            Direction::PosY => Direction::NegY,
            Direction::NegY => Direction::PosY,
            Direction::PosX => Direction::NegX,
            Direction::NegX => Direction::PosX,
            Direction::PosZ => Direction::NegZ,
            Direction::NegZ => Direction::PosZ,
            Direction::None => Direction::None,
        }
    }

    /// Normal axis (`0=x, 1=y, 2=z`), or `None` for decorative faces.
    #[inline]
    pub fn axis(self) -> Option<usize> {
        match self {
            Direction::PosX | Direction::NegX => Some(0),
            Direction::PosY | Direction::NegY => Some(1),
            Direction::PosZ | Direction::NegZ => Some(2),
            Direction::None => None,
        }
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        matches!(self, Direction::PosX | Direction::PosY | Direction::PosZ)
    }

    /// Signed in-plane axes `(u, v)` with `u × v` equal to the outward normal, so that
    /// walking `(0,0) → (1,0) → (1,1) → (0,1)` in `(u,v)` is counter-clockwise from outside.
    /// `v` points "up" in texture space for the four side faces.
    #[inline]
    pub fn tangents(self) -> ((usize, i8), (usize, i8)) {
        match self {
            Direction::PosY => ((0, 1), (2, -1)),
            Direction::NegY => ((0, 1), (2, 1)),
            Direction::PosX => ((2, -1), (1, 1)),
            Direction::NegX => ((2, 1), (1, 1)),
            Direction::PosZ => ((0, 1), (1, 1)),
            Direction::NegZ => ((0, -1), (1, 1)),
            Direction::None => ((0, 1), (1, 1)),
        }
    }

    #[inline]
    pub fn role(self) -> FaceRole {
        match self {
            Direction::PosY => FaceRole::Top,
            Direction::NegY => FaceRole::Bottom,
            _ => FaceRole::Side,
        }
    }

    /// Parses the compass names used in block configs.
    pub fn from_config_key(key: &str) -> Option<Direction> {
        match key {
            "up" | "top" => Some(Direction::PosY),
            "down" | "bottom" => Some(Direction::NegY),
            "east" => Some(Direction::PosX),
            "west" => Some(Direction::NegX),
            "south" => Some(Direction::PosZ),
            "north" => Some(Direction::NegZ),
            _ => None,
        }
    }
}

/// Coarse role used when a block gives top/bottom/side textures.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FaceRole {
    Top,
    Bottom,
    Side,
}

/// Emitter family used for a block.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderType {
    Cube,
    Cross,
    Crop,
    Fire,
    #[serde(alias = "model")]
    CustomModel,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderLayer {
    #[default]
    Opaque,
    Translucent,
}

/// Per-direction override of the default face-visibility rule.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CullRule {
    /// Hidden behind a full opaque cube unless the face is non-full.
    #[default]
    Default,
    /// Never hidden by a neighbor.
    Always,
    /// Hidden only by a neighbor of the same block id.
    Same,
    /// Hidden by the same block id or by a full opaque cube.
    SameOrOpaque,
}
