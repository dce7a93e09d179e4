use thiserror::Error;

use crate::types::BlockId;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("reading block config: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing block config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("block id {id} is reserved for air (block `{name}`)")]
    ReservedId { id: BlockId, name: String },
    #[error("block id {id} used by both `{first}` and `{second}`")]
    DuplicateId {
        id: BlockId,
        first: String,
        second: String,
    },
    #[error("block name `{0}` defined twice")]
    DuplicateName(String),
    #[error("block `{name}`: model box {index} is empty or outside 0..16")]
    BadModelBox { name: String, index: usize },
    #[error("block `{name}`: render type `model` needs at least one box")]
    MissingModel { name: String },
    #[error("block `{name}`: tile [{x}, {y}] is outside the {tiles_x}x{tiles_y} atlas")]
    TileOutOfAtlas {
        name: String,
        x: u16,
        y: u16,
        tiles_x: u16,
        tiles_y: u16,
    },
    #[error("block `{name}`: unknown face key `{key}`")]
    UnknownFace { name: String, key: String },
    #[error("atlas must have at least one tile, got {tiles_x}x{tiles_y}")]
    EmptyAtlas { tiles_x: u16, tiles_y: u16 },
}
