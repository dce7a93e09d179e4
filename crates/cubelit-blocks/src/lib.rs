//! Block property table: block types, face models and the TOML config they are compiled from.
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod model;
pub mod registry;
pub mod types;

pub use config::BlocksConfig;
pub use error::RegistryError;
pub use model::{BlockModel, CornerSample, FaceDescriptor, FaceFlags, ModelBox, UvRect};
pub use registry::{AtlasLayout, BlockRegistry, BlockType};
pub use types::{AIR, BlockId, BlockMeta, CullRule, Direction, FaceRole, RenderLayer, RenderType};
