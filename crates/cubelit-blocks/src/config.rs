use serde::Deserialize;
use std::collections::HashMap;

use crate::types::{CullRule, RenderLayer, RenderType};

// Top-level blocks config file
#[derive(Deserialize, Debug, Default)]
pub struct BlocksConfig {
    #[serde(default)]
    pub atlas: AtlasConfig,
    #[serde(default)]
    pub blocks: Vec<BlockDef>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct AtlasConfig {
    #[serde(default = "default_tiles")]
    pub tiles_x: u16,
    #[serde(default = "default_tiles")]
    pub tiles_y: u16,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            tiles_x: default_tiles(),
            tiles_y: default_tiles(),
        }
    }
}

fn default_tiles() -> u16 {
    16
}

#[derive(Deserialize, Debug, Clone)]
pub struct BlockDef {
    pub name: String,
    pub id: u16,
    #[serde(default)]
    pub render: Option<RenderType>,
    // Defaults to true for cubes and custom models, false for decorative shapes.
    #[serde(default)]
    pub opaque: Option<bool>,
    #[serde(default)]
    pub layer: Option<RenderLayer>,
    #[serde(default)]
    pub no_ao: Option<bool>,

    // Face key (`all`, `top`, `bottom`, `side` or a compass direction) → atlas tile `[x, y]`.
    #[serde(default)]
    pub textures: HashMap<String, [u16; 2]>,
    // Tiles to advance per metadata value; 0 ignores metadata.
    #[serde(default)]
    pub variant_stride: Option<u16>,

    // Required for `render = "model"`.
    #[serde(default)]
    pub model: Option<Vec<ModelBoxDef>>,

    // Compass direction → visibility rule.
    #[serde(default)]
    pub cull: HashMap<String, CullRule>,
}

// Box in 1/16 units
#[derive(Deserialize, Debug, Clone, Copy)]
pub struct ModelBoxDef {
    pub from: [f32; 3],
    pub to: [f32; 3],
}
