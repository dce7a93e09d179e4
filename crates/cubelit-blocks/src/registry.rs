use std::fs;
use std::path::Path;

use hashbrown::HashMap;

use crate::config::{AtlasConfig, BlockDef, BlocksConfig};
use crate::error::RegistryError;
use crate::model::{BlockModel, FaceFlags, ModelBox};
use crate::types::{AIR, BlockId, BlockMeta, CullRule, Direction, FaceRole, RenderLayer, RenderType};

/// Grid of equally sized tiles in a texture atlas.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AtlasLayout {
    pub tiles_x: u16,
    pub tiles_y: u16,
}

impl Default for AtlasLayout {
    fn default() -> Self {
        let cfg = AtlasConfig::default();
        Self {
            tiles_x: cfg.tiles_x,
            tiles_y: cfg.tiles_y,
        }
    }
}

impl AtlasLayout {
    #[inline]
    pub fn tile_count(&self) -> u32 {
        self.tiles_x as u32 * self.tiles_y as u32
    }

    #[inline]
    pub fn tile_index(&self, x: u16, y: u16) -> u32 {
        y as u32 * self.tiles_x as u32 + x as u32
    }

    /// Normalized `(min, max)` of tile `index`, wrapping past the last tile.
    pub fn tile_rect(&self, index: u32) -> ([f32; 2], [f32; 2]) {
        let index = index % self.tile_count().max(1);
        let tx = self.tiles_x.max(1) as u32;
        let (x, y) = (index % tx, index / tx);
        let (w, h) = (1.0 / self.tiles_x.max(1) as f32, 1.0 / self.tiles_y.max(1) as f32);
        (
            [x as f32 * w, y as f32 * h],
            [(x + 1) as f32 * w, (y + 1) as f32 * h],
        )
    }
}

#[derive(Clone, Debug)]
pub struct BlockType {
    pub id: BlockId,
    pub name: String,
    pub render: RenderType,
    pub opaque: bool,
    pub layer: RenderLayer,
    pub no_ao: bool,
    pub variant_stride: u16,
    pub model: BlockModel,
    // Precomputed per direction index (NONE included)
    pub tiles: [u32; 7],
    pub cull: [Option<CullRule>; 6],
    pub full_cube: bool,
    pub casts_ao: bool,
    pub fast_skip: bool,
}

impl BlockType {
    /// Invisible stand-in for air and for ids missing from the table.
    pub fn placeholder(id: BlockId, name: &str) -> Self {
        BlockType {
            id,
            name: name.to_string(),
            render: RenderType::Cube,
            opaque: false,
            layer: RenderLayer::Opaque,
            no_ao: true,
            variant_stride: 0,
            model: BlockModel::default(),
            tiles: [0; 7],
            cull: [None; 6],
            full_cube: false,
            casts_ao: false,
            fast_skip: false,
        }
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.render == RenderType::Fire || !self.model.faces.is_empty()
    }
}

/// Immutable block property table, indexed densely by id.
#[derive(Clone, Debug)]
pub struct BlockRegistry {
    blocks: Vec<BlockType>,
    by_name: HashMap<String, BlockId>,
    atlas: AtlasLayout,
    unknown: BlockType,
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self {
            blocks: vec![BlockType::placeholder(AIR, "air")],
            by_name: HashMap::from([("air".to_string(), AIR)]),
            atlas: AtlasLayout::default(),
            unknown: BlockType::placeholder(BlockId::MAX, "unknown"),
        }
    }
}

impl BlockRegistry {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, RegistryError> {
        let cfg: BlocksConfig = toml::from_str(text)?;
        Self::from_config(cfg)
    }

    pub fn from_config(cfg: BlocksConfig) -> Result<Self, RegistryError> {
        if cfg.atlas.tiles_x == 0 || cfg.atlas.tiles_y == 0 {
            return Err(RegistryError::EmptyAtlas {
                tiles_x: cfg.atlas.tiles_x,
                tiles_y: cfg.atlas.tiles_y,
            });
        }
        let mut reg = BlockRegistry {
            atlas: AtlasLayout {
                tiles_x: cfg.atlas.tiles_x,
                tiles_y: cfg.atlas.tiles_y,
            },
            ..Default::default()
        };
        let mut defined: Vec<bool> = vec![true];
        for def in cfg.blocks {
            let ty = compile_block(&reg.atlas, def)?;
            let id = ty.id;
            if id == AIR {
                return Err(RegistryError::ReservedId { id, name: ty.name });
            }
            if reg.by_name.contains_key(&ty.name) {
                return Err(RegistryError::DuplicateName(ty.name));
            }
            let slot = id as usize;
            if slot >= reg.blocks.len() {
                for fill in reg.blocks.len()..=slot {
                    reg.blocks.push(BlockType::placeholder(fill as BlockId, "unknown"));
                    defined.push(false);
                }
            }
            if defined[slot] {
                return Err(RegistryError::DuplicateId {
                    id,
                    first: reg.blocks[slot].name.clone(),
                    second: ty.name,
                });
            }
            defined[slot] = true;
            reg.by_name.insert(ty.name.clone(), id);
            reg.blocks[slot] = ty;
        }
        log::debug!(
            target: "blocks",
            "block registry: {} ids, {} defined, atlas {}x{}",
            reg.blocks.len(),
            reg.by_name.len(),
            reg.atlas.tiles_x,
            reg.atlas.tiles_y
        );
        Ok(reg)
    }

    /// Unknown ids resolve to an invisible placeholder.
    #[inline]
    pub fn get(&self, id: BlockId) -> &BlockType {
        self.blocks.get(id as usize).unwrap_or(&self.unknown)
    }

    pub fn id_by_name(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    #[inline]
    pub fn atlas(&self) -> AtlasLayout {
        self.atlas
    }

    #[inline]
    pub fn is_full_block(&self, id: BlockId) -> bool {
        self.get(id).full_cube
    }

    #[inline]
    pub fn is_opaque(&self, id: BlockId) -> bool {
        self.get(id).opaque
    }

    /// Full opaque cube: hides neighbor faces and darkens corners.
    #[inline]
    pub fn casts_ao(&self, id: BlockId) -> bool {
        self.get(id).casts_ao
    }

    #[inline]
    pub fn fast_skip(&self, id: BlockId) -> bool {
        self.get(id).fast_skip
    }

    #[inline]
    pub fn render_type(&self, id: BlockId) -> RenderType {
        self.get(id).render
    }

    #[inline]
    pub fn layer(&self, id: BlockId) -> RenderLayer {
        self.get(id).layer
    }

    #[inline]
    pub fn model(&self, id: BlockId) -> &BlockModel {
        &self.get(id).model
    }

    /// Configured visibility rule for one side, if any.
    #[inline]
    pub fn cull_rule(&self, id: BlockId, dir: Direction) -> Option<CullRule> {
        if dir == Direction::None {
            return None;
        }
        self.get(id).cull[dir.index()]
    }

    /// Atlas rect of the tile for `dir`, shifted by metadata variants.
    pub fn face_uv(&self, id: BlockId, dir: Direction, meta: BlockMeta) -> ([f32; 2], [f32; 2]) {
        let ty = self.get(id);
        let base = ty.tiles[dir.index()];
        let tile = base.wrapping_add(meta as u32 * ty.variant_stride as u32);
        self.atlas.tile_rect(tile)
    }
}

fn compile_block(atlas: &AtlasLayout, def: BlockDef) -> Result<BlockType, RegistryError> {
    let render = def.render.unwrap_or(RenderType::Cube);
    let decorative = matches!(render, RenderType::Cross | RenderType::Crop | RenderType::Fire);
    let opaque = def.opaque.unwrap_or(!decorative);
    let layer = def.layer.unwrap_or(RenderLayer::Opaque);
    let no_ao = def.no_ao.unwrap_or(decorative);

    let mut model = match render {
        RenderType::Cube => BlockModel::unit_cube(),
        RenderType::Cross => BlockModel::cross(),
        RenderType::Crop => BlockModel::crop(),
        // Shape depends on neighbors; built by the mesher.
        RenderType::Fire => BlockModel::default(),
        RenderType::CustomModel => {
            let boxes = def.model.as_deref().unwrap_or_default();
            if boxes.is_empty() {
                return Err(RegistryError::MissingModel { name: def.name });
            }
            let mut out = Vec::with_capacity(boxes.len());
            for (index, b) in boxes.iter().enumerate() {
                let mb = ModelBox {
                    from: b.from,
                    to: b.to,
                };
                if !mb.is_valid() {
                    return Err(RegistryError::BadModelBox {
                        name: def.name,
                        index,
                    });
                }
                out.push(mb);
            }
            BlockModel::from_boxes(&out)
        }
    };

    let mut cull = [None; 6];
    for (key, rule) in &def.cull {
        let dir = Direction::from_config_key(key).ok_or_else(|| RegistryError::UnknownFace {
            name: def.name.clone(),
            key: key.clone(),
        })?;
        cull[dir.index()] = Some(*rule);
    }
    for face in &mut model.faces {
        if face.direction != Direction::None && cull[face.direction.index()].is_some() {
            face.flags.insert(FaceFlags::CUSTOM_CULL);
        }
        if no_ao {
            face.flags.insert(FaceFlags::NO_AO);
        }
    }

    let mut tiles = [0u32; 7];
    for (key, &[x, y]) in &def.textures {
        if x >= atlas.tiles_x || y >= atlas.tiles_y {
            return Err(RegistryError::TileOutOfAtlas {
                name: def.name,
                x,
                y,
                tiles_x: atlas.tiles_x,
                tiles_y: atlas.tiles_y,
            });
        }
        if !matches!(key.as_str(), "all" | "side") && Direction::from_config_key(key).is_none() {
            return Err(RegistryError::UnknownFace {
                name: def.name,
                key: key.clone(),
            });
        }
    }
    for (i, slot) in tiles.iter_mut().enumerate() {
        let dir = Direction::from_index(i);
        if let Some([x, y]) = pick_texture(&def, dir) {
            *slot = atlas.tile_index(x, y);
        }
    }

    let full_cube = model.is_full_cube();
    let casts_ao = full_cube && opaque;
    let fast_skip = render == RenderType::Cube && full_cube && cull.iter().all(Option::is_none);
    Ok(BlockType {
        id: def.id,
        name: def.name,
        render,
        opaque,
        layer,
        no_ao,
        variant_stride: def.variant_stride.unwrap_or(0),
        model,
        tiles,
        cull,
        full_cube,
        casts_ao,
        fast_skip,
    })
}

// Exact direction, then top/bottom/side, then `all`.
fn pick_texture(def: &BlockDef, dir: Direction) -> Option<[u16; 2]> {
    let t = &def.textures;
    let exact = match dir {
        Direction::PosX => t.get("east"),
        Direction::NegX => t.get("west"),
        Direction::PosZ => t.get("south"),
        Direction::NegZ => t.get("north"),
        _ => None,
    };
    let role = match (dir, dir.role()) {
        (Direction::None, _) => t.get("side"),
        (_, FaceRole::Top) => t.get("top").or_else(|| t.get("up")),
        (_, FaceRole::Bottom) => t.get("bottom").or_else(|| t.get("down")),
        (_, FaceRole::Side) => t.get("side"),
    };
    exact.or(role).or_else(|| t.get("all")).copied()
}
