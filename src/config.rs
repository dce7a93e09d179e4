use std::path::{Path, PathBuf};

use cubelit_blocks::BlockRegistry;
use cubelit_chunk::Light;
use cubelit_lighting::LightSettings;
use cubelit_mesh_cpu::{HaloFiller, MeshSettings};
use cubelit_runtime::RuntimeConfig;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("[halo] floor_block `{0}` is not in the block table")]
    UnknownBlock(String),
    #[error("[halo] default_light {0:#04x} is not a sky/block nibble pair")]
    BadLight(u32),
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub mesher: MesherSection,
    #[serde(default)]
    pub halo: HaloSection,
    #[serde(default)]
    pub runtime: RuntimeSection,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MesherSection {
    #[serde(default = "yes")]
    pub smooth_lighting: bool,
    #[serde(default = "yes")]
    pub ambient_occlusion: bool,
    #[serde(default)]
    pub fullbright: bool,
    #[serde(default = "yes")]
    pub batched: bool,
}

impl Default for MesherSection {
    fn default() -> Self {
        Self {
            smooth_lighting: true,
            ambient_occlusion: true,
            fullbright: false,
            batched: true,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct HaloSection {
    #[serde(default)]
    pub world_floor_y: i32,
    #[serde(default = "default_floor_block")]
    pub floor_block: String,
    #[serde(default = "default_light")]
    pub default_light: u32,
}

impl Default for HaloSection {
    fn default() -> Self {
        Self {
            world_floor_y: 0,
            floor_block: default_floor_block(),
            default_light: default_light(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct RuntimeSection {
    /// 0 = pick from core count.
    #[serde(default)]
    pub workers: usize,
}

fn yes() -> bool {
    true
}

fn default_floor_block() -> String {
    "stone".to_string()
}

fn default_light() -> u32 {
    u32::from(Light::FULL_SKY.0)
}

impl EngineConfig {
    /// Missing file means defaults; a present but broken file is an error.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("{} not found, using default engine config", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn mesh_settings(&self, reg: &BlockRegistry) -> Result<MeshSettings, ConfigError> {
        let floor_block = reg
            .id_by_name(&self.halo.floor_block)
            .ok_or_else(|| ConfigError::UnknownBlock(self.halo.floor_block.clone()))?;
        let default_light =
            u8::try_from(self.halo.default_light).map_err(|_| ConfigError::BadLight(self.halo.default_light))?;
        Ok(MeshSettings {
            light: LightSettings {
                smooth_lighting: self.mesher.smooth_lighting,
                ambient_occlusion: self.mesher.ambient_occlusion,
            },
            fullbright: self.mesher.fullbright,
            batched: self.mesher.batched,
            filler: HaloFiller {
                world_floor_y: self.halo.world_floor_y,
                floor_block,
                default_light: Light(default_light),
            },
        })
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            workers: self.runtime.workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCKS: &str = r#"
        [[blocks]]
        name = "stone"
        id = 1
        textures = { all = [0, 0] }
    "#;

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, EngineConfig::default());
        let reg = BlockRegistry::from_toml_str(BLOCKS).unwrap();
        assert_eq!(cfg.mesh_settings(&reg).unwrap(), MeshSettings::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = EngineConfig::from_toml_str(
            "[mesher]\nambient_occlusion = false\n[halo]\nworld_floor_y = -64\n",
        )
        .unwrap();
        assert!(cfg.mesher.smooth_lighting);
        assert!(!cfg.mesher.ambient_occlusion);
        assert_eq!(cfg.halo.world_floor_y, -64);
        assert_eq!(cfg.halo.floor_block, "stone");
    }

    #[test]
    fn unknown_floor_block_is_rejected() {
        let cfg = EngineConfig::from_toml_str("[halo]\nfloor_block = \"bedrock\"\n").unwrap();
        let reg = BlockRegistry::from_toml_str(BLOCKS).unwrap();
        assert!(matches!(cfg.mesh_settings(&reg), Err(ConfigError::UnknownBlock(name)) if name == "bedrock"));
    }

    #[test]
    fn out_of_range_light_is_rejected() {
        let cfg = EngineConfig::from_toml_str("[halo]\ndefault_light = 300\n").unwrap();
        let reg = BlockRegistry::from_toml_str(BLOCKS).unwrap();
        assert!(matches!(cfg.mesh_settings(&reg), Err(ConfigError::BadLight(300))));
    }

    #[test]
    fn unknown_section_is_an_error() {
        assert!(EngineConfig::from_toml_str("[render]\nfov = 70\n").is_err());
    }
}
