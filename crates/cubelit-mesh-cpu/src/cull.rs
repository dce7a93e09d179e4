use cubelit_blocks::{AIR, BlockId, BlockRegistry, CullRule, Direction, FaceDescriptor, FaceFlags};

use crate::halo::NeighborHalo;

/// Face visibility against the neighboring block.
#[derive(Copy, Clone)]
pub struct FaceCuller<'a> {
    reg: &'a BlockRegistry,
}

impl<'a> FaceCuller<'a> {
    pub fn new(reg: &'a BlockRegistry) -> Self {
        Self { reg }
    }

    /// Whether `face` of `block` is visible next to `neighbor`. A configured rule for the
    /// face's side replaces the default test.
    pub fn should_render(&self, block: BlockId, neighbor: BlockId, face: &FaceDescriptor) -> bool {
        if face.direction == Direction::None {
            return block != AIR;
        }
        let rule = if face.flags.contains(FaceFlags::CUSTOM_CULL) {
            self.reg.cull_rule(block, face.direction)
        } else {
            None
        };
        match rule.unwrap_or_default() {
            CullRule::Default => {
                face.flags.contains(FaceFlags::NON_FULL) || !self.reg.casts_ao(neighbor)
            }
            CullRule::Always => true,
            CullRule::Same => neighbor != block,
            CullRule::SameOrOpaque => neighbor != block && !self.reg.casts_ao(neighbor),
        }
    }

    /// Whole-voxel skip: plain cubes enclosed by full opaque cubes on all six sides.
    #[inline]
    pub fn fully_enclosed(&self, halo: &NeighborHalo, block: BlockId, x: i32, y: i32, z: i32) -> bool {
        self.reg.fast_skip(block) && halo.axis_neighbors_all(x, y, z, |b| self.reg.casts_ao(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubelit_geom::Vec3;

    const BLOCKS: &str = r#"
        [[blocks]]
        name = "stone"
        id = 1

        [[blocks]]
        name = "glass"
        id = 2
        opaque = false
        layer = "translucent"
        cull = { east = "same_or_opaque" }

        [[blocks]]
        name = "water"
        id = 3
        opaque = false
        layer = "translucent"
        cull = { east = "same", west = "always" }
    "#;

    fn east() -> FaceDescriptor {
        FaceDescriptor::from_box(Direction::PosX, Vec3::ZERO, Vec3::ONE)
    }

    #[test]
    fn default_rule() {
        let reg = BlockRegistry::from_toml_str(BLOCKS).unwrap();
        let c = FaceCuller::new(&reg);
        let f = east();
        assert!(!c.should_render(1, 1, &f));
        assert!(c.should_render(1, AIR, &f));
        assert!(c.should_render(1, 2, &f));
        let mut slab_side = f.clone();
        slab_side.flags.insert(FaceFlags::NON_FULL);
        assert!(c.should_render(1, 1, &slab_side));
    }

    #[test]
    fn custom_rules_override() {
        let reg = BlockRegistry::from_toml_str(BLOCKS).unwrap();
        let c = FaceCuller::new(&reg);
        let glass_east = &reg.model(2).faces[Direction::PosX.index()];
        assert!(glass_east.flags.contains(FaceFlags::CUSTOM_CULL));
        assert!(!c.should_render(2, 2, glass_east));
        assert!(!c.should_render(2, 1, glass_east));
        assert!(c.should_render(2, 3, glass_east));

        let water = reg.model(3);
        let water_east = &water.faces[Direction::PosX.index()];
        let water_west = &water.faces[Direction::NegX.index()];
        assert!(!c.should_render(3, 3, water_east));
        assert!(c.should_render(3, 1, water_east));
        assert!(c.should_render(3, 1, water_west));
        assert!(c.should_render(3, 3, water_west));
    }

    #[test]
    fn decorative_faces_ignore_neighbors() {
        let reg = BlockRegistry::from_toml_str(BLOCKS).unwrap();
        let c = FaceCuller::new(&reg);
        let deco = FaceDescriptor::decorative([Vec3::ZERO, Vec3::ONE, Vec3::ONE, Vec3::ZERO], cubelit_blocks::UvRect::FULL);
        assert!(c.should_render(1, 1, &deco));
        assert!(!c.should_render(AIR, 1, &deco));
    }
}
