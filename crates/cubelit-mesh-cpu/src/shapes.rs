//! Geometry that depends on the surroundings and can't live in a static block model.

use cubelit_blocks::{FaceDescriptor, UvRect};
use cubelit_geom::Vec3;

/// Gap between a fire sheet and the block it clings to.
const FIRE_OFFSET: f32 = 1.0 / 16.0;

/// Full opaque cubes around a fire cell.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FireSupport {
    pub below: bool,
    pub pos_x: bool,
    pub neg_x: bool,
    pub pos_z: bool,
    pub neg_z: bool,
}

impl FireSupport {
    #[inline]
    fn any_side(&self) -> bool {
        self.pos_x || self.neg_x || self.pos_z || self.neg_z
    }
}

/// Fills `out` with the fire sheets for one cell: a crossed pair when burning on the
/// ground (or hanging in the air), otherwise one sheet hugging each supporting wall.
pub fn fire_faces(support: FireSupport, out: &mut Vec<FaceDescriptor>) {
    out.clear();
    if support.below || !support.any_side() {
        push_double(out, [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]);
        push_double(out, [
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 1.0),
        ]);
        return;
    }
    let (lo, hi) = (FIRE_OFFSET, 1.0 - FIRE_OFFSET);
    if support.pos_x {
        push_double(out, x_sheet(hi));
    }
    if support.neg_x {
        push_double(out, x_sheet(lo));
    }
    if support.pos_z {
        push_double(out, z_sheet(hi));
    }
    if support.neg_z {
        push_double(out, z_sheet(lo));
    }
}

fn x_sheet(x: f32) -> [Vec3; 4] {
    [
        Vec3::new(x, 0.0, 0.0),
        Vec3::new(x, 0.0, 1.0),
        Vec3::new(x, 1.0, 1.0),
        Vec3::new(x, 1.0, 0.0),
    ]
}

fn z_sheet(z: f32) -> [Vec3; 4] {
    [
        Vec3::new(0.0, 0.0, z),
        Vec3::new(1.0, 0.0, z),
        Vec3::new(1.0, 1.0, z),
        Vec3::new(0.0, 1.0, z),
    ]
}

fn push_double(out: &mut Vec<FaceDescriptor>, corners: [Vec3; 4]) {
    let face = FaceDescriptor::decorative(corners, UvRect::FULL);
    out.push(face.flipped());
    out.push(face);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grounded_fire_crosses() {
        let mut out = Vec::new();
        fire_faces(FireSupport { below: true, pos_x: true, ..Default::default() }, &mut out);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn wall_fire_hugs_walls() {
        let mut out = Vec::new();
        fire_faces(FireSupport { pos_x: true, neg_z: true, ..Default::default() }, &mut out);
        assert_eq!(out.len(), 4);
        assert!(out[..2].iter().all(|f| f.corners.iter().all(|c| c.x == 1.0 - FIRE_OFFSET)));
        assert!(out[2..].iter().all(|f| f.corners.iter().all(|c| c.z == FIRE_OFFSET)));
    }
}
