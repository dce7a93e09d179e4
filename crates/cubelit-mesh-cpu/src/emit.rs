use cubelit_blocks::FaceDescriptor;
use cubelit_geom::{Aabb, Vec3};
use cubelit_lighting::CornerLight;

use crate::mesh_build::MeshBuild;
use crate::vertex::PackedVertex;

/// Occlusion plus darkness of a corner; higher is darker.
#[inline]
pub fn corner_weight(c: CornerLight) -> u8 {
    c.ao + (15 - c.level())
}

/// Split along `1-3` instead of `0-2` when corners 0 and 2 are darker, so the seam follows
/// the brighter diagonal and interpolation stays symmetric.
#[inline]
pub fn should_rotate(lights: &[CornerLight; 4]) -> bool {
    let a = corner_weight(lights[0]) as u16 + corner_weight(lights[2]) as u16;
    let b = corner_weight(lights[1]) as u16 + corner_weight(lights[3]) as u16;
    a > b
}

/// Appends one face of the voxel at `origin`. `atlas` is the tile rect the face's local
/// UV box maps into.
pub fn emit_face(
    out: &mut MeshBuild,
    bounds: &mut Aabb,
    origin: Vec3,
    face: &FaceDescriptor,
    atlas: ([f32; 2], [f32; 2]),
    lights: [CornerLight; 4],
) {
    let (amin, amax) = atlas;
    let mut verts = [PackedVertex::default(); 4];
    for (i, v) in verts.iter_mut().enumerate() {
        let p = origin + face.corners[i];
        bounds.grow(p);
        let local = face.uv.corner(i);
        let uv = [
            amin[0] + local[0] * (amax[0] - amin[0]),
            amin[1] + local[1] * (amax[1] - amin[1]),
        ];
        *v = PackedVertex::new(p, uv, face.direction, lights[i].ao, lights[i].light);
    }
    if should_rotate(&lights) {
        verts.rotate_left(1);
    }
    out.push_quad(verts);
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubelit_blocks::Direction;

    fn cl(ao: u8, light: u8) -> CornerLight {
        CornerLight { ao, light }
    }

    #[test]
    fn uniform_corners_keep_order() {
        assert!(!should_rotate(&[cl(1, 0xF0); 4]));
    }

    #[test]
    fn dark_diagonal_rotates() {
        let lights = [cl(3, 0x20), cl(0, 0xF0), cl(3, 0x20), cl(0, 0xF0)];
        assert!(should_rotate(&lights));
        let lights = [cl(0, 0xF0), cl(3, 0x20), cl(0, 0xF0), cl(3, 0x20)];
        assert!(!should_rotate(&lights));
    }

    #[test]
    fn rotated_quad_keeps_facing() {
        let face = FaceDescriptor::from_box(Direction::PosY, Vec3::ZERO, Vec3::ONE);
        let mut out = MeshBuild::default();
        let mut bounds = Aabb::EMPTY;
        let lights = [cl(3, 0x00), cl(0, 0xF0), cl(3, 0x00), cl(0, 0xF0)];
        emit_face(&mut out, &mut bounds, Vec3::new(2.0, 3.0, 4.0), &face, ([0.0; 2], [1.0; 2]), lights);
        assert_eq!(out.quad_count(), 1);
        assert_eq!(bounds, Aabb::new(Vec3::new(2.0, 4.0, 4.0), Vec3::new(3.0, 4.0, 5.0)));
        // First vertex is the old corner 1.
        assert_eq!(out.vertices[0].ao(), 0);
        for tri in out.indices.chunks(3) {
            let p: Vec<Vec3> = tri.iter().map(|&i| out.vertices[i as usize].decode().pos).collect();
            let n = (p[1] - p[0]).cross(p[2] - p[0]);
            assert!(n.y > 0.0);
        }
    }
}
