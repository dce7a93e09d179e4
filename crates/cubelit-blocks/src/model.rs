//! Face descriptors and block models.
//!
//! A model is a flat list of faces. Each directional face carries its four corners in
//! counter-clockwise order seen from outside, a tile-local UV box, flags, and the grid
//! offsets (relative to the owning voxel) that the AO/light evaluator samples for it.

use std::ops::BitOr;

use cubelit_geom::{Aabb, Vec3};

use crate::types::Direction;

/// Face flags packed into one byte.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FaceFlags(pub u8);

impl FaceFlags {
    pub const NONE: FaceFlags = FaceFlags(0);
    /// Corners take AO 0 and the flat light of the sample cell.
    pub const NO_AO: FaceFlags = FaceFlags(1 << 0);
    /// Face does not cover its whole cube side; a full neighbor does not hide it.
    pub const NON_FULL: FaceFlags = FaceFlags(1 << 1);
    /// Visibility comes from the block's per-direction cull rule.
    pub const CUSTOM_CULL: FaceFlags = FaceFlags(1 << 2);

    #[inline]
    pub fn contains(self, other: FaceFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: FaceFlags) {
        self.0 |= other.0;
    }
}

impl BitOr for FaceFlags {
    type Output = FaceFlags;
    #[inline]
    fn bitor(self, rhs: FaceFlags) -> FaceFlags {
        FaceFlags(self.0 | rhs.0)
    }
}

/// Tile-local texture box, `0..1` on both axes, `v` growing downwards.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UvRect {
    pub min: [f32; 2],
    pub max: [f32; 2],
}

impl UvRect {
    pub const FULL: UvRect = UvRect {
        min: [0.0, 0.0],
        max: [1.0, 1.0],
    };

    /// UV for canonical corner `i`: bottom-left, bottom-right, top-right, top-left.
    #[inline]
    pub fn corner(&self, i: usize) -> [f32; 2] {
        match i & 3 {
            0 => [self.min[0], self.max[1]],
            1 => [self.max[0], self.max[1]],
            2 => [self.max[0], self.min[1]],
            _ => [self.min[0], self.min[1]],
        }
    }
}

/// Grid offsets of the three cells touching one face corner.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CornerSample {
    pub edge_a: [i8; 3],
    pub edge_b: [i8; 3],
    pub diagonal: [i8; 3],
}

#[derive(Clone, Debug, PartialEq)]
pub struct FaceDescriptor {
    pub direction: Direction,
    /// Block-local corner positions.
    pub corners: [Vec3; 4],
    pub uv: UvRect,
    pub flags: FaceFlags,
    /// Cell whose light is the face's own light.
    pub light_offset: [i8; 3],
    pub corner_samples: [CornerSample; 4],
}

impl FaceDescriptor {
    /// Face of the axis-aligned box `[min, max]` (block-local units) on side `dir`.
    pub fn from_box(dir: Direction, min: Vec3, max: Vec3) -> FaceDescriptor {
        let Some(n_axis) = dir.axis() else {
            return Self::decorative([min, min, max, max], UvRect::FULL);
        };
        let ((u_axis, u_sign), (v_axis, v_sign)) = dir.tangents();
        let plane = if dir.is_positive() { max[n_axis] } else { min[n_axis] };
        let pick = |axis: usize, sign: i8, high: bool| -> f32 {
            if (sign > 0) == high { max[axis] } else { min[axis] }
        };
        let mut corners = [Vec3::ZERO; 4];
        for (i, (a, b)) in [(false, false), (true, false), (true, true), (false, true)]
            .into_iter()
            .enumerate()
        {
            corners[i] = Vec3::ZERO
                .with_axis(n_axis, plane)
                .with_axis(u_axis, pick(u_axis, u_sign, a))
                .with_axis(v_axis, pick(v_axis, v_sign, b));
        }

        // Texture follows geometry so partial faces show the matching part of the tile.
        let along = |axis: usize, sign: i8, c: f32| if sign > 0 { c } else { 1.0 - c };
        let (u0, u1) = {
            let a = along(u_axis, u_sign, min[u_axis]);
            let b = along(u_axis, u_sign, max[u_axis]);
            (a.min(b), a.max(b))
        };
        let (t0, t1) = {
            let a = along(v_axis, v_sign, min[v_axis]);
            let b = along(v_axis, v_sign, max[v_axis]);
            (a.min(b), a.max(b))
        };
        let uv = UvRect {
            min: [u0, 1.0 - t1],
            max: [u1, 1.0 - t0],
        };

        let on_boundary = if dir.is_positive() {
            plane >= 1.0
        } else {
            plane <= 0.0
        };
        let covers = min[u_axis] <= 0.0
            && max[u_axis] >= 1.0
            && min[v_axis] <= 0.0
            && max[v_axis] >= 1.0;
        let mut flags = FaceFlags::NONE;
        if !(on_boundary && covers) {
            flags.insert(FaceFlags::NON_FULL);
        }
        let (light_offset, corner_samples) = sample_offsets(dir, &corners, on_boundary);
        FaceDescriptor {
            direction: dir,
            corners,
            uv,
            flags,
            light_offset,
            corner_samples,
        }
    }

    /// Free-standing quad (cross, crop and fire planes). Sampled flat from the owning cell.
    pub fn decorative(corners: [Vec3; 4], uv: UvRect) -> FaceDescriptor {
        FaceDescriptor {
            direction: Direction::None,
            corners,
            uv,
            flags: FaceFlags::NO_AO | FaceFlags::NON_FULL,
            light_offset: [0, 0, 0],
            corner_samples: [CornerSample::default(); 4],
        }
    }

    /// Same quad seen from the other side.
    pub fn flipped(&self) -> FaceDescriptor {
        let c = self.corners;
        let mut out = self.clone();
        out.corners = [c[1], c[0], c[3], c[2]];
        out.direction = self.direction.opposite();
        out
    }
}

/// Light cell plus the three AO cells per corner. Boundary faces sample the layer in
/// front of the face; inset faces sample the owning cell's own layer.
fn sample_offsets(
    dir: Direction,
    corners: &[Vec3; 4],
    on_boundary: bool,
) -> ([i8; 3], [CornerSample; 4]) {
    let (dx, dy, dz) = dir.delta();
    let layer: [i8; 3] = if on_boundary {
        [dx as i8, dy as i8, dz as i8]
    } else {
        [0, 0, 0]
    };
    let ((u_axis, _), (v_axis, _)) = dir.tangents();
    let mut samples = [CornerSample::default(); 4];
    for (i, c) in corners.iter().enumerate() {
        let su: i8 = if c[u_axis] >= 0.5 { 1 } else { -1 };
        let sv: i8 = if c[v_axis] >= 0.5 { 1 } else { -1 };
        let mut edge_a = layer;
        edge_a[u_axis] += su;
        let mut edge_b = layer;
        edge_b[v_axis] += sv;
        let mut diagonal = edge_a;
        diagonal[v_axis] += sv;
        samples[i] = CornerSample {
            edge_a,
            edge_b,
            diagonal,
        };
    }
    (layer, samples)
}

/// Box in 1/16 block units, as written in block configs.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ModelBox {
    pub from: [f32; 3],
    pub to: [f32; 3],
}

impl ModelBox {
    #[inline]
    pub fn is_valid(&self) -> bool {
        (0..3).all(|a| {
            self.from[a] >= 0.0 && self.to[a] <= 16.0 && self.from[a] < self.to[a]
        })
    }

    #[inline]
    pub fn min(&self) -> Vec3 {
        Vec3::new(self.from[0], self.from[1], self.from[2]) * (1.0 / 16.0)
    }

    #[inline]
    pub fn max(&self) -> Vec3 {
        Vec3::new(self.to[0], self.to[1], self.to[2]) * (1.0 / 16.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockModel {
    pub faces: Vec<FaceDescriptor>,
    pub bounds: Aabb,
}

impl BlockModel {
    pub fn unit_cube() -> BlockModel {
        Self::from_boxes(&[ModelBox {
            from: [0.0; 3],
            to: [16.0; 3],
        }])
    }

    /// Six faces per box. Faces of one box hidden inside another box are kept; the
    /// configs in practice use disjoint boxes.
    pub fn from_boxes(boxes: &[ModelBox]) -> BlockModel {
        let mut faces = Vec::with_capacity(boxes.len() * 6);
        let mut bounds = Aabb::EMPTY;
        for b in boxes {
            let (min, max) = (b.min(), b.max());
            bounds.grow(min);
            bounds.grow(max);
            for dir in Direction::AXES {
                faces.push(FaceDescriptor::from_box(dir, min, max));
            }
        }
        BlockModel { faces, bounds }
    }

    /// Two crossed diagonal planes, both sides.
    pub fn cross() -> BlockModel {
        const INSET: f32 = 0.15;
        let (lo, hi) = (INSET, 1.0 - INSET);
        let a = FaceDescriptor::decorative(
            [
                Vec3::new(lo, 0.0, lo),
                Vec3::new(hi, 0.0, hi),
                Vec3::new(hi, 1.0, hi),
                Vec3::new(lo, 1.0, lo),
            ],
            UvRect::FULL,
        );
        let b = FaceDescriptor::decorative(
            [
                Vec3::new(lo, 0.0, hi),
                Vec3::new(hi, 0.0, lo),
                Vec3::new(hi, 1.0, lo),
                Vec3::new(lo, 1.0, hi),
            ],
            UvRect::FULL,
        );
        Self::double_sided(vec![a, b])
    }

    /// Four planes in a `#` pattern, both sides, slightly lowered like farmland crops.
    pub fn crop() -> BlockModel {
        const TOP: f32 = 15.0 / 16.0;
        let mut planes = Vec::with_capacity(4);
        for off in [0.25f32, 0.75] {
            planes.push(FaceDescriptor::decorative(
                [
                    Vec3::new(off, 0.0, 0.0),
                    Vec3::new(off, 0.0, 1.0),
                    Vec3::new(off, TOP, 1.0),
                    Vec3::new(off, TOP, 0.0),
                ],
                UvRect::FULL,
            ));
            planes.push(FaceDescriptor::decorative(
                [
                    Vec3::new(0.0, 0.0, off),
                    Vec3::new(1.0, 0.0, off),
                    Vec3::new(1.0, TOP, off),
                    Vec3::new(0.0, TOP, off),
                ],
                UvRect::FULL,
            ));
        }
        Self::double_sided(planes)
    }

    fn double_sided(planes: Vec<FaceDescriptor>) -> BlockModel {
        let mut faces = Vec::with_capacity(planes.len() * 2);
        let mut bounds = Aabb::EMPTY;
        for p in planes {
            for c in p.corners {
                bounds.grow(c);
            }
            faces.push(p.flipped());
            faces.push(p);
        }
        BlockModel { faces, bounds }
    }

    /// True when every face is a full boundary face (a plain cube).
    pub fn is_full_cube(&self) -> bool {
        self.faces.len() == 6
            && self
                .faces
                .iter()
                .all(|f| f.direction != Direction::None && !f.flags.contains(FaceFlags::NON_FULL))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normal_of(f: &FaceDescriptor) -> Vec3 {
        let c = f.corners;
        (c[1] - c[0]).cross(c[2] - c[0])
    }

    #[test]
    fn unit_cube_faces_wind_outward() {
        let m = BlockModel::unit_cube();
        assert!(m.is_full_cube());
        for f in &m.faces {
            let (dx, dy, dz) = f.direction.delta();
            let n = normal_of(f);
            assert!(n.dot(Vec3::from_cell(dx, dy, dz)) > 0.0, "{:?}", f.direction);
            assert_eq!(f.light_offset, [dx as i8, dy as i8, dz as i8]);
        }
    }

    #[test]
    fn corner_samples_touch_the_corner() {
        let f = FaceDescriptor::from_box(Direction::PosY, Vec3::ZERO, Vec3::ONE);
        for (i, s) in f.corner_samples.iter().enumerate() {
            let c = f.corners[i];
            // Edge cells differ from the light cell on exactly one in-plane axis, in the
            // direction of the corner.
            for cell in [s.edge_a, s.edge_b, s.diagonal] {
                assert_eq!(cell[1], 1);
                if cell[0] != 0 {
                    assert_eq!(cell[0] > 0, c.x > 0.5);
                }
                if cell[2] != 0 {
                    assert_eq!(cell[2] > 0, c.z > 0.5);
                }
            }
            assert_ne!(s.diagonal[0], 0);
            assert_ne!(s.diagonal[2], 0);
        }
    }

    #[test]
    fn slab_faces_are_flagged() {
        let m = BlockModel::from_boxes(&[ModelBox {
            from: [0.0, 0.0, 0.0],
            to: [16.0, 8.0, 16.0],
        }]);
        assert!(!m.is_full_cube());
        let top = m.faces.iter().find(|f| f.direction == Direction::PosY).unwrap();
        let bottom = m.faces.iter().find(|f| f.direction == Direction::NegY).unwrap();
        let side = m.faces.iter().find(|f| f.direction == Direction::PosX).unwrap();
        assert!(top.flags.contains(FaceFlags::NON_FULL));
        assert_eq!(top.light_offset, [0, 0, 0]);
        assert!(!bottom.flags.contains(FaceFlags::NON_FULL));
        assert_eq!(bottom.light_offset, [0, -1, 0]);
        assert!(side.flags.contains(FaceFlags::NON_FULL));
        // Lower half of the tile.
        assert_eq!(side.uv.min[1], 0.5);
        assert_eq!(side.uv.max[1], 1.0);
    }

    #[test]
    fn decorative_planes_are_double_sided() {
        let m = BlockModel::cross();
        assert_eq!(m.faces.len(), 4);
        for pair in m.faces.chunks(2) {
            let n0 = normal_of(&pair[0]);
            let n1 = normal_of(&pair[1]);
            assert!(n0.dot(n1) < 0.0);
            assert!(pair[0].flags.contains(FaceFlags::NO_AO));
        }
        assert_eq!(BlockModel::crop().faces.len(), 8);
    }
}
