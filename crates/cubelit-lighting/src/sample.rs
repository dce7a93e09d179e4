use cubelit_blocks::CornerSample;

/// Occlusion bits and light bytes of the 3x3x3 cells around one voxel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalSample {
    occ: u32,
    light: [u8; 27],
}

impl Default for LocalSample {
    fn default() -> Self {
        Self {
            occ: 0,
            light: [0; 27],
        }
    }
}

impl LocalSample {
    #[inline]
    pub const fn index(dx: i32, dy: i32, dz: i32) -> usize {
        ((dy + 1) * 9 + (dz + 1) * 3 + (dx + 1)) as usize
    }

    #[inline]
    fn index_of(off: [i8; 3]) -> usize {
        Self::index(off[0] as i32, off[1] as i32, off[2] as i32)
    }

    /// Fills every cell from `f(dx, dy, dz) -> (occludes, light)`.
    pub fn from_fn(mut f: impl FnMut(i32, i32, i32) -> (bool, u8)) -> Self {
        let mut s = Self::default();
        s.refill(&mut f);
        s
    }

    /// Reuses this sample for the next voxel.
    pub fn refill(&mut self, mut f: impl FnMut(i32, i32, i32) -> (bool, u8)) {
        self.occ = 0;
        for dy in -1..=1 {
            for dz in -1..=1 {
                for dx in -1..=1 {
                    let i = Self::index(dx, dy, dz);
                    let (occ, light) = f(dx, dy, dz);
                    self.occ |= (occ as u32) << i;
                    self.light[i] = light;
                }
            }
        }
    }

    #[inline]
    pub fn occludes(&self, off: [i8; 3]) -> bool {
        (self.occ >> Self::index_of(off)) & 1 != 0
    }

    #[inline]
    pub fn light(&self, off: [i8; 3]) -> u8 {
        self.light[Self::index_of(off)]
    }

    /// Occlusion bits of the edge, edge and diagonal cells of one corner.
    #[inline]
    pub fn corner_bits(&self, c: &CornerSample) -> [bool; 3] {
        [
            self.occludes(c.edge_a),
            self.occludes(c.edge_b),
            self.occludes(c.diagonal),
        ]
    }

    #[inline]
    pub fn corner_lights(&self, c: &CornerSample) -> [u8; 3] {
        [self.light(c.edge_a), self.light(c.edge_b), self.light(c.diagonal)]
    }
}
