// Four corners evaluated lane-wise without branches. Must agree bit-for-bit with
// `evaluate_corners`.

use crate::{CornerLight, FaceInputs, LightSettings};

const LANES: usize = 4;

// 65536 / n rounded up; exact for the sums reachable here (at most 4 * 15).
const RECIP: [u32; 5] = [0, 65536, 32768, 21846, 16384];

#[inline]
fn div_small(sum: u32, n: u32) -> u32 {
    (sum * RECIP[n as usize]) >> 16
}

pub fn evaluate_corners_batched(inputs: &FaceInputs, settings: LightSettings) -> [CornerLight; 4] {
    let ao_mask = if settings.ambient_occlusion { 0xFFu32 } else { 0 };
    let smooth = settings.smooth_lighting as u32;

    let mut a = [0u32; LANES];
    let mut b = [0u32; LANES];
    let mut d = [0u32; LANES];
    for l in 0..LANES {
        a[l] = inputs.occ[l][0] as u32;
        b[l] = inputs.occ[l][1] as u32;
        d[l] = inputs.occ[l][2] as u32;
    }

    let mut ao = [0u32; LANES];
    for l in 0..LANES {
        // Both edges set means the sum is already 2 or 3; OR-ing 3 pins it to 3.
        ao[l] = ((a[l] + b[l] + d[l]) | ((a[l] & b[l]) * 3)) & ao_mask;
    }

    let face_sky = (inputs.face_light >> 4) as u32;
    let face_block = (inputs.face_light & 0x0F) as u32;
    let mut sky = [face_sky; LANES];
    let mut block = [face_block; LANES];
    let mut n = [1u32; LANES];
    for k in 0..3 {
        for l in 0..LANES {
            let open = (1 - inputs.occ[l][k] as u32) * smooth;
            let v = inputs.light[l][k] as u32;
            sky[l] += open * (v >> 4);
            block[l] += open * (v & 0x0F);
            n[l] += open;
        }
    }

    let mut out = [CornerLight::default(); LANES];
    for l in 0..LANES {
        let s = div_small(sky[l], n[l]);
        let bl = div_small(block[l], n[l]);
        out[l] = CornerLight {
            ao: ao[l] as u8,
            light: ((s << 4) | bl) as u8,
        };
    }
    out
}
