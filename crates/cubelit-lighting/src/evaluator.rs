use cubelit_blocks::CornerSample;

use crate::{AO_MAX, CornerLight, LightSettings, LocalSample};

/// Everything one face's four corners read from the neighborhood.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FaceInputs {
    pub face_light: u8,
    /// Per corner: edge a, edge b, diagonal.
    pub occ: [[bool; 3]; 4],
    pub light: [[u8; 3]; 4],
}

impl FaceInputs {
    pub fn gather(
        sample: &LocalSample,
        light_offset: [i8; 3],
        corners: &[CornerSample; 4],
    ) -> FaceInputs {
        let mut out = FaceInputs {
            face_light: sample.light(light_offset),
            ..Default::default()
        };
        for (i, c) in corners.iter().enumerate() {
            out.occ[i] = sample.corner_bits(c);
            out.light[i] = sample.corner_lights(c);
        }
        out
    }
}

/// Reference evaluation of one corner.
pub fn evaluate_corner(
    face_light: u8,
    occ: [bool; 3],
    light: [u8; 3],
    settings: LightSettings,
) -> CornerLight {
    let ao = if settings.ambient_occlusion {
        if occ[0] && occ[1] {
            AO_MAX
        } else {
            occ.iter().filter(|&&o| o).count() as u8
        }
    } else {
        0
    };
    let light = if settings.smooth_lighting {
        let mut sky = (face_light >> 4) as u32;
        let mut block = (face_light & 0x0F) as u32;
        let mut n = 1u32;
        for k in 0..3 {
            if !occ[k] {
                sky += (light[k] >> 4) as u32;
                block += (light[k] & 0x0F) as u32;
                n += 1;
            }
        }
        (((sky / n) as u8) << 4) | (block / n) as u8
    } else {
        face_light
    };
    CornerLight { ao, light }
}

/// Scalar path over all four corners.
pub fn evaluate_corners(inputs: &FaceInputs, settings: LightSettings) -> [CornerLight; 4] {
    std::array::from_fn(|i| evaluate_corner(inputs.face_light, inputs.occ[i], inputs.light[i], settings))
}
