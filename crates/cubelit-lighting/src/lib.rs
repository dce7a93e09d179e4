//! Per-corner ambient occlusion and smooth light blending.
#![forbid(unsafe_code)]

mod batched;
mod evaluator;
mod sample;

pub use batched::evaluate_corners_batched;
pub use evaluator::{FaceInputs, evaluate_corner, evaluate_corners};
pub use sample::LocalSample;

/// Largest AO level; both edge cells occluded always lands here.
pub const AO_MAX: u8 = 3;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LightSettings {
    pub smooth_lighting: bool,
    pub ambient_occlusion: bool,
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            smooth_lighting: true,
            ambient_occlusion: true,
        }
    }
}

impl LightSettings {
    /// Corners need the 3x3x3 neighborhood only if one of the features is on.
    #[inline]
    pub fn needs_sample(&self) -> bool {
        self.smooth_lighting || self.ambient_occlusion
    }
}

/// AO level (0..=3) and packed light byte for one vertex.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CornerLight {
    pub ao: u8,
    pub light: u8,
}

impl CornerLight {
    #[inline]
    pub const fn flat(light: u8) -> Self {
        Self { ao: 0, light }
    }

    /// Brighter of the two channels.
    #[inline]
    pub fn level(self) -> u8 {
        (self.light >> 4).max(self.light & 0x0F)
    }
}
