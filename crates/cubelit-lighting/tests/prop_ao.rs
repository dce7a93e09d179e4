use cubelit_lighting::{
    AO_MAX, CornerLight, FaceInputs, LightSettings, evaluate_corner, evaluate_corners,
    evaluate_corners_batched,
};
use proptest::prelude::*;

fn settings() -> impl Strategy<Value = LightSettings> {
    (any::<bool>(), any::<bool>()).prop_map(|(smooth_lighting, ambient_occlusion)| LightSettings {
        smooth_lighting,
        ambient_occlusion,
    })
}

fn face_inputs() -> impl Strategy<Value = FaceInputs> {
    (
        any::<u8>(),
        prop::array::uniform4(prop::array::uniform3(any::<bool>())),
        prop::array::uniform4(prop::array::uniform3(any::<u8>())),
    )
        .prop_map(|(face_light, occ, light)| FaceInputs {
            face_light,
            occ,
            light,
        })
}

const ON: LightSettings = LightSettings {
    smooth_lighting: true,
    ambient_occlusion: true,
};

proptest! {
    // Batched lanes match the reference corner by corner.
    #[test]
    fn batched_matches_scalar(inputs in face_inputs(), s in settings()) {
        prop_assert_eq!(evaluate_corners_batched(&inputs, s), evaluate_corners(&inputs, s));
    }

    // Adding an occluder never lowers AO.
    #[test]
    fn ao_monotonic(occ in prop::array::uniform3(any::<bool>()), extra in 0usize..3, light in prop::array::uniform3(any::<u8>())) {
        let before = evaluate_corner(0xF0, occ, light, ON);
        let mut more = occ;
        more[extra] = true;
        let after = evaluate_corner(0xF0, more, light, ON);
        prop_assert!(after.ao >= before.ao);
        prop_assert!(after.ao <= AO_MAX);
    }

    #[test]
    fn ao_floor_ignores_diagonal(diag in any::<bool>(), light in prop::array::uniform3(any::<u8>()), face in any::<u8>()) {
        let c = evaluate_corner(face, [true, true, diag], light, ON);
        prop_assert_eq!(c.ao, AO_MAX);
    }

    // Each channel lands within the range of the values that took part.
    #[test]
    fn blend_within_bounds(face in any::<u8>(), occ in prop::array::uniform3(any::<bool>()), light in prop::array::uniform3(any::<u8>())) {
        let c = evaluate_corner(face, occ, light, ON);
        for shift in [4u8, 0] {
            let ch = |v: u8| (v >> shift) & 0x0F;
            let mut lo = ch(face);
            let mut hi = ch(face);
            for k in 0..3 {
                if !occ[k] {
                    lo = lo.min(ch(light[k]));
                    hi = hi.max(ch(light[k]));
                }
            }
            let got = ch(c.light);
            prop_assert!(got >= lo && got <= hi, "channel {} = {} outside [{}, {}]", shift, got, lo, hi);
        }
    }

    #[test]
    fn toggles_off_is_flat(inputs in face_inputs()) {
        let off = LightSettings { smooth_lighting: false, ambient_occlusion: false };
        let expect = [CornerLight::flat(inputs.face_light); 4];
        prop_assert_eq!(evaluate_corners(&inputs, off), expect);
        prop_assert_eq!(evaluate_corners_batched(&inputs, off), expect);
    }
}
