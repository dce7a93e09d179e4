use cubelit_geom::{Aabb, Vec3};
use proptest::prelude::*;

fn coord() -> impl Strategy<Value = f32> {
    -1000.0f32..1000.0
}

fn arb_vec3() -> impl Strategy<Value = Vec3> {
    (coord(), coord(), coord()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

proptest! {
    // Cross product is orthogonal to both operands
    #[test]
    fn cross_is_orthogonal(a in arb_vec3(), b in arb_vec3()) {
        let c = a.cross(b);
        let scale = 1.0 + a.dot(a).sqrt() * b.dot(b).sqrt();
        prop_assert!(c.dot(a).abs() <= 1e-3 * scale * scale);
        prop_assert!(c.dot(b).abs() <= 1e-3 * scale * scale);
    }

    // Growing an empty box by a set of points yields a box containing all of them
    #[test]
    fn grow_contains_all_points(pts in prop::collection::vec(arb_vec3(), 1..16)) {
        let mut bb = Aabb::EMPTY;
        prop_assert!(bb.is_empty());
        for p in &pts { bb.grow(*p); }
        prop_assert!(!bb.is_empty());
        for p in &pts {
            prop_assert!(bb.min.x <= p.x && bb.min.y <= p.y && bb.min.z <= p.z);
            prop_assert!(p.x <= bb.max.x && p.y <= bb.max.y && p.z <= bb.max.z);
        }
    }
}

#[test]
fn axis_access_matches_fields() {
    let v = Vec3::new(1.0, 2.0, 3.0);
    assert_eq!(v.axis(0), 1.0);
    assert_eq!(v.axis(1), 2.0);
    assert_eq!(v.axis(2), 3.0);
    assert_eq!(v.with_axis(1, 9.0), Vec3::new(1.0, 9.0, 3.0));
}
