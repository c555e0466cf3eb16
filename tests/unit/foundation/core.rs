use super::*;

fn close(a: DVec3, b: DVec3) -> bool {
    (a - b).abs().max_element() < 1e-9
}

#[test]
fn axis_reflection_flips_one_component() {
    let p = DVec3::new(1.0, 2.0, 3.0);
    assert_eq!(Axis::X.reflect_point(p), DVec3::new(-1.0, 2.0, 3.0));
    assert_eq!(Axis::Y.reflect_point(p), DVec3::new(1.0, -2.0, 3.0));
    assert_eq!(Axis::Z.reflect_point(p), DVec3::new(1.0, 2.0, -3.0));
}

#[test]
fn rotation_reflection_keeps_axis_angle() {
    let r = DVec3::new(10.0, 20.0, 30.0);
    assert_eq!(Axis::X.reflect_rotation(r), DVec3::new(10.0, -20.0, -30.0));
    assert_eq!(Axis::Y.reflect_rotation(r), DVec3::new(-10.0, 20.0, -30.0));
    assert_eq!(Axis::Z.reflect_rotation(r), DVec3::new(-10.0, -20.0, 30.0));
}

#[test]
fn rotate_orders_roundtrip_through_quaternions() {
    let r = DVec3::new(12.0, -25.0, 40.0);
    for order in [
        RotateOrder::Xyz,
        RotateOrder::Yzx,
        RotateOrder::Zxy,
        RotateOrder::Xzy,
        RotateOrder::Yxz,
        RotateOrder::Zyx,
    ] {
        let back = order.euler_degrees(order.to_quat(r));
        assert!(close(back, r), "{order:?}: {back:?}");
    }
}

#[test]
fn xyz_order_applies_x_first() {
    let q = RotateOrder::Xyz.to_quat(DVec3::new(90.0, 0.0, 90.0));
    // X first leaves +X alone, then Z turns it into +Y.
    let v = q * DVec3::X;
    assert!(close(v, DVec3::Y), "{v:?}");
}

#[test]
fn matrix_roundtrip_preserves_trs() {
    let t = Transform {
        translate: DVec3::new(1.0, 2.0, 3.0),
        rotate: DVec3::new(0.0, 45.0, 10.0),
        scale: DVec3::new(1.0, 2.0, 1.0),
        ..Transform::default()
    };
    let mut back = Transform::default();
    back.set_matrix(t.matrix());
    assert!(close(back.translate, t.translate));
    assert!(close(back.rotate, t.rotate));
    assert!(close(back.scale, t.scale));
}

#[test]
fn full_mirror_mode_reflects_scale() {
    let mut t = Transform::at(DVec3::new(2.0, 0.0, 0.0));
    assert_eq!(t.reflected(Axis::X).scale, DVec3::ONE);
    t.mirror_mode = MirrorMode::Full;
    assert_eq!(t.reflected(Axis::X).scale, DVec3::new(-1.0, 1.0, 1.0));
    assert_eq!(t.reflected(Axis::X).translate, DVec3::new(-2.0, 0.0, 0.0));
}

#[test]
fn transform_serde_defaults_metadata() {
    let json = r#"{"translate":[1,0,0],"rotate":[0,0,0],"scale":[1,1,1]}"#;
    let t: Transform = serde_json::from_str(json).unwrap();
    assert_eq!(t.rotate_order, RotateOrder::Xyz);
    assert_eq!(t.mirror_mode, MirrorMode::TranslateRotate);
    assert_eq!(t.offset_count, 0);
}
