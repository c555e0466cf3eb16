use super::*;
use crate::foundation::core::{Space, Transform};
use crate::parts::brow::lid_points;
use crate::rename::{Resolution, ScriptedResolver};
use crate::scene::transform::read_transform;

fn close(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < 1e-6
}

fn world(ws: &Workspace, node: &str) -> Transform {
    read_transform(ws.scene(), node, Space::World).unwrap()
}

fn left_arm(ws: &mut Workspace, registry: &PartRegistry) -> Part {
    let mut arm = registry.instantiate("arm").unwrap();
    arm.update_options(ws, [("parent", "L_clavicle_JNT")]).unwrap();
    assert!(arm.create_guide(ws).unwrap());
    let mut t = ws.scene().transform("L_arm_elbow_PLC").unwrap();
    t.translate = Vec3::new(5.5, 14.0, -1.0);
    t.rotate = Vec3::new(10.0, 20.0, 30.0);
    ws.scene_mut().set_transform("L_arm_elbow_PLC", t).unwrap();
    arm
}

#[test]
fn mirrored_values_swap_side_and_references() {
    let registry = PartRegistry::with_builtins();
    let mut ws = Workspace::in_memory();
    let mut arm = registry.instantiate("arm").unwrap();
    arm.update_options(&mut ws, [("parent", "L_clavicle_JNT")])
        .unwrap();
    let values = mirrored_values(ws.naming(), &arm);
    assert_eq!(values[SIDE], OptionValue::from("R"));
    assert_eq!(values["parent"], OptionValue::from("R_clavicle_JNT"));
    assert_eq!(values[NAME], OptionValue::from("arm"));
    assert_eq!(values["numTwistJoints"], OptionValue::from(4));
}

#[test]
fn mirror_builds_reflected_counterpart() {
    let registry = PartRegistry::with_builtins();
    let mut ws = Workspace::in_memory();
    let arm = left_arm(&mut ws, &registry);

    let right = mirror(&mut ws, &registry, &arm, Axis::X).unwrap();
    assert_eq!(right.side(), "R");
    assert_eq!(right.guide_root(), Some("R_arm_guide_GRP"));
    assert_eq!(right.options().get_str("parent"), Some("R_clavicle_JNT"));

    let l = world(&ws, "L_arm_elbow_PLC");
    let r = world(&ws, "R_arm_elbow_PLC");
    assert!(close(r.translate, Vec3::new(-5.5, 14.0, -1.0)));
    let expected = Axis::X.reflect_quat(l.rotation());
    assert!(r.rotation().dot(expected).abs() > 1.0 - 1e-9);

    let lj = world(&ws, "L_arm_wrist_JNT");
    let rj = world(&ws, "R_arm_wrist_JNT");
    assert!(close(rj.translate, Axis::X.reflect_point(lj.translate)));

    let shape = ws.scene().shape("R_arm_proxy_GEO").unwrap();
    let src = ws.scene().shape("L_arm_proxy_GEO").unwrap();
    assert_eq!(shape.points, src.reflected_points(Axis::X));
    assert!(ws.scene().exists("L_arm_elbow_PLC"));
}

#[test]
fn mirroring_twice_changes_nothing() {
    let registry = PartRegistry::with_builtins();
    let mut ws = Workspace::in_memory();
    let arm = left_arm(&mut ws, &registry);
    let right = mirror(&mut ws, &registry, &arm, Axis::X).unwrap();
    let nodes = right.node_set(&ws).unwrap().hierarchy();
    let before: Vec<Option<Transform>> = nodes.iter().map(|n| ws.scene().transform(n)).collect();
    let count = ws.scene().nodes().len();

    mirror(&mut ws, &registry, &arm, Axis::X).unwrap();
    let after: Vec<Option<Transform>> = nodes.iter().map(|n| ws.scene().transform(n)).collect();
    assert_eq!(ws.scene().nodes().len(), count);
    for (a, b) in before.iter().zip(&after) {
        match (a, b) {
            (Some(a), Some(b)) => {
                assert!(close(a.translate, b.translate));
                assert!(close(a.rotate, b.rotate));
            }
            (None, None) => {}
            _ => panic!("transform presence changed"),
        }
    }
}

#[test]
fn center_part_mirrors_in_place() {
    let registry = PartRegistry::with_builtins();
    let mut ws = Workspace::in_memory();
    let mut brow = registry.instantiate("brow").unwrap();
    brow.create_guide(&mut ws).unwrap();
    let mut t = ws.scene().transform("C_brow_L_inner_PLC").unwrap();
    t.translate = Vec3::new(1.5, 21.0, 0.8);
    ws.scene_mut().set_transform("C_brow_L_inner_PLC", t).unwrap();
    let mut lid = ws.scene().shape("C_brow_lid_SRF").unwrap();
    lid.points[0] = Vec3::new(3.0, -1.0, 2.0);
    ws.scene_mut().set_shape("C_brow_lid_SRF", lid).unwrap();

    let same = mirror(&mut ws, &registry, &brow, Axis::X).unwrap();
    assert_eq!(same.guide_root(), brow.guide_root());
    assert!(close(
        world(&ws, "C_brow_R_inner_PLC").translate,
        Vec3::new(-1.5, 21.0, 0.8)
    ));
    let lid = ws.scene().shape("C_brow_lid_SRF").unwrap();
    assert!(close(lid.points[42], Vec3::new(-3.0, -1.0, 2.0)));
    assert_eq!(ws.guide_roots().len(), 1);
}

#[test]
fn surface_mirror_maps_columns_by_index() {
    let mut points = lid_points(6.0);
    let original = points.clone();
    points[3] = Vec3::new(9.0, 9.0, 9.0);
    mirror_surface(&mut points, Axis::X);
    for v in 0..7 {
        assert!(close(points[6 * 7 + v], Axis::X.reflect_point(points[v])));
        assert_eq!(points[3 * 7 + v], original[3 * 7 + v]);
    }
    assert!(close(points[6 * 7 + 3], Vec3::new(-9.0, 9.0, 9.0)));
}

#[test]
fn duplicate_copies_pose_under_resolved_name() {
    let registry = PartRegistry::with_builtins();
    let mut ws = Workspace::in_memory();
    let arm = left_arm(&mut ws, &registry);
    ws.set_resolver(ScriptedResolver::new([Resolution::rename("L", "arm1")]));

    let copy = duplicate(&mut ws, &registry, &arm, &IndexMap::new()).unwrap();
    assert_eq!(copy.name(), "arm1");
    assert!(close(
        world(&ws, "L_arm1_elbow_PLC").translate,
        Vec3::new(5.5, 14.0, -1.0)
    ));
    assert_eq!(copy.options().get_str("parent"), Some("L_clavicle_JNT"));
}

#[test]
fn cancelled_duplicate_leaves_scene_alone() {
    let registry = PartRegistry::with_builtins();
    let mut ws = Workspace::in_memory();
    let arm = left_arm(&mut ws, &registry);
    let before = ws.scene().nodes().len();
    let err = duplicate(&mut ws, &registry, &arm, &IndexMap::new()).unwrap_err();
    assert!(err.is_clash());
    assert_eq!(ws.scene().nodes().len(), before);
}

fn overrides(values: &[(&str, &str)]) -> IndexMap<String, OptionValue> {
    values
        .iter()
        .map(|(k, v)| ((*k).to_owned(), OptionValue::from(*v)))
        .collect()
}

#[test]
fn headless_duplicate_takes_its_name_from_overrides() {
    let registry = PartRegistry::with_builtins();
    let mut ws = Workspace::in_memory();
    let arm = left_arm(&mut ws, &registry);

    let copy = duplicate(&mut ws, &registry, &arm, &overrides(&[("name", "arm2")])).unwrap();
    assert_eq!(copy.guide_root(), Some("L_arm2_guide_GRP"));
    assert_eq!(copy.options().get_str("parent"), Some("L_clavicle_JNT"));
    assert_eq!(
        copy.options().get_i64("numTwistJoints"),
        arm.options().get_i64("numTwistJoints")
    );
    assert!(close(
        world(&ws, "L_arm2_elbow_PLC").translate,
        Vec3::new(5.5, 14.0, -1.0)
    ));
    assert_eq!(ws.guide_roots(), ["L_arm_guide_GRP", "L_arm2_guide_GRP"]);
}

#[test]
fn duplicate_onto_an_existing_guide_updates_it_in_place() {
    let registry = PartRegistry::with_builtins();
    let mut ws = Workspace::in_memory();
    let arm = left_arm(&mut ws, &registry);
    duplicate(&mut ws, &registry, &arm, &overrides(&[("name", "arm2")])).unwrap();
    let count = ws.scene().nodes().len();

    let mut t = ws.scene().transform("L_arm_elbow_PLC").unwrap();
    t.translate = Vec3::new(6.0, 13.0, 0.0);
    ws.scene_mut().set_transform("L_arm_elbow_PLC", t).unwrap();
    let copy = duplicate(
        &mut ws,
        &registry,
        &arm,
        &overrides(&[("name", "arm2"), ("parent", "C_spine_JNT")]),
    )
    .unwrap();
    assert_eq!(ws.scene().nodes().len(), count);
    assert_eq!(copy.options().get_str("parent"), Some("C_spine_JNT"));
    assert!(close(
        world(&ws, "L_arm2_elbow_PLC").translate,
        Vec3::new(6.0, 13.0, 0.0)
    ));
}

#[test]
fn explicit_side_override_replaces_the_swapped_side() {
    let registry = PartRegistry::with_builtins();
    let mut ws = Workspace::in_memory();
    let arm = left_arm(&mut ws, &registry);

    let target = mirror_with(
        &mut ws,
        &registry,
        &arm,
        Axis::X,
        &overrides(&[("side", "L"), ("name", "armB")]),
    )
    .unwrap();
    assert_eq!(target.side(), "L");
    assert_eq!(target.guide_root(), Some("L_armB_guide_GRP"));
    assert_eq!(target.options().get_str("parent"), Some("R_clavicle_JNT"));
    assert!(close(
        world(&ws, "L_armB_elbow_PLC").translate,
        Vec3::new(-5.5, 14.0, -1.0)
    ));
    assert!(!ws.scene().exists("R_arm_guide_GRP"));
}
