use std::sync::atomic::{AtomicBool, Ordering};

use super::*;
use crate::foundation::core::Transform;
use crate::options::{DataType, OptionSpec, OptionTable};
use crate::part::{ATTR_PART_TYPE, GuideBuilder, GuideContext, RigBuilder};
use crate::scene::graph::ConstraintKind;

/// Rig builder that creates a control, then fails while `broken` is set.
struct Flaky {
    broken: Arc<AtomicBool>,
}

impl GuideBuilder for Flaky {
    fn build_guide(&self, _ctx: &mut GuideContext<'_>, _options: &OptionTable) -> RigResult<()> {
        Ok(())
    }
}

impl RigBuilder for Flaky {
    fn build_rig(&self, ctx: &mut RigContext<'_>, _options: &OptionTable) -> RigResult<()> {
        ctx.add_control(Some("parent"), None, &["main"], Transform::default(), None)?;
        if self.broken.load(Ordering::SeqCst) {
            return Err(RigError::scene("flaky rig failure"));
        }
        Ok(())
    }
}

fn flaky_registry(broken: Arc<AtomicBool>) -> PartRegistry {
    let mut registry = PartRegistry::with_builtins();
    registry.register("flaky", move || {
        let mut options = OptionTable::new("C", "flaky");
        options.register("parent", OptionSpec::new(DataType::ParentDriver, ""))?;
        options.register("aim", OptionSpec::new(DataType::ParentDriver, ""))?;
        let b = Arc::new(Flaky {
            broken: Arc::clone(&broken),
        });
        Ok(Part::new("flaky", options, b.clone(), b))
    });
    registry
}

fn guide(ws: &mut Workspace, registry: &PartRegistry, part_type: &str) -> Part {
    let mut part = registry.instantiate(part_type).unwrap();
    assert!(part.create_guide(ws).unwrap());
    part
}

#[test]
fn start_rig_requires_a_guide() {
    let registry = PartRegistry::with_builtins();
    let mut ws = Workspace::in_memory();
    let mut arm = registry.instantiate("arm").unwrap();
    assert!(matches!(
        arm.start_rig(&mut ws),
        Err(RigError::MissingGuide(_))
    ));
}

#[test]
fn build_and_finish_check_their_state() {
    let registry = PartRegistry::with_builtins();
    let mut ws = Workspace::in_memory();
    let mut arm = guide(&mut ws, &registry, "arm");
    assert!(matches!(
        arm.build_rig(&mut ws),
        Err(RigError::InvalidState(_))
    ));
    assert!(matches!(
        arm.finish_rig(&mut ws),
        Err(RigError::InvalidState(_))
    ));
}

#[test]
fn missing_driver_falls_back_to_parts_container() {
    let registry = PartRegistry::with_builtins();
    let mut ws = Workspace::in_memory();
    let mut arm = registry.instantiate("arm").unwrap();
    arm.update_options(&mut ws, [("parent", "C_spine_chest_JNT")])
        .unwrap();
    arm.create_guide(&mut ws).unwrap();
    arm.create_rig(&mut ws).unwrap();

    let roots = &arm.rig_roots()["parent"];
    assert_eq!(roots.control_group, "L_arm_parent_controls_GRP");
    assert_eq!(
        ws.scene().parent(&roots.control_group).as_deref(),
        Some("parts")
    );
    assert_eq!(arm.state(), PartState::RigBuilt);
    assert!(ws.scene().exists("L_arm_shoulder_fk_CTL"));
}

#[test]
fn existing_driver_parents_the_rig_groups() {
    let registry = PartRegistry::with_builtins();
    let mut ws = Workspace::in_memory();
    let mut root = guide(&mut ws, &registry, "root");
    root.create_rig(&mut ws).unwrap();
    let mut arm = registry.instantiate("arm").unwrap();
    arm.update_options(&mut ws, [("parent", "C_root_main_JNT")])
        .unwrap();
    arm.create_guide(&mut ws).unwrap();
    arm.create_rig(&mut ws).unwrap();

    for group in ["L_arm_parent_controls_GRP", "L_arm_parent_rig_GRP"] {
        assert_eq!(ws.scene().parent(group).as_deref(), Some("C_root_main_JNT"));
    }
    let constraints = ws.scene().constraints("L_arm_wrist_JNT");
    assert_eq!(constraints.len(), 1);
    assert_eq!(constraints[0].driver, "L_arm_wrist_fk_CTL");
    assert_eq!(constraints[0].kind, ConstraintKind::Orient);
}

#[test]
fn rig_controls_copy_guide_shapes() {
    let registry = PartRegistry::with_builtins();
    let mut ws = Workspace::in_memory();
    let mut root = guide(&mut ws, &registry, "root");
    root.create_rig(&mut ws).unwrap();
    assert_eq!(
        ws.scene().shape("C_root_world_CTL"),
        ws.scene().shape("C_root_world_guide_CTL")
    );
    assert_eq!(
        ws.scene().parent("C_root_main_CTL").as_deref(),
        Some("C_root_world_CTL")
    );
}

#[test]
fn second_start_rig_is_rejected() {
    let registry = PartRegistry::with_builtins();
    let mut ws = Workspace::in_memory();
    let mut root = guide(&mut ws, &registry, "root");
    root.create_rig(&mut ws).unwrap();
    let mut again = Part::set_guide(&ws, &registry, "C_root_guide_GRP").unwrap();
    assert!(matches!(
        again.start_rig(&mut ws),
        Err(RigError::InvalidState(_))
    ));
}

#[test]
fn finish_rig_is_idempotent() {
    let registry = PartRegistry::with_builtins();
    let mut ws = Workspace::in_memory();
    let mut root = guide(&mut ws, &registry, "root");
    root.create_rig(&mut ws).unwrap();
    let before = ws.scene().connections("C_root_controls_GRP");
    root.finish_rig(&mut ws).unwrap();
    assert_eq!(ws.scene().connections("C_root_controls_GRP"), before);
    assert_eq!(before.len(), 1);
    assert_eq!(before[0].source_attr, CONTROL_VIS);
    assert_eq!(before[0].target_attr, ATTR_VISIBILITY);
}

#[test]
fn build_rigs_orders_root_first_and_dependents_last() {
    let registry = PartRegistry::with_builtins();
    let mut ws = Workspace::in_memory();
    let mut switch = registry.instantiate("space_switch").unwrap();
    switch.create_guide(&mut ws).unwrap();
    let mut arm = registry.instantiate("arm").unwrap();
    arm.update_options(&mut ws, [("parent", "C_root_main_JNT")])
        .unwrap();
    arm.create_guide(&mut ws).unwrap();
    guide(&mut ws, &registry, "root");
    switch
        .update_options(&mut ws, [("target", "L_arm")])
        .unwrap();

    let report = build_rigs(&mut ws, &registry);
    assert_eq!(
        report.built,
        ["C_root_guide_GRP", "L_arm_guide_GRP", "C_space_guide_GRP"]
    );
    assert!(report.failed.is_empty());
    assert_eq!(
        ws.scene().parent("L_arm_parent_controls_GRP").as_deref(),
        Some("C_root_main_JNT")
    );
    assert_eq!(
        ws.scene().attr("C_space_switch_CTL", "target"),
        Some(serde_json::json!("L_arm_guide_GRP"))
    );

    let again = build_rigs(&mut ws, &registry);
    assert!(again.built.is_empty());
    assert_eq!(again.skipped.len(), 3);
}

#[test]
fn build_rigs_skips_flagged_parts_and_reports_failures() {
    let registry = PartRegistry::with_builtins();
    let mut ws = Workspace::in_memory();
    let mut root = guide(&mut ws, &registry, "root");
    root.set_skip_build(&mut ws, true).unwrap();
    guide(&mut ws, &registry, "arm");
    ws.scene_mut()
        .set_attr("L_arm_guide_GRP", ATTR_PART_TYPE, serde_json::json!("leg"))
        .unwrap();

    let report = build_rigs(&mut ws, &registry);
    assert_eq!(report.skipped, ["C_root_guide_GRP"]);
    assert!(report.built.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "L_arm_guide_GRP");
}

#[test]
fn failed_rig_build_leaves_the_guide_ready_for_a_retry() {
    let broken = Arc::new(AtomicBool::new(true));
    let registry = flaky_registry(Arc::clone(&broken));
    let mut ws = Workspace::in_memory();
    guide(&mut ws, &registry, "flaky");

    let report = build_rigs(&mut ws, &registry);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "C_flaky_guide_GRP");
    for node in [
        "C_flaky_parent_controls_GRP",
        "C_flaky_parent_rig_GRP",
        "C_flaky_aim_controls_GRP",
        "C_flaky_main_CTL",
    ] {
        assert!(!ws.scene().exists(node), "{node}");
    }
    assert_eq!(ws.scene().attr("C_flaky_guide_GRP", ATTR_RIG_ROOTS), None);
    let found = Part::find(&ws, &registry, "C", "flaky").unwrap().unwrap();
    assert_eq!(found.state(), PartState::GuideBuilt);
    assert!(found.rig_roots().is_empty());

    broken.store(false, Ordering::SeqCst);
    let report = build_rigs(&mut ws, &registry);
    assert_eq!(report.built, ["C_flaky_guide_GRP"]);
    assert!(report.skipped.is_empty());
    assert!(ws.scene().exists("C_flaky_main_CTL"));
}

#[test]
fn create_rig_failure_returns_the_part_to_guide_built() {
    let registry = flaky_registry(Arc::new(AtomicBool::new(true)));
    let mut ws = Workspace::in_memory();
    let mut part = guide(&mut ws, &registry, "flaky");
    assert!(part.create_rig(&mut ws).is_err());
    assert_eq!(part.state(), PartState::GuideBuilt);
    assert!(part.rig_roots().is_empty());
}

#[test]
fn start_rig_clash_removes_groups_it_already_created() {
    let registry = flaky_registry(Arc::new(AtomicBool::new(false)));
    let mut ws = Workspace::in_memory();
    let mut part = guide(&mut ws, &registry, "flaky");
    ws.scene_mut()
        .create_node("C_flaky_aim_rig_GRP", NodeType::Group, None)
        .unwrap();

    assert!(matches!(
        part.start_rig(&mut ws),
        Err(RigError::AlreadyExists(group)) if group == "C_flaky_aim_rig_GRP"
    ));
    for node in [
        "C_flaky_parent_controls_GRP",
        "C_flaky_parent_rig_GRP",
        "C_flaky_aim_controls_GRP",
    ] {
        assert!(!ws.scene().exists(node), "{node}");
    }
    assert!(ws.scene().exists("C_flaky_aim_rig_GRP"));
    assert_eq!(part.state(), PartState::GuideBuilt);
    assert_eq!(ws.scene().attr("C_flaky_guide_GRP", ATTR_RIG_ROOTS), None);
}
