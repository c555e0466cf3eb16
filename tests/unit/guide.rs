use super::*;
use crate::foundation::core::{Transform, Vec3};
use crate::options::{OptionSpec, OptionTable};
use crate::part::{ATTR_OPTIONS, GuideBuilder, RigBuilder, RigContext};
use crate::rename::{Resolution, ScriptedResolver};

struct Widget {
    fail: bool,
}

impl GuideBuilder for Widget {
    fn build_guide(&self, ctx: &mut GuideContext<'_>, options: &OptionTable) -> RigResult<()> {
        let count = options.get_i64("count").unwrap_or(1);
        for i in 0..count {
            let tok = format!("p{i}");
            ctx.add(
                NodeCategory::Placers,
                &[tok.as_str()],
                NodeType::Placer,
                None,
                Transform::at(Vec3::new(i as f64, 0.0, 0.0)),
            )?;
        }
        let first = ctx.format(&["p0"], NodeType::Placer);
        ctx.add_history(&first, &["length"])?;
        if self.fail {
            return Err(RigError::scene("widget failure"));
        }
        Ok(())
    }
}

impl RigBuilder for Widget {
    fn build_rig(&self, _ctx: &mut RigContext<'_>, _options: &OptionTable) -> RigResult<()> {
        Ok(())
    }
}

fn widget(side: &str, name: &str, fail: bool) -> Part {
    let mut options = OptionTable::new(side, name);
    options
        .register(
            "count",
            OptionSpec::new(DataType::Int, 2)
                .range(1.0, 8.0)
                .rebuild_required(),
        )
        .unwrap();
    options
        .register("parent", OptionSpec::new(DataType::ParentDriver, ""))
        .unwrap();
    let b = Arc::new(Widget { fail });
    Part::new("widget", options, b.clone(), b)
}

fn placers(ws: &Workspace, side: &str, name: &str) -> Vec<String> {
    let group = ws
        .naming()
        .format(side, name, &["guide", "placers"], NodeType::Group);
    ws.scene().children(&group)
}

#[test]
fn create_guide_builds_hierarchy_and_metadata() {
    let mut ws = Workspace::in_memory();
    let mut part = widget("L", "widget", false);
    assert!(part.create_guide(&mut ws).unwrap());

    let root = "L_widget_guide_GRP";
    assert_eq!(part.guide_root(), Some(root));
    assert_eq!(part.state(), PartState::GuideBuilt);
    assert_eq!(ws.scene().parent(root).as_deref(), Some("guides"));
    assert_eq!(ws.scene().children(root).len(), 5);
    assert_eq!(
        placers(&ws, "L", "widget"),
        vec!["L_widget_p0_PLC", "L_widget_p1_PLC"]
    );
    assert!(ws.scene().exists("L_widget_length_UTL"));
    assert_eq!(
        ws.scene().attr(root, ATTR_PART_TYPE),
        Some(serde_json::Value::from("widget"))
    );
    let incoming = ws.scene().connections(root);
    assert!(
        incoming
            .iter()
            .any(|c| c.source == "rig_settings" && c.source_attr == GUIDE_VIS)
    );
    assert_eq!(ws.guide_roots(), vec![root]);
}

#[test]
fn existing_root_is_rejected_before_any_node_is_created() {
    let mut ws = Workspace::in_memory();
    widget("L", "widget", false).create_guide(&mut ws).unwrap();
    let before = ws.scene().nodes();

    let mut twin = widget("L", "widget", false);
    let err = twin.create_guide(&mut ws).unwrap_err();
    assert!(matches!(err, RigError::AlreadyExists(_)));
    assert_eq!(ws.scene().nodes(), before);
    assert_eq!(twin.state(), PartState::Unbuilt);
}

#[test]
fn failed_build_rolls_back_and_restores_others() {
    let mut ws = Workspace::in_memory();
    widget("R", "widget", false).create_guide(&mut ws).unwrap();
    let before = ws.scene().nodes();

    let mut part = widget("L", "widget", true);
    assert!(part.create_guide(&mut ws).is_err());
    assert_eq!(part.state(), PartState::Unbuilt);
    assert_eq!(part.guide_root(), None);
    assert!(!ws.scene().exists("L_widget_guide_GRP"));
    assert!(!ws.scene().exists("L_widget_length_UTL"));
    let mut after = ws.scene().nodes();
    let mut expected = before;
    after.sort();
    expected.sort();
    assert_eq!(after, expected);
}

#[test]
fn abandoned_session_removes_its_nodes() {
    let mut ws = Workspace::in_memory();
    let mut part = widget("L", "widget", false);
    {
        let mut session = part.start_guide(&mut ws).unwrap();
        session.build().unwrap();
    }
    assert_eq!(part.state(), PartState::Unbuilt);
    assert!(!ws.scene().exists("L_widget_guide_GRP"));
    assert!(!ws.scene().exists("L_widget_p0_PLC"));
}

#[test]
fn staged_build_consults_resolver_on_clash() {
    let mut ws = Workspace::in_memory();
    widget("L", "widget", false).create_guide(&mut ws).unwrap();
    ws.set_resolver(ScriptedResolver::new([Resolution::rename("L", "widget1")]));

    let mut copy = widget("L", "widget", false);
    assert!(
        copy.create_guide_with(&mut ws, StartMode::Staged)
            .unwrap()
    );
    assert_eq!(copy.name(), "widget1");
    assert_eq!(copy.guide_root(), Some("L_widget1_guide_GRP"));
    assert!(ws.scene().exists("L_widget_p0_PLC"));
    assert!(ws.scene().exists("L_widget1_p0_PLC"));
    assert!(ws.scene().exists("L_widget1_length_UTL"));
    assert_eq!(ws.guide_roots().len(), 2);
}

#[test]
fn cancelled_staged_build_discards_guide_and_resets_options() {
    let mut ws = Workspace::in_memory();
    widget("L", "widget", false).create_guide(&mut ws).unwrap();
    let before = ws.scene().nodes();

    let mut copy = widget("L", "widget", false);
    copy.update_options(&mut ws, [("count", 3)]).unwrap();
    assert_eq!(copy.options().get_i64("count"), Some(3));
    assert!(
        !copy
            .create_guide_with(&mut ws, StartMode::Staged)
            .unwrap()
    );
    assert_eq!(copy.options().get_i64("count"), Some(2));
    assert_eq!(copy.state(), PartState::Unbuilt);
    assert_eq!(ws.scene().nodes().len(), before.len());
    assert!(ws.scene().nodes().iter().all(|n| !n.starts_with("stash:")));
}

#[test]
fn renaming_updates_nodes_and_metadata() {
    let mut ws = Workspace::in_memory();
    let mut part = widget("L", "widget", false);
    part.create_guide(&mut ws).unwrap();

    let report = part.update_options(&mut ws, [("name", "other")]).unwrap();
    assert!(report.renamed);
    assert_eq!(part.guide_root(), Some("L_other_guide_GRP"));
    assert!(ws.scene().exists("L_other_p1_PLC"));
    assert!(ws.scene().exists("L_other_length_UTL"));
    assert!(!ws.scene().exists("L_widget_guide_GRP"));

    let meta = ws.scene().attr("L_other_guide_GRP", ATTR_OPTIONS).unwrap();
    let specs = OptionTable::parse_metadata(meta.as_str().unwrap()).unwrap();
    assert_eq!(specs["name"].value, OptionValue::from("other"));
}

#[test]
fn rename_clash_reverts_the_update() {
    let mut ws = Workspace::in_memory();
    let mut part = widget("L", "widget", false);
    part.create_guide(&mut ws).unwrap();
    widget("L", "other", false).create_guide(&mut ws).unwrap();
    let before = ws.scene().nodes();

    let err = part
        .update_options(&mut ws, [("name", "other")])
        .unwrap_err();
    assert!(err.is_clash());
    assert_eq!(part.name(), "widget");
    assert_eq!(part.guide_root(), Some("L_widget_guide_GRP"));
    assert_eq!(ws.scene().nodes(), before);
}

#[test]
fn rebuild_required_values_wait_for_confirmation() {
    let mut ws = Workspace::in_memory();
    let mut part = widget("L", "widget", false);
    part.create_guide(&mut ws).unwrap();

    let report = part.update_options(&mut ws, [("count", 4)]).unwrap();
    assert_eq!(report.pending, vec!["count"]);
    assert_eq!(part.options().get_i64("count"), Some(2));
    assert_eq!(placers(&ws, "L", "widget").len(), 2);

    assert!(part.confirm_rebuild(&mut ws).unwrap());
    assert_eq!(part.options().get_i64("count"), Some(4));
    assert_eq!(placers(&ws, "L", "widget").len(), 4);
    assert!(part.pending_rebuild().is_empty());
}

#[test]
fn reverted_rename_also_drops_values_parked_in_the_same_update() {
    let mut ws = Workspace::in_memory();
    widget("R", "widget", false).create_guide(&mut ws).unwrap();
    let mut part = widget("L", "widget", false);
    part.create_guide(&mut ws).unwrap();
    part.update_options(&mut ws, [("count", 3)]).unwrap();

    let err = part
        .update_options(
            &mut ws,
            [("count", OptionValue::from(6)), ("side", OptionValue::from("R"))],
        )
        .unwrap_err();
    assert!(err.is_clash());
    assert_eq!(part.side(), "L");
    assert_eq!(part.pending_rebuild().len(), 1);
    assert_eq!(part.pending_rebuild()["count"], OptionValue::from(3));

    assert!(part.confirm_rebuild(&mut ws).unwrap());
    assert_eq!(part.options().get_i64("count"), Some(3));
    assert_eq!(placers(&ws, "L", "widget").len(), 3);
}

#[test]
fn second_start_on_a_built_part_reports_the_existing_root() {
    let mut ws = Workspace::in_memory();
    let mut part = widget("L", "widget", false);
    part.create_guide(&mut ws).unwrap();
    let before = ws.scene().nodes();
    assert!(matches!(
        part.create_guide(&mut ws),
        Err(RigError::AlreadyExists(root)) if root == "L_widget_guide_GRP"
    ));
    assert_eq!(ws.scene().nodes(), before);
    assert_eq!(part.state(), PartState::GuideBuilt);
}

#[test]
fn discarded_rebuild_keeps_old_values() {
    let mut ws = Workspace::in_memory();
    let mut part = widget("L", "widget", false);
    part.create_guide(&mut ws).unwrap();
    part.update_options(&mut ws, [("count", 5)]).unwrap();
    part.discard_rebuild();
    assert!(part.confirm_rebuild(&mut ws).unwrap());
    assert_eq!(part.options().get_i64("count"), Some(2));
    assert_eq!(placers(&ws, "L", "widget").len(), 2);
}

#[test]
fn rejected_values_are_reported_not_raised() {
    let mut ws = Workspace::in_memory();
    let mut part = widget("L", "widget", false);
    let report = part
        .update_options(
            &mut ws,
            [
                ("count", OptionValue::from("many")),
                ("count", OptionValue::from(99)),
                ("wings", OptionValue::from(2)),
            ],
        )
        .unwrap();
    assert!(report.applied.is_empty());
    assert!(matches!(
        report.rejected[0].1,
        Rejection::TypeMismatch { .. }
    ));
    assert!(matches!(
        report.rejected[1].1,
        Rejection::OutOfBounds { .. }
    ));
    assert!(matches!(report.rejected[2].1, Rejection::UnknownKey));
    assert_eq!(part.options().get_i64("count"), Some(2));
}

#[test]
fn parent_driver_values_are_canonicalised() {
    let mut ws = Workspace::in_memory();
    let mut part = widget("L", "widget", false);
    part.update_options(&mut ws, [("parent", " L_arm_shoulder_PLC_ ")])
        .unwrap();
    assert_eq!(
        part.options().get_str("parent"),
        Some("L_arm_shoulder_JNT")
    );
}

#[test]
fn delete_guide_removes_history_first() {
    let mut ws = Workspace::in_memory();
    let mut part = widget("L", "widget", false);
    part.create_guide(&mut ws).unwrap();
    part.delete_guide(&mut ws).unwrap();
    assert!(!ws.scene().exists("L_widget_guide_GRP"));
    assert!(!ws.scene().exists("L_widget_length_UTL"));
    assert_eq!(part.state(), PartState::Unbuilt);
    assert!(matches!(
        part.delete_guide(&mut ws),
        Err(RigError::MissingGuide(_))
    ));
}
