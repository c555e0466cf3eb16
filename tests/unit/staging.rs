use super::*;
use crate::part::ATTR_CATEGORY;
use crate::scene::graph::NodeType;
use crate::scene::memory::MemoryScene;

fn scene_with_guide() -> MemoryScene {
    let mut s = MemoryScene::new();
    s.create_node("guides", NodeType::Group, None).unwrap();
    s.create_node("L_arm_guide_GRP", NodeType::Group, Some("guides"))
        .unwrap();
    s.set_attr("L_arm_guide_GRP", ATTR_PART_TYPE, "arm".into())
        .unwrap();
    s.create_node(
        "L_arm_guide_placers_GRP",
        NodeType::Group,
        Some("L_arm_guide_GRP"),
    )
    .unwrap();
    s.set_attr("L_arm_guide_placers_GRP", ATTR_CATEGORY, "placers".into())
        .unwrap();
    s.create_node(
        "L_arm_shoulder_PLC",
        NodeType::Placer,
        Some("L_arm_guide_placers_GRP"),
    )
    .unwrap();
    s.create_node("L_arm_length_UTL", NodeType::Utility, None)
        .unwrap();
    s.connect_history("L_arm_shoulder_PLC", "L_arm_length_UTL")
        .unwrap();
    s
}

#[test]
fn acquire_stashes_guides_and_history() {
    let mut scene = scene_with_guide();
    let naming = NameConvention::default();
    let stage = ScopedStagingArea::acquire(&mut scene, &naming, "guides").unwrap();
    let reserved = stage.reserved_names();
    assert!(reserved.contains("L_arm_guide_GRP"));
    assert!(reserved.contains("L_arm_length_UTL"));
    assert!(!stage.scene_ref().exists("L_arm_shoulder_PLC"));
    assert!(stage.scene_ref().exists("stash:L_arm_shoulder_PLC"));
    stage.commit().unwrap();
    assert!(scene.exists("L_arm_shoulder_PLC"));
    assert!(scene.exists("L_arm_length_UTL"));
}

#[test]
fn rollback_deletes_tracked_and_restores() {
    let mut scene = scene_with_guide();
    let naming = NameConvention::default();
    let mut stage = ScopedStagingArea::acquire(&mut scene, &naming, "guides").unwrap();
    stage
        .scene()
        .create_node("L_arm_guide_GRP", NodeType::Group, None)
        .unwrap();
    stage.track("L_arm_guide_GRP");
    stage.rollback().unwrap();
    assert!(scene.exists("L_arm_guide_GRP"));
    assert_eq!(scene.parent("L_arm_guide_GRP").as_deref(), Some("guides"));
    assert!(scene.nodes().iter().all(|n| !n.starts_with("stash:")));
}

#[test]
fn drop_without_commit_rolls_back() {
    let mut scene = scene_with_guide();
    let naming = NameConvention::default();
    {
        let mut stage = ScopedStagingArea::acquire(&mut scene, &naming, "guides").unwrap();
        stage
            .scene()
            .create_node("R_arm_guide_GRP", NodeType::Group, None)
            .unwrap();
        stage.track("R_arm_guide_GRP");
    }
    assert!(!scene.exists("R_arm_guide_GRP"));
    assert!(scene.exists("L_arm_guide_GRP"));
}

#[test]
fn missing_container_stashes_nothing() {
    let mut scene = MemoryScene::new();
    let naming = NameConvention::default();
    let stage = ScopedStagingArea::acquire(&mut scene, &naming, "guides").unwrap();
    assert!(stage.reserved_names().is_empty());
    stage.commit().unwrap();
}
