use super::*;
use crate::foundation::core::Vec3;

fn small_tree() -> MemoryScene {
    let mut s = MemoryScene::new();
    s.create_node("root", NodeType::Group, None).unwrap();
    s.create_node("a", NodeType::Control, Some("root")).unwrap();
    s.create_node("b", NodeType::Joint, Some("a")).unwrap();
    s.create_node("c", NodeType::Placer, Some("root")).unwrap();
    s
}

#[test]
fn create_rejects_duplicates_and_missing_parents() {
    let mut s = small_tree();
    assert!(s.create_node("a", NodeType::Group, None).is_err());
    assert!(s.create_node("z", NodeType::Group, Some("nope")).is_err());
    assert_eq!(s.len(), 4);
}

#[test]
fn descendants_are_depth_first_in_creation_order() {
    let s = small_tree();
    assert_eq!(s.descendants("root"), vec!["a", "b", "c"]);
    assert_eq!(s.depth("b"), 2);
}

#[test]
fn rename_keeps_relations() {
    let mut s = small_tree();
    s.create_node("len", NodeType::Utility, None).unwrap();
    s.connect_history("b", "len").unwrap();
    s.apply_constraint("c", "b", ConstraintKind::Parent).unwrap();
    s.connect_attr("a", "visibility", "b", "visibility").unwrap();

    s.rename_node("a", "a2").unwrap();
    s.rename_node("b", "b2").unwrap();

    assert_eq!(s.parent("b2").as_deref(), Some("a2"));
    assert_eq!(s.children("root"), vec!["a2", "c"]);
    assert_eq!(s.history("b2"), vec!["len"]);
    assert_eq!(s.constraints("b2")[0].driver, "c");
    assert_eq!(s.connections("b2")[0].source, "a2");
    assert!(!s.exists("a"));
}

#[test]
fn rename_refuses_taken_names() {
    let mut s = small_tree();
    assert!(s.rename_node("a", "c").is_err());
    assert!(s.exists("a"));
}

#[test]
fn delete_removes_subtree_and_dangling_relations() {
    let mut s = small_tree();
    s.apply_constraint("b", "c", ConstraintKind::Point).unwrap();
    s.delete_node("a").unwrap();
    assert!(!s.exists("a"));
    assert!(!s.exists("b"));
    assert_eq!(s.children("root"), vec!["c"]);
    assert!(s.constraints("c").is_empty());
}

#[test]
fn set_parent_rejects_cycles() {
    let mut s = small_tree();
    assert!(s.set_parent("a", Some("b")).is_err());
    s.set_parent("c", Some("a")).unwrap();
    assert_eq!(s.children("a"), vec!["b", "c"]);
}

#[test]
fn utility_nodes_have_no_transform() {
    let mut s = small_tree();
    s.create_node("math", NodeType::Utility, None).unwrap();
    assert!(s.transform("math").is_none());
    assert!(s.set_transform("math", Transform::default()).is_err());
    s.set_transform("a", Transform::at(Vec3::X)).unwrap();
    assert_eq!(s.transform("a").unwrap().translate, Vec3::X);
}

#[test]
fn connecting_a_target_twice_replaces_the_input() {
    let mut s = small_tree();
    s.connect_attr("a", "v", "c", "visibility").unwrap();
    s.connect_attr("b", "v", "c", "visibility").unwrap();
    let conns = s.connections("c");
    assert_eq!(conns.len(), 1);
    assert_eq!(conns[0].source, "b");
}

#[test]
fn removed_attrs_are_gone_and_returned() {
    let mut s = small_tree();
    s.set_attr("a", "rigRoots", serde_json::json!({"parent": 1}))
        .unwrap();
    assert_eq!(
        s.remove_attr("a", "rigRoots").unwrap(),
        Some(serde_json::json!({"parent": 1}))
    );
    assert_eq!(s.attr("a", "rigRoots"), None);
    assert_eq!(s.remove_attr("a", "rigRoots").unwrap(), None);
    assert!(s.remove_attr("nope", "rigRoots").is_err());
}
