use super::*;

#[test]
fn defaults_validate() {
    RigSettings::default().validate().unwrap();
}

#[test]
fn partial_json_falls_back_to_defaults() {
    let s = RigSettings::from_reader(r#"{"left": "Lf", "right": "Rt"}"#.as_bytes()).unwrap();
    assert_eq!(s.left, "Lf");
    assert_eq!(s.right, "Rt");
    assert_eq!(s.center, "C");
    assert_eq!(s.guide_container, "guides");
    assert_eq!(s.max_resolve_attempts, 32);
}

#[test]
fn rejects_duplicate_side_tokens() {
    let s = RigSettings {
        right: "L".to_owned(),
        ..RigSettings::default()
    };
    assert!(matches!(s.validate(), Err(RigError::Configuration(_))));
}

#[test]
fn rejects_side_token_with_delimiter() {
    let s = RigSettings {
        left: "L_x".to_owned(),
        ..RigSettings::default()
    };
    assert!(s.validate().is_err());
}

#[test]
fn from_path_reports_missing_file() {
    let err = RigSettings::from_path("does/not/exist.json").unwrap_err();
    assert!(err.to_string().contains("does/not/exist.json"));
}
