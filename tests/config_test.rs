use email_features::*;
use tokio_test::{assert_err, assert_ok};

#[test]
fn test_defaults() {
    let config = assert_ok!(EngineConfig::from_json_str("{}"));
    assert_eq!(config, EngineConfig::default());
    assert_eq!(config.winnow, WinnowKind::DropEmpty);
    assert_eq!(config.max_list_items, DEFAULT_MAX_LIST_ITEMS);
    assert!(config.public_suffix_list.is_none());
}

#[test]
fn test_full_config() {
    let config = assert_ok!(EngineConfig::from_json_str(
        r#"{
            "winnow": "drop_subsumed",
            "max_list_items": 50,
            "public_suffixes": ["com", "co.uk"]
        }"#
    ));
    assert_eq!(config.winnow, WinnowKind::DropSubsumed);
    assert_eq!(config.max_list_items, 50);
    assert_eq!(config.public_suffixes, vec!["com", "co.uk"]);
}

#[test]
fn test_rejects_unknown_fields_and_values() {
    let err = assert_err!(EngineConfig::from_json_str(r#"{"winow": "drop_empty"}"#));
    assert!(matches!(err, ConfigError::Json(_)));

    let err = assert_err!(EngineConfig::from_json_str(r#"{"winnow": "keep_all"}"#));
    assert!(matches!(err, ConfigError::Json(_)));
}

#[test]
fn test_missing_file() {
    let err = assert_err!(EngineConfig::from_file("/nonexistent/engine.json"));
    assert!(matches!(err, ConfigError::Io { .. }));
}

// --- Engine ---

#[test]
fn test_engine_from_config() {
    let config = assert_ok!(EngineConfig::from_json_str(
        r#"{"winnow": "drop_subsumed", "max_list_items": 3, "public_suffixes": ["com"]}"#
    ));
    let engine = assert_ok!(Engine::from_config(&config));
    assert_eq!(engine.public_suffixes().len(), 1);

    let script = assert_ok!(engine.compile(
        r#"
        let "sld" "domain_part('a.b.example.com', 'sld')";
        let "urls" "winnow(['http://a.com', 'http://a.com/x'])";
        let "big" "tokenize('a b c d', 'words')";
        "#
    ));
    let features = script.evaluate(&Message::default());

    assert_eq!(features.get("sld"), Some(&Value::from("example.com")));
    assert_eq!(features.get("urls"), Some(&Value::from(vec!["http://a.com/x"])));
    assert_eq!(features.failures().len(), 1);
    assert_eq!(features.failures()[0].name, "big");
}

#[test]
fn test_engine_loads_suffix_list_file() {
    let path = std::env::temp_dir().join(format!("email-features-psl-{}.dat", std::process::id()));
    assert_ok!(std::fs::write(&path, "// test list\ncom\nco.uk\n"));

    let config = EngineConfig {
        public_suffix_list: Some(path.clone()),
        public_suffixes: vec!["org".into()],
        ..Default::default()
    };
    let engine = Engine::from_config(&config);
    let _ = std::fs::remove_file(&path);

    let engine = assert_ok!(engine);
    assert_eq!(engine.public_suffixes().len(), 3);
    assert!(engine.public_suffixes().contains("co.uk"));
    assert!(engine.public_suffixes().contains("org"));
}

#[test]
fn test_engine_rejects_bad_suffix_rule() {
    let config = EngineConfig {
        public_suffixes: vec!["..bad".into()],
        ..Default::default()
    };
    let err = assert_err!(Engine::from_config(&config));
    assert!(matches!(err, ConfigError::InvalidSuffixRule { .. }));
}
