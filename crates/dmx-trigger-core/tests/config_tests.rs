use std::io::Write;
use std::path::PathBuf;

use dmx_trigger_core::{
    ConfigError, Direction, DmxFrame, Effect, Predicate, ProcessSupervisor, TriggerConfig,
    TriggerEngine, DEFAULT_UNIVERSE,
};
use tempfile::TempDir;

fn write_config(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

const STAGE_TOML: &str = r#"
universe = 4

[variables]
room = "stage"

[[slot]]
slot = 10
  [[slot.action]]
  when = { exact = 255 }
  run = ["echo", "on", "${room}"]

  [[slot.action]]
  when = { range = { low = 1, high = 254 } }
  direction = "falling"
  set = { level = "${slot_value}" }

[[slot]]
slot = 3
  [[slot.action]]
  when = { rising = 128 }
  run = ["go"]
"#;

#[test]
fn test_load_toml() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "stage.toml", STAGE_TOML);

    let config = TriggerConfig::load(&path).unwrap();
    assert_eq!(config.universe_or_default(), 4);
    assert_eq!(config.slots.len(), 2);

    let second = &config.slots[0].actions[1];
    assert_eq!(second.when, Predicate::Range { low: 1, high: 254 });
    assert_eq!(second.direction, Direction::Falling);
    assert_eq!(second.set.get("level").map(String::as_str), Some("${slot_value}"));

    let (context, groups) = config.into_parts();
    assert_eq!(context.get("room"), Some("stage"));
    assert_eq!(groups.keys().copied().collect::<Vec<_>>(), vec![3, 10]);
    assert_eq!(groups[&10].len(), 2);
    assert_eq!(
        groups[&10].actions()[0].effects()[0],
        Effect::Command {
            program: "echo".to_string(),
            args: vec!["on".to_string(), "${room}".to_string()],
        }
    );

    let engine = TriggerEngine::new(4, context, groups);
    assert_eq!(engine.group_count(), 2);
    assert_eq!(engine.tracked_slots(), 0);
}

#[test]
fn test_assignments_keep_file_order() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "zones.toml",
        r#"
[[slot]]
slot = 1
  [[slot.action]]
  when = "any_change"
  set = { zone = "${slot_value}", alias = "${zone}" }
"#,
    );

    let config = TriggerConfig::load(&path).unwrap();
    let names: Vec<_> = config.slots[0].actions[0].set.keys().cloned().collect();
    assert_eq!(names, vec!["zone", "alias"]);

    let (context, groups) = config.into_parts();
    assert_eq!(
        groups[&1].actions()[0].effects()[0],
        Effect::Assign(vec![
            ("zone".to_string(), "${slot_value}".to_string()),
            ("alias".to_string(), "${zone}".to_string()),
        ])
    );

    let mut engine = TriggerEngine::new(DEFAULT_UNIVERSE, context, groups);
    let frame = DmxFrame::from_slice(&[42]);
    let report = engine.process_frame(&frame, &mut ProcessSupervisor::new());
    assert_eq!(report.actions_fired, 1);
    assert_eq!(engine.context().get("zone"), Some("42"));
    assert_eq!(engine.context().get("alias"), Some("42"));
}

#[test]
fn test_assignments_keep_file_order_json() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "zones.json",
        r#"{ "slot": [ { "slot": 1, "action": [
            { "when": "any_change", "set": { "zone": "a", "alias": "b", "beam": "c" } }
        ] } ] }"#,
    );

    let config = TriggerConfig::load(&path).unwrap();
    let names: Vec<_> = config.slots[0].actions[0].set.keys().cloned().collect();
    assert_eq!(names, vec!["zone", "alias", "beam"]);
}

#[test]
fn test_load_json() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "rules.json",
        r#"{
            "slot": [
                { "slot": 1, "action": [ { "when": "any_change", "run": ["logger", "${slot_value}"] } ] }
            ]
        }"#,
    );

    let config = TriggerConfig::load(&path).unwrap();
    assert_eq!(config.universe_or_default(), DEFAULT_UNIVERSE);
    assert_eq!(config.slots[0].actions[0].when, Predicate::AnyChange);
}

#[test]
fn test_load_ron() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "rules.ron",
        r#"(
            universe: Some(2),
            slot: [
                (slot: 512, action: [(when: exact(0), set: {"dark": "yes"})]),
            ],
        )"#,
    );

    let config = TriggerConfig::load(&path).unwrap();
    assert_eq!(config.universe, Some(2));
    assert_eq!(config.slots[0].slot, 512);
    assert_eq!(config.slots[0].actions[0].when, Predicate::Exact(0));
}

#[test]
fn test_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "rules.yaml", "slot: []");
    assert!(matches!(
        TriggerConfig::load(&path),
        Err(ConfigError::UnsupportedFormat(ext)) if ext == "yaml"
    ));
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let result = TriggerConfig::load(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn test_syntax_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "broken.toml", "[[slot]\nslot = ");
    assert!(matches!(TriggerConfig::load(&path), Err(ConfigError::Toml(_))));
}

#[test]
fn test_unknown_predicate_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "odd.toml",
        "[[slot]]\nslot = 1\n[[slot.action]]\nwhen = { between = 3 }\nrun = [\"x\"]\n",
    );
    assert!(matches!(TriggerConfig::load(&path), Err(ConfigError::Toml(_))));
}

#[test]
fn test_validation_errors() {
    let dir = TempDir::new().unwrap();

    let cases = [
        (
            "slot0.toml",
            "[[slot]]\nslot = 0\n",
            "Invalid slot 0 (must be 1-512)",
        ),
        (
            "range.toml",
            "[[slot]]\nslot = 5\n[[slot.action]]\nwhen = { range = { low = 9, high = 2 } }\nrun = [\"x\"]\n",
            "Invalid range 9-2 on slot 5",
        ),
        (
            "empty.toml",
            "[[slot]]\nslot = 5\n[[slot.action]]\nwhen = { exact = 1 }\nrun = []\n",
            "Action #1 on slot 5 has an empty command",
        ),
        (
            "noeffect.toml",
            "[[slot]]\nslot = 6\n[[slot.action]]\nwhen = { exact = 1 }\n",
            "Action #1 on slot 6 has no effect (needs `run` or `set`)",
        ),
        (
            "var.toml",
            "[variables]\n\"bad-name\" = \"1\"\n",
            "Invalid variable name: \"bad-name\"",
        ),
    ];

    for (name, content, message) in cases {
        let path = write_config(&dir, name, content);
        let err = TriggerConfig::load(&path).unwrap_err();
        assert_eq!(err.to_string(), message, "case {}", name);
    }
}
