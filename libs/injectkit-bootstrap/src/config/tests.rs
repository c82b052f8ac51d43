use super::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_default_config() {
    let config = BootstrapConfig::default();

    assert!(config.modules.is_empty());
    assert!(config.priorities.is_empty());
    assert_eq!(config.module_set(), ModuleSet::all());

    let logging = config.logging.as_ref().unwrap();
    assert_eq!(logging["default"].console_level, "info");
    assert!(logging["default"].file.is_empty());
}

#[test]
fn test_yaml_serialization() {
    let mut config = BootstrapConfig::default();
    config.modules.push("kv_store".to_string());
    config
        .priorities
        .insert("kv_store::file::FileStore".to_string(), Priority::High);

    let yaml = config.to_yaml().expect("Failed to serialize to YAML");

    assert!(yaml.contains("modules:"));
    assert!(yaml.contains("- kv_store"));
    assert!(yaml.contains("kv_store::file::FileStore"));
    assert!(yaml.contains("high"));
    assert!(yaml.contains("logging:"));
}

#[test]
fn test_layered_loading_yaml_only() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("test-config.yaml");

    let yaml_content = r#"
modules:
  - kv_store
  - audit::sinks
priorities:
  "kv_store::file::FileStore": HIGHEST
  "kv_store::memory::MemStore": low
log_dir: "/tmp/injectkit-logs"
logging:
  default:
    console_level: warn
    file: "logs/injectkit.log"
    file_level: debug
  injectkit:
    console_level: debug
"#;

    fs::write(&config_path, yaml_content).expect("Failed to write config file");

    let config = BootstrapConfig::load_layered(&config_path).expect("Failed to load config");

    assert_eq!(config.modules, vec!["kv_store", "audit::sinks"]);
    assert_eq!(config.priorities["kv_store::file::FileStore"], Priority::Highest);
    assert_eq!(config.priorities["kv_store::memory::MemStore"], Priority::Low);
    assert_eq!(config.log_base_dir(), PathBuf::from("/tmp/injectkit-logs"));

    let logging = config.logging.as_ref().unwrap();
    assert_eq!(logging.len(), 2);
    assert_eq!(logging["injectkit"].console_level, "debug");
    assert!(logging["injectkit"].file.is_empty());

    let set = config.module_set();
    assert!(set.contains("audit::sinks::file"));
    assert!(!set.contains("audit"));
    assert_eq!(
        config
            .loader_options()
            .priority_overrides
            .get("kv_store::memory::MemStore"),
        Some(&Priority::Low)
    );
    config.validate().expect("valid config");
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config = BootstrapConfig::load_layered(temp_dir.path().join("absent.yaml"))
        .expect("missing YAML is not an error");

    assert!(config.modules.is_empty());
    assert!(config.logging.is_none());
}

#[test]
fn test_unknown_fields_are_rejected() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("bad.yaml");
    fs::write(&config_path, "modulez:\n  - kv_store\n").unwrap();

    assert!(BootstrapConfig::load_layered(&config_path).is_err());
}

#[test]
fn test_invalid_priority_is_rejected() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("bad.yaml");
    fs::write(&config_path, "priorities:\n  \"a::B\": urgent\n").unwrap();

    assert!(BootstrapConfig::load_layered(&config_path).is_err());
}

#[test]
fn test_cli_overrides() {
    let mut config = BootstrapConfig {
        modules: vec!["kv_store".to_string()],
        ..Default::default()
    };

    let args = CliArgs {
        config: None,
        modules: vec!["audit".to_string(), "kv_store::memory".to_string()],
        print_config: false,
        verbose: 2,
    };

    config.apply_cli_overrides(&args);

    assert_eq!(config.modules, vec!["audit", "kv_store::memory"]);
    let logging = config.logging.as_ref().unwrap();
    assert_eq!(logging["default"].console_level, "trace");
}

#[test]
fn test_cli_overrides_verbose_levels() {
    let test_cases = vec![(0, "info"), (1, "debug"), (2, "trace"), (3, "trace")];

    for (verbose, expected) in test_cases {
        let mut config = BootstrapConfig::default();
        let args = CliArgs {
            verbose,
            ..Default::default()
        };
        config.apply_cli_overrides(&args);

        assert_eq!(
            config.logging.as_ref().unwrap()["default"].console_level,
            expected,
            "verbose level {verbose}"
        );
        assert!(config.modules.is_empty(), "no --module keeps config modules");
    }
}

#[test]
fn test_validate_rejects_bad_input() {
    let config = BootstrapConfig {
        modules: vec!["kv_store::::memory".to_string()],
        ..Default::default()
    };
    assert!(config.validate().is_err());

    let config = BootstrapConfig {
        modules: vec!["  ".to_string()],
        ..Default::default()
    };
    assert!(config.validate().is_err());

    let mut config = BootstrapConfig::default();
    config
        .logging
        .as_mut()
        .unwrap()
        .get_mut("default")
        .unwrap()
        .console_level = "loud".to_string();
    assert!(config.validate().is_err());
}
