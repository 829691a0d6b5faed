use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use keylaunch_core::config::{self, Config, ConfigError};
use keylaunch_core::session::LaunchMode;

fn unique_temp_dir(label: &str) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after unix epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "keylaunch-{label}-{}-{unique}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn accepts_default_config() {
    let cfg = Config::default();
    assert_eq!(cfg.port, 62321);
    assert_eq!(cfg.suggestion_limit, 5);
    assert_eq!(cfg.launch_mode, LaunchMode::Hide);
    assert!(cfg.config_path.to_string_lossy().contains("keylaunch"));
    assert!(cfg.history_path.to_string_lossy().contains("keylaunch"));
    assert!(config::validate(&cfg).is_ok());
}

#[test]
fn rejects_suggestion_limit_out_of_range() {
    let cfg = Config {
        suggestion_limit: 0,
        ..Default::default()
    };
    assert!(config::validate(&cfg).is_err());

    let cfg = Config {
        suggestion_limit: 101,
        ..Default::default()
    };
    assert!(config::validate(&cfg).is_err());
}

#[test]
fn rejects_zero_port_and_unknown_log_level() {
    let cfg = Config {
        port: 0,
        ..Default::default()
    };
    assert!(config::validate(&cfg).is_err());

    let cfg = Config {
        log_level: "loud".to_string(),
        ..Default::default()
    };
    let error = config::validate(&cfg).unwrap_err();
    assert!(error.contains("loud"));
}

#[test]
fn missing_file_yields_defaults_bound_to_path() {
    let dir = unique_temp_dir("cfg-missing");
    let path = dir.join("config.toml");

    let cfg = config::load(Some(&path)).unwrap();

    assert_eq!(cfg.config_path, path);
    assert_eq!(cfg.port, Config::default().port);
    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn loads_partial_toml_over_defaults() {
    let dir = unique_temp_dir("cfg-toml");
    let path = dir.join("config.toml");
    std::fs::write(
        &path,
        "suggestion_limit = 8\nlaunch_mode = \"exit\"\ndesktop_name = \"GNOME\"\n",
    )
    .unwrap();

    let cfg = config::load(Some(&path)).unwrap();

    assert_eq!(cfg.suggestion_limit, 8);
    assert_eq!(cfg.launch_mode, LaunchMode::Exit);
    assert_eq!(cfg.desktop_name, "GNOME");
    assert_eq!(cfg.port, 62321);
    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn loads_json5_by_extension() {
    let dir = unique_temp_dir("cfg-json");
    let path = dir.join("config.json");
    std::fs::write(
        &path,
        "{\n  // comments are allowed\n  port: 40123,\n  log_level: 'debug',\n}\n",
    )
    .unwrap();

    let cfg = config::load(Some(&path)).unwrap();

    assert_eq!(cfg.port, 40123);
    assert_eq!(cfg.log_level_filter(), log::LevelFilter::Debug);
    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn invalid_values_are_reported() {
    let dir = unique_temp_dir("cfg-invalid");
    let path = dir.join("config.toml");
    std::fs::write(&path, "probe_timeout_ms = 0\n").unwrap();

    let result = config::load(Some(&path));

    assert!(matches!(result, Err(ConfigError::Invalid(_))));
    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn malformed_file_is_a_parse_error() {
    let dir = unique_temp_dir("cfg-malformed");
    let path = dir.join("config.toml");
    std::fs::write(&path, "port = \"not a number\"\n").unwrap();

    assert!(matches!(config::load(Some(&path)), Err(ConfigError::Parse(_))));
    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn saved_config_loads_back() {
    let dir = unique_temp_dir("cfg-save");
    let cfg = Config {
        config_path: dir.join("nested").join("config.toml"),
        icon_size: 64,
        launch_mode: LaunchMode::Exit,
        ..Default::default()
    };

    config::save(&cfg).unwrap();
    let loaded = config::load(Some(&cfg.config_path)).unwrap();

    assert_eq!(loaded, cfg);
    std::fs::remove_dir_all(dir).unwrap();
}
