use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::coordinator::DEFAULT_PORT;
use crate::session::LaunchMode;

const APP_DIR_NAME: &str = "keylaunch";
const CONFIG_FILE_NAME: &str = "config.toml";
const HISTORY_FILE_NAME: &str = "history";

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(error) => write!(f, "io error: {error}"),
            Self::Parse(error) => write!(f, "parse error: {error}"),
            Self::Invalid(error) => write!(f, "invalid config: {error}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip)]
    pub config_path: PathBuf,
    pub port: u16,
    pub probe_timeout_ms: u64,
    pub suggestion_limit: u16,
    pub launch_mode: LaunchMode,
    /// Identifier matched against `OnlyShowIn` in desktop entries.
    pub desktop_name: String,
    pub application_dirs: Vec<PathBuf>,
    pub icon_theme_dirs: Vec<PathBuf>,
    pub icon_size: u32,
    pub history_path: PathBuf,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = stable_config_dir();
        let data_dir = user_data_dir();
        Self {
            config_path: config_dir.join(CONFIG_FILE_NAME),
            port: DEFAULT_PORT,
            probe_timeout_ms: 50,
            suggestion_limit: 5,
            launch_mode: LaunchMode::Hide,
            desktop_name: "Launcher".to_string(),
            application_dirs: vec![
                PathBuf::from("/usr/share/applications"),
                data_dir.join("applications"),
            ],
            icon_theme_dirs: vec![
                PathBuf::from("/usr/share/icons/hicolor"),
                data_dir.join("icons").join("hicolor"),
            ],
            icon_size: 48,
            history_path: config_dir.join(HISTORY_FILE_NAME),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level
            .parse::<log::LevelFilter>()
            .unwrap_or(log::LevelFilter::Info)
    }
}

/// Per-user directory holding config and history.
pub fn stable_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}

/// Per-user directory for logs and other local state.
pub fn stable_app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}

fn user_data_dir() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(".local")
            .join("share")
    })
}

pub fn validate(cfg: &Config) -> Result<(), String> {
    if cfg.port == 0 {
        return Err("port must be non-zero".into());
    }

    if !(1..=5_000).contains(&cfg.probe_timeout_ms) {
        return Err("probe_timeout_ms out of range".into());
    }

    if !(1..=100).contains(&cfg.suggestion_limit) {
        return Err("suggestion_limit out of range".into());
    }

    if cfg.desktop_name.trim().is_empty() {
        return Err("desktop_name is required".into());
    }

    if cfg.history_path.as_os_str().is_empty() {
        return Err("history_path is required".into());
    }

    if cfg.icon_size == 0 {
        return Err("icon_size must be non-zero".into());
    }

    if cfg.log_level.parse::<log::LevelFilter>().is_err() {
        return Err(format!("unknown log_level '{}'", cfg.log_level));
    }

    Ok(())
}

/// Loads config from `path`, or from the per-user default location.
///
/// A missing file yields defaults bound to that path. JSON/JSON5 files are
/// accepted by extension; everything else is read as TOML.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| stable_config_dir().join(CONFIG_FILE_NAME));

    let raw = match std::fs::read_to_string(&config_path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Config {
                config_path,
                ..Config::default()
            });
        }
        Err(error) => return Err(ConfigError::Io(error)),
    };

    let mut cfg = parse(&raw, &config_path)?;
    cfg.config_path = config_path;
    validate(&cfg).map_err(ConfigError::Invalid)?;
    Ok(cfg)
}

pub fn save(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = cfg.config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let encoded = if is_json_path(&cfg.config_path) {
        json5::to_string(cfg).map_err(|e| ConfigError::Parse(e.to_string()))?
    } else {
        toml::to_string_pretty(cfg).map_err(|e| ConfigError::Parse(e.to_string()))?
    };
    std::fs::write(&cfg.config_path, encoded)?;
    Ok(())
}

fn parse(raw: &str, path: &Path) -> Result<Config, ConfigError> {
    if is_json_path(path) {
        json5::from_str::<Config>(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    } else {
        toml::from_str::<Config>(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

fn is_json_path(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            extension.eq_ignore_ascii_case("json") || extension.eq_ignore_ascii_case("json5")
        })
}
