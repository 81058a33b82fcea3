use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::HookrelayConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "hookrelay.toml",
    "hookrelay.yaml",
    "hookrelay.yml",
    "hookrelay.json",
];

/// Environment variable overriding the user-global config directory.
const CONFIG_DIR_ENV: &str = "HOOKRELAY_CONFIG_DIR";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported config format: .{0}")]
    UnsupportedFormat(String),

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<HookrelayConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&substitute_env(&raw), path)?;
    validate(&config)?;
    Ok(config)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./hookrelay.{toml,yaml,yml,json}`
/// 2. `$HOOKRELAY_CONFIG_DIR/` or `~/.config/hookrelay/`
///
/// Returns `HookrelayConfig::default()` if no usable config file is found.
pub fn discover_and_load() -> HookrelayConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return HookrelayConfig::default();
    };
    debug!(path = %path.display(), "loading config");
    match load_config(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            HookrelayConfig::default()
        },
    }
}

/// Returns the user-global config directory.
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    directories::ProjectDirs::from("", "", "hookrelay").map(|d| d.config_dir().to_path_buf())
}

fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

fn parse_config(raw: &str, path: &Path) -> Result<HookrelayConfig, ConfigError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

fn validate(config: &HookrelayConfig) -> Result<(), ConfigError> {
    if config.http.timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "http.timeout_secs must be greater than zero".into(),
        ));
    }
    if config.commands.prefix.trim().is_empty() {
        return Err(ConfigError::Invalid("commands.prefix must not be empty".into()));
    }
    Ok(())
}
