//! Configuration I/O - Loading and saving configuration
//!
//! Handles reading configuration from files and environment variables.

use std::path::Path;

use super::types::Config;
use crate::error::{Error, Result};

/// Load configuration with layered precedence:
/// 1. Config file (config.json / config.toml) if it exists, otherwise defaults
/// 2. Environment variable overrides (includes .env)
pub fn load_config() -> Result<Config> {
    let config_path = super::paths::config_path();

    let mut config = if config_path.exists() {
        load_config_from_path(&config_path)?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config);

    Ok(config)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    parse_config(&content, path)
}

fn parse_config(content: &str, path: &Path) -> Result<Config> {
    // Detect format by extension
    let config: Config = if path.extension().map_or(false, |ext| ext == "json") {
        json5::from_str(content).map_err(|e| Error::Config(format!("Invalid JSON config: {}", e)))?
    } else if path.extension().map_or(false, |ext| ext == "toml") {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML config: {}", e)))?
    } else {
        json5::from_str(content)
            .or_else(|_| toml::from_str(content).map_err(|e| Error::Config(e.to_string())))
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?
    };

    Ok(config)
}

/// Apply environment variable overrides to an existing config.
///
/// Loads a `.env` file if present and overlays any set variables onto the
/// config. Env vars have the highest precedence: defaults < file < env.
pub fn apply_env_overrides(config: &mut Config) {
    dotenvy::dotenv().ok();
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Overlay values produced by `lookup` onto `config`.
///
/// Unparseable values are ignored and the previous setting is kept.
pub(crate) fn apply_overrides_from<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    // Sandbox overrides
    if let Some(v) = lookup("SANDBOX_ENABLED") {
        config.sandbox.enabled = !matches!(v.to_lowercase().as_str(), "false" | "0" | "no" | "off");
    }
    if let Some(image) = lookup("SANDBOX_IMAGE") {
        config.sandbox.image = image;
    }
    if let Some(limit) = lookup("SANDBOX_MEMORY_LIMIT") {
        config.sandbox.memory_limit = limit;
    }

    // Interpreter overrides
    if let Some(python) = lookup("PYTHON_BIN") {
        config.interpreters.python = python;
    }
    if let Some(node) = lookup("NODE_BIN") {
        config.interpreters.node = node;
    }

    // Session overrides
    if let Some(timeout) = lookup("EXEC_TIMEOUT") {
        if let Ok(v) = timeout.parse() {
            config.session.default_timeout_secs = v;
        }
    }
    if let Some(dir) = lookup("EXEC_SCRATCH_DIR") {
        config.session.scratch_dir = std::path::PathBuf::from(dir);
    }
    if let Some(policy) = lookup("EXEC_ON_DUPLICATE") {
        if let Ok(v) = policy.parse() {
            config.session.on_duplicate = v;
        }
    }
}

/// Save configuration to a file
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content = if path.extension().map_or(false, |ext| ext == "toml") {
        toml::to_string_pretty(config).map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    } else {
        serde_json::to_string_pretty(config).map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    };

    if let Some(parent) = path.parent() {
        super::paths::ensure_dir(parent)?;
    }

    std::fs::write(path, content)?;
    Ok(())
}
