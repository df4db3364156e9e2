//! Configuration types module

pub mod sandbox;
pub mod session;

use serde::{Deserialize, Serialize};

/// Main engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Container sandbox configuration
    #[serde(default)]
    pub sandbox: sandbox::SandboxConfig,

    /// Interpreter binaries for the subprocess path
    #[serde(default)]
    pub interpreters: sandbox::InterpreterConfig,

    /// Interactive session configuration
    #[serde(default)]
    pub session: session::SessionConfig,
}

impl Config {
    /// Load configuration from the config file and environment variables
    ///
    /// Precedence, lowest first:
    /// 1. Default values
    /// 2. Config file (if present)
    /// 3. Environment variable overrides
    pub fn from_env() -> crate::error::Result<Self> {
        crate::config::load_config()
    }
}
