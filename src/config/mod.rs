//! Configuration module
//!
//! - types/mod.rs: Root `Config`
//! - types/sandbox.rs: Container sandbox and interpreter configuration
//! - types/session.rs: Interactive session configuration
//! - io.rs: Configuration loading and saving
//! - validation.rs: Configuration validation
//! - paths.rs: Configuration file paths

mod io;
mod paths;
mod types;
mod validation;

pub use types::Config;

pub use types::sandbox::{parse_memory_limit, InterpreterConfig, SandboxConfig};
pub use types::session::{DuplicatePolicy, SessionConfig};

pub use io::{apply_env_overrides, load_config, load_config_from_path, save_config};
pub use paths::{config_dir, config_path, ensure_dir};
pub use validation::{validate_config, ConfigValidationResult, ValidationIssue};
