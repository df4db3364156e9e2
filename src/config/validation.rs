//! Configuration validation
//!
//! Validates configuration and reports issues.

use super::types::sandbox::parse_memory_limit;
use super::types::Config;

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    /// Whether the config is valid
    pub valid: bool,
    /// Validation errors (critical)
    pub errors: Vec<ValidationIssue>,
    /// Validation warnings (non-critical)
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        ConfigValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn with_error(mut self, issue: ValidationIssue) -> Self {
        self.valid = false;
        self.errors.push(issue);
        self
    }

    /// Add a warning
    pub fn with_warning(mut self, issue: ValidationIssue) -> Self {
        self.warnings.push(issue);
        self
    }
}

/// A validation issue
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the config field
    pub path: String,
    /// Issue message
    pub message: String,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Create a new issue
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

/// Validate the configuration
pub fn validate_config(config: &Config) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::valid();

    result = validate_sandbox_config(config, result);
    result = validate_interpreter_config(config, result);
    result = validate_session_config(config, result);

    result
}

fn validate_sandbox_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    let sandbox = &config.sandbox;

    if sandbox.enabled && sandbox.image.is_empty() {
        result = result.with_error(
            ValidationIssue::new("sandbox.image", "Sandbox enabled but no image specified")
                .with_suggestion("Set sandbox.image to a Python image such as python:3.11-slim"),
        );
    }

    if parse_memory_limit(&sandbox.memory_limit).is_none() {
        result = result.with_error(
            ValidationIssue::new(
                "sandbox.memory_limit",
                format!("Unparseable memory limit: {}", sandbox.memory_limit),
            )
            .with_suggestion("Use a size such as 256m or 1g"),
        );
    }

    if sandbox.cpu_quota <= 0 || sandbox.cpu_period <= 0 {
        result = result.with_error(ValidationIssue::new(
            "sandbox.cpu_quota",
            "CPU quota and period must be positive",
        ));
    }

    if sandbox.network != "none" {
        result = result.with_warning(
            ValidationIssue::new(
                "sandbox.network",
                format!("Sandbox network mode is '{}', containers can reach the network", sandbox.network),
            )
            .with_suggestion("Set sandbox.network to none"),
        );
    }

    result
}

fn validate_interpreter_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    let interpreters = [
        ("interpreters.python", &config.interpreters.python),
        ("interpreters.node", &config.interpreters.node),
    ];

    for (path, binary) in interpreters {
        if which::which(binary).is_err() {
            result = result.with_warning(
                ValidationIssue::new(path, format!("Interpreter not found on PATH: {}", binary))
                    .with_suggestion("Install it or point the setting at an absolute path"),
            );
        }
    }

    result
}

fn validate_session_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    let session = &config.session;

    if session.default_timeout_secs == 0 {
        result = result.with_error(ValidationIssue::new(
            "session.default_timeout_secs",
            "Default timeout must be at least one second",
        ));
    }

    if session.max_chunk_bytes == 0 {
        result = result.with_error(ValidationIssue::new(
            "session.max_chunk_bytes",
            "Chunk size must be greater than zero",
        ));
    }

    if session.poll_interval_ms == 0 {
        result = result.with_warning(
            ValidationIssue::new("session.poll_interval_ms", "Zero poll interval busy-waits")
                .with_suggestion("Use a small positive interval such as 50"),
        );
    }

    if !session.scratch_dir.exists() {
        result = result.with_warning(
            ValidationIssue::new(
                "session.scratch_dir",
                format!("Scratch directory does not exist: {}", session.scratch_dir.display()),
            )
            .with_suggestion("Create the directory or change session.scratch_dir"),
        );
    }

    result
}
