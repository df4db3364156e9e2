//! Common runner trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Result;

/// Supported programming languages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Python,
    JavaScript,
}

impl Language {
    /// Extension of the temporary source file
    pub fn extension(&self) -> &'static str {
        match self {
            Language::Python => ".py",
            Language::JavaScript => ".js",
        }
    }
}

impl std::str::FromStr for Language {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "javascript" | "js" | "node" => Ok(Language::JavaScript),
            _ => Err(crate::Error::InvalidInput(format!(
                "Unsupported language: {}. Supported: python, javascript",
                s
            ))),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::Python => write!(f, "python"),
            Language::JavaScript => write!(f, "javascript"),
        }
    }
}

/// Message returned when a batch run exceeds its budget
pub const BATCH_TIMEOUT_MESSAGE: &str = "⏱ Execution timed out";

/// Result of a non-interactive run
///
/// Serializes to the `{exit_code?, output?, error?}` payload transports emit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Exit code (absent when the run never completed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Combined output, stdout followed by stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Error text: stderr on non-zero exit, or an engine failure message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Create a result for a run that completed with an exit code
    pub fn completed(exit_code: i32, output: impl Into<String>, error: Option<String>) -> Self {
        ExecutionResult {
            exit_code: Some(exit_code),
            output: Some(output.into()),
            error,
        }
    }

    /// Create an error-only result
    pub fn failure(error: impl Into<String>) -> Self {
        ExecutionResult {
            exit_code: None,
            output: None,
            error: Some(error.into()),
        }
    }

    /// Create a timeout result; output produced before the kill is not included
    pub fn timeout() -> Self {
        Self::failure(BATCH_TIMEOUT_MESSAGE)
    }

    /// Whether the run completed with exit code 0
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Whether this result reports a timeout
    pub fn timed_out(&self) -> bool {
        self.exit_code.is_none() && self.error.as_deref() == Some(BATCH_TIMEOUT_MESSAGE)
    }
}

/// Strategy interface for batch execution backends
#[async_trait]
pub trait BatchRunner: Send + Sync {
    /// Get the runner name
    fn name(&self) -> &str;

    /// Check if a language is supported
    fn supports_language(&self, language: Language) -> bool;

    /// Execute code once.
    ///
    /// `Ok` carries every outcome of the user's program, including non-zero
    /// exits, timeouts and launch failures. `Err` is reserved for
    /// infrastructure failures of the backend itself.
    async fn run(&self, code: &str, timeout: Duration, language: Language) -> Result<ExecutionResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parsing() {
        assert_eq!("python".parse::<Language>().unwrap(), Language::Python);
        assert_eq!("py".parse::<Language>().unwrap(), Language::Python);
        assert_eq!("js".parse::<Language>().unwrap(), Language::JavaScript);
        assert_eq!("JavaScript".parse::<Language>().unwrap(), Language::JavaScript);
        assert!("ruby".parse::<Language>().is_err());
    }

    #[test]
    fn test_language_extension() {
        assert_eq!(Language::Python.extension(), ".py");
        assert_eq!(Language::JavaScript.extension(), ".js");
        assert_eq!(Language::default(), Language::Python);
    }

    #[test]
    fn test_execution_result_wire_shape() {
        let completed = ExecutionResult::completed(1, "out\n", Some(String::new()));
        let json = serde_json::to_value(&completed).unwrap();
        assert_eq!(json, serde_json::json!({"exit_code": 1, "output": "out\n", "error": ""}));

        let ok = ExecutionResult::completed(0, "hi\n", None);
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json, serde_json::json!({"exit_code": 0, "output": "hi\n"}));
        assert!(ok.is_success());

        let timeout = ExecutionResult::timeout();
        let json = serde_json::to_value(&timeout).unwrap();
        assert_eq!(json, serde_json::json!({"error": "⏱ Execution timed out"}));
        assert!(timeout.timed_out());
        assert!(!timeout.is_success());
    }
}
