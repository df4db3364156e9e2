//! Sandbox configuration types
//!
//! Configuration for the container path and for the interpreters used by the
//! subprocess path.

use serde::{Deserialize, Serialize};

/// Container sandbox configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Use the container runtime when it is reachable at startup
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Docker image to use for Python batch runs
    #[serde(default = "default_image")]
    pub image: String,
    /// Memory ceiling (e.g. "256m", "1g")
    #[serde(default = "default_memory")]
    pub memory_limit: String,
    /// CFS quota in microseconds per `cpu_period`
    #[serde(default = "default_cpu_quota")]
    pub cpu_quota: i64,
    /// CFS period in microseconds
    #[serde(default = "default_cpu_period")]
    pub cpu_period: i64,
    /// Network mode
    #[serde(default = "default_network")]
    pub network: String,
    /// Container name prefix; a random suffix is appended per run
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
    /// Pull the image during the startup probe if it is missing
    #[serde(default)]
    pub pull_image: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        SandboxConfig {
            enabled: true,
            image: default_image(),
            memory_limit: default_memory(),
            cpu_quota: default_cpu_quota(),
            cpu_period: default_cpu_period(),
            network: default_network(),
            name_prefix: default_name_prefix(),
            pull_image: false,
        }
    }
}

impl SandboxConfig {
    /// Fraction of one CPU the container may use
    pub fn cpu_fraction(&self) -> f64 {
        if self.cpu_period <= 0 {
            return 0.0;
        }
        self.cpu_quota as f64 / self.cpu_period as f64
    }
}

fn default_true() -> bool {
    true
}

fn default_image() -> String {
    "python:3.11-slim".to_string()
}

fn default_memory() -> String {
    "256m".to_string()
}

fn default_cpu_quota() -> i64 {
    50_000
}

fn default_cpu_period() -> i64 {
    100_000
}

fn default_network() -> String {
    "none".to_string()
}

fn default_name_prefix() -> String {
    "code-exec".to_string()
}

/// Interpreter binaries for the subprocess path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpreterConfig {
    /// Python interpreter (name on PATH or absolute path)
    #[serde(default = "default_python")]
    pub python: String,
    /// JavaScript interpreter
    #[serde(default = "default_node")]
    pub node: String,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            python: default_python(),
            node: default_node(),
        }
    }
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_node() -> String {
    "node".to_string()
}

/// Parse a memory limit string (e.g., "512m", "1g") to bytes
pub fn parse_memory_limit(limit: &str) -> Option<i64> {
    let limit = limit.trim().to_lowercase();
    let (num_str, unit) = if limit.ends_with('g') || limit.ends_with("gb") {
        (limit.trim_end_matches(|c| c == 'g' || c == 'b'), "g")
    } else if limit.ends_with('m') || limit.ends_with("mb") {
        (limit.trim_end_matches(|c| c == 'm' || c == 'b'), "m")
    } else if limit.ends_with('k') || limit.ends_with("kb") {
        (limit.trim_end_matches(|c| c == 'k' || c == 'b'), "k")
    } else {
        (limit.as_str(), "b")
    };

    let num: i64 = num_str.parse().ok()?;

    Some(match unit {
        "g" => num * 1024 * 1024 * 1024,
        "m" => num * 1024 * 1024,
        "k" => num * 1024,
        _ => num,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sandbox_policy_defaults() {
        let config = SandboxConfig::default();
        assert!(config.enabled);
        assert_eq!(config.image, "python:3.11-slim");
        assert_eq!(config.network, "none");
        assert_eq!(parse_memory_limit(&config.memory_limit), Some(256 * 1024 * 1024));
        assert!((config.cpu_fraction() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_memory_limit() {
        assert_eq!(parse_memory_limit("512m"), Some(512 * 1024 * 1024));
        assert_eq!(parse_memory_limit("1g"), Some(1024 * 1024 * 1024));
        assert_eq!(parse_memory_limit("1024k"), Some(1024 * 1024));
        assert_eq!(parse_memory_limit("1024"), Some(1024));
        assert_eq!(parse_memory_limit("lots"), None);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: SandboxConfig = serde_json::from_str(r#"{"enabled": false}"#).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.cpu_quota, 50_000);
        assert_eq!(config.name_prefix, "code-exec");
    }
}
