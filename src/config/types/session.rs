//! Session configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Interactive session and stream-reader tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Timeout applied when a caller does not pass one
    #[serde(default = "default_timeout")]
    pub default_timeout_secs: u64,
    /// Bounded wait of the stream consumer on its queue
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Chunk size at which the pipe worker flushes regardless of readiness
    #[serde(default = "default_max_chunk")]
    pub max_chunk_bytes: usize,
    /// Consecutive empty polls before the consumer checks for process exit
    #[serde(default = "default_exit_check_polls")]
    pub exit_check_polls: u32,
    /// Directory for temporary source files
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
    /// What to do when `start` reuses a registered session id
    #[serde(default)]
    pub on_duplicate: DuplicatePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            default_timeout_secs: default_timeout(),
            poll_interval_ms: default_poll_interval(),
            max_chunk_bytes: default_max_chunk(),
            exit_check_polls: default_exit_check_polls(),
            scratch_dir: default_scratch_dir(),
            on_duplicate: DuplicatePolicy::default(),
        }
    }
}

impl SessionConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_timeout() -> u64 {
    10
}

fn default_poll_interval() -> u64 {
    50
}

fn default_max_chunk() -> usize {
    1024
}

fn default_exit_check_polls() -> u32 {
    3
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir()
}

/// Policy for a `start` whose session id is still registered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Refuse the new run and leave the live one untouched
    #[default]
    Reject,
    /// Force-stop the live run, then start the new one
    Replace,
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(DuplicatePolicy::Reject),
            "replace" => Ok(DuplicatePolicy::Replace),
            _ => Err(crate::error::Error::Config(format!(
                "Invalid duplicate policy: {}. Valid: reject, replace",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.default_timeout(), Duration::from_secs(10));
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.on_duplicate, DuplicatePolicy::Reject);
    }

    #[test]
    fn test_duplicate_policy_parsing() {
        assert_eq!("replace".parse::<DuplicatePolicy>().unwrap(), DuplicatePolicy::Replace);
        assert_eq!("REJECT".parse::<DuplicatePolicy>().unwrap(), DuplicatePolicy::Reject);
        assert!("overwrite".parse::<DuplicatePolicy>().is_err());
    }
}
