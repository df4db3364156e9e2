//! Runtime selection between the container and subprocess paths
//!
//! Container availability is decided once, when the engine is built, and the
//! policy below is then a pure function of (language, availability).

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::sandbox::executor::{BatchRunner, ExecutionResult, Language};

/// Execution path for a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Ephemeral resource-capped container
    Container,
    /// Host interpreter subprocess
    Subprocess,
}

/// Pick the execution path for a language.
///
/// JavaScript never uses the container; Python does whenever it is available.
pub fn select_backend(language: Language, container_available: bool) -> Backend {
    match language {
        Language::JavaScript => Backend::Subprocess,
        Language::Python if container_available => Backend::Container,
        Language::Python => Backend::Subprocess,
    }
}

/// Outcome of the startup container-runtime probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxAvailability {
    /// Daemon reachable; Python batch runs use containers
    Available,
    /// Probe failed; everything uses subprocesses
    Unavailable(String),
    /// Turned off by configuration
    Disabled,
}

impl SandboxAvailability {
    pub fn is_available(&self) -> bool {
        matches!(self, SandboxAvailability::Available)
    }
}

impl std::fmt::Display for SandboxAvailability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SandboxAvailability::Available => write!(f, "available"),
            SandboxAvailability::Unavailable(reason) => write!(f, "unavailable ({})", reason),
            SandboxAvailability::Disabled => write!(f, "disabled"),
        }
    }
}

/// Batch runner that routes each run to the container or subprocess strategy
pub struct RuntimeSelector {
    container: Option<Arc<dyn BatchRunner>>,
    subprocess: Arc<dyn BatchRunner>,
}

impl RuntimeSelector {
    /// `container` is `None` when the probe found no usable runtime
    pub fn new(container: Option<Arc<dyn BatchRunner>>, subprocess: Arc<dyn BatchRunner>) -> Self {
        RuntimeSelector {
            container,
            subprocess,
        }
    }

    /// Backend a run in `language` would start on
    pub fn backend_for(&self, language: Language) -> Backend {
        select_backend(language, self.container.is_some())
    }

    /// Run once, retrying on the subprocess path only when the container
    /// image is missing. Never fails; errors become `error` payloads.
    pub async fn run(&self, code: &str, timeout: Duration, language: Language) -> ExecutionResult {
        if let (Backend::Container, Some(container)) = (self.backend_for(language), &self.container) {
            match container.run(code, timeout, language).await {
                Ok(result) => return result,
                Err(e) if e.is_fallback_eligible() => {
                    warn!("Container run failed, falling back to subprocess: {}", e);
                }
                Err(e) => return ExecutionResult::failure(e.to_string()),
            }
        }

        info!("Running {} via {}", language, self.subprocess.name());
        self.subprocess
            .run(code, timeout, language)
            .await
            .unwrap_or_else(|e| ExecutionResult::failure(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted runner that counts calls
    struct StubRunner {
        name: &'static str,
        calls: AtomicUsize,
        respond: fn() -> Result<ExecutionResult>,
    }

    impl StubRunner {
        fn new(name: &'static str, respond: fn() -> Result<ExecutionResult>) -> Arc<Self> {
            Arc::new(StubRunner {
                name,
                calls: AtomicUsize::new(0),
                respond,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BatchRunner for StubRunner {
        fn name(&self) -> &str {
            self.name
        }

        fn supports_language(&self, _language: Language) -> bool {
            true
        }

        async fn run(&self, _code: &str, _timeout: Duration, _language: Language) -> Result<ExecutionResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.respond)()
        }
    }

    fn subprocess_ok() -> Result<ExecutionResult> {
        Ok(ExecutionResult::completed(0, "from subprocess\n", None))
    }

    #[test]
    fn test_select_backend() {
        assert_eq!(select_backend(Language::JavaScript, true), Backend::Subprocess);
        assert_eq!(select_backend(Language::JavaScript, false), Backend::Subprocess);
        assert_eq!(select_backend(Language::Python, true), Backend::Container);
        assert_eq!(select_backend(Language::Python, false), Backend::Subprocess);
    }

    #[tokio::test]
    async fn test_missing_image_falls_back_once() {
        let container = StubRunner::new("container", || {
            Err(Error::ImageMissing("No such image: python:3.11-slim".to_string()))
        });
        let subprocess = StubRunner::new("subprocess", subprocess_ok);
        let selector = RuntimeSelector::new(Some(container.clone() as Arc<dyn BatchRunner>), subprocess.clone());

        let result = selector.run("print(1)", Duration::from_secs(1), Language::Python).await;

        assert_eq!(result.output.as_deref(), Some("from subprocess\n"));
        assert_eq!(result.error, None);
        assert_eq!(container.calls(), 1);
        assert_eq!(subprocess.calls(), 1);
    }

    #[tokio::test]
    async fn test_other_container_failures_surface() {
        let container = StubRunner::new("container", || {
            Err(Error::Container("daemon went away".to_string()))
        });
        let subprocess = StubRunner::new("subprocess", subprocess_ok);
        let selector = RuntimeSelector::new(Some(container.clone() as Arc<dyn BatchRunner>), subprocess.clone());

        let result = selector.run("print(1)", Duration::from_secs(1), Language::Python).await;

        assert!(result.error.unwrap().contains("daemon went away"));
        assert_eq!(subprocess.calls(), 0);
    }

    #[tokio::test]
    async fn test_container_timeout_is_not_retried() {
        let container = StubRunner::new("container", || Ok(ExecutionResult::timeout()));
        let subprocess = StubRunner::new("subprocess", subprocess_ok);
        let selector = RuntimeSelector::new(Some(container.clone() as Arc<dyn BatchRunner>), subprocess.clone());

        let result = selector.run("while True: pass", Duration::from_secs(1), Language::Python).await;

        assert!(result.timed_out());
        assert_eq!(subprocess.calls(), 0);
    }

    #[tokio::test]
    async fn test_javascript_skips_container() {
        let container = StubRunner::new("container", subprocess_ok);
        let subprocess = StubRunner::new("subprocess", subprocess_ok);
        let selector = RuntimeSelector::new(Some(container.clone() as Arc<dyn BatchRunner>), subprocess.clone());

        selector.run("console.log(1)", Duration::from_secs(1), Language::JavaScript).await;

        assert_eq!(container.calls(), 0);
        assert_eq!(subprocess.calls(), 1);
    }

    #[tokio::test]
    async fn test_without_container_uses_subprocess() {
        let subprocess = StubRunner::new("subprocess", subprocess_ok);
        let selector = RuntimeSelector::new(None, subprocess.clone());

        assert_eq!(selector.backend_for(Language::Python), Backend::Subprocess);
        let result = selector.run("print(1)", Duration::from_secs(1), Language::Python).await;
        assert!(result.is_success());
    }

    #[test]
    fn test_availability_display() {
        assert!(SandboxAvailability::Available.is_available());
        assert!(!SandboxAvailability::Disabled.is_available());
        assert_eq!(
            SandboxAvailability::Unavailable("no socket".to_string()).to_string(),
            "unavailable (no socket)"
        );
    }
}
