//! Execution engine
//!
//! The single entry point transports use: batch runs, interactive sessions,
//! input forwarding and stop. Build one with [`Engine::new`] and share it as
//! `Arc<Engine>`.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Config;
use crate::sandbox::{
    self, Backend, BatchRunner, ExecutionResult, Language, ProcessRunner, RuntimeSelector,
    SandboxAvailability,
};
use crate::session::{SessionEvents, SessionInfo, SessionManager};

/// Code execution engine
pub struct Engine {
    config: Config,
    availability: SandboxAvailability,
    selector: RuntimeSelector,
    sessions: SessionManager,
}

impl Engine {
    /// Build the engine, probing the container runtime once
    pub async fn new(config: Config) -> Self {
        let (selector, availability) = sandbox::create_runtime(&config).await;
        info!("Execution engine ready, container sandbox {}", availability);
        Self::assemble(config, selector, availability)
    }

    /// Build an engine that never uses containers
    pub fn subprocess_only(config: Config) -> Self {
        let subprocess: Arc<dyn BatchRunner> = Arc::new(ProcessRunner::new(
            config.interpreters.clone(),
            config.session.scratch_dir.clone(),
        ));
        let selector = RuntimeSelector::new(None, subprocess);
        Self::assemble(config, selector, SandboxAvailability::Disabled)
    }

    fn assemble(config: Config, selector: RuntimeSelector, availability: SandboxAvailability) -> Self {
        let sessions = SessionManager::new(config.interpreters.clone(), config.session.clone());
        Engine {
            config,
            availability,
            selector,
            sessions,
        }
    }

    fn timeout_or_default(&self, timeout: Option<Duration>) -> Duration {
        timeout.unwrap_or_else(|| self.config.session.default_timeout())
    }

    /// Run `code` to completion and return its captured result.
    ///
    /// Never fails: infrastructure errors, timeouts and missing interpreters
    /// all come back in the result's `error` field.
    pub async fn run_batch(
        &self,
        code: &str,
        timeout: Option<Duration>,
        language: Language,
    ) -> ExecutionResult {
        let timeout = self.timeout_or_default(timeout);
        debug!("Batch run: {} for up to {:?}", language, timeout);
        self.selector.run(code, timeout, language).await
    }

    /// Run `code` as an interactive session; resolves with its exit code
    pub async fn start_interactive(
        &self,
        session_id: &str,
        code: &str,
        timeout: Option<Duration>,
        language: Language,
        events: Arc<dyn SessionEvents>,
    ) -> i32 {
        let timeout = self.timeout_or_default(timeout);
        self.sessions
            .start(session_id, code, timeout, language, events)
            .await
    }

    /// Forward one line of input to a live session
    pub async fn send_input(&self, session_id: &str, text: &str) -> bool {
        self.sessions.send_input(session_id, text).await
    }

    /// Kill a live session; unknown ids are ignored
    pub async fn stop_process(&self, session_id: &str) {
        self.sessions.stop(session_id).await
    }

    /// Stop all live sessions, e.g. on shutdown
    pub async fn shutdown(&self) {
        self.sessions.stop_all().await
    }

    pub fn availability(&self) -> &SandboxAvailability {
        &self.availability
    }

    /// Path a batch run in `language` would take
    pub fn backend_for(&self, language: Language) -> Backend {
        self.selector.backend_for(language)
    }

    pub async fn active_sessions(&self) -> Vec<SessionInfo> {
        self.sessions.active_sessions().await
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
