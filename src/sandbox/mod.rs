//! Sandbox module - batch code execution
//!
//! Provides two execution paths:
//! - Container Mode: ephemeral, resource-capped Docker containers (Python only)
//! - Subprocess Mode: the host interpreter, bounded only by the timeout

pub mod container;
pub mod executor;
pub mod process;
pub mod selector;

pub use container::ContainerRunner;
pub use executor::{BatchRunner, ExecutionResult, Language, BATCH_TIMEOUT_MESSAGE};
pub use process::ProcessRunner;
pub use selector::{select_backend, Backend, RuntimeSelector, SandboxAvailability};

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;

/// Probe the container runtime once and build the batch runtime around the result
pub async fn create_runtime(config: &Config) -> (RuntimeSelector, SandboxAvailability) {
    let subprocess: Arc<dyn BatchRunner> = Arc::new(ProcessRunner::new(
        config.interpreters.clone(),
        config.session.scratch_dir.clone(),
    ));

    if !config.sandbox.enabled {
        info!("Container sandbox disabled by configuration");
        return (RuntimeSelector::new(None, subprocess), SandboxAvailability::Disabled);
    }

    match ContainerRunner::connect(&config.sandbox).await {
        Ok(runner) => {
            info!("Container sandbox available (image {})", config.sandbox.image);
            let container: Arc<dyn BatchRunner> = Arc::new(runner);
            (
                RuntimeSelector::new(Some(container), subprocess),
                SandboxAvailability::Available,
            )
        }
        Err(e) => {
            warn!("Container sandbox unavailable, using subprocesses: {}", e);
            (
                RuntimeSelector::new(None, subprocess),
                SandboxAvailability::Unavailable(e.to_string()),
            )
        }
    }
}
