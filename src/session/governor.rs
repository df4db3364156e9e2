//! Per-session timeout watchdog

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::warn;

use super::events::SessionEvents;
use super::RunControl;

/// Text of the synthetic error chunk emitted when a session is killed for time
pub fn timeout_message(timeout: Duration) -> String {
    format!("\n⏱ Execution timed out after {:?}\n", timeout)
}

/// Delayed task that kills an overrunning process.
///
/// Dropping the governor disarms it.
pub struct TimeoutGovernor {
    handle: Option<JoinHandle<()>>,
    fired: Arc<AtomicBool>,
}

impl TimeoutGovernor {
    /// Arm the watchdog for one run
    pub fn spawn(timeout: Duration, control: Arc<RunControl>, events: Arc<dyn SessionEvents>) -> Self {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if control.has_exited() {
                return;
            }

            flag.store(true, Ordering::SeqCst);
            warn!("Session exceeded {:?}, killing", timeout);
            control.kill();

            if !control.is_stopped() {
                events.on_output(timeout_message(timeout), true).await;
            }
        });

        TimeoutGovernor {
            handle: Some(handle),
            fired,
        }
    }

    /// Whether the deadline passed while the process was still running
    pub fn fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Disarm the watchdog.
    ///
    /// If it already fired, its timeout message is allowed to finish so that
    /// it is delivered before the session's completion.
    pub async fn cancel(mut self) {
        if let Some(handle) = self.handle.take() {
            if !self.fired() {
                handle.abort();
            }
            let _ = handle.await;
        }
    }
}

impl Drop for TimeoutGovernor {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
