//! Pipe readiness checks
//!
//! The pipe worker flushes its pending chunk as soon as no further byte is
//! immediately readable. How that is determined is platform specific.

use std::fs::File;

/// Non-blocking "is more data available" check for one pipe
pub trait ReadinessProbe: Send + 'static {
    /// Whether at least one more byte can be read without blocking
    fn has_pending(&mut self) -> bool;
}

/// Probe that never reports pending data, so every read is flushed at once
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverPending;

impl ReadinessProbe for NeverPending {
    fn has_pending(&mut self) -> bool {
        false
    }
}

/// `poll(2)` with a zero timeout on the pipe's descriptor
#[cfg(unix)]
#[derive(Debug)]
pub struct PollProbe {
    fd: std::os::unix::io::RawFd,
}

#[cfg(unix)]
impl PollProbe {
    /// The probe borrows the descriptor; it must not outlive `source`
    pub fn new(source: &impl std::os::unix::io::AsRawFd) -> Self {
        PollProbe {
            fd: source.as_raw_fd(),
        }
    }
}

#[cfg(unix)]
impl ReadinessProbe for PollProbe {
    fn has_pending(&mut self) -> bool {
        let mut pollfd = libc::pollfd {
            fd: self.fd,
            events: libc::POLLIN,
            revents: 0,
        };

        // Zero timeout: report current state without waiting
        let result = unsafe { libc::poll(&mut pollfd, 1, 0) };

        result > 0 && (pollfd.revents & libc::POLLIN) != 0
    }
}

/// Platform probe for a pipe opened as a blocking file
#[cfg(unix)]
pub fn probe_for(file: &File) -> Box<dyn ReadinessProbe> {
    Box::new(PollProbe::new(file))
}

/// Platform probe for a pipe opened as a blocking file
#[cfg(not(unix))]
pub fn probe_for(_file: &File) -> Box<dyn ReadinessProbe> {
    Box::new(NeverPending)
}

impl ReadinessProbe for Box<dyn ReadinessProbe> {
    fn has_pending(&mut self) -> bool {
        (**self).has_pending()
    }
}
