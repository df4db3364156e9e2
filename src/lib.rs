//! # Classroom Exec
//!
//! Interactive code-execution engine for teaching environments.
//!
//! ## Features
//!
//! - **Batch runs:** Python in an ephemeral, resource-capped Docker container,
//!   falling back to the host interpreter; JavaScript on the host interpreter
//! - **Interactive sessions:** live stdout/stderr streaming, including prompts
//!   without a trailing newline, and stdin forwarding while the program runs
//! - **Timeouts:** every run is killed once its wall-clock budget is spent
//! - **Cleanup:** temporary source files and containers never outlive a run

pub mod config;
pub mod engine;
pub mod error;
pub mod sandbox;
pub mod session;

pub use config::Config;
pub use engine::Engine;
pub use error::{Error, Result};
pub use sandbox::{ExecutionResult, Language};
pub use session::{SessionEvent, SessionEvents};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
