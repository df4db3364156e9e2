//! Error types for the execution engine

use thiserror::Error;

use crate::sandbox::Language;

/// Result type alias using the engine's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the execution engine
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Docker/container infrastructure error
    #[error("Container error: {0}")]
    Container(String),

    /// The sandbox base image is not present on the container host
    #[error("No such image: {0}")]
    ImageMissing(String),

    /// Interpreter binary could not be launched
    #[error("{message}")]
    LaunchFailure { language: Language, message: String },

    /// A session with this id is still registered
    #[error("Session {0} is already running")]
    SessionBusy(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the batch selector may retry this failure on the subprocess path
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(self, Error::ImageMissing(_))
    }
}

impl From<bollard::errors::Error> for Error {
    fn from(err: bollard::errors::Error) -> Self {
        match err {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                ref message,
            } if message.contains("No such image") => Error::ImageMissing(message.clone()),
            other => Error::Container(other.to_string()),
        }
    }
}
