//! Error types for the bridge orchestrator

use thiserror::Error;

/// Main error type for the orchestration core
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Remote API error (status {status}): {message}")]
    RemoteApi { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response for {operation}: {message}")]
    MalformedResponse { operation: String, message: String },

    #[error("{operation} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<EngineError>,
    },

    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    #[error("Failed to parse transaction intent: {0}")]
    IntentParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },

    #[error("Timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::RemoteApi { .. }
                | EngineError::Transport(_)
                | EngineError::MalformedResponse { .. }
                | EngineError::RouteNotFound(_)
        )
    }

    /// Innermost error, looking through retry exhaustion
    pub fn root(&self) -> &EngineError {
        match self {
            EngineError::RetriesExhausted { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if error was raised locally before reaching the network
    pub fn is_validation(&self) -> bool {
        matches!(self.root(), EngineError::Validation(_))
    }
}

/// Result type for orchestration operations
pub type EngineResult<T> = Result<T, EngineError>;
