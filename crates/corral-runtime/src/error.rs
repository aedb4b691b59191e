//! Runtime error types

use thiserror::Error;

/// Errors surfaced by the container runtime boundary
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The container engine is not reachable; checked before any other work
    #[error("Container runtime unavailable: {0}")]
    Unavailable(String),

    /// An engine command ran but reported failure
    #[error("Runtime command `{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// No container with the given name exists
    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    /// An image pull was attempted and failed
    #[error("Pull failed for {reference}: {detail}")]
    PullFailed { reference: String, detail: String },

    /// Engine output could not be parsed
    #[error("Failed to parse runtime output: {0}")]
    Parse(String),

    /// Spawning or talking to the engine binary failed
    #[error("I/O error talking to the runtime: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;
