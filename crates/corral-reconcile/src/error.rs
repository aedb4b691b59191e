//! Reconciliation error types
//!
//! The four fatal kinds stop the loop immediately; warnings live in the
//! run report and never stop anything.

use thiserror::Error;

/// Fatal reconciliation errors
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Container engine not reachable; checked before any other work
    #[error("Container runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    /// Image resolution exhausted its fallback chain
    #[error(transparent)]
    Resolve(#[from] corral_resolve::ResolveError),

    /// Readiness timeout or GPU requirement failure
    #[error(transparent)]
    Health(#[from] corral_health::HealthError),

    /// Runtime call failed mid-run
    #[error(transparent)]
    Runtime(#[from] corral_runtime::RuntimeError),

    /// A desired spec failed validation
    #[error("Invalid service spec: {0}")]
    InvalidSpec(String),
}

/// Result type for reconciliation operations
pub type Result<T> = std::result::Result<T, ReconcileError>;
