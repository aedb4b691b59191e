//! Resolution error types

use corral_types::ServiceName;
use thiserror::Error;

/// Errors surfaced by desired-state and image resolution
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No candidate in the fallback chain yielded an image
    #[error("No image found for {component}; attempted {}", attempted.join(", "))]
    ImageResolution {
        component: ServiceName,
        attempted: Vec<String>,
    },

    /// Runtime call failed while resolving
    #[error(transparent)]
    Runtime(#[from] corral_runtime::RuntimeError),
}

/// Result type for resolution operations
pub type Result<T> = std::result::Result<T, ResolveError>;
