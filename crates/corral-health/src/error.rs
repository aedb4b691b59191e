//! Health error types

use corral_types::ServiceName;
use thiserror::Error;

/// Errors surfaced by readiness gating and capability negotiation
#[derive(Debug, Error)]
pub enum HealthError {
    /// A dependency never reported healthy within its bound; fatal
    #[error("{service} did not become ready within {waited_secs}s")]
    ReadinessTimeout {
        service: ServiceName,
        waited_secs: u64,
    },

    /// GPU mandated but unavailable; fatal, raised before anything starts
    #[error("GPU required for {service} but no GPU is available")]
    GpuRequired { service: ServiceName },

    /// Runtime call failed while probing
    #[error(transparent)]
    Runtime(#[from] corral_runtime::RuntimeError),
}

/// Result type for health operations
pub type Result<T> = std::result::Result<T, HealthError>;
