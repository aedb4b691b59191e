//! GPU capability negotiation.
//!
//! Negotiation happens once per run, before any compute-heavy service is
//! started: a mandated-but-unavailable GPU must fail before a single
//! container is created.

use crate::error::{HealthError, Result};
use corral_types::{GpuPolicy, ServiceName};
use tokio::process::Command;
use tracing::debug;

/// How a compute-heavy service will run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeMode {
    /// Attach accelerator flags.
    Accelerated,
    /// CPU-only flags.
    CpuOnly,
}

/// Outcome of negotiating a service's GPU policy against the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuDecision {
    pub mode: ComputeMode,
    /// True when the policy wanted a GPU but the host has none; the caller
    /// emits a warning and proceeds CPU-only.
    pub degraded: bool,
}

/// Detect whether an NVIDIA GPU is usable on this host.
pub async fn detect_gpu() -> bool {
    match Command::new("nvidia-smi").arg("-L").output().await {
        Ok(output) => {
            let available = output.status.success() && !output.stdout.is_empty();
            debug!(available, "GPU detection via nvidia-smi");
            available
        }
        Err(e) => {
            debug!(error = %e, "nvidia-smi not present; assuming no GPU");
            false
        }
    }
}

/// Negotiate a GPU policy against detected availability.
pub fn negotiate(
    service: &ServiceName,
    policy: GpuPolicy,
    gpu_available: bool,
) -> Result<GpuDecision> {
    match (policy, gpu_available) {
        (GpuPolicy::Disabled, _) => Ok(GpuDecision {
            mode: ComputeMode::CpuOnly,
            degraded: false,
        }),
        (_, true) => Ok(GpuDecision {
            mode: ComputeMode::Accelerated,
            degraded: false,
        }),
        (GpuPolicy::Optional, false) => Ok(GpuDecision {
            mode: ComputeMode::CpuOnly,
            degraded: true,
        }),
        (GpuPolicy::Required, false) => Err(HealthError::GpuRequired {
            service: service.clone(),
        }),
    }
}
