//! Per-service actions decided by the drift detector.

use serde::{Deserialize, Serialize};

/// What the reconciler decided to do for one service.
///
/// No variant ever deletes volumes or named data; `Recreate` force-removes
/// the container only and then creates a replacement against the same
/// mounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Desired state already holds.
    Skip,
    /// Container exists, matches, and only needs starting.
    Start,
    /// No container exists; resolve the image and create one.
    Create,
    /// A critical field diverged; force-remove then create.
    Recreate(RecreateReason),
}

impl Action {
    /// Whether executing this action mutates the host.
    pub fn mutates(&self) -> bool {
        !matches!(self, Action::Skip)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Skip => write!(f, "skip"),
            Action::Start => write!(f, "start"),
            Action::Create => write!(f, "create"),
            Action::Recreate(reason) => write!(f, "recreate ({})", reason),
        }
    }
}

/// The critical-field divergence that forced a recreation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecreateReason {
    /// A critical environment key's live value differs from the desired one.
    CriticalEnvDrift,
    /// The container runs a different image than desired.
    ImageChanged,
    /// The required mount set differs from the desired one.
    VolumeMismatch,
    /// The live bound host port differs from the desired one.
    PortMismatch,
}

impl std::fmt::Display for RecreateReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecreateReason::CriticalEnvDrift => write!(f, "critical env drift"),
            RecreateReason::ImageChanged => write!(f, "image changed"),
            RecreateReason::VolumeMismatch => write!(f, "volume mismatch"),
            RecreateReason::PortMismatch => write!(f, "port mismatch"),
        }
    }
}
