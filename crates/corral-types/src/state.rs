//! Live host state as reported by the container runtime
//!
//! HostState is queried fresh for each service at action time; it is never
//! cached across services within a run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the container engine reports for one service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostState {
    /// A container with the expected name exists
    pub exists: bool,

    /// The container is currently running
    pub running: bool,

    /// Image reference the existing container was created from
    pub image: Option<String>,

    /// Environment as reported by the runtime
    pub env: BTreeMap<String, String>,
}

impl HostState {
    /// State for a service with no container on the host
    pub fn missing() -> Self {
        Self::default()
    }

    /// Collapse into the three states the drift detector distinguishes
    pub fn observed(&self) -> ObservedState {
        match (self.exists, self.running) {
            (true, true) => ObservedState::Running,
            (true, false) => ObservedState::ExistsStopped,
            (false, _) => ObservedState::Missing,
        }
    }
}

/// The three per-service states the action decision branches on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObservedState {
    /// Container exists and is running
    Running,
    /// Container exists but is stopped
    ExistsStopped,
    /// No container exists
    Missing,
}

impl std::fmt::Display for ObservedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObservedState::Running => write!(f, "running"),
            ObservedState::ExistsStopped => write!(f, "stopped"),
            ObservedState::Missing => write!(f, "missing"),
        }
    }
}
