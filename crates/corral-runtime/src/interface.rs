//! The container runtime trait the reconciler drives.

use crate::error::Result;
use async_trait::async_trait;
use corral_types::{PortBinding, VolumeMount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything needed to create and start one container.
///
/// Built by the reconciler from a `ServiceSpec` plus the resolved image
/// reference and the constructed resource/capability flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Container name.
    pub name: String,

    /// Fully resolved image reference.
    pub image: String,

    /// Environment variables.
    pub env: BTreeMap<String, String>,

    /// Volume mounts. Named volumes are created if absent, never deleted.
    pub volumes: Vec<VolumeMount>,

    /// Network to attach to.
    pub network: String,

    /// Published ports.
    pub ports: Vec<PortBinding>,

    /// Resource and capability flags (`--cpus`, `--memory`, `--gpus`, ...),
    /// constructed by the reconciler; passed through verbatim.
    pub flags: Vec<String>,
}

/// Boundary to the container engine.
///
/// The reconciler is the only caller. Implementations must be safe to drive
/// sequentially from a single task; no interior ordering guarantees beyond
/// per-call atomicity are assumed.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Check that the engine is reachable. Called once, before any other
    /// work in a reconciliation run.
    async fn ping(&self) -> Result<()>;

    /// Whether a container with this name exists (running or not).
    async fn container_exists(&self, name: &str) -> Result<bool>;

    /// Whether a container with this name is currently running.
    async fn is_running(&self, name: &str) -> Result<bool>;

    /// Start an existing stopped container.
    async fn start(&self, name: &str) -> Result<()>;

    /// Create and start a container from a full run request.
    async fn run(&self, request: &RunRequest) -> Result<()>;

    /// Remove a container. Never touches volumes.
    async fn remove(&self, name: &str, force: bool) -> Result<()>;

    /// Environment of an existing container as reported by the engine.
    async fn inspect_env(&self, name: &str) -> Result<BTreeMap<String, String>>;

    /// Image reference an existing container was created from.
    async fn inspect_image(&self, name: &str) -> Result<String>;

    /// Mount sources of an existing container.
    async fn inspect_mounts(&self, name: &str) -> Result<Vec<VolumeMount>>;

    /// Whether an image reference is present locally.
    async fn image_exists_locally(&self, reference: &str) -> Result<bool>;

    /// Pull an image from its registry.
    async fn pull(&self, reference: &str) -> Result<()>;

    /// Host port a running container publishes for a container port.
    async fn host_port_of(&self, name: &str, container_port: u16) -> Result<Option<u16>>;

    /// Create the named network if it does not exist.
    async fn ensure_network(&self, name: &str) -> Result<()>;

    /// Create the named volume if it does not exist.
    async fn ensure_volume(&self, name: &str) -> Result<()>;
}
