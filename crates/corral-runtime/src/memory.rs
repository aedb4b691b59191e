//! In-memory implementation of the container runtime
//!
//! Suitable for development and testing. Records every call so tests can
//! assert attempt ordering (image fallback chain) and the absence of host
//! mutations (idempotence, GPU-required aborts, no pruning).

use crate::error::{Result, RuntimeError};
use crate::interface::{ContainerRuntime, RunRequest};
use async_trait::async_trait;
use corral_types::{PortBinding, VolumeMount};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// One recorded runtime call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    Ping,
    ImageExistsLocally(String),
    Pull(String),
    Start(String),
    Run(String),
    Remove { name: String, force: bool },
    EnsureNetwork(String),
    EnsureVolume(String),
}

impl RuntimeCall {
    /// Whether this call mutated the simulated host.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            RuntimeCall::Pull(_)
                | RuntimeCall::Start(_)
                | RuntimeCall::Run(_)
                | RuntimeCall::Remove { .. }
                | RuntimeCall::EnsureNetwork(_)
                | RuntimeCall::EnsureVolume(_)
        )
    }
}

/// State of one simulated container.
#[derive(Debug, Clone, Default)]
pub struct SeededContainer {
    pub running: bool,
    /// Image reference the container was created from.
    pub image: String,
    pub env: BTreeMap<String, String>,
    pub mounts: Vec<VolumeMount>,
    pub ports: Vec<PortBinding>,
    /// Flags the container was created with, for assertions.
    pub flags: Vec<String>,
}

/// In-memory container runtime.
pub struct InMemoryRuntime {
    containers: DashMap<String, SeededContainer>,
    /// Locally present images: reference -> image id.
    local_images: DashMap<String, String>,
    /// Pullable images: reference -> image id.
    remote_images: DashMap<String, String>,
    networks: DashMap<String, ()>,
    volumes: DashMap<String, ()>,
    available: AtomicBool,
    calls: Mutex<Vec<RuntimeCall>>,
}

impl InMemoryRuntime {
    pub fn new() -> Self {
        Self {
            containers: DashMap::new(),
            local_images: DashMap::new(),
            remote_images: DashMap::new(),
            networks: DashMap::new(),
            volumes: DashMap::new(),
            available: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Simulate an unreachable engine.
    pub fn set_unavailable(&self) {
        self.available.store(false, Ordering::SeqCst);
    }

    /// Seed a locally present image.
    pub fn add_local_image(&self, reference: impl Into<String>, image_id: impl Into<String>) {
        self.local_images.insert(reference.into(), image_id.into());
    }

    /// Seed a registry image that `pull` will succeed for.
    pub fn add_remote_image(&self, reference: impl Into<String>, image_id: impl Into<String>) {
        self.remote_images.insert(reference.into(), image_id.into());
    }

    /// Seed an existing container.
    pub fn seed_container(&self, name: impl Into<String>, container: SeededContainer) {
        self.containers.insert(name.into(), container);
    }

    /// Snapshot of a simulated container, for assertions.
    pub fn container(&self, name: &str) -> Option<SeededContainer> {
        self.containers.get(name).map(|c| c.clone())
    }

    /// Names of all simulated containers.
    pub fn container_names(&self) -> Vec<String> {
        self.containers.iter().map(|c| c.key().clone()).collect()
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Only the recorded calls that mutated the host.
    pub fn mutations(&self) -> Vec<RuntimeCall> {
        self.calls()
            .into_iter()
            .filter(RuntimeCall::is_mutation)
            .collect()
    }

    fn record(&self, call: RuntimeCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RuntimeError::Unavailable(
                "simulated engine down".to_string(),
            ))
        }
    }
}

impl Default for InMemoryRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRuntime for InMemoryRuntime {
    async fn ping(&self) -> Result<()> {
        self.record(RuntimeCall::Ping);
        self.check_available()
    }

    async fn container_exists(&self, name: &str) -> Result<bool> {
        self.check_available()?;
        Ok(self.containers.contains_key(name))
    }

    async fn is_running(&self, name: &str) -> Result<bool> {
        self.check_available()?;
        Ok(self
            .containers
            .get(name)
            .map(|c| c.running)
            .unwrap_or(false))
    }

    async fn start(&self, name: &str) -> Result<()> {
        self.check_available()?;
        self.record(RuntimeCall::Start(name.to_string()));
        match self.containers.get_mut(name) {
            Some(mut container) => {
                container.running = true;
                Ok(())
            }
            None => Err(RuntimeError::ContainerNotFound(name.to_string())),
        }
    }

    async fn run(&self, request: &RunRequest) -> Result<()> {
        self.check_available()?;
        self.record(RuntimeCall::Run(request.name.clone()));

        if !self.local_images.contains_key(&request.image) {
            return Err(RuntimeError::CommandFailed {
                command: format!("run {}", request.name),
                stderr: format!("image not present: {}", request.image),
            });
        }

        self.containers.insert(
            request.name.clone(),
            SeededContainer {
                running: true,
                image: request.image.clone(),
                env: request.env.clone(),
                mounts: request.volumes.clone(),
                ports: request.ports.clone(),
                flags: request.flags.clone(),
            },
        );
        Ok(())
    }

    async fn remove(&self, name: &str, force: bool) -> Result<()> {
        self.check_available()?;
        self.record(RuntimeCall::Remove {
            name: name.to_string(),
            force,
        });
        match self.containers.remove(name) {
            Some(_) => Ok(()),
            None => Err(RuntimeError::ContainerNotFound(name.to_string())),
        }
    }

    async fn inspect_env(&self, name: &str) -> Result<BTreeMap<String, String>> {
        self.check_available()?;
        self.containers
            .get(name)
            .map(|c| c.env.clone())
            .ok_or_else(|| RuntimeError::ContainerNotFound(name.to_string()))
    }

    async fn inspect_image(&self, name: &str) -> Result<String> {
        self.check_available()?;
        self.containers
            .get(name)
            .map(|c| c.image.clone())
            .ok_or_else(|| RuntimeError::ContainerNotFound(name.to_string()))
    }

    async fn inspect_mounts(&self, name: &str) -> Result<Vec<VolumeMount>> {
        self.check_available()?;
        self.containers
            .get(name)
            .map(|c| c.mounts.clone())
            .ok_or_else(|| RuntimeError::ContainerNotFound(name.to_string()))
    }

    async fn image_exists_locally(&self, reference: &str) -> Result<bool> {
        self.check_available()?;
        self.record(RuntimeCall::ImageExistsLocally(reference.to_string()));
        Ok(self.local_images.contains_key(reference))
    }

    async fn pull(&self, reference: &str) -> Result<()> {
        self.check_available()?;
        self.record(RuntimeCall::Pull(reference.to_string()));
        match self.remote_images.get(reference) {
            Some(image_id) => {
                self.local_images
                    .insert(reference.to_string(), image_id.clone());
                Ok(())
            }
            None => Err(RuntimeError::PullFailed {
                reference: reference.to_string(),
                detail: "not found in simulated registry".to_string(),
            }),
        }
    }

    async fn host_port_of(&self, name: &str, container_port: u16) -> Result<Option<u16>> {
        self.check_available()?;
        Ok(self.containers.get(name).and_then(|c| {
            c.ports
                .iter()
                .find(|p| p.container_port == container_port)
                .map(|p| p.host_port)
        }))
    }

    async fn ensure_network(&self, name: &str) -> Result<()> {
        self.check_available()?;
        if !self.networks.contains_key(name) {
            self.record(RuntimeCall::EnsureNetwork(name.to_string()));
            self.networks.insert(name.to_string(), ());
        }
        Ok(())
    }

    async fn ensure_volume(&self, name: &str) -> Result<()> {
        self.check_available()?;
        if !self.volumes.contains_key(name) {
            self.record(RuntimeCall::EnsureVolume(name.to_string()));
            self.volumes.insert(name.to_string(), ());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_requires_a_local_image() {
        let runtime = InMemoryRuntime::new();
        let request = RunRequest {
            name: "corral_api".to_string(),
            image: "corral-api:1.0.0".to_string(),
            ..RunRequest::default()
        };

        assert!(runtime.run(&request).await.is_err());

        runtime.add_local_image("corral-api:1.0.0", "sha256:aaa");
        runtime.run(&request).await.unwrap();
        assert!(runtime.is_running("corral_api").await.unwrap());
    }

    #[tokio::test]
    async fn pull_promotes_remote_images_to_local() {
        let runtime = InMemoryRuntime::new();
        runtime.add_remote_image("ghcr.io/corral-dev/corral-api:1.0.0", "sha256:bbb");

        assert!(!runtime
            .image_exists_locally("ghcr.io/corral-dev/corral-api:1.0.0")
            .await
            .unwrap());
        runtime
            .pull("ghcr.io/corral-dev/corral-api:1.0.0")
            .await
            .unwrap();
        assert!(runtime
            .image_exists_locally("ghcr.io/corral-dev/corral-api:1.0.0")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn calls_are_recorded_in_order() {
        let runtime = InMemoryRuntime::new();
        runtime.ping().await.unwrap();
        let _ = runtime.image_exists_locally("corral-ui:1.0.0").await;
        let _ = runtime.pull("ghcr.io/corral-dev/corral-ui:1.0.0").await;

        let calls = runtime.calls();
        assert_eq!(calls[0], RuntimeCall::Ping);
        assert_eq!(
            calls[1],
            RuntimeCall::ImageExistsLocally("corral-ui:1.0.0".to_string())
        );
        assert!(matches!(calls[2], RuntimeCall::Pull(_)));
    }

    #[tokio::test]
    async fn unavailable_engine_fails_ping() {
        let runtime = InMemoryRuntime::new();
        runtime.set_unavailable();
        assert!(matches!(
            runtime.ping().await,
            Err(RuntimeError::Unavailable(_))
        ));
    }
}
