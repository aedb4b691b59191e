//! Readiness probes.
//!
//! A probe answers one question: is the prerequisite healthy right now?
//! The waiter owns retries and bounds; probes themselves are single-shot.

use crate::error::Result;
use async_trait::async_trait;
use corral_runtime::ContainerRuntime;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Single-shot health check against one service.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Probe name for logging.
    fn name(&self) -> &str;

    /// Whether the service currently reports healthy.
    async fn check(&self) -> Result<bool>;
}

/// Probe that asks the container runtime whether the container runs.
///
/// Used for services without an HTTP surface (the data store).
pub struct RunningProbe {
    runtime: Arc<dyn ContainerRuntime>,
    container_name: String,
}

impl RunningProbe {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, container_name: impl Into<String>) -> Self {
        Self {
            runtime,
            container_name: container_name.into(),
        }
    }
}

#[async_trait]
impl ReadinessProbe for RunningProbe {
    fn name(&self) -> &str {
        "running"
    }

    async fn check(&self) -> Result<bool> {
        Ok(self.runtime.is_running(&self.container_name).await?)
    }
}

/// Probe that expects a 2xx answer from an HTTP endpoint.
///
/// Used for the inference runtime and the API.
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl ReadinessProbe for HttpProbe {
    fn name(&self) -> &str {
        "http"
    }

    async fn check(&self) -> Result<bool> {
        match self.client.get(&self.url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                debug!(url = %self.url, error = %e, "HTTP probe not answering yet");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corral_runtime::{InMemoryRuntime, SeededContainer};

    #[tokio::test]
    async fn running_probe_tracks_container_state() {
        let runtime = Arc::new(InMemoryRuntime::new());
        runtime.seed_container(
            "corral_store",
            SeededContainer {
                running: false,
                ..SeededContainer::default()
            },
        );

        let probe = RunningProbe::new(runtime.clone(), "corral_store");
        assert!(!probe.check().await.unwrap());

        runtime.start("corral_store").await.unwrap();
        assert!(probe.check().await.unwrap());
    }

    #[tokio::test]
    async fn running_probe_is_false_for_missing_container() {
        let runtime = Arc::new(InMemoryRuntime::new());
        let probe = RunningProbe::new(runtime, "corral_store");
        assert!(!probe.check().await.unwrap());
    }
}
