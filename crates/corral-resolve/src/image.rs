//! Image Resolver
//!
//! Turns a component's image candidates into a concrete reference via the
//! fallback chain, in strict order:
//!
//! 1. local `{short_name}:{tag}` (no network),
//! 2. pull `{remote_repo}:{tag}`,
//! 3. pull `{remote_repo}:latest`,
//! 4. fail, naming all three attempted references.

use crate::error::{ResolveError, Result};
use corral_runtime::ContainerRuntime;
use corral_types::{ImageCandidates, ServiceName};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Resolves abstract image candidates against the container runtime.
pub struct ImageResolver {
    runtime: Arc<dyn ContainerRuntime>,
    build_tag: String,
}

impl ImageResolver {
    /// `build_tag` is the invocation-wide tag from the build manifest; a
    /// per-spec tag override takes precedence over it.
    pub fn new(runtime: Arc<dyn ContainerRuntime>, build_tag: impl Into<String>) -> Self {
        Self {
            runtime,
            build_tag: build_tag.into(),
        }
    }

    /// Resolve one component's image to a concrete reference.
    #[instrument(skip(self, candidates), fields(component = %component))]
    pub async fn resolve(
        &self,
        component: &ServiceName,
        candidates: &ImageCandidates,
    ) -> Result<String> {
        let tag = candidates.tag.as_deref().unwrap_or(&self.build_tag);

        let local = format!("{}:{}", candidates.local_short_name, tag);
        let remote_tagged = format!("{}:{}", candidates.remote_repo, tag);
        let remote_latest = format!("{}:latest", candidates.remote_repo);

        if self.runtime.image_exists_locally(&local).await? {
            debug!(image = %local, "Using local image");
            return Ok(local);
        }

        match self.runtime.pull(&remote_tagged).await {
            Ok(()) => {
                info!(image = %remote_tagged, "Pulled tagged image");
                return Ok(remote_tagged);
            }
            Err(e) => warn!(image = %remote_tagged, error = %e, "Tagged pull failed"),
        }

        match self.runtime.pull(&remote_latest).await {
            Ok(()) => {
                info!(image = %remote_latest, "Pulled latest image");
                return Ok(remote_latest);
            }
            Err(e) => warn!(image = %remote_latest, error = %e, "Latest pull failed"),
        }

        Err(ResolveError::ImageResolution {
            component: component.clone(),
            attempted: vec![local, remote_tagged, remote_latest],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corral_runtime::{InMemoryRuntime, RuntimeCall};

    fn candidates() -> ImageCandidates {
        ImageCandidates::new("corral-api", "ghcr.io/corral-dev/corral-api")
    }

    #[tokio::test]
    async fn local_image_wins_without_network() {
        let runtime = Arc::new(InMemoryRuntime::new());
        runtime.add_local_image("corral-api:1.0.0", "sha256:aaa");

        let resolver = ImageResolver::new(runtime.clone(), "1.0.0");
        let resolved = resolver
            .resolve(&ServiceName::Api, &candidates())
            .await
            .unwrap();

        assert_eq!(resolved, "corral-api:1.0.0");
        assert!(
            !runtime
                .calls()
                .iter()
                .any(|c| matches!(c, RuntimeCall::Pull(_))),
            "local hit must not touch the network"
        );
    }

    #[tokio::test]
    async fn falls_back_to_tagged_pull() {
        let runtime = Arc::new(InMemoryRuntime::new());
        runtime.add_remote_image("ghcr.io/corral-dev/corral-api:1.0.0", "sha256:bbb");

        let resolver = ImageResolver::new(runtime.clone(), "1.0.0");
        let resolved = resolver
            .resolve(&ServiceName::Api, &candidates())
            .await
            .unwrap();

        assert_eq!(resolved, "ghcr.io/corral-dev/corral-api:1.0.0");
    }

    #[tokio::test]
    async fn attempts_local_then_tagged_before_latest() {
        let runtime = Arc::new(InMemoryRuntime::new());
        runtime.add_remote_image("ghcr.io/corral-dev/corral-api:latest", "sha256:ccc");

        let resolver = ImageResolver::new(runtime.clone(), "1.0.0");
        let resolved = resolver
            .resolve(&ServiceName::Api, &candidates())
            .await
            .unwrap();

        assert_eq!(resolved, "ghcr.io/corral-dev/corral-api:latest");
        assert_eq!(
            runtime.calls(),
            vec![
                RuntimeCall::ImageExistsLocally("corral-api:1.0.0".to_string()),
                RuntimeCall::Pull("ghcr.io/corral-dev/corral-api:1.0.0".to_string()),
                RuntimeCall::Pull("ghcr.io/corral-dev/corral-api:latest".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn exhausted_chain_names_all_attempts() {
        let runtime = Arc::new(InMemoryRuntime::new());
        let resolver = ImageResolver::new(runtime, "1.0.0");

        let err = resolver
            .resolve(&ServiceName::Api, &candidates())
            .await
            .unwrap_err();

        match err {
            ResolveError::ImageResolution {
                component,
                attempted,
            } => {
                assert_eq!(component, ServiceName::Api);
                assert_eq!(
                    attempted,
                    vec![
                        "corral-api:1.0.0".to_string(),
                        "ghcr.io/corral-dev/corral-api:1.0.0".to_string(),
                        "ghcr.io/corral-dev/corral-api:latest".to_string(),
                    ]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn spec_tag_override_beats_build_tag() {
        let runtime = Arc::new(InMemoryRuntime::new());
        runtime.add_local_image("mysql:8.4", "sha256:ddd");

        let resolver = ImageResolver::new(runtime, "1.0.0");
        let pinned = ImageCandidates::new("mysql", "docker.io/library/mysql").with_tag("8.4");
        let resolved = resolver
            .resolve(&ServiceName::Store, &pinned)
            .await
            .unwrap();

        assert_eq!(resolved, "mysql:8.4");
    }
}
