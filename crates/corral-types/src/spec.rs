//! Service specifications for reconciliation
//!
//! A ServiceSpec is the declarative target configuration for one service -
//! what the reconciler converges the host toward.

use crate::service::ServiceName;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Declarative target configuration for one managed service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Component identifier
    pub name: ServiceName,

    /// Container name on the host
    pub container_name: String,

    /// Image reference candidates for the fallback chain
    pub image: ImageCandidates,

    /// Environment variables
    pub env: BTreeMap<String, String>,

    /// Environment keys whose divergence forces recreation
    pub critical_env_keys: BTreeSet<String>,

    /// Volume mounts
    pub volumes: Vec<VolumeMount>,

    /// Network to attach to
    pub network: String,

    /// Published port bindings
    pub ports: Vec<PortBinding>,

    /// Resource limits
    pub resources: ResourceLimits,

    /// GPU policy
    pub gpu: GpuPolicy,

    /// Predecessor services that must be running/ready first
    pub depends_on: Vec<ServiceName>,

    /// Readiness probe configuration
    pub readiness: ReadinessConfig,

    /// Whether the live bound host port must match the desired one
    /// (gateway-class services)
    pub enforce_host_port: bool,
}

impl ServiceSpec {
    /// Create a spec with empty configuration for a component
    pub fn new(name: ServiceName, container_name: impl Into<String>) -> Self {
        Self {
            name,
            container_name: container_name.into(),
            image: ImageCandidates::default(),
            env: BTreeMap::new(),
            critical_env_keys: BTreeSet::new(),
            volumes: Vec::new(),
            network: String::new(),
            ports: Vec::new(),
            resources: ResourceLimits::default(),
            gpu: GpuPolicy::Disabled,
            depends_on: Vec::new(),
            readiness: ReadinessConfig::None,
            enforce_host_port: false,
        }
    }

    /// Validate the spec
    pub fn validate(&self) -> Result<(), SpecValidationError> {
        if self.container_name.is_empty() {
            return Err(SpecValidationError::EmptyContainerName(self.name.clone()));
        }

        if self.name.is_known() && self.image.remote_repo.is_empty() {
            return Err(SpecValidationError::MissingImage(self.name.clone()));
        }

        for key in &self.critical_env_keys {
            if !self.env.contains_key(key) {
                return Err(SpecValidationError::CriticalKeyNotDeclared {
                    service: self.name.clone(),
                    key: key.clone(),
                });
            }
        }

        if self.enforce_host_port && self.ports.is_empty() {
            return Err(SpecValidationError::HostPortWithoutBinding(
                self.name.clone(),
            ));
        }

        Ok(())
    }

    /// Desired values of the critical env keys
    pub fn critical_env(&self) -> BTreeMap<&str, &str> {
        self.critical_env_keys
            .iter()
            .filter_map(|k| self.env.get(k).map(|v| (k.as_str(), v.as_str())))
            .collect()
    }

    /// The first published port binding, if any
    pub fn primary_port(&self) -> Option<&PortBinding> {
        self.ports.first()
    }
}

/// Candidates for the image resolution fallback chain
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageCandidates {
    /// Short name checked locally first (no network)
    pub local_short_name: String,

    /// Remote repository pulled when the local image is absent
    pub remote_repo: String,

    /// Tag override; `None` means the invocation-wide build tag
    pub tag: Option<String>,
}

impl ImageCandidates {
    pub fn new(local_short_name: impl Into<String>, remote_repo: impl Into<String>) -> Self {
        Self {
            local_short_name: local_short_name.into(),
            remote_repo: remote_repo.into(),
            tag: None,
        }
    }

    /// Pin this candidate set to a fixed tag regardless of the build tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// A named-volume or bind mount
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VolumeMount {
    /// Named volume or host path
    pub source: String,

    /// Mount point inside the container
    pub target: String,

    /// Mount read-only
    #[serde(default)]
    pub read_only: bool,
}

impl VolumeMount {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            read_only: false,
        }
    }
}

/// A published container port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    /// Port on the host
    pub host_port: u16,

    /// Port inside the container
    pub container_port: u16,
}

impl PortBinding {
    pub fn new(host_port: u16, container_port: u16) -> Self {
        Self {
            host_port,
            container_port,
        }
    }
}

impl std::fmt::Display for PortBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host_port, self.container_port)
    }
}

/// Resource limits passed through to the container runtime
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// CPU quota in whole/fractional cores
    pub cpus: Option<f64>,

    /// Memory limit in bytes
    pub memory_bytes: Option<u64>,

    /// Memory + swap limit in bytes
    pub memory_swap_bytes: Option<u64>,

    /// Shared memory size in bytes
    pub shm_size_bytes: Option<u64>,
}

/// GPU requirement policy for a service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuPolicy {
    /// GPU must be available; fatal error otherwise
    Required,
    /// Use the GPU when available, degrade to CPU with a warning otherwise
    Optional,
    /// Never attach a GPU
    #[default]
    Disabled,
}

/// Readiness probe configuration gating dependent services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReadinessConfig {
    /// No gating; dependents proceed as soon as the action completes
    None,

    /// Health-critical: the container must report running within
    /// `retries` probes spaced `interval` apart; exhaustion is fatal
    Container {
        retries: u32,
        #[serde(with = "duration_serde")]
        interval: Duration,
    },

    /// Compute-heavy: an HTTP endpoint must answer 2xx within `timeout`,
    /// probed every `interval`
    Http {
        url: String,
        #[serde(with = "duration_serde")]
        timeout: Duration,
        #[serde(with = "duration_serde")]
        interval: Duration,
    },
}

impl ReadinessConfig {
    /// Whether this service gates its dependents at all
    pub fn gates_dependents(&self) -> bool {
        !matches!(self, ReadinessConfig::None)
    }
}

/// Spec validation errors
#[derive(Debug, thiserror::Error)]
pub enum SpecValidationError {
    #[error("Service {0} has an empty container name")]
    EmptyContainerName(ServiceName),

    #[error("Service {0} has no image configured")]
    MissingImage(ServiceName),

    #[error("Service {service} marks {key} critical but does not declare it")]
    CriticalKeyNotDeclared { service: ServiceName, key: String },

    #[error("Service {0} enforces a host port but publishes none")]
    HostPortWithoutBinding(ServiceName),
}

/// Serde helper for Duration
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ServiceSpec {
        let mut spec = ServiceSpec::new(ServiceName::Api, "corral_api");
        spec.image = ImageCandidates::new("corral-api", "ghcr.io/corral-dev/corral-api");
        spec
    }

    #[test]
    fn validate_accepts_minimal_spec() {
        assert!(spec().validate().is_ok());
    }

    #[test]
    fn validate_rejects_undeclared_critical_key() {
        let mut spec = spec();
        spec.critical_env_keys.insert("OLLAMA_HOST".to_string());
        assert!(matches!(
            spec.validate(),
            Err(SpecValidationError::CriticalKeyNotDeclared { .. })
        ));
    }

    #[test]
    fn validate_rejects_enforced_port_without_binding() {
        let mut spec = spec();
        spec.enforce_host_port = true;
        assert!(matches!(
            spec.validate(),
            Err(SpecValidationError::HostPortWithoutBinding(_))
        ));
    }

    #[test]
    fn critical_env_projects_declared_values() {
        let mut spec = spec();
        spec.env
            .insert("OLLAMA_HOST".to_string(), "http://runtime:11434".to_string());
        spec.env.insert("RUST_LOG".to_string(), "info".to_string());
        spec.critical_env_keys.insert("OLLAMA_HOST".to_string());

        let critical = spec.critical_env();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical.get("OLLAMA_HOST"), Some(&"http://runtime:11434"));
    }
}
