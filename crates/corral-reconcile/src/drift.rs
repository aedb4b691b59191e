//! Drift Detector - the per-service action decision.
//!
//! A pure function over the desired spec and the observed host state.
//! Only the curated critical fields can force recreation; divergence in
//! anything else is deliberately ignored.

use corral_types::{Action, HostState, ObservedState, RecreateReason, ServiceSpec, VolumeMount};

/// Everything the decision looks at beyond the spec.
///
/// `desired_image` and `live_mounts` are only consulted for a stopped
/// existing container; `live_host_port` only when the spec enforces its
/// host port.
#[derive(Debug, Clone, Copy)]
pub struct DriftInputs<'a> {
    pub host: &'a HostState,
    pub desired_image: Option<&'a str>,
    pub live_mounts: Option<&'a [VolumeMount]>,
    pub live_host_port: Option<u16>,
}

impl<'a> DriftInputs<'a> {
    pub fn new(host: &'a HostState) -> Self {
        Self {
            host,
            desired_image: None,
            live_mounts: None,
            live_host_port: None,
        }
    }
}

/// Decide the action for one service.
pub fn decide(spec: &ServiceSpec, inputs: &DriftInputs<'_>) -> Action {
    match inputs.host.observed() {
        ObservedState::Missing => Action::Create,

        observed => {
            // Host-port divergence wins over everything else.
            if let Some(mismatch) = host_port_mismatch(spec, inputs.live_host_port) {
                return mismatch;
            }

            match observed {
                ObservedState::Running => {
                    if critical_env_drifted(spec, inputs.host) {
                        Action::Recreate(RecreateReason::CriticalEnvDrift)
                    } else {
                        Action::Skip
                    }
                }
                ObservedState::ExistsStopped => {
                    if image_changed(inputs) {
                        Action::Recreate(RecreateReason::ImageChanged)
                    } else if mounts_missing(spec, inputs.live_mounts) {
                        Action::Recreate(RecreateReason::VolumeMismatch)
                    } else {
                        Action::Start
                    }
                }
                ObservedState::Missing => unreachable!("handled above"),
            }
        }
    }
}

fn host_port_mismatch(spec: &ServiceSpec, live_host_port: Option<u16>) -> Option<Action> {
    if !spec.enforce_host_port {
        return None;
    }
    let desired = spec.primary_port()?.host_port;
    match live_host_port {
        Some(live) if live != desired => Some(Action::Recreate(RecreateReason::PortMismatch)),
        _ => None,
    }
}

/// A running container cannot have env hot-swapped, so any critical key
/// whose live value differs from the desired one forces recreation.
fn critical_env_drifted(spec: &ServiceSpec, host: &HostState) -> bool {
    spec.critical_env_keys
        .iter()
        .any(|key| host.env.get(key) != spec.env.get(key))
}

fn image_changed(inputs: &DriftInputs<'_>) -> bool {
    match (inputs.desired_image, inputs.host.image.as_deref()) {
        (Some(desired), Some(live)) => desired != live,
        _ => false,
    }
}

/// The required mount set must be present; extra live mounts (anonymous
/// volumes the image declares) are ignored.
fn mounts_missing(spec: &ServiceSpec, live_mounts: Option<&[VolumeMount]>) -> bool {
    let Some(live) = live_mounts else {
        return false;
    };
    spec.volumes.iter().any(|desired| {
        !live
            .iter()
            .any(|m| m.source == desired.source && m.target == desired.target)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use corral_types::{ImageCandidates, PortBinding, ServiceName};
    use std::collections::BTreeMap;

    fn api_spec() -> ServiceSpec {
        let mut spec = ServiceSpec::new(ServiceName::Api, "corral_api");
        spec.image = ImageCandidates::new("corral-api", "ghcr.io/corral-dev/corral-api");
        spec.env
            .insert("OLLAMA_HOST".to_string(), "http://y".to_string());
        spec.env.insert("RUST_LOG".to_string(), "info".to_string());
        spec.critical_env_keys.insert("OLLAMA_HOST".to_string());
        spec
    }

    fn running_host(env: &[(&str, &str)]) -> HostState {
        HostState {
            exists: true,
            running: true,
            image: Some("corral-api:1.0.0".to_string()),
            env: env
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn missing_container_is_created() {
        let host = HostState::missing();
        let action = decide(&api_spec(), &DriftInputs::new(&host));
        assert_eq!(action, Action::Create);
    }

    #[test]
    fn critical_env_drift_forces_recreate() {
        let host = running_host(&[("OLLAMA_HOST", "http://x"), ("RUST_LOG", "info")]);
        let action = decide(&api_spec(), &DriftInputs::new(&host));
        assert_eq!(action, Action::Recreate(RecreateReason::CriticalEnvDrift));
    }

    #[test]
    fn non_critical_drift_is_a_noop() {
        let host = running_host(&[("OLLAMA_HOST", "http://y"), ("RUST_LOG", "debug")]);
        let action = decide(&api_spec(), &DriftInputs::new(&host));
        assert_eq!(action, Action::Skip);
    }

    #[test]
    fn matching_running_container_is_skipped() {
        let host = running_host(&[("OLLAMA_HOST", "http://y"), ("RUST_LOG", "info")]);
        let action = decide(&api_spec(), &DriftInputs::new(&host));
        assert_eq!(action, Action::Skip);
    }

    #[test]
    fn stopped_container_with_matching_config_is_started() {
        let mut host = running_host(&[("OLLAMA_HOST", "http://y")]);
        host.running = false;

        let inputs = DriftInputs {
            host: &host,
            desired_image: Some("corral-api:1.0.0"),
            live_mounts: Some(&[]),
            live_host_port: None,
        };
        assert_eq!(decide(&api_spec(), &inputs), Action::Start);
    }

    #[test]
    fn stopped_container_with_stale_image_is_recreated() {
        let mut host = running_host(&[("OLLAMA_HOST", "http://y")]);
        host.running = false;

        let inputs = DriftInputs {
            host: &host,
            desired_image: Some("corral-api:2.0.0"),
            live_mounts: Some(&[]),
            live_host_port: None,
        };
        assert_eq!(
            decide(&api_spec(), &inputs),
            Action::Recreate(RecreateReason::ImageChanged)
        );
    }

    #[test]
    fn stopped_container_missing_a_required_mount_is_recreated() {
        let mut spec = api_spec();
        spec.volumes.push(VolumeMount::new("corral_data", "/data"));

        let mut host = running_host(&[("OLLAMA_HOST", "http://y")]);
        host.running = false;

        let live = [VolumeMount::new("other", "/other")];
        let inputs = DriftInputs {
            host: &host,
            desired_image: Some("corral-api:1.0.0"),
            live_mounts: Some(&live),
            live_host_port: None,
        };
        assert_eq!(
            decide(&spec, &inputs),
            Action::Recreate(RecreateReason::VolumeMismatch)
        );
    }

    #[test]
    fn extra_live_mounts_are_ignored() {
        let mut spec = api_spec();
        spec.volumes.push(VolumeMount::new("corral_data", "/data"));

        let mut host = running_host(&[("OLLAMA_HOST", "http://y")]);
        host.running = false;

        let live = [
            VolumeMount::new("corral_data", "/data"),
            VolumeMount::new("anonymous123", "/var/cache"),
        ];
        let inputs = DriftInputs {
            host: &host,
            desired_image: Some("corral-api:1.0.0"),
            live_mounts: Some(&live),
            live_host_port: None,
        };
        assert_eq!(decide(&spec, &inputs), Action::Start);
    }

    #[test]
    fn port_mismatch_beats_other_drift() {
        let mut spec = api_spec();
        spec.ports.push(PortBinding::new(80, 80));
        spec.enforce_host_port = true;

        // Even with critical env drift present, the port decides the reason.
        let host = running_host(&[("OLLAMA_HOST", "http://x")]);
        let inputs = DriftInputs {
            host: &host,
            desired_image: None,
            live_mounts: None,
            live_host_port: Some(8080),
        };
        assert_eq!(
            decide(&spec, &inputs),
            Action::Recreate(RecreateReason::PortMismatch)
        );
    }

    #[test]
    fn matching_port_falls_through_to_normal_rules() {
        let mut spec = api_spec();
        spec.ports.push(PortBinding::new(80, 80));
        spec.enforce_host_port = true;

        let host = running_host(&[("OLLAMA_HOST", "http://y"), ("RUST_LOG", "info")]);
        let inputs = DriftInputs {
            host: &host,
            desired_image: None,
            live_mounts: None,
            live_host_port: Some(80),
        };
        assert_eq!(decide(&spec, &inputs), Action::Skip);
    }
}
