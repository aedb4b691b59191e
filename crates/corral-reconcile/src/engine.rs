//! The sequential reconciler engine.
//!
//! Walks the ordered service list, queries fresh host state per service,
//! decides an action via the drift detector, executes it through the
//! container runtime, and gates dependents through the readiness waiter.
//! Strictly sequential; the only suspension points are the bounded
//! readiness waits.

use crate::drift::{decide, DriftInputs};
use crate::error::{ReconcileError, Result};
use crate::flags::run_flags;
use crate::report::{RunReport, ServiceReport, Warning};
use corral_health::{await_ready, negotiate, probe_for, GpuDecision};
use corral_resolve::ImageResolver;
use corral_runtime::{ContainerRuntime, RunRequest, RuntimeError};
use corral_types::{
    Action, GpuPolicy, HostState, ObservedState, ReconciliationPlan, ServiceSpec, VolumeMount,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Plan and report produced by one reconciliation run.
#[derive(Debug)]
pub struct ReconcileOutcome {
    pub plan: ReconciliationPlan,
    pub report: RunReport,
}

/// The reconciler. One instance per invocation.
///
/// Concurrent invocations against the same host are not mutually
/// excluded; corral assumes a single operator per host.
pub struct Reconciler {
    runtime: Arc<dyn ContainerRuntime>,
    images: ImageResolver,
    gpu_available: bool,
}

impl Reconciler {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, images: ImageResolver, gpu_available: bool) -> Self {
        Self {
            runtime,
            images,
            gpu_available,
        }
    }

    /// Bring the desired services into a running state.
    ///
    /// Fatal errors abort immediately; already-completed steps stay in
    /// their resulting state and a re-run converges. Services on the host
    /// that are not in `desired` are never touched (no pruning).
    #[instrument(skip(self, desired), fields(services = desired.len()))]
    pub async fn reconcile(&self, desired: &[ServiceSpec]) -> Result<ReconcileOutcome> {
        let started_at = chrono::Utc::now();

        // Engine reachability is checked before any other work.
        self.runtime.ping().await.map_err(|e| match e {
            RuntimeError::Unavailable(msg) => ReconcileError::RuntimeUnavailable(msg),
            other => ReconcileError::Runtime(other),
        })?;

        // A mandated-but-unavailable GPU fails before anything is started.
        for spec in desired {
            if spec.gpu == GpuPolicy::Required {
                negotiate(&spec.name, spec.gpu, self.gpu_available)?;
            }
        }

        let mut plan = ReconciliationPlan::new();
        let mut warnings: Vec<Warning> = Vec::new();
        let mut services: Vec<ServiceReport> = Vec::new();

        for spec in desired {
            if !spec.name.is_known() {
                warn!(component = %spec.name, "Unknown component requested; skipping");
                warnings.push(Warning::UnknownComponent(spec.name.to_string()));
                services.push(ServiceReport {
                    service: spec.name.clone(),
                    container_name: spec.container_name.clone(),
                    action: Action::Skip,
                    state: "skipped (unknown component)".to_string(),
                    ports: Vec::new(),
                });
                plan.push(spec.clone(), Action::Skip);
                continue;
            }

            spec.validate()
                .map_err(|e| ReconcileError::InvalidSpec(e.to_string()))?;

            let action = self.step(spec, &mut warnings).await?;
            info!(service = %spec.name, action = %action, "Service reconciled");

            let running = self.runtime.is_running(&spec.container_name).await?;
            services.push(ServiceReport {
                service: spec.name.clone(),
                container_name: spec.container_name.clone(),
                action: action.clone(),
                state: if running { "running" } else { "stopped" }.to_string(),
                ports: spec.ports.clone(),
            });
            plan.push(spec.clone(), action);
        }

        Ok(ReconcileOutcome {
            plan,
            report: RunReport {
                started_at,
                finished_at: chrono::Utc::now(),
                services,
                warnings,
            },
        })
    }

    /// Decide, execute and gate one service.
    async fn step(&self, spec: &ServiceSpec, warnings: &mut Vec<Warning>) -> Result<Action> {
        let name = spec.container_name.as_str();

        // Fresh host state, never cached across services.
        let host = self.host_state(name).await?;

        let mut resolved_image: Option<String> = None;
        let mut live_mounts: Option<Vec<VolumeMount>> = None;
        if host.observed() == ObservedState::ExistsStopped {
            // The image and mount comparison only applies to a stopped
            // existing container; resolve the desired image up front.
            resolved_image = Some(self.images.resolve(&spec.name, &spec.image).await?);
            live_mounts = Some(self.runtime.inspect_mounts(name).await?);
        }

        let live_host_port = if spec.enforce_host_port && host.exists {
            match spec.primary_port() {
                Some(binding) => {
                    self.runtime
                        .host_port_of(name, binding.container_port)
                        .await?
                }
                None => None,
            }
        } else {
            None
        };

        let action = decide(
            spec,
            &DriftInputs {
                host: &host,
                desired_image: resolved_image.as_deref(),
                live_mounts: live_mounts.as_deref(),
                live_host_port,
            },
        );

        match &action {
            Action::Skip => {}
            Action::Start => self.runtime.start(name).await?,
            Action::Create => {
                self.create(spec, resolved_image.take(), warnings).await?;
            }
            Action::Recreate(reason) => {
                info!(service = %spec.name, reason = %reason, "Recreating container");
                // Force-removes the container only; volumes stay.
                self.runtime.remove(name, true).await?;
                self.create(spec, resolved_image.take(), warnings).await?;
            }
        }

        // Gate dependents until this service reports healthy.
        if let Some((probe, policy)) =
            probe_for(&spec.readiness, self.runtime.clone(), name)
        {
            await_ready(&spec.name, probe.as_ref(), policy).await?;
        }

        Ok(action)
    }

    async fn host_state(&self, name: &str) -> Result<HostState> {
        if !self.runtime.container_exists(name).await? {
            return Ok(HostState::missing());
        }

        Ok(HostState {
            exists: true,
            running: self.runtime.is_running(name).await?,
            image: Some(self.runtime.inspect_image(name).await?),
            env: self.runtime.inspect_env(name).await?,
        })
    }

    /// Resolve the image, prepare the network and volumes, and run.
    async fn create(
        &self,
        spec: &ServiceSpec,
        resolved_image: Option<String>,
        warnings: &mut Vec<Warning>,
    ) -> Result<()> {
        let image = match resolved_image {
            Some(image) => image,
            None => self.images.resolve(&spec.name, &spec.image).await?,
        };

        if spec.enforce_host_port {
            if let Some(binding) = spec.primary_port() {
                if !host_port_is_free(binding.host_port) {
                    warn!(service = %spec.name, port = binding.host_port, "Desired host port is occupied");
                    warnings.push(Warning::PortConflict {
                        service: spec.name.clone(),
                        port: binding.host_port,
                    });
                }
            }
        }

        if !spec.network.is_empty() {
            self.runtime.ensure_network(&spec.network).await?;
        }
        for mount in &spec.volumes {
            if is_named_volume(&mount.source) {
                self.runtime.ensure_volume(&mount.source).await?;
            }
        }

        let decision: GpuDecision = negotiate(&spec.name, spec.gpu, self.gpu_available)?;
        if decision.degraded {
            warn!(service = %spec.name, "GPU unavailable; degrading to CPU-only");
            warnings.push(Warning::GpuDegraded {
                service: spec.name.clone(),
            });
        }

        let request = RunRequest {
            name: spec.container_name.clone(),
            image,
            env: spec.env.clone(),
            volumes: spec.volumes.clone(),
            network: spec.network.clone(),
            ports: spec.ports.clone(),
            flags: run_flags(&spec.resources, decision.mode),
        };
        self.runtime.run(&request).await?;
        Ok(())
    }
}

/// Named volumes get created up front; absolute and relative paths are
/// bind mounts the engine handles on its own.
fn is_named_volume(source: &str) -> bool {
    !source.starts_with('/') && !source.starts_with('.') && !source.starts_with('~')
}

/// Best-effort pre-flight: can the desired host port still be bound?
/// A conflict is only a warning; the runtime surfaces the real bind
/// failure if one occurs.
fn host_port_is_free(port: u16) -> bool {
    std::net::TcpListener::bind(("0.0.0.0", port)).is_ok()
}
