//! The bounded readiness waiter.

use crate::error::{HealthError, Result};
use crate::probes::{HttpProbe, ReadinessProbe, RunningProbe};
use corral_runtime::ContainerRuntime;
use corral_types::{ReadinessConfig, ServiceName};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Bounds for one readiness wait: fixed attempt count, fixed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl WaitPolicy {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Total time the policy may block for.
    pub fn bound(&self) -> Duration {
        self.interval * self.attempts
    }
}

/// Build the probe and wait bounds for a service's readiness config.
///
/// Returns `None` for services that do not gate their dependents.
pub fn probe_for(
    config: &ReadinessConfig,
    runtime: Arc<dyn ContainerRuntime>,
    container_name: &str,
) -> Option<(Box<dyn ReadinessProbe>, WaitPolicy)> {
    match config {
        ReadinessConfig::None => None,
        ReadinessConfig::Container { retries, interval } => Some((
            Box::new(RunningProbe::new(runtime, container_name)),
            WaitPolicy::new(*retries, *interval),
        )),
        ReadinessConfig::Http {
            url,
            timeout,
            interval,
        } => {
            let attempts = (timeout.as_millis() / interval.as_millis().max(1)).max(1) as u32;
            Some((
                Box::new(HttpProbe::new(url.clone())),
                WaitPolicy::new(attempts, *interval),
            ))
        }
    }
}

/// Poll the probe until it reports healthy or the policy is exhausted.
///
/// Exhaustion is fatal: the returned `ReadinessTimeout` names the unhealthy
/// dependency and aborts the whole reconciliation run.
#[instrument(skip(probe), fields(service = %service, probe = probe.name()))]
pub async fn await_ready(
    service: &ServiceName,
    probe: &dyn ReadinessProbe,
    policy: WaitPolicy,
) -> Result<()> {
    for attempt in 1..=policy.attempts {
        if probe.check().await? {
            info!(attempt, "Service ready");
            return Ok(());
        }
        debug!(attempt, max = policy.attempts, "Not ready yet");

        if attempt < policy.attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Err(HealthError::ReadinessTimeout {
        service: service.clone(),
        waited_secs: policy.bound().as_secs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Probe that reports healthy from the nth check onward.
    struct HealthyAfter {
        checks: AtomicU32,
        healthy_at: u32,
    }

    impl HealthyAfter {
        fn new(healthy_at: u32) -> Self {
            Self {
                checks: AtomicU32::new(0),
                healthy_at,
            }
        }
    }

    #[async_trait]
    impl ReadinessProbe for HealthyAfter {
        fn name(&self) -> &str {
            "healthy-after"
        }

        async fn check(&self) -> Result<bool> {
            let n = self.checks.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(n >= self.healthy_at)
        }
    }

    #[tokio::test]
    async fn ready_within_bounds_succeeds() {
        let probe = HealthyAfter::new(3);
        let policy = WaitPolicy::new(5, Duration::from_millis(1));
        await_ready(&ServiceName::Store, &probe, policy)
            .await
            .unwrap();
        assert_eq!(probe.checks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_policy_is_a_named_timeout() {
        let probe = HealthyAfter::new(u32::MAX);
        let policy = WaitPolicy::new(3, Duration::from_millis(1));

        let err = await_ready(&ServiceName::Runtime, &probe, policy)
            .await
            .unwrap_err();

        match err {
            HealthError::ReadinessTimeout { service, .. } => {
                assert_eq!(service, ServiceName::Runtime)
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(probe.checks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn probe_factory_respects_config_class() {
        let runtime = Arc::new(corral_runtime::InMemoryRuntime::new());

        assert!(probe_for(&ReadinessConfig::None, runtime.clone(), "x").is_none());

        let (probe, policy) = probe_for(
            &ReadinessConfig::Container {
                retries: 30,
                interval: Duration::from_secs(2),
            },
            runtime.clone(),
            "corral_store",
        )
        .unwrap();
        assert_eq!(probe.name(), "running");
        assert_eq!(policy.attempts, 30);

        let (probe, policy) = probe_for(
            &ReadinessConfig::Http {
                url: "http://127.0.0.1:11434/api/version".to_string(),
                timeout: Duration::from_secs(600),
                interval: Duration::from_secs(5),
            },
            runtime,
            "corral_runtime",
        )
        .unwrap();
        assert_eq!(probe.name(), "http");
        // Ten minutes at five-second intervals.
        assert_eq!(policy.attempts, 120);
        assert_eq!(policy.bound(), Duration::from_secs(600));
    }
}
