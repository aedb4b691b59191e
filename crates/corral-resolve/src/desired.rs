//! Desired State Resolver
//!
//! Merges CLI flags, environment variables and built-in defaults into one
//! canonical, ordered service list. Precedence per field is always
//! CLI flag > environment variable > built-in default, applied through a
//! single helper so the contract is testable per field.

use corral_types::{
    service::canonical_sort, GpuPolicy, ImageCandidates, PortBinding, ReadinessConfig,
    ResourceLimits, ServiceName, ServiceSpec, VolumeMount,
};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Process environment as a map, injected for testability.
pub type EnvMap = BTreeMap<String, String>;

/// Per-field overrides from the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub tag: Option<String>,
    pub registry: Option<String>,
    pub network: Option<String>,
    pub db_password: Option<String>,
    pub model: Option<String>,
    pub ollama_host: Option<String>,
    pub api_port: Option<u16>,
    pub gateway_port: Option<u16>,
    pub gpu: Option<GpuPolicy>,
}

/// Fully resolved per-invocation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub tag: String,
    pub registry: String,
    pub network: String,
    pub db_password: String,
    pub model: String,
    pub ollama_host: String,
    pub api_port: u16,
    pub gateway_port: u16,
    pub gpu: GpuPolicy,
}

/// Pick a field value: CLI flag > environment variable > built-in default.
fn pick(cli: Option<String>, env: &EnvMap, key: &str, default: &str) -> String {
    cli.or_else(|| env.get(key).cloned())
        .unwrap_or_else(|| default.to_string())
}

fn pick_port(cli: Option<u16>, env: &EnvMap, key: &str, default: u16) -> u16 {
    cli.or_else(|| env.get(key).and_then(|v| v.parse().ok()))
        .unwrap_or(default)
}

fn pick_gpu(cli: Option<GpuPolicy>, env: &EnvMap) -> GpuPolicy {
    cli.or_else(|| {
        env.get("CORRAL_GPU")
            .map(|v| match v.to_ascii_lowercase().as_str() {
                "required" => GpuPolicy::Required,
                "disabled" | "off" => GpuPolicy::Disabled,
                _ => GpuPolicy::Optional,
            })
    })
    .unwrap_or(GpuPolicy::Optional)
}

impl Settings {
    /// Resolve every field from its three sources. `build_tag` comes from
    /// the build manifest, read once per invocation.
    pub fn from_sources(opts: &ResolveOptions, env: &EnvMap, build_tag: &str) -> Self {
        Self {
            tag: pick(opts.tag.clone(), env, "CORRAL_TAG", build_tag),
            registry: pick(
                opts.registry.clone(),
                env,
                "CORRAL_REGISTRY",
                "ghcr.io/corral-dev",
            ),
            network: pick(opts.network.clone(), env, "CORRAL_NETWORK", "corral"),
            db_password: pick(
                opts.db_password.clone(),
                env,
                "CORRAL_DB_PASSWORD",
                "corral",
            ),
            model: pick(opts.model.clone(), env, "CORRAL_MODEL", "llama3.1"),
            ollama_host: pick(
                opts.ollama_host.clone(),
                env,
                "OLLAMA_HOST",
                "http://corral_runtime:11434",
            ),
            api_port: pick_port(opts.api_port, env, "CORRAL_API_PORT", 8700),
            gateway_port: pick_port(opts.gateway_port, env, "CORRAL_GATEWAY_PORT", 80),
            gpu: pick_gpu(opts.gpu, env),
        }
    }

    fn own_image(&self, component: &str) -> ImageCandidates {
        ImageCandidates::new(
            format!("corral-{}", component),
            format!("{}/corral-{}", self.registry, component),
        )
    }

    fn db_url(&self) -> String {
        format!(
            "mysql://root:{}@corral_store:3306/corral",
            self.db_password
        )
    }

    fn api_url_internal() -> String {
        "http://corral_api:8700".to_string()
    }
}

/// Resolve the requested components into the ordered service list.
///
/// `settings` comes from one `Settings::from_sources` call per invocation.
/// An empty request substitutes the canonical default set. Unknown tokens
/// are retained (they warn and are skipped at execution time, not rejected
/// here) and sort after the known components, preserving input order.
pub fn resolve(requested: &[String], settings: &Settings) -> Vec<ServiceSpec> {
    let names: Vec<ServiceName> = if requested.is_empty() {
        ServiceName::CANONICAL_ORDER.to_vec()
    } else {
        canonical_sort(requested.iter().map(|t| ServiceName::parse(t)).collect())
    };

    debug!(?names, "Resolved component list");

    names
        .into_iter()
        .map(|name| spec_for(name, settings))
        .collect()
}

/// Built-in spec for one component under the resolved settings.
pub fn spec_for(name: ServiceName, settings: &Settings) -> ServiceSpec {
    match name {
        ServiceName::Store => store_spec(settings),
        ServiceName::Runtime => runtime_spec(settings),
        ServiceName::Api => api_spec(settings),
        ServiceName::Controller => controller_spec(settings),
        ServiceName::Ui => ui_spec(settings),
        ServiceName::Gateway => gateway_spec(settings),
        ServiceName::Other(token) => other_spec(token, settings),
    }
}

fn store_spec(settings: &Settings) -> ServiceSpec {
    let mut spec = ServiceSpec::new(ServiceName::Store, "corral_store");
    spec.image = ImageCandidates::new("mysql", "docker.io/library/mysql").with_tag("8.4");
    spec.env.insert(
        "MYSQL_ROOT_PASSWORD".to_string(),
        settings.db_password.clone(),
    );
    spec.env
        .insert("MYSQL_DATABASE".to_string(), "corral".to_string());
    spec.critical_env_keys.insert("MYSQL_ROOT_PASSWORD".to_string());
    spec.volumes
        .push(VolumeMount::new("corral_store_data", "/var/lib/mysql"));
    spec.network = settings.network.clone();
    spec.readiness = ReadinessConfig::Container {
        retries: 30,
        interval: Duration::from_secs(2),
    };
    spec
}

fn runtime_spec(settings: &Settings) -> ServiceSpec {
    let mut spec = ServiceSpec::new(ServiceName::Runtime, "corral_runtime");
    spec.image = ImageCandidates::new("ollama/ollama", "docker.io/ollama/ollama").with_tag("latest");
    spec.volumes
        .push(VolumeMount::new("corral_models", "/root/.ollama"));
    spec.network = settings.network.clone();
    spec.ports.push(PortBinding::new(11434, 11434));
    spec.resources = ResourceLimits {
        shm_size_bytes: Some(1 << 30),
        ..ResourceLimits::default()
    };
    spec.gpu = settings.gpu;
    spec.depends_on = vec![ServiceName::Store];
    spec.readiness = ReadinessConfig::Http {
        url: "http://127.0.0.1:11434/api/version".to_string(),
        timeout: Duration::from_secs(600),
        interval: Duration::from_secs(5),
    };
    spec
}

fn api_spec(settings: &Settings) -> ServiceSpec {
    let mut spec = ServiceSpec::new(ServiceName::Api, "corral_api");
    spec.image = settings.own_image("api");
    spec.image.tag = Some(settings.tag.clone());
    spec.env
        .insert("CORRAL_DB_URL".to_string(), settings.db_url());
    spec.env
        .insert("OLLAMA_HOST".to_string(), settings.ollama_host.clone());
    spec.env
        .insert("CORRAL_MODEL".to_string(), settings.model.clone());
    spec.env.insert("RUST_LOG".to_string(), "info".to_string());
    spec.critical_env_keys.extend([
        "CORRAL_DB_URL".to_string(),
        "OLLAMA_HOST".to_string(),
        "CORRAL_MODEL".to_string(),
    ]);
    spec.network = settings.network.clone();
    spec.ports.push(PortBinding::new(settings.api_port, 8700));
    spec.depends_on = vec![ServiceName::Store, ServiceName::Runtime];
    spec.readiness = ReadinessConfig::Http {
        url: format!("http://127.0.0.1:{}/healthz", settings.api_port),
        timeout: Duration::from_secs(60),
        interval: Duration::from_secs(2),
    };
    spec
}

fn controller_spec(settings: &Settings) -> ServiceSpec {
    let mut spec = ServiceSpec::new(ServiceName::Controller, "corral_controller");
    spec.image = settings.own_image("controller");
    spec.image.tag = Some(settings.tag.clone());
    spec.env
        .insert("CORRAL_DB_URL".to_string(), settings.db_url());
    spec.env
        .insert("CORRAL_API_URL".to_string(), Settings::api_url_internal());
    spec.env
        .insert("OLLAMA_HOST".to_string(), settings.ollama_host.clone());
    spec.env.insert("RUST_LOG".to_string(), "info".to_string());
    spec.critical_env_keys.extend([
        "CORRAL_DB_URL".to_string(),
        "CORRAL_API_URL".to_string(),
        "OLLAMA_HOST".to_string(),
    ]);
    spec.network = settings.network.clone();
    spec.depends_on = vec![ServiceName::Store, ServiceName::Api];
    spec
}

fn ui_spec(settings: &Settings) -> ServiceSpec {
    let mut spec = ServiceSpec::new(ServiceName::Ui, "corral_ui");
    spec.image = settings.own_image("ui");
    spec.image.tag = Some(settings.tag.clone());
    spec.env
        .insert("CORRAL_API_URL".to_string(), Settings::api_url_internal());
    spec.critical_env_keys.insert("CORRAL_API_URL".to_string());
    spec.network = settings.network.clone();
    spec.depends_on = vec![ServiceName::Api];
    spec
}

fn gateway_spec(settings: &Settings) -> ServiceSpec {
    let mut spec = ServiceSpec::new(ServiceName::Gateway, "corral_gateway");
    spec.image = settings.own_image("gateway");
    spec.image.tag = Some(settings.tag.clone());
    spec.network = settings.network.clone();
    spec.ports.push(PortBinding::new(settings.gateway_port, 80));
    spec.enforce_host_port = true;
    spec.depends_on = vec![ServiceName::Api, ServiceName::Ui];
    spec
}

fn other_spec(token: String, settings: &Settings) -> ServiceSpec {
    let container_name = format!("corral_{}", token);
    let mut spec = ServiceSpec::new(ServiceName::Other(token), container_name);
    spec.network = settings.network.clone();
    spec
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> EnvMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn defaults(build_tag: &str) -> Settings {
        Settings::from_sources(&ResolveOptions::default(), &EnvMap::new(), build_tag)
    }

    #[test]
    fn empty_request_yields_canonical_default_set() {
        let specs = resolve(&[], &defaults("1.0.0"));
        let names: Vec<ServiceName> = specs.iter().map(|s| s.name.clone()).collect();
        assert_eq!(names, ServiceName::CANONICAL_ORDER.to_vec());
    }

    #[test]
    fn subset_is_reordered_canonically() {
        let requested = vec!["gateway".to_string(), "store".to_string()];
        let specs = resolve(&requested, &defaults("1.0.0"));
        let names: Vec<ServiceName> = specs.iter().map(|s| s.name.clone()).collect();
        assert_eq!(names, vec![ServiceName::Store, ServiceName::Gateway]);
    }

    #[test]
    fn unknown_tokens_are_retained_and_sort_last() {
        let requested = vec!["metrics".to_string(), "api".to_string()];
        let specs = resolve(&requested, &defaults("1.0.0"));
        assert_eq!(specs[0].name, ServiceName::Api);
        assert_eq!(specs[1].name, ServiceName::Other("metrics".to_string()));
    }

    #[test]
    fn cli_flag_beats_env_var_beats_default() {
        // default
        let settings =
            Settings::from_sources(&ResolveOptions::default(), &EnvMap::new(), "1.0.0");
        assert_eq!(settings.model, "llama3.1");

        // env var beats default
        let settings = Settings::from_sources(
            &ResolveOptions::default(),
            &env(&[("CORRAL_MODEL", "qwen2.5")]),
            "1.0.0",
        );
        assert_eq!(settings.model, "qwen2.5");

        // CLI flag beats env var
        let opts = ResolveOptions {
            model: Some("phi3".to_string()),
            ..ResolveOptions::default()
        };
        let settings =
            Settings::from_sources(&opts, &env(&[("CORRAL_MODEL", "qwen2.5")]), "1.0.0");
        assert_eq!(settings.model, "phi3");
    }

    #[test]
    fn precedence_applies_uniformly_to_ports() {
        let settings = Settings::from_sources(
            &ResolveOptions::default(),
            &env(&[("CORRAL_GATEWAY_PORT", "8080")]),
            "1.0.0",
        );
        assert_eq!(settings.gateway_port, 8080);

        let opts = ResolveOptions {
            gateway_port: Some(443),
            ..ResolveOptions::default()
        };
        let settings = Settings::from_sources(
            &opts,
            &env(&[("CORRAL_GATEWAY_PORT", "8080")]),
            "1.0.0",
        );
        assert_eq!(settings.gateway_port, 443);
    }

    #[test]
    fn build_tag_flows_into_own_images() {
        let specs = resolve(&["api".to_string()], &defaults("0.4.2"));
        assert_eq!(specs[0].image.tag.as_deref(), Some("0.4.2"));
    }

    #[test]
    fn tag_flag_overrides_build_manifest() {
        let opts = ResolveOptions {
            tag: Some("nightly".to_string()),
            ..ResolveOptions::default()
        };
        let settings = Settings::from_sources(&opts, &EnvMap::new(), "0.4.2");
        let specs = resolve(&["api".to_string()], &settings);
        assert_eq!(specs[0].image.tag.as_deref(), Some("nightly"));
    }

    #[test]
    fn stock_images_keep_pinned_tags() {
        let specs = resolve(&["store".to_string()], &defaults("0.4.2"));
        assert_eq!(specs[0].image.tag.as_deref(), Some("8.4"));
    }

    #[test]
    fn gateway_enforces_its_host_port() {
        let settings =
            Settings::from_sources(&ResolveOptions::default(), &EnvMap::new(), "1.0.0");
        let spec = gateway_spec(&settings);
        assert!(spec.enforce_host_port);
        assert_eq!(spec.primary_port().map(|p| p.host_port), Some(80));
    }

    #[test]
    fn critical_keys_are_declared_in_env() {
        for spec in resolve(&[], &defaults("1.0.0")) {
            spec.validate().unwrap();
        }
    }

    #[test]
    fn ollama_host_env_var_reaches_api_spec() {
        let settings = Settings::from_sources(
            &ResolveOptions::default(),
            &env(&[("OLLAMA_HOST", "http://gpu-box:11434")]),
            "1.0.0",
        );
        let specs = resolve(&["api".to_string()], &settings);
        assert_eq!(
            specs[0].env.get("OLLAMA_HOST").map(String::as_str),
            Some("http://gpu-box:11434")
        );
    }
}
