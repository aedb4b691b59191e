//! Corral CLI - bring the local service fleet to its desired state
//!
//! `corral up` reconciles the host toward the resolved desired state,
//! `corral status` reports what is currently on the host, and
//! `corral version` prints the release version.
//!
//! User-facing progress goes to stdout as tagged lines; diagnostic
//! tracing is separate and off by default (`--log-level`, `RUST_LOG`).

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use corral_health::detect_gpu;
use corral_reconcile::Reconciler;
use corral_resolve::{build_tag, resolve, EnvMap, ImageResolver, ResolveOptions, Settings};
use corral_runtime::{ContainerRuntime, DockerCli};
use corral_types::GpuPolicy;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "corral")]
#[command(about = "Local reconciler for the corral service fleet", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level for diagnostic tracing
    #[arg(long, env = "CORRAL_LOG_LEVEL", default_value = "warn", global = true)]
    log_level: String,

    /// Emit diagnostic tracing as JSON
    #[arg(long, env = "CORRAL_LOG_JSON", global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring services to their desired running state
    Up(UpArgs),

    /// Show the current state of the managed containers
    Status(StatusArgs),

    /// Show version information
    Version,
}

#[derive(Args)]
struct UpArgs {
    /// Components to reconcile; empty means the full canonical set
    components: Vec<String>,

    /// Image tag override (otherwise CORRAL_TAG, then the build manifest)
    #[arg(long)]
    tag: Option<String>,

    /// Image registry for corral's own images
    #[arg(long)]
    registry: Option<String>,

    /// Container network name
    #[arg(long)]
    network: Option<String>,

    /// Data store root password
    #[arg(long)]
    db_password: Option<String>,

    /// Default inference model
    #[arg(long)]
    model: Option<String>,

    /// Inference runtime endpoint as seen by the services
    #[arg(long)]
    ollama_host: Option<String>,

    /// Host port for the API service
    #[arg(long)]
    api_port: Option<u16>,

    /// Host port for the gateway
    #[arg(long)]
    gateway_port: Option<u16>,

    /// Fail unless a GPU is attachable
    #[arg(long, conflicts_with = "no_gpu")]
    gpu_required: bool,

    /// Never attach a GPU
    #[arg(long)]
    no_gpu: bool,

    /// Build manifest path
    #[arg(long, env = "CORRAL_MANIFEST", default_value = "/etc/corral/build.json")]
    manifest: PathBuf,

    /// Container engine binary
    #[arg(long, env = "CORRAL_ENGINE", default_value = "docker")]
    engine: String,
}

impl UpArgs {
    fn gpu_override(&self) -> Option<GpuPolicy> {
        if self.gpu_required {
            Some(GpuPolicy::Required)
        } else if self.no_gpu {
            Some(GpuPolicy::Disabled)
        } else {
            None
        }
    }

    fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            tag: self.tag.clone(),
            registry: self.registry.clone(),
            network: self.network.clone(),
            db_password: self.db_password.clone(),
            model: self.model.clone(),
            ollama_host: self.ollama_host.clone(),
            api_port: self.api_port,
            gateway_port: self.gateway_port,
            gpu: self.gpu_override(),
        }
    }
}

#[derive(Args)]
struct StatusArgs {
    /// Components to report on; empty means the full canonical set
    components: Vec<String>,

    /// Container engine binary
    #[arg(long, env = "CORRAL_ENGINE", default_value = "docker")]
    engine: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Err(e) = run(cli).await {
        eprintln!("[ERROR] {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(cli: &Cli) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Up(args) => up(args).await,
        Commands::Status(args) => status(args).await,
        Commands::Version => {
            println!("corral {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn up(args: UpArgs) -> Result<()> {
    let env_map: EnvMap = std::env::vars().collect();
    let manifest_tag = build_tag(&args.manifest);
    let opts = args.resolve_options();

    let settings = Settings::from_sources(&opts, &env_map, &manifest_tag);
    let desired = resolve(&args.components, &settings);

    let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerCli::with_binary(&args.engine));
    let gpu_available = detect_gpu().await;

    info(&format!(
        "Reconciling {} component(s) at tag {}",
        desired.len(),
        settings.tag
    ));

    let images = ImageResolver::new(runtime.clone(), settings.tag.clone());
    let reconciler = Reconciler::new(runtime, images, gpu_available);
    let outcome = reconciler.reconcile(&desired).await?;

    for w in &outcome.report.warnings {
        warning(&w.to_string());
    }
    for entry in &outcome.report.services {
        info(&format!(
            "{}: {} ({})",
            entry.service, entry.action, entry.state
        ));
    }

    println!();
    print!("{}", outcome.report.render_table());

    if outcome.plan.is_all_skip() {
        success("Everything already in its desired state");
    } else {
        success("All requested components reconciled");
    }
    Ok(())
}

async fn status(args: StatusArgs) -> Result<()> {
    let env_map: EnvMap = std::env::vars().collect();
    let settings = Settings::from_sources(
        &ResolveOptions::default(),
        &env_map,
        corral_resolve::manifest::FALLBACK_TAG,
    );
    let desired = resolve(&args.components, &settings);

    let runtime = DockerCli::with_binary(&args.engine);
    runtime.ping().await?;

    let mut name_width = "SERVICE".len();
    for spec in &desired {
        name_width = name_width.max(spec.name.as_str().len());
    }

    println!("{:<name_width$}  {:<8}  PORTS", "SERVICE", "STATUS");
    for spec in &desired {
        let state = if !runtime.container_exists(&spec.container_name).await? {
            "absent"
        } else if runtime.is_running(&spec.container_name).await? {
            "running"
        } else {
            "stopped"
        };
        let ports = spec
            .ports
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        println!("{:<name_width$}  {:<8}  {}", spec.name.as_str(), state, ports);
    }
    Ok(())
}

fn info(msg: &str) {
    println!("[INFO] {msg}");
}

fn success(msg: &str) {
    println!("[SUCCESS] {msg}");
}

fn warning(msg: &str) {
    println!("[WARNING] {msg}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn gpu_flags_map_to_policies() {
        let cli = Cli::parse_from(["corral", "up", "--gpu-required"]);
        let Commands::Up(args) = cli.command else {
            panic!("expected up");
        };
        assert_eq!(args.gpu_override(), Some(GpuPolicy::Required));

        let cli = Cli::parse_from(["corral", "up", "--no-gpu"]);
        let Commands::Up(args) = cli.command else {
            panic!("expected up");
        };
        assert_eq!(args.gpu_override(), Some(GpuPolicy::Disabled));

        let cli = Cli::parse_from(["corral", "up"]);
        let Commands::Up(args) = cli.command else {
            panic!("expected up");
        };
        assert_eq!(args.gpu_override(), None);
    }

    #[test]
    fn conflicting_gpu_flags_are_rejected() {
        assert!(Cli::try_parse_from(["corral", "up", "--gpu-required", "--no-gpu"]).is_err());
    }

    #[test]
    fn components_are_positional() {
        let cli = Cli::parse_from(["corral", "up", "store", "api"]);
        let Commands::Up(args) = cli.command else {
            panic!("expected up");
        };
        assert_eq!(args.components, vec!["store", "api"]);
    }
}
