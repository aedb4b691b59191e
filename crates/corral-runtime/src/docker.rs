//! Docker CLI implementation of the container runtime.
//!
//! Drives the `docker` binary directly. Every call is one short-lived
//! process; nothing is cached between calls, so the reconciler always sees
//! fresh host state.

use crate::error::{Result, RuntimeError};
use crate::interface::{ContainerRuntime, RunRequest};
use async_trait::async_trait;
use corral_types::VolumeMount;
use serde::Deserialize;
use std::collections::BTreeMap;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Container runtime backed by the `docker` command-line client.
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    /// Driver for the `docker` binary found on PATH.
    pub fn new() -> Self {
        Self {
            binary: "docker".to_string(),
        }
    }

    /// Driver for an explicit engine binary (e.g. `podman`).
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run an engine command, capturing stdout/stderr.
    async fn exec(&self, args: &[&str]) -> Result<CommandOutput> {
        debug!(binary = %self.binary, ?args, "Invoking container engine");

        let output = Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    /// Run an engine command that is expected to succeed.
    async fn exec_ok(&self, args: &[&str]) -> Result<String> {
        let output = self.exec(args).await?;
        if output.success {
            Ok(output.stdout)
        } else {
            Err(RuntimeError::CommandFailed {
                command: format!("{} {}", self.binary, args.join(" ")),
                stderr: output.stderr,
            })
        }
    }

    /// Exact-name filter: `name=foo` also matches `foo-bar`, so anchor it.
    fn name_filter(name: &str) -> String {
        format!("name=^/{}$", name)
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

struct CommandOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

/// One entry of `docker inspect --format '{{json .Mounts}}'`.
#[derive(Debug, Deserialize)]
struct InspectMount {
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Source")]
    source: Option<String>,
    #[serde(rename = "Destination")]
    destination: String,
    #[serde(rename = "RW", default)]
    rw: bool,
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn ping(&self) -> Result<()> {
        let output = self.exec(&["info", "--format", "{{.ServerVersion}}"]).await;
        match output {
            Ok(out) if out.success => Ok(()),
            Ok(out) => Err(RuntimeError::Unavailable(out.stderr)),
            Err(e) => Err(RuntimeError::Unavailable(e.to_string())),
        }
    }

    async fn container_exists(&self, name: &str) -> Result<bool> {
        let filter = Self::name_filter(name);
        let stdout = self
            .exec_ok(&["ps", "-a", "--filter", &filter, "--format", "{{.Names}}"])
            .await?;
        Ok(stdout.lines().any(|line| line == name))
    }

    async fn is_running(&self, name: &str) -> Result<bool> {
        let filter = Self::name_filter(name);
        let stdout = self
            .exec_ok(&["ps", "--filter", &filter, "--format", "{{.Names}}"])
            .await?;
        Ok(stdout.lines().any(|line| line == name))
    }

    #[instrument(skip(self))]
    async fn start(&self, name: &str) -> Result<()> {
        self.exec_ok(&["start", name]).await?;
        Ok(())
    }

    #[instrument(skip(self, request), fields(name = %request.name, image = %request.image))]
    async fn run(&self, request: &RunRequest) -> Result<()> {
        let mut args: Vec<String> = vec![
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            request.name.clone(),
            "--restart".to_string(),
            "unless-stopped".to_string(),
        ];

        if !request.network.is_empty() {
            args.push("--network".to_string());
            args.push(request.network.clone());
        }

        for (key, value) in &request.env {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }

        for mount in &request.volumes {
            args.push("-v".to_string());
            let mut value = format!("{}:{}", mount.source, mount.target);
            if mount.read_only {
                value.push_str(":ro");
            }
            args.push(value);
        }

        for port in &request.ports {
            args.push("-p".to_string());
            args.push(format!("{}:{}", port.host_port, port.container_port));
        }

        args.extend(request.flags.iter().cloned());
        args.push(request.image.clone());

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.exec_ok(&arg_refs).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, name: &str, force: bool) -> Result<()> {
        if force {
            self.exec_ok(&["rm", "-f", name]).await?;
        } else {
            self.exec_ok(&["rm", name]).await?;
        }
        Ok(())
    }

    async fn inspect_env(&self, name: &str) -> Result<BTreeMap<String, String>> {
        let stdout = self
            .exec_ok(&["inspect", "--format", "{{json .Config.Env}}", name])
            .await
            .map_err(|_| RuntimeError::ContainerNotFound(name.to_string()))?;

        let pairs: Vec<String> =
            serde_json::from_str(&stdout).map_err(|e| RuntimeError::Parse(e.to_string()))?;

        Ok(pairs
            .iter()
            .filter_map(|pair| {
                pair.split_once('=')
                    .map(|(k, v)| (k.to_string(), v.to_string()))
            })
            .collect())
    }

    async fn inspect_image(&self, name: &str) -> Result<String> {
        self.exec_ok(&["inspect", "--format", "{{.Config.Image}}", name])
            .await
            .map_err(|_| RuntimeError::ContainerNotFound(name.to_string()))
    }

    async fn inspect_mounts(&self, name: &str) -> Result<Vec<VolumeMount>> {
        let stdout = self
            .exec_ok(&["inspect", "--format", "{{json .Mounts}}", name])
            .await
            .map_err(|_| RuntimeError::ContainerNotFound(name.to_string()))?;

        let mounts: Vec<InspectMount> =
            serde_json::from_str(&stdout).map_err(|e| RuntimeError::Parse(e.to_string()))?;

        Ok(mounts
            .into_iter()
            .map(|m| VolumeMount {
                // Named volumes report both Name and a backing Source path;
                // prefer the name, it is what the spec declares.
                source: m.name.or(m.source).unwrap_or_default(),
                target: m.destination,
                read_only: !m.rw,
            })
            .collect())
    }

    async fn image_exists_locally(&self, reference: &str) -> Result<bool> {
        let output = self
            .exec(&["image", "inspect", "--format", "{{.Id}}", reference])
            .await?;
        Ok(output.success)
    }

    #[instrument(skip(self))]
    async fn pull(&self, reference: &str) -> Result<()> {
        let output = self.exec(&["pull", reference]).await?;
        if output.success {
            Ok(())
        } else {
            Err(RuntimeError::PullFailed {
                reference: reference.to_string(),
                detail: output.stderr,
            })
        }
    }

    async fn host_port_of(&self, name: &str, container_port: u16) -> Result<Option<u16>> {
        let spec = format!("{}/tcp", container_port);
        let output = self.exec(&["port", name, &spec]).await?;
        if !output.success {
            return Ok(None);
        }

        // Output looks like `0.0.0.0:8080` (one line per bound address).
        Ok(output
            .stdout
            .lines()
            .filter_map(|line| line.rsplit_once(':'))
            .filter_map(|(_, port)| port.trim().parse::<u16>().ok())
            .next())
    }

    async fn ensure_network(&self, name: &str) -> Result<()> {
        let probe = self
            .exec(&["network", "inspect", "--format", "{{.Id}}", name])
            .await?;
        if !probe.success {
            self.exec_ok(&["network", "create", name]).await?;
            debug!(network = %name, "Created network");
        }
        Ok(())
    }

    async fn ensure_volume(&self, name: &str) -> Result<()> {
        let probe = self
            .exec(&["volume", "inspect", "--format", "{{.Name}}", name])
            .await?;
        if !probe.success {
            self.exec_ok(&["volume", "create", name]).await?;
            debug!(volume = %name, "Created volume");
        }
        Ok(())
    }
}
