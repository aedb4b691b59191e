//! The per-run report: what was done, what to warn about.

use chrono::{DateTime, Utc};
use corral_types::{Action, PortBinding, ServiceName};
use serde::{Deserialize, Serialize};

/// Non-fatal findings; logged, never aborting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Warning {
    /// A requested component token is not a known service.
    UnknownComponent(String),

    /// The desired host port is already occupied by an unrelated process.
    /// The runtime surfaces the real bind failure if one occurs.
    PortConflict { service: ServiceName, port: u16 },

    /// GPU wanted but unavailable; the service runs CPU-only.
    GpuDegraded { service: ServiceName },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::UnknownComponent(token) => {
                write!(f, "Unknown component '{}'; skipping", token)
            }
            Warning::PortConflict { service, port } => {
                write!(f, "Host port {} for {} is already in use", port, service)
            }
            Warning::GpuDegraded { service } => {
                write!(f, "No GPU available; {} will run CPU-only", service)
            }
        }
    }
}

/// Outcome for one service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceReport {
    pub service: ServiceName,
    pub container_name: String,
    pub action: Action,
    /// Final state, e.g. `running` or `skipped (unknown component)`.
    pub state: String,
    pub ports: Vec<PortBinding>,
}

/// Aggregated outcome of one reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub services: Vec<ServiceReport>,
    pub warnings: Vec<Warning>,
}

impl RunReport {
    /// Render the final tabular dump of managed services.
    pub fn render_table(&self) -> String {
        let mut name_width = "SERVICE".len();
        let mut state_width = "STATUS".len();
        for entry in &self.services {
            name_width = name_width.max(entry.service.as_str().len());
            state_width = state_width.max(entry.state.len());
        }

        let mut out = format!(
            "{:<name_width$}  {:<state_width$}  PORTS\n",
            "SERVICE", "STATUS"
        );
        for entry in &self.services {
            let ports = entry
                .ports
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!(
                "{:<name_width$}  {:<state_width$}  {}\n",
                entry.service.as_str(),
                entry.state,
                ports
            ));
        }
        out
    }
}
