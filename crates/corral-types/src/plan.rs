//! The per-run reconciliation plan.

use crate::action::Action;
use crate::service::ServiceName;
use crate::spec::ServiceSpec;
use serde::{Deserialize, Serialize};

/// One decided action for one service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanEntry {
    pub spec: ServiceSpec,
    pub action: Action,
}

/// Ordered list of per-service actions computed for one invocation.
///
/// Produced and consumed within a single run; never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconciliationPlan {
    entries: Vec<PlanEntry>,
}

impl ReconciliationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a decided action, in dependency order.
    pub fn push(&mut self, spec: ServiceSpec, action: Action) {
        self.entries.push(PlanEntry { spec, action });
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The action decided for a given service, if it was planned.
    pub fn action_for(&self, name: &ServiceName) -> Option<&Action> {
        self.entries
            .iter()
            .find(|e| &e.spec.name == name)
            .map(|e| &e.action)
    }

    /// Whether every planned action is `Skip` (the idempotence property).
    pub fn is_all_skip(&self) -> bool {
        self.entries.iter().all(|e| e.action == Action::Skip)
    }
}
