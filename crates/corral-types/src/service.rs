//! Service identifiers and the canonical dependency order.

use serde::{Deserialize, Serialize};

/// Identifier for a managed service.
///
/// The six built-in components have a fixed dependency order; anything else
/// is retained as `Other` so callers can warn about it at execution time
/// rather than rejecting it up front.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceName {
    /// Primary data store.
    Store,
    /// Inference/compute runtime.
    Runtime,
    /// Public API server.
    Api,
    /// Background controller.
    Controller,
    /// Web UI.
    Ui,
    /// Edge gateway / reverse proxy.
    Gateway,
    /// Unrecognized component token, kept verbatim.
    Other(String),
}

impl ServiceName {
    /// The canonical dependency order applied to any requested subset.
    pub const CANONICAL_ORDER: [ServiceName; 6] = [
        ServiceName::Store,
        ServiceName::Runtime,
        ServiceName::Api,
        ServiceName::Controller,
        ServiceName::Ui,
        ServiceName::Gateway,
    ];

    /// Parse a component token. Unknown tokens are retained, not rejected.
    pub fn parse(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "store" => ServiceName::Store,
            "runtime" => ServiceName::Runtime,
            "api" => ServiceName::Api,
            "controller" => ServiceName::Controller,
            "ui" => ServiceName::Ui,
            "gateway" => ServiceName::Gateway,
            _ => ServiceName::Other(token.trim().to_string()),
        }
    }

    /// Position in the canonical order, if this is a built-in component.
    pub fn canonical_index(&self) -> Option<usize> {
        Self::CANONICAL_ORDER.iter().position(|n| n == self)
    }

    /// Whether this is one of the six built-in components.
    pub fn is_known(&self) -> bool {
        !matches!(self, ServiceName::Other(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            ServiceName::Store => "store",
            ServiceName::Runtime => "runtime",
            ServiceName::Api => "api",
            ServiceName::Controller => "controller",
            ServiceName::Ui => "ui",
            ServiceName::Gateway => "gateway",
            ServiceName::Other(token) => token.as_str(),
        }
    }
}

impl std::fmt::Display for ServiceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sort the requested components into the canonical dependency order.
///
/// Built-in components sort by their canonical position; unknown tokens are
/// appended at the end preserving their relative input order.
pub fn canonical_sort(requested: Vec<ServiceName>) -> Vec<ServiceName> {
    let mut known: Vec<ServiceName> = Vec::new();
    let mut unknown: Vec<ServiceName> = Vec::new();
    for name in requested {
        if name.is_known() {
            known.push(name);
        } else {
            unknown.push(name);
        }
    }
    known.sort_by_key(|n| n.canonical_index());
    known.extend(unknown);
    known
}
