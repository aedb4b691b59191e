//! Corral Reconcile - Drift detection and the reconciler engine
//!
//! The engine walks the ordered service list, queries fresh host state per
//! service, decides an action via the drift detector, executes it through
//! the container runtime, and gates dependents through the readiness
//! waiter. It is strictly sequential: no two services are actioned
//! concurrently, which keeps the shared container engine race-free.
//!
//! ## Guarantees
//!
//! - No action ever deletes volumes or named data.
//! - Re-running with unchanged desired and host state yields an all-Skip
//!   plan.
//! - Recreation happens only on critical-field divergence.
//! - Services that are no longer declared are left alone (no pruning).
//!
//! On a fatal error the loop aborts immediately; completed steps stand and
//! a re-run converges. Two concurrent invocations against the same host
//! are not mutually excluded; corral assumes a single operator.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod drift;
pub mod engine;
pub mod error;
pub mod flags;
pub mod report;

// Re-exports
pub use drift::{decide, DriftInputs};
pub use engine::{ReconcileOutcome, Reconciler};
pub use error::{ReconcileError, Result};
pub use flags::run_flags;
pub use report::{RunReport, ServiceReport, Warning};
