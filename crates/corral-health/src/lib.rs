//! Corral Health - Readiness gating and capability negotiation
//!
//! The Readiness Waiter blocks dependent reconciliation steps until a
//! prerequisite service reports healthy, with a bounded fixed-interval
//! polling loop per dependency class:
//!
//! - health-critical dependencies (the data store) get a fixed retry count;
//!   exhaustion is fatal and aborts the run,
//! - compute-heavy dependencies (the inference runtime) get a longer
//!   bounded wait, ten minutes by default.
//!
//! GPU capability negotiation happens before any compute-heavy wait begins:
//! a mandated-but-unavailable GPU is fatal before anything is started, an
//! optional-but-unavailable GPU degrades to CPU with a warning.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod gpu;
pub mod probes;
pub mod waiter;

// Re-exports
pub use error::{HealthError, Result};
pub use gpu::{detect_gpu, negotiate, ComputeMode, GpuDecision};
pub use probes::{HttpProbe, ReadinessProbe, RunningProbe};
pub use waiter::{await_ready, probe_for, WaitPolicy};
