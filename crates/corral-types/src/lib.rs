//! Corral Types - Core types for the local service reconciler
//!
//! Corral brings a declared set of named services (data store, inference
//! runtime, API, controller, UI, gateway) into a running state on a single
//! container host. This crate defines the shared data model:
//!
//! ## Architectural Boundaries
//!
//! - **corral-resolve** owns: producing `ServiceSpec`s from flags/env/defaults
//! - **corral-runtime** owns: talking to the container engine
//! - **corral-reconcile** owns: deciding and executing per-service actions
//!
//! ## Key Concepts
//!
//! - **ServiceSpec**: Declarative target configuration for one service
//! - **HostState**: What the container engine reports for one service
//! - **Action**: What the reconciler decided to do (Skip/Start/Create/Recreate)
//! - **ReconciliationPlan**: The ordered per-service actions for one run

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod action;
pub mod plan;
pub mod service;
pub mod spec;
pub mod state;

// Re-export main types
pub use action::{Action, RecreateReason};
pub use plan::{PlanEntry, ReconciliationPlan};
pub use service::ServiceName;
pub use spec::{
    GpuPolicy, ImageCandidates, PortBinding, ReadinessConfig, ResourceLimits, ServiceSpec,
    SpecValidationError, VolumeMount,
};
pub use state::{HostState, ObservedState};
