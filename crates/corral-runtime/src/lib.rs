//! Corral Runtime - Container runtime interface
//!
//! This crate provides the collaborator boundary to the container engine:
//!
//! - **ContainerRuntime**: The trait the reconciler drives
//! - **DockerCli**: Production implementation shelling out to `docker`
//! - **InMemoryRuntime**: In-memory implementation for development and testing
//!
//! ## In-Memory vs Docker
//!
//! `InMemoryRuntime` records every mutation and image-resolution attempt so
//! tests can assert ordering and the absence of side effects. Production
//! use goes through `DockerCli`, which only ever creates, starts, and
//! removes containers - volumes and named data are never deleted.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod docker;
pub mod error;
pub mod interface;
pub mod memory;

// Re-exports
pub use docker::DockerCli;
pub use error::{Result, RuntimeError};
pub use interface::{ContainerRuntime, RunRequest};
pub use memory::{InMemoryRuntime, RuntimeCall, SeededContainer};
