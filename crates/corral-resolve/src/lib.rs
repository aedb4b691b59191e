//! Corral Resolve - Desired state and image resolution
//!
//! Two concerns live here:
//!
//! - **Desired State Resolver**: merges CLI flags, environment variables and
//!   built-in defaults (in that precedence) into the canonical, ordered
//!   service list for one invocation.
//! - **Image Resolver**: turns a component's image candidates into a
//!   concrete reference via the local -> remote-tagged -> remote-latest
//!   fallback chain.
//!
//! The build tag is read once per invocation from a JSON build manifest and
//! defaults to `latest` when the manifest is unreadable.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod desired;
pub mod error;
pub mod image;
pub mod manifest;

// Re-exports
pub use desired::{resolve, EnvMap, ResolveOptions, Settings};
pub use error::{ResolveError, Result};
pub use image::ImageResolver;
pub use manifest::build_tag;
