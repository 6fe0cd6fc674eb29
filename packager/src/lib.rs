//! Module packager library.
//!
//! This crate packages versioned module directories into reproducible
//! `.tar.gz` archives and generates the v2 registry index that describes
//! them. It is used by the `build-registry-assets` binary and can be driven
//! programmatically for testing or custom release workflows.
//!
//! # Modules
//!
//! - [`archive`] - File enumeration, deterministic archives, and digests
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Layered build configuration
//! - [`descriptor`] - Module descriptor (`module.yaml`) reading
//! - [`discovery`] - Module directory discovery
//! - [`error`] - Build error taxonomy
//! - [`pipeline`] - Build orchestration
//! - [`registry`] - Registry entry assembly and index output
//! - [`timestamp`] - Build timestamps and the clock seam

pub mod archive;
pub mod cli;
pub mod config;
pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod timestamp;
