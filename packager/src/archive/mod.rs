//! Module archive naming, construction, verification, and digesting.
//!
//! # Sub-modules
//!
//! - [`enumerate`] - Safety-checked file listing (`ModuleFileManifest`).
//! - [`builder`] - Deterministic `.tar.gz` construction.
//! - [`naming`] - Archive naming policy (`ArchiveName`).
//! - [`digest`] - Streaming SHA-256 (`Sha256Digest`).
//! - [`layout`] - Verification against the single-root extractor contract.
//! - [`packaging`] - Per-module orchestration (`package_module`).
//! - [`error`] - Error types for all of the above.

pub mod builder;
pub mod digest;
pub mod enumerate;
pub mod error;
pub mod layout;
pub mod naming;
pub mod packaging;
