//! Error types for a registry build.
//!
//! Every failure aborts the whole build before the index is written. The
//! variants here say which stage failed and, for per-module failures, which
//! module; the wrapped error names the file and the rule it broke.

use crate::archive::error::PackagingError;
use crate::config::ConfigError;
use crate::descriptor::{DescriptorError, ModuleName};
use crate::discovery::DiscoveryError;
use crate::registry::index::IndexWriteError;
use crate::registry::legacy::LegacyRegistryError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while building registry assets.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The build parameters could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The legacy registry could not be loaded.
    #[error(transparent)]
    LegacyRegistry(#[from] LegacyRegistryError),

    /// The modules directory could not be scanned.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// A module descriptor is unreadable or incomplete.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// Two module directories declare the same name.
    #[error("module {name} is declared by both {first} and {second}")]
    DuplicateModule {
        /// The contested name.
        name: ModuleName,
        /// Descriptor seen first.
        first: Utf8PathBuf,
        /// Descriptor seen second.
        second: Utf8PathBuf,
    },

    /// A module could not be packaged.
    #[error("module {module}: {source}")]
    Module {
        /// The module being packaged.
        module: ModuleName,
        /// What went wrong.
        #[source]
        source: PackagingError,
    },

    /// The registry index could not be written.
    #[error(transparent)]
    Index(#[from] IndexWriteError),
}

impl BuildError {
    /// Attach a module name to a packaging failure.
    pub(crate) fn module(module: &ModuleName) -> impl FnOnce(PackagingError) -> Self + '_ {
        move |source| Self::Module {
            module: module.clone(),
            source,
        }
    }

    /// The packaging failure behind this error, if any.
    #[must_use]
    pub fn packaging(&self) -> Option<&PackagingError> {
        match self {
            Self::Module { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A specialised `Result` type for registry builds.
pub type Result<T> = std::result::Result<T, BuildError>;
