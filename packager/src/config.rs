//! Build configuration.
//!
//! Parameters come from three layers: command-line flags, an optional TOML
//! file, and built-in defaults. Each layer is a [`ConfigLayer`] whose unset
//! fields defer to the layer below. [`BuildConfig::resolve`] folds the
//! merged layer into concrete values, anchoring relative paths at an explicit
//! root and fixing the build timestamp, so the pipeline never consults the
//! working directory or the clock itself.

use crate::timestamp::{BuildTimestamp, Clock, TimestampError, resolve_timestamp};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use thiserror::Error;

/// Default modules directory, relative to the root.
pub const DEFAULT_MODULES_DIR: &str = "cognitive/modules";
/// Default legacy registry path, relative to the root.
pub const DEFAULT_LEGACY_REGISTRY: &str = "cognitive-registry.json";
/// Default archive output directory, relative to the root.
pub const DEFAULT_OUT_DIR: &str = "dist/registry-assets";
/// Default registry index path, relative to the root.
pub const DEFAULT_REGISTRY_OUT: &str = "cognitive-registry.v2.json";
/// Default publishing namespace.
pub const DEFAULT_NAMESPACE: &str = "official";
/// Default minimum runtime version.
pub const DEFAULT_RUNTIME_MIN: &str = "2.2.0";
/// Default repository URL.
pub const DEFAULT_REPOSITORY: &str = "https://github.com/Cognary/cognitive";
/// Default homepage URL.
pub const DEFAULT_HOMEPAGE: &str = "https://cognary.github.io/cognitive/";
/// Default SPDX license identifier.
pub const DEFAULT_LICENSE: &str = "MIT";

/// Errors arising while assembling the build configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// The underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or has unknown keys.
    #[error("invalid config file {path}: {source}")]
    Parse {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// The parser's diagnostic.
        #[source]
        source: toml::de::Error,
    },

    /// No release tag was given by any layer.
    #[error("a release tag is required (pass --tag, e.g. --tag v2.2.7)")]
    MissingTag,

    /// The working directory cannot be determined.
    #[error("cannot determine working directory: {source}")]
    CurrentDir {
        /// The underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// The working directory cannot be represented as UTF-8.
    #[error("working directory {path} is not valid UTF-8")]
    NonUtf8Root {
        /// The offending path.
        path: std::path::PathBuf,
    },

    /// The build timestamp could not be determined.
    #[error(transparent)]
    Timestamp(#[from] TimestampError),
}

/// One source of build parameters. Unset fields defer to a lower layer.
///
/// This is also the schema of the optional TOML file:
///
/// ```toml
/// tag = "v2.2.7"
/// modules-dir = "cognitive/modules"
/// namespace = "official"
/// only = ["code-reviewer"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct ConfigLayer {
    /// Release tag used in download URLs.
    pub tag: Option<String>,
    /// Directory holding one sub-directory per module.
    pub modules_dir: Option<Utf8PathBuf>,
    /// Previous-schema registry supplying authored metadata.
    pub legacy_registry: Option<Utf8PathBuf>,
    /// Build without a legacy registry.
    pub skip_legacy_registry: Option<bool>,
    /// Directory receiving the archives.
    pub out_dir: Option<Utf8PathBuf>,
    /// Path of the registry index to write.
    pub registry_out: Option<Utf8PathBuf>,
    /// Publishing namespace.
    pub namespace: Option<String>,
    /// Minimum runtime version.
    pub runtime_min: Option<String>,
    /// Repository URL.
    pub repository: Option<String>,
    /// Homepage URL.
    pub homepage: Option<String>,
    /// SPDX license identifier.
    pub license: Option<String>,
    /// Fixed build timestamp (ISO 8601).
    pub timestamp: Option<String>,
    /// Module names to build; empty means all.
    pub only: Vec<String>,
}

impl ConfigLayer {
    /// Read a layer from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Combine with `lower`, keeping this layer's values where set.
    ///
    /// A non-empty `only` list replaces the lower list wholesale. A legacy
    /// registry named in this layer also cancels a lower layer's opt-out.
    #[must_use]
    pub fn over(self, lower: Self) -> Self {
        let skip_legacy_registry = if self.legacy_registry.is_some() {
            self.skip_legacy_registry
        } else {
            self.skip_legacy_registry.or(lower.skip_legacy_registry)
        };
        Self {
            tag: self.tag.or(lower.tag),
            modules_dir: self.modules_dir.or(lower.modules_dir),
            legacy_registry: self.legacy_registry.or(lower.legacy_registry),
            skip_legacy_registry,
            out_dir: self.out_dir.or(lower.out_dir),
            registry_out: self.registry_out.or(lower.registry_out),
            namespace: self.namespace.or(lower.namespace),
            runtime_min: self.runtime_min.or(lower.runtime_min),
            repository: self.repository.or(lower.repository),
            homepage: self.homepage.or(lower.homepage),
            license: self.license.or(lower.license),
            timestamp: self.timestamp.or(lower.timestamp),
            only: if self.only.is_empty() {
                lower.only
            } else {
                self.only
            },
        }
    }
}

/// Publishing parameters shared by every registry entry of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishParams {
    /// Release tag used in download URLs.
    pub release_tag: String,
    /// Publishing namespace.
    pub namespace: String,
    /// Minimum runtime version.
    pub runtime_min: String,
    /// Repository URL; also the base of download URLs.
    pub repository: String,
    /// Homepage URL.
    pub homepage: String,
    /// SPDX license identifier.
    pub license: String,
    /// The single timestamp stamped on the index and every entry.
    pub timestamp: BuildTimestamp,
}

/// Fully resolved build parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Directory holding one sub-directory per module.
    pub modules_dir: Utf8PathBuf,
    /// Previous-schema registry, if one is used.
    pub legacy_registry: Option<Utf8PathBuf>,
    /// Directory receiving the archives.
    pub out_dir: Utf8PathBuf,
    /// Path of the registry index to write.
    pub registry_out: Utf8PathBuf,
    /// Module names to build; empty means all.
    pub only: BTreeSet<String>,
    /// Values copied into every registry entry.
    pub publish: PublishParams,
}

/// Process-level inputs needed to resolve a [`ConfigLayer`].
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    /// Directory that relative paths are resolved against.
    pub root: &'a Utf8Path,
    /// Value of `SOURCE_DATE_EPOCH`, if set.
    pub source_date_epoch: Option<&'a str>,
    /// Clock consulted when no timestamp is supplied.
    pub clock: &'a dyn Clock,
}

impl BuildConfig {
    /// Resolve a merged layer into a concrete configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingTag`] if no non-blank tag was given, or
    /// [`ConfigError::Timestamp`] if the timestamp source is malformed.
    pub fn resolve(layer: ConfigLayer, context: ResolveContext<'_>) -> Result<Self, ConfigError> {
        let release_tag = layer
            .tag
            .map(|tag| tag.trim().to_owned())
            .filter(|tag| !tag.is_empty())
            .ok_or(ConfigError::MissingTag)?;
        let timestamp = resolve_timestamp(
            layer.timestamp.as_deref(),
            context.source_date_epoch,
            context.clock,
        )?;
        let anchored = |path: Option<Utf8PathBuf>, default: &str| {
            context
                .root
                .join(path.unwrap_or_else(|| Utf8PathBuf::from(default)))
        };

        let legacy_registry = if layer.skip_legacy_registry.unwrap_or(false) {
            None
        } else {
            Some(anchored(layer.legacy_registry, DEFAULT_LEGACY_REGISTRY))
        };

        Ok(Self {
            modules_dir: anchored(layer.modules_dir, DEFAULT_MODULES_DIR),
            legacy_registry,
            out_dir: anchored(layer.out_dir, DEFAULT_OUT_DIR),
            registry_out: anchored(layer.registry_out, DEFAULT_REGISTRY_OUT),
            only: layer
                .only
                .iter()
                .map(|name| name.trim())
                .filter(|name| !name.is_empty())
                .map(str::to_owned)
                .collect(),
            publish: PublishParams {
                release_tag,
                namespace: or_default(layer.namespace, DEFAULT_NAMESPACE),
                runtime_min: or_default(layer.runtime_min, DEFAULT_RUNTIME_MIN),
                repository: or_default(layer.repository, DEFAULT_REPOSITORY),
                homepage: or_default(layer.homepage, DEFAULT_HOMEPAGE),
                license: or_default(layer.license, DEFAULT_LICENSE),
                timestamp,
            },
        })
    }
}

fn or_default(value: Option<String>, default: &str) -> String {
    value.unwrap_or_else(|| default.to_owned())
}
