//! CLI argument definitions for the registry asset builder.
//!
//! Flags map one-to-one onto [`ConfigLayer`] fields. This module only parses
//! and layers them; the build itself lives in [`crate::pipeline`].

use crate::config::{BuildConfig, ConfigError, ConfigLayer, ResolveContext};
use crate::timestamp::Clock;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;

/// Build module archives and the v2 registry index.
#[derive(Parser, Debug, Clone)]
#[command(name = "build-registry-assets")]
#[command(version, about)]
#[command(long_about = concat!(
    "Build module archives and the v2 registry index.\n\n",
    "Every directory under the modules directory that contains a module.yaml is ",
    "packaged as <name>-<version>.tar.gz with a single <name>/ root directory. ",
    "Archives are byte-reproducible: entries are sorted, owned by root, and ",
    "stamped with mtime 0. The registry index lists each archive with its ",
    "download URL, SHA-256 checksum, size, and file manifest.\n\n",
    "Descriptions, authors, and tags are taken from the v1 registry when it ",
    "has them.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Build every module for a release:\n",
    "    $ build-registry-assets --tag v2.2.7\n\n",
    "  Rebuild two modules with a pinned timestamp:\n",
    "    $ build-registry-assets --tag v2.2.7 --only code-reviewer --only summarizer \\\n",
    "        --timestamp 2026-02-01T00:00:00Z\n\n",
    "  Reproducible build from a CI checkout:\n",
    "    $ SOURCE_DATE_EPOCH=$(git log -1 --format=%ct) build-registry-assets --tag v2.2.7",
))]
pub struct Cli {
    /// Release tag the archives will be attached to, e.g. v2.2.7.
    #[arg(long, value_name = "TAG")]
    pub tag: Option<String>,

    /// Directory containing one sub-directory per module [default: cognitive/modules].
    #[arg(long, value_name = "DIR")]
    pub modules_dir: Option<Utf8PathBuf>,

    /// v1 registry supplying descriptions, authors, and tags [default: cognitive-registry.json].
    #[arg(long = "v1-registry", alias = "legacy-registry", value_name = "FILE")]
    pub legacy_registry: Option<Utf8PathBuf>,

    /// Build without a v1 registry.
    #[arg(long, conflicts_with = "legacy_registry")]
    pub no_legacy_registry: bool,

    /// Output directory for archives [default: dist/registry-assets].
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<Utf8PathBuf>,

    /// Output path of the registry index [default: cognitive-registry.v2.json].
    #[arg(long, value_name = "FILE")]
    pub registry_out: Option<Utf8PathBuf>,

    /// Namespace for published modules [default: official].
    #[arg(long, value_name = "NAME")]
    pub namespace: Option<String>,

    /// Minimum runtime version [default: 2.2.0].
    #[arg(long, value_name = "VERSION")]
    pub runtime_min: Option<String>,

    /// Repository URL; download URLs are formed from it.
    #[arg(long, value_name = "URL")]
    pub repository: Option<String>,

    /// Homepage URL.
    #[arg(long, value_name = "URL")]
    pub homepage: Option<String>,

    /// SPDX license identifier [default: MIT].
    #[arg(long, value_name = "SPDX")]
    pub license: Option<String>,

    /// ISO 8601 timestamp for the index and entries [default: SOURCE_DATE_EPOCH, else now].
    #[arg(long, value_name = "TIME")]
    pub timestamp: Option<String>,

    /// Limit the build to a module name (repeatable).
    #[arg(long, value_name = "NAME")]
    pub only: Vec<String>,

    /// Directory relative paths are resolved against [default: current directory].
    #[arg(long, value_name = "DIR")]
    pub root: Option<Utf8PathBuf>,

    /// TOML file supplying defaults for any of the options above.
    #[arg(long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Only log errors.
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Default for Cli {
    /// A `Cli` with no flags given.
    ///
    /// # Examples
    ///
    /// ```
    /// use module_packager::cli::Cli;
    ///
    /// let cli = Cli::default();
    /// assert!(cli.tag.is_none());
    /// assert!(cli.only.is_empty());
    /// ```
    fn default() -> Self {
        Self {
            tag: None,
            modules_dir: None,
            legacy_registry: None,
            no_legacy_registry: false,
            out_dir: None,
            registry_out: None,
            namespace: None,
            runtime_min: None,
            repository: None,
            homepage: None,
            license: None,
            timestamp: None,
            only: Vec::new(),
            root: None,
            config: None,
            verbosity: 0,
            quiet: false,
        }
    }
}

impl Cli {
    /// The flags as a configuration layer.
    #[must_use]
    pub fn layer(&self) -> ConfigLayer {
        ConfigLayer {
            tag: self.tag.clone(),
            modules_dir: self.modules_dir.clone(),
            legacy_registry: self.legacy_registry.clone(),
            skip_legacy_registry: self.no_legacy_registry.then_some(true),
            out_dir: self.out_dir.clone(),
            registry_out: self.registry_out.clone(),
            namespace: self.namespace.clone(),
            runtime_min: self.runtime_min.clone(),
            repository: self.repository.clone(),
            homepage: self.homepage.clone(),
            license: self.license.clone(),
            timestamp: self.timestamp.clone(),
            only: self.only.clone(),
        }
    }

    /// Log filter directive for the requested verbosity.
    ///
    /// # Examples
    ///
    /// ```
    /// use clap::Parser;
    /// use module_packager::cli::Cli;
    ///
    /// let cli = Cli::parse_from(["build-registry-assets", "-vv"]);
    /// assert_eq!(cli.log_directive(), "trace");
    /// ```
    #[must_use]
    pub fn log_directive(&self) -> &'static str {
        match (self.quiet, self.verbosity) {
            (true, _) => "error",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }

    /// Resolve the root directory against the working directory.
    #[must_use]
    pub fn root_dir(&self, cwd: &Utf8Path) -> Utf8PathBuf {
        match &self.root {
            Some(root) => cwd.join(root),
            None => cwd.to_path_buf(),
        }
    }

    /// Layer flags over the config file (if any) and resolve.
    ///
    /// `cwd` anchors `--root`; the config file path and every configured
    /// path are then resolved against the root.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be loaded, no tag
    /// is given, or the timestamp is malformed.
    pub fn build_config(
        &self,
        cwd: &Utf8Path,
        source_date_epoch: Option<&str>,
        clock: &dyn Clock,
    ) -> Result<BuildConfig, ConfigError> {
        let root = self.root_dir(cwd);
        let file_layer = match &self.config {
            Some(path) => ConfigLayer::load(&root.join(path))?,
            None => ConfigLayer::default(),
        };
        BuildConfig::resolve(
            self.layer().over(file_layer),
            ResolveContext {
                root: &root,
                source_date_epoch,
                clock,
            },
        )
    }
}

#[cfg(test)]
#[expect(clippy::expect_used, reason = "tests fail fast on broken fixtures")]
#[path = "cli_tests.rs"]
mod tests;
