//! Registry index document and its writer.

use super::ascii::to_ascii_json;
use super::entry::RegistryEntry;
use crate::descriptor::ModuleName;
use crate::timestamp::BuildTimestamp;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fs;
use std::io::Write;
use thiserror::Error;

/// `$schema` marker of the index document.
pub const INDEX_SCHEMA_URL: &str = "https://cognitive-modules.dev/schema/registry-v2.json";

/// Index format version.
pub const INDEX_FORMAT_VERSION: &str = "2.0.0";

/// Errors arising while writing the index.
#[derive(Debug, Error)]
pub enum IndexWriteError {
    /// The index could not be serialized.
    #[error("failed to serialize registry index: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The index file could not be written.
    #[error("failed to write registry index {path}: {source}")]
    Io {
        /// Destination path.
        path: Utf8PathBuf,
        /// The underlying failure.
        #[source]
        source: std::io::Error,
    },
}

/// Aggregate counters published with the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Number of entries.
    pub total_modules: usize,
    /// Download counter, reset on every build.
    pub total_downloads: u64,
    /// The build timestamp.
    pub last_updated: BuildTimestamp,
}

/// The registry index document.
///
/// Entries keep their insertion order, which is the order modules were
/// discovered in; `featured` lists the same names in the same order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistryIndex {
    #[serde(rename = "$schema")]
    schema: &'static str,
    version: &'static str,
    updated: BuildTimestamp,
    #[serde(serialize_with = "serialize_entries")]
    modules: Vec<RegistryEntry>,
    categories: Value,
    featured: Vec<ModuleName>,
    stats: IndexStats,
}

impl RegistryIndex {
    /// Fold `entries` into an index stamped with `updated`.
    #[must_use]
    pub fn new(entries: Vec<RegistryEntry>, categories: Value, updated: BuildTimestamp) -> Self {
        let featured = entries.iter().map(|entry| entry.name().clone()).collect();
        let stats = IndexStats {
            total_modules: entries.len(),
            total_downloads: 0,
            last_updated: updated,
        };
        Self {
            schema: INDEX_SCHEMA_URL,
            version: INDEX_FORMAT_VERSION,
            updated,
            modules: entries,
            categories,
            featured,
            stats,
        }
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.modules
    }

    /// Featured module names.
    #[must_use]
    pub fn featured(&self) -> &[ModuleName] {
        &self.featured
    }

    /// Summary counters.
    #[must_use]
    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }
}

fn serialize_entries<S: Serializer>(
    entries: &[RegistryEntry],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(entries.iter().map(|entry| (entry.name().as_str(), entry)))
}

/// Write `index` to `path` as ASCII-only JSON.
///
/// The document is written to a temporary file beside `path` and renamed
/// into place, so readers never observe a partial index.
///
/// # Errors
///
/// Returns [`IndexWriteError`] if serialization or any filesystem step fails.
pub fn write_index(index: &RegistryIndex, path: &Utf8Path) -> Result<(), IndexWriteError> {
    let bytes = to_ascii_json(index)?;
    let io_err = |source| IndexWriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or(Utf8Path::new("."));
    fs::create_dir_all(parent).map_err(io_err)?;

    let mut staged = tempfile::Builder::new()
        .prefix(".registry-index.")
        .suffix(".partial")
        .tempfile_in(parent)
        .map_err(io_err)?;
    staged.write_all(&bytes).map_err(io_err)?;
    staged.as_file().sync_all().map_err(io_err)?;
    let staged = staged.into_temp_path();
    staged.persist(path).map_err(|err| io_err(err.error))?;
    set_published_permissions(path).map_err(io_err)
}

#[cfg(unix)]
fn set_published_permissions(path: &Utf8Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_published_permissions(_path: &Utf8Path) -> std::io::Result<()> {
    Ok(())
}
