//! Module discovery.
//!
//! A module is any immediate sub-directory of the modules directory that
//! holds a descriptor file. Discovery order is the sorted order of the
//! sub-directory names, which fixes the order of entries in the index.

use crate::descriptor::DESCRIPTOR_FILE_NAME;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Errors arising while scanning the modules directory.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The modules directory could not be listed.
    #[error("failed to scan modules directory {path}: {source}")]
    Io {
        /// Path being scanned.
        path: Utf8PathBuf,
        /// The underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// A sub-directory name is not valid UTF-8.
    #[error("module directory name is not valid UTF-8: {}", path.display())]
    NonUtf8Path {
        /// The offending path.
        path: PathBuf,
    },
}

/// A discovered module directory and its descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredModule {
    /// The module directory.
    pub root: Utf8PathBuf,
    /// The descriptor file inside it.
    pub descriptor: Utf8PathBuf,
}

/// List `<modules_dir>/*/module.yaml`, sorted by directory name.
///
/// Sub-directories without a descriptor and plain files are skipped.
///
/// # Errors
///
/// Returns [`DiscoveryError::Io`] if `modules_dir` cannot be read and
/// [`DiscoveryError::NonUtf8Path`] for a directory name that is not UTF-8.
pub fn discover_modules(modules_dir: &Utf8Path) -> Result<Vec<DiscoveredModule>, DiscoveryError> {
    let io_err = |source| DiscoveryError::Io {
        path: modules_dir.to_path_buf(),
        source,
    };

    let mut modules = Vec::new();
    for entry in fs::read_dir(modules_dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let root = Utf8PathBuf::from_path_buf(entry.path())
            .map_err(|path| DiscoveryError::NonUtf8Path { path })?;
        let descriptor = root.join(DESCRIPTOR_FILE_NAME);
        if descriptor.is_file() {
            modules.push(DiscoveredModule { root, descriptor });
        }
    }
    modules.sort_by(|a, b| a.root.file_name().cmp(&b.root.file_name()));
    Ok(modules)
}
