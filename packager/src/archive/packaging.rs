//! Packaging of a single module into a verified, digested archive.
//!
//! Orchestrates: enumerate files, build the archive, re-read it against the
//! extractor contract, then stream it through SHA-256.

use super::builder::{ArchiveRequest, build_archive};
use super::digest::{Sha256Digest, digest_file};
use super::enumerate::{ModuleFileManifest, enumerate_module_files};
use super::error::PackagingError;
use super::layout::verify_layout;
use super::naming::ArchiveName;
use crate::descriptor::ModuleMetadata;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use std::fs;

/// Input parameters for [`package_module`].
#[derive(Debug, Clone, Copy)]
pub struct PackageParams<'a> {
    /// Directory containing the module's descriptor and files.
    pub module_root: &'a Utf8Path,
    /// Directory where the archive will be written.
    pub out_dir: &'a Utf8Path,
    /// Descriptor fields; name and version fix the archive name.
    pub metadata: &'a ModuleMetadata,
}

/// A finished archive on disk. Never modified after its digest is taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveArtifact {
    /// Location of the `.tar.gz` file.
    pub path: Utf8PathBuf,
    /// Length of the archive in bytes.
    pub size_bytes: u64,
    /// SHA-256 of the archive bytes.
    pub sha256: Sha256Digest,
}

impl ArchiveArtifact {
    /// The archive's file name, as used in download URLs.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path.file_name().unwrap_or(self.path.as_str())
    }
}

/// Output produced by [`package_module`].
#[derive(Debug, Clone)]
pub struct PackagedModule {
    /// Canonical archive name.
    pub name: ArchiveName,
    /// The archive and its digest.
    pub artifact: ArchiveArtifact,
    /// The module's source files, as packaged.
    pub files: ModuleFileManifest,
}

/// Package one module directory.
///
/// # Errors
///
/// Returns any [`PackagingError`] raised while enumerating, archiving,
/// verifying, or digesting. An archive that fails verification is removed.
pub fn package_module(params: PackageParams<'_>) -> Result<PackagedModule, PackagingError> {
    let name = ArchiveName::new(params.metadata.name.clone(), params.metadata.version.clone());
    let files = enumerate_module_files(params.module_root)?;
    debug!("{}: {} files to package", name.module(), files.len());

    let archive_path = build_archive(&ArchiveRequest {
        module_root: params.module_root,
        out_dir: params.out_dir,
        name: &name,
        files: &files,
    })?;

    if let Err(err) = check_contents(&archive_path, &name, &files) {
        if let Err(remove_err) = fs::remove_file(&archive_path) {
            warn!("could not remove rejected archive {archive_path}: {remove_err}");
        }
        return Err(err);
    }

    let digest = digest_file(&archive_path)?;
    debug!(
        "{}: {} bytes, sha256 {}",
        name.filename(),
        digest.size_bytes,
        digest.sha256
    );

    Ok(PackagedModule {
        name,
        artifact: ArchiveArtifact {
            path: archive_path,
            size_bytes: digest.size_bytes,
            sha256: digest.sha256,
        },
        files,
    })
}

/// The archive must hold exactly the enumerated files, in order.
fn check_contents(
    archive_path: &Utf8Path,
    name: &ArchiveName,
    files: &ModuleFileManifest,
) -> Result<(), PackagingError> {
    let packaged = verify_layout(archive_path, name.root_dir())?;
    if packaged.as_slice() == files.as_slice() {
        Ok(())
    } else {
        Err(PackagingError::InvalidLayout {
            path: archive_path.to_path_buf(),
            reason: format!(
                "archive lists {} entries but the module has {} files",
                packaged.len(),
                files.len()
            ),
        })
    }
}

#[cfg(test)]
#[expect(clippy::expect_used, reason = "tests fail fast on broken fixtures")]
#[path = "packaging_tests.rs"]
mod tests;
