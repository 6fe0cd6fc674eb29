//! Inspection of finished archives against the extractor contract.
//!
//! Consumers unpack module archives with a safe extractor that expects a
//! single top-level directory named after the module, holding nothing but
//! regular files. [`verify_layout`] re-reads a freshly written archive and
//! checks that contract, along with the pinned ownership and timestamps,
//! before the archive is published in the registry.

use super::builder::{CANONICAL_ID, CANONICAL_OWNER, PINNED_MTIME};
use super::error::PackagingError;
use camino::Utf8Path;
use flate2::read::GzDecoder;
use std::fs;
use std::path::{Component, Path};
use tar::EntryType;

/// List the module-relative file paths in the archive at `archive_path`.
///
/// Every entry must live under `root/`, be a regular file, carry no
/// absolute or `..` components, and have canonical owner and mtime. The
/// gzip container's mtime must also be zero.
///
/// # Errors
///
/// Returns [`PackagingError::InvalidLayout`] naming the first broken rule,
/// or [`PackagingError::Io`] if the archive cannot be read.
pub fn verify_layout(archive_path: &Utf8Path, root: &str) -> Result<Vec<String>, PackagingError> {
    let invalid = |reason: String| PackagingError::InvalidLayout {
        path: archive_path.to_path_buf(),
        reason,
    };
    let io = || PackagingError::io(archive_path);

    let file = fs::File::open(archive_path).map_err(io())?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let mut relative_paths = Vec::new();

    for entry in archive.entries().map_err(io())? {
        let entry = entry.map_err(io())?;
        let entry_path = entry.path().map_err(io())?.into_owned();
        let display = entry_path.display().to_string();

        let relative = relative_to_root(&entry_path, root)
            .ok_or_else(|| invalid(format!("entry {display} is outside root directory {root}")))?;
        let header = entry.header();
        if header.entry_type() != EntryType::Regular {
            return Err(invalid(format!(
                "entry {display} is {:?}, not a regular file",
                header.entry_type()
            )));
        }
        if !has_canonical_owner(header) {
            return Err(invalid(format!("entry {display} has non-canonical ownership")));
        }
        if header.mtime().ok() != Some(u64::from(PINNED_MTIME)) {
            return Err(invalid(format!("entry {display} has a non-zero mtime")));
        }
        relative_paths.push(relative);
    }

    if relative_paths.is_empty() {
        return Err(invalid("archive has no entries".to_owned()));
    }

    let decoder = archive.into_inner();
    let container_mtime = decoder.header().map(flate2::GzHeader::mtime);
    if container_mtime != Some(PINNED_MTIME) {
        return Err(invalid(format!(
            "gzip header mtime is {container_mtime:?}, expected {PINNED_MTIME}"
        )));
    }

    Ok(relative_paths)
}

/// Strip `root/` from `path`, rejecting traversal and bare root entries.
fn relative_to_root(path: &Path, root: &str) -> Option<String> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == root => {}
        _ => return None,
    }
    let mut parts = Vec::new();
    for component in components {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            _ => return None,
        }
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}

fn has_canonical_owner(header: &tar::Header) -> bool {
    header.uid().ok() == Some(CANONICAL_ID)
        && header.gid().ok() == Some(CANONICAL_ID)
        && header.username().ok().flatten() == Some(CANONICAL_OWNER)
        && header.groupname().ok().flatten() == Some(CANONICAL_OWNER)
}
