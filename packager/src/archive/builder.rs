//! Deterministic `.tar.gz` construction.
//!
//! Identical module trees produce byte-identical archives:
//!
//! - entries are appended in manifest order, never directory order;
//! - ownership is `0:0` (`root:root`) and every mtime, including the gzip
//!   header's, is the Unix epoch;
//! - permissions collapse to `0o755` or `0o644`;
//! - paths that do not fit a ustar header travel in a PAX `path` record.
//!
//! The archive is written to a temporary file beside its destination and
//! renamed into place only once complete.

use super::enumerate::{ModuleFileManifest, source_path};
use super::error::{LinkKind, PackagingError};
use super::naming::ArchiveName;
use camino::{Utf8Path, Utf8PathBuf};
use flate2::{Compression, GzBuilder};
use std::collections::HashSet;
use std::fs;
use std::io::{self, BufWriter, Read, Write};
use tar::{EntryType, Header};

/// Canonical owner recorded for every entry.
pub const CANONICAL_OWNER: &str = "root";

/// Canonical numeric user and group id.
pub const CANONICAL_ID: u64 = 0;

/// Timestamp recorded for every entry and for the gzip container.
pub const PINNED_MTIME: u32 = 0;

/// Gzip OS byte meaning "unknown", so the host OS does not leak in.
const GZIP_OS_UNKNOWN: u8 = 255;

/// Longest path the ustar `name` field holds without a prefix split.
const USTAR_NAME_LEN: usize = 100;

const MODE_EXECUTABLE: u32 = 0o755;
const MODE_REGULAR: u32 = 0o644;

/// Inputs for [`build_archive`].
#[derive(Debug, Clone, Copy)]
pub struct ArchiveRequest<'a> {
    /// Directory holding the module's files.
    pub module_root: &'a Utf8Path,
    /// Directory that receives the archive; created if missing.
    pub out_dir: &'a Utf8Path,
    /// Canonical archive name, which also fixes the root directory.
    pub name: &'a ArchiveName,
    /// Files to include, already sorted.
    pub files: &'a ModuleFileManifest,
}

/// Write the module's files into `<out_dir>/<name>` and return that path.
///
/// # Errors
///
/// Returns [`PackagingError::SymlinkRejected`] if a manifest entry is a
/// symbolic link or repeats an inode already archived,
/// [`PackagingError::UnsupportedFileType`] for anything that is not a
/// regular file, and [`PackagingError::Io`] when a source file is missing or
/// the output cannot be written. On error no file exists at the
/// destination path unless one was already there from an earlier run.
pub fn build_archive(request: &ArchiveRequest<'_>) -> Result<Utf8PathBuf, PackagingError> {
    let out_dir = request.out_dir;
    fs::create_dir_all(out_dir).map_err(PackagingError::io(out_dir))?;
    let archive_path = out_dir.join(request.name.filename());

    let partial = tempfile::Builder::new()
        .prefix(&format!(".{}.", request.name))
        .suffix(".partial")
        .tempfile_in(out_dir)
        .map_err(PackagingError::io(out_dir))?;
    let (file, temp_path) = partial.into_parts();

    let writer = write_tarball(BufWriter::new(file), request, &archive_path)?;
    let file = writer
        .into_inner()
        .map_err(|e| PackagingError::io(&archive_path)(e.into_error()))?;
    file.sync_all().map_err(PackagingError::io(&archive_path))?;
    drop(file);

    temp_path
        .persist(&archive_path)
        .map_err(|e| PackagingError::io(&archive_path)(e.error))?;
    set_published_permissions(&archive_path)?;
    Ok(archive_path)
}

#[cfg(unix)]
fn set_published_permissions(path: &Utf8Path) -> Result<(), PackagingError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(MODE_REGULAR))
        .map_err(PackagingError::io(path))
}

#[cfg(not(unix))]
fn set_published_permissions(_path: &Utf8Path) -> Result<(), PackagingError> {
    Ok(())
}

/// Stream the gzip-compressed tarball into `writer` and hand it back.
fn write_tarball<W: Write>(
    writer: W,
    request: &ArchiveRequest<'_>,
    archive_path: &Utf8Path,
) -> Result<W, PackagingError> {
    let encoder = GzBuilder::new()
        .mtime(PINNED_MTIME)
        .operating_system(GZIP_OS_UNKNOWN)
        .write(writer, Compression::best());
    let mut tarball = tar::Builder::new(encoder);
    let mut seen = SeenInodes::default();

    for relative in request.files.iter() {
        append_module_file(&mut tarball, request, relative, &mut seen)?;
    }

    let encoder = tarball
        .into_inner()
        .map_err(PackagingError::io(archive_path))?;
    let mut writer = encoder.finish().map_err(PackagingError::io(archive_path))?;
    writer.flush().map_err(PackagingError::io(archive_path))?;
    Ok(writer)
}

fn append_module_file<W: Write>(
    tarball: &mut tar::Builder<W>,
    request: &ArchiveRequest<'_>,
    relative: &str,
    seen: &mut SeenInodes,
) -> Result<(), PackagingError> {
    let source = source_path(request.module_root, relative);
    let metadata = fs::symlink_metadata(&source).map_err(PackagingError::io(&source))?;
    let file_type = metadata.file_type();
    if file_type.is_symlink() {
        return Err(PackagingError::SymlinkRejected {
            path: source,
            link: LinkKind::Symbolic,
        });
    }
    if !file_type.is_file() {
        return Err(PackagingError::UnsupportedFileType { path: source });
    }
    if !seen.insert(&metadata) {
        return Err(PackagingError::SymlinkRejected {
            path: source,
            link: LinkKind::Hard,
        });
    }

    let file = fs::File::open(&source).map_err(PackagingError::io(&source))?;
    let size = file.metadata().map_err(PackagingError::io(&source))?.len();
    let entry_path = format!("{}/{relative}", request.name.root_dir());

    let mut header = canonical_header(size, normalized_mode(&metadata))
        .map_err(PackagingError::io(&source))?;
    if needs_pax_path(&entry_path) {
        tarball
            .append_pax_extensions([("path", entry_path.as_bytes())])
            .map_err(PackagingError::io(&source))?;
        header
            .set_path(ustar_fallback_name(&entry_path))
            .map_err(PackagingError::io(&source))?;
    } else {
        header
            .set_path(&entry_path)
            .map_err(PackagingError::io(&source))?;
    }
    header.set_cksum();

    // `take` keeps the entry body consistent with the recorded size even if
    // the file grows while it is being read.
    tarball
        .append(&header, file.take(size))
        .map_err(PackagingError::io(&source))
}

/// A ustar header with every owner and time field pinned.
fn canonical_header(size: u64, mode: u32) -> io::Result<Header> {
    let mut header = Header::new_ustar();
    header.set_entry_type(EntryType::Regular);
    header.set_size(size);
    header.set_mode(mode);
    header.set_uid(CANONICAL_ID);
    header.set_gid(CANONICAL_ID);
    header.set_mtime(u64::from(PINNED_MTIME));
    header.set_username(CANONICAL_OWNER)?;
    header.set_groupname(CANONICAL_OWNER)?;
    Ok(header)
}

/// Non-ASCII or overlong paths are carried in a PAX extended header.
fn needs_pax_path(entry_path: &str) -> bool {
    !entry_path.is_ascii() || entry_path.len() > USTAR_NAME_LEN
}

/// The ustar `name` written beside a PAX `path` record: ASCII, truncated.
fn ustar_fallback_name(entry_path: &str) -> String {
    entry_path
        .chars()
        .map(|c| if c.is_ascii() { c } else { '_' })
        .take(USTAR_NAME_LEN)
        .collect::<String>()
        .trim_end_matches('/')
        .to_owned()
}

#[cfg(unix)]
fn normalized_mode(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    if metadata.permissions().mode() & 0o111 == 0 {
        MODE_REGULAR
    } else {
        MODE_EXECUTABLE
    }
}

#[cfg(not(unix))]
fn normalized_mode(_metadata: &fs::Metadata) -> u32 {
    MODE_REGULAR
}

/// Inodes already written to the current archive.
#[derive(Default)]
struct SeenInodes(HashSet<(u64, u64)>);

impl SeenInodes {
    /// Record the file's inode; `false` if it was already archived.
    #[cfg(unix)]
    fn insert(&mut self, metadata: &fs::Metadata) -> bool {
        use std::os::unix::fs::MetadataExt;
        metadata.nlink() <= 1 || self.0.insert((metadata.dev(), metadata.ino()))
    }

    #[cfg(not(unix))]
    fn insert(&mut self, _metadata: &fs::Metadata) -> bool {
        let _ = &self.0;
        true
    }
}

#[cfg(test)]
#[expect(clippy::expect_used, reason = "tests fail fast on broken fixtures")]
#[path = "builder_tests.rs"]
mod tests;
