//! Safety-checked enumeration of a module's files.
//!
//! Walks a module directory without following links and returns the
//! relative paths of its regular files in byte-wise sorted order. Any link
//! or special file aborts the walk so that nothing outside the module tree
//! can reach an archive.

use super::error::{LinkKind, PackagingError};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::fs;
use std::io;

/// Platform housekeeping files that are never packaged.
pub const IGNORED_FILE_NAMES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// Directory nesting beyond this depth is treated as an error.
const MAX_DIRECTORY_DEPTH: usize = 64;

/// Sorted relative paths of the regular files in one module.
///
/// Paths always use `/` as the separator and never contain directory
/// entries, so the same tree produces the same manifest on every platform.
///
/// # Examples
///
/// ```
/// use module_packager::archive::enumerate::enumerate_module_files;
/// use camino::Utf8Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// std::fs::create_dir(dir.path().join("prompts"))?;
/// std::fs::write(dir.path().join("prompts/system.md"), "hi")?;
/// std::fs::write(dir.path().join("module.yaml"), "name: demo")?;
///
/// let root = Utf8Path::from_path(dir.path()).ok_or("non-UTF-8 temp dir")?;
/// let manifest = enumerate_module_files(root)?;
/// assert_eq!(manifest.as_slice(), ["module.yaml", "prompts/system.md"]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ModuleFileManifest(Vec<String>);

impl ModuleFileManifest {
    /// Build a manifest from arbitrary paths, sorting them.
    #[must_use]
    pub fn from_paths(mut paths: Vec<String>) -> Self {
        paths.sort();
        Self(paths)
    }

    /// Return the paths in sorted order.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Iterate over the relative paths.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of files in the manifest.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the module has no packageable files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// List the regular files under `module_root`.
///
/// # Errors
///
/// Returns [`PackagingError::SymlinkRejected`] if the root or any entry
/// beneath it is a symbolic link, [`PackagingError::UnsupportedFileType`]
/// for FIFOs, sockets, and devices, [`PackagingError::NonUtf8Path`] for
/// file names that are not UTF-8, and [`PackagingError::Io`] when the tree
/// cannot be read. No partial manifest is returned.
pub fn enumerate_module_files(module_root: &Utf8Path) -> Result<ModuleFileManifest, PackagingError> {
    let metadata = fs::symlink_metadata(module_root).map_err(PackagingError::io(module_root))?;
    if metadata.file_type().is_symlink() {
        return Err(PackagingError::SymlinkRejected {
            path: module_root.to_path_buf(),
            link: LinkKind::Symbolic,
        });
    }
    if !metadata.is_dir() {
        return Err(PackagingError::Io {
            path: module_root.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotADirectory, "module root is not a directory"),
        });
    }

    let mut files = Vec::new();
    collect_files(module_root, None, MAX_DIRECTORY_DEPTH, &mut files)?;
    Ok(ModuleFileManifest::from_paths(files))
}

fn collect_files(
    dir: &Utf8Path,
    relative: Option<&str>,
    remaining_depth: usize,
    out: &mut Vec<String>,
) -> Result<(), PackagingError> {
    if remaining_depth == 0 {
        return Err(PackagingError::Io {
            path: dir.to_path_buf(),
            source: io::Error::other(format!(
                "directory nesting exceeds {MAX_DIRECTORY_DEPTH} levels"
            )),
        });
    }

    for entry in fs::read_dir(dir).map_err(PackagingError::io(dir))? {
        let entry = entry.map_err(PackagingError::io(dir))?;
        let raw_name = entry.file_name();
        let Some(name) = raw_name.to_str() else {
            return Err(PackagingError::NonUtf8Path { path: entry.path() });
        };
        let path = dir.join(name);
        // `DirEntry::file_type` does not traverse links.
        let file_type = entry.file_type().map_err(PackagingError::io(&path))?;
        let child = join_relative(relative, name);

        if file_type.is_symlink() {
            return Err(PackagingError::SymlinkRejected {
                path,
                link: LinkKind::Symbolic,
            });
        }
        if file_type.is_dir() {
            collect_files(&path, Some(&child), remaining_depth - 1, out)?;
        } else if file_type.is_file() {
            if !IGNORED_FILE_NAMES.contains(&name) {
                out.push(child);
            }
        } else {
            return Err(PackagingError::UnsupportedFileType { path });
        }
    }
    Ok(())
}

fn join_relative(parent: Option<&str>, name: &str) -> String {
    match parent {
        Some(parent) => format!("{parent}/{name}"),
        None => name.to_owned(),
    }
}

/// Resolve a manifest path back to its location under `module_root`.
#[must_use]
pub fn source_path(module_root: &Utf8Path, relative: &str) -> Utf8PathBuf {
    relative
        .split('/')
        .fold(module_root.to_path_buf(), |acc, part| acc.join(part))
}

#[cfg(test)]
#[expect(clippy::expect_used, reason = "tests fail fast on broken fixtures")]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn module_dir() -> TempDir {
        TempDir::new().expect("temp dir creation succeeds")
    }

    fn root(dir: &TempDir) -> &Utf8Path {
        Utf8Path::from_path(dir.path()).expect("temp dir is UTF-8")
    }

    fn write(dir: &TempDir, rel: &str) {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, rel.as_bytes()).expect("write");
    }

    #[rstest]
    fn lists_nested_files_sorted(module_dir: TempDir) {
        for rel in ["z.txt", "b/inner.md", "a.yaml", "b/deeper/x.json", "B.txt"] {
            write(&module_dir, rel);
        }

        let manifest = enumerate_module_files(root(&module_dir)).expect("enumerates");
        assert_eq!(
            manifest.as_slice(),
            ["B.txt", "a.yaml", "b/deeper/x.json", "b/inner.md", "z.txt"]
        );
    }

    #[rstest]
    fn skips_housekeeping_files(module_dir: TempDir) {
        write(&module_dir, "module.yaml");
        write(&module_dir, ".DS_Store");
        write(&module_dir, "nested/.DS_Store");
        write(&module_dir, "nested/Thumbs.db");

        let manifest = enumerate_module_files(root(&module_dir)).expect("enumerates");
        assert_eq!(manifest.as_slice(), ["module.yaml"]);
    }

    #[rstest]
    fn empty_directories_contribute_nothing(module_dir: TempDir) {
        write(&module_dir, "module.yaml");
        fs::create_dir_all(module_dir.path().join("empty/also_empty")).expect("mkdir");

        let manifest = enumerate_module_files(root(&module_dir)).expect("enumerates");
        assert_eq!(manifest.len(), 1);
    }

    #[cfg(unix)]
    #[rstest]
    fn rejects_symlinked_file(module_dir: TempDir) {
        write(&module_dir, "module.yaml");
        std::os::unix::fs::symlink("/etc/passwd", module_dir.path().join("passwd"))
            .expect("symlink");

        let err = enumerate_module_files(root(&module_dir)).expect_err("symlink rejected");
        assert!(matches!(
            err,
            PackagingError::SymlinkRejected { ref path, link: LinkKind::Symbolic }
                if path.file_name() == Some("passwd")
        ));
    }

    #[cfg(unix)]
    #[rstest]
    fn rejects_symlinked_directory(module_dir: TempDir) {
        write(&module_dir, "module.yaml");
        let outside = TempDir::new().expect("outside dir");
        fs::write(outside.path().join("secret"), b"x").expect("write");
        fs::create_dir_all(module_dir.path().join("sub")).expect("mkdir");
        std::os::unix::fs::symlink(outside.path(), module_dir.path().join("sub/escape"))
            .expect("symlink");

        let err = enumerate_module_files(root(&module_dir)).expect_err("symlink rejected");
        assert!(matches!(err, PackagingError::SymlinkRejected { .. }));
    }

    #[cfg(unix)]
    #[rstest]
    fn rejects_symlinked_root(module_dir: TempDir) {
        let link = module_dir.path().join("link");
        let target = module_dir.path().join("real");
        fs::create_dir(&target).expect("mkdir");
        std::os::unix::fs::symlink(&target, &link).expect("symlink");

        let link = Utf8Path::from_path(&link).expect("UTF-8");
        let err = enumerate_module_files(link).expect_err("root symlink rejected");
        assert!(matches!(err, PackagingError::SymlinkRejected { .. }));
    }

    #[rstest]
    fn missing_root_is_io_error(module_dir: TempDir) {
        let missing = root(&module_dir).join("does-not-exist");
        let err = enumerate_module_files(&missing).expect_err("missing root");
        assert!(matches!(err, PackagingError::Io { .. }));
    }

    #[test]
    fn source_path_splits_on_forward_slashes() {
        let path = source_path(Utf8Path::new("mods/demo"), "prompts/system.md");
        assert_eq!(path, Utf8Path::new("mods/demo").join("prompts").join("system.md"));
    }
}
