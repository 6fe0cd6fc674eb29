//! Error types for module enumeration and archive packaging.
//!
//! Every variant carries the offending path so that a failed build can name
//! exactly which file broke which rule.

use camino::Utf8PathBuf;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The kind of link that caused a file to be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// A symbolic link (file or directory).
    Symbolic,
    /// A second directory entry for an inode already packaged.
    Hard,
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symbolic => f.write_str("symbolic link"),
            Self::Hard => f.write_str("hard link"),
        }
    }
}

/// Errors arising while enumerating, archiving, or digesting a module.
#[derive(Debug, Error)]
pub enum PackagingError {
    /// A link was found under the module root.
    #[error("refusing to package {link}: {path}")]
    SymlinkRejected {
        /// Path of the link on disk.
        path: Utf8PathBuf,
        /// Whether the link is symbolic or hard.
        link: LinkKind,
    },

    /// A FIFO, socket, or device node was found under the module root.
    #[error("refusing to package non-regular file: {path}")]
    UnsupportedFileType {
        /// Path of the offending entry.
        path: Utf8PathBuf,
    },

    /// A file name under the module root is not valid UTF-8.
    #[error("file name is not valid UTF-8: {}", path.display())]
    NonUtf8Path {
        /// Lossy rendering is left to the caller; this is the raw path.
        path: PathBuf,
    },

    /// A read or write failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The file or directory being accessed.
        path: Utf8PathBuf,
        /// The underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// The written archive does not have the layout extractors depend on.
    #[error("archive {path} violates the single-root layout: {reason}")]
    InvalidLayout {
        /// Path of the archive that was inspected.
        path: Utf8PathBuf,
        /// Which layout rule was broken.
        reason: String,
    },
}

impl PackagingError {
    /// Return a closure that wraps an [`std::io::Error`] with `path`.
    ///
    /// Intended for `map_err` chains:
    /// `fs::File::open(path).map_err(PackagingError::io(path))?`.
    pub fn io(path: impl Into<Utf8PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symlink_message_names_link_kind_and_path() {
        let err = PackagingError::SymlinkRejected {
            path: Utf8PathBuf::from("mods/a/link"),
            link: LinkKind::Symbolic,
        };
        assert_eq!(
            err.to_string(),
            "refusing to package symbolic link: mods/a/link"
        );
    }

    #[test]
    fn io_helper_keeps_path() {
        let err = PackagingError::io("out/x.tar.gz")(std::io::Error::other("disk full"));
        assert!(matches!(&err, PackagingError::Io { path, .. } if path == "out/x.tar.gz"));
        assert!(err.to_string().contains("disk full"));
    }
}
