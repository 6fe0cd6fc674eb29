//! Archive naming policy for module distribution.
//!
//! Every module archive is named `<name>-<version>.tar.gz` and unpacks into
//! a single directory named after the module.

use crate::descriptor::{ModuleName, ModuleVersion};
use std::fmt;

/// The fixed file extension for module archives.
pub const ARCHIVE_EXTENSION: &str = ".tar.gz";

/// The canonical archive file name for one module release.
///
/// # Examples
///
/// ```
/// use module_packager::archive::naming::ArchiveName;
/// use module_packager::descriptor::{ModuleName, ModuleVersion};
///
/// let name = ArchiveName::new(
///     ModuleName::try_from("code-reviewer").expect("valid name"),
///     ModuleVersion::try_from("2.2.0").expect("valid version"),
/// );
/// assert_eq!(name.to_string(), "code-reviewer-2.2.0.tar.gz");
/// assert_eq!(name.root_dir(), "code-reviewer");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    module: ModuleName,
    version: ModuleVersion,
}

impl ArchiveName {
    /// Create an archive name from validated components.
    #[must_use]
    pub fn new(module: ModuleName, version: ModuleVersion) -> Self {
        Self { module, version }
    }

    /// Return the module name component.
    #[must_use]
    pub fn module(&self) -> &ModuleName {
        &self.module
    }

    /// Return the version component.
    #[must_use]
    pub fn version(&self) -> &ModuleVersion {
        &self.version
    }

    /// The single top-level directory inside the archive.
    #[must_use]
    pub fn root_dir(&self) -> &str {
        self.module.as_str()
    }

    /// Return the filename as a string without consuming the value.
    #[must_use]
    pub fn filename(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ArchiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}{ARCHIVE_EXTENSION}", self.module, self.version)
    }
}
