//! Module descriptor reading.
//!
//! Each module directory carries a `module.yaml` file. Only four top-level
//! keys matter to packaging (`name`, `version`, `tier`, `responsibility`);
//! everything else in the document is ignored. The file is parsed with a
//! real YAML parser and the four keys are validated afterwards, so quoting
//! and comments follow ordinary YAML rules.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use serde_yaml::Value;
use std::fmt;
use std::fs;
use thiserror::Error;

/// File name of the descriptor inside every module directory.
pub const DESCRIPTOR_FILE_NAME: &str = "module.yaml";

/// Descriptor keys that must be present, in reporting order.
pub const REQUIRED_KEYS: [&str; 4] = ["name", "version", "tier", "responsibility"];

/// A name or version that cannot safely become part of a file path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} \"{value}\": {reason}")]
pub struct InvalidComponent {
    /// Which component was rejected (`module name` or `module version`).
    pub kind: &'static str,
    /// The rejected value.
    pub value: String,
    /// The rule it broke.
    pub reason: &'static str,
}

/// Errors arising while reading a module descriptor.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The descriptor file could not be read.
    #[error("failed to read module descriptor {path}: {source}")]
    Read {
        /// Path of the descriptor.
        path: Utf8PathBuf,
        /// The underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// The descriptor is not well-formed YAML.
    #[error("module descriptor {path} is not valid YAML: {source}")]
    Parse {
        /// Path of the descriptor.
        path: Utf8PathBuf,
        /// The parser's diagnostic.
        #[source]
        source: serde_yaml::Error,
    },

    /// The document's top level is a list or scalar instead of a mapping.
    #[error("module descriptor {path} must be a mapping of keys to values")]
    NotAMapping {
        /// Path of the descriptor.
        path: Utf8PathBuf,
    },

    /// One or more required keys are absent or empty.
    #[error("module descriptor {path} is missing required keys: {}", missing.join(", "))]
    MetadataIncomplete {
        /// Path of the descriptor.
        path: Utf8PathBuf,
        /// Every missing key, in [`REQUIRED_KEYS`] order.
        missing: Vec<&'static str>,
    },

    /// A required key holds a list or mapping instead of a scalar.
    #[error("module descriptor {path}: key \"{key}\" must be a scalar value")]
    NonScalarField {
        /// Path of the descriptor.
        path: Utf8PathBuf,
        /// The offending key.
        key: &'static str,
    },

    /// The name or version cannot be used as a path component.
    #[error("module descriptor {path}: {source}")]
    InvalidField {
        /// Path of the descriptor.
        path: Utf8PathBuf,
        /// What was wrong with the value.
        #[source]
        source: InvalidComponent,
    },
}

macro_rules! path_component_newtype {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(String);

        impl $name {
            /// Return the value as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<&str> for $name {
            type Error = InvalidComponent;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                validate_component($kind, value)?;
                Ok(Self(value.to_owned()))
            }
        }

        impl TryFrom<String> for $name {
            type Error = InvalidComponent;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                validate_component($kind, &value)?;
                Ok(Self(value))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0)
            }
        }
    };
}

path_component_newtype!(
    /// A module name, usable as both a file name and an archive root.
    ///
    /// # Examples
    ///
    /// ```
    /// use module_packager::descriptor::ModuleName;
    ///
    /// let name = ModuleName::try_from("code-reviewer").expect("valid name");
    /// assert_eq!(name.as_str(), "code-reviewer");
    /// assert!(ModuleName::try_from("../escape").is_err());
    /// ```
    ModuleName,
    "module name"
);

path_component_newtype!(
    /// A module version string, embedded in the archive file name.
    ModuleVersion,
    "module version"
);

fn validate_component(kind: &'static str, value: &str) -> Result<(), InvalidComponent> {
    let reject = |reason| InvalidComponent {
        kind,
        value: value.to_owned(),
        reason,
    };
    if value.trim().is_empty() {
        return Err(reject("must not be blank"));
    }
    if value == "." || value == ".." {
        return Err(reject("must not be a relative directory reference"));
    }
    if value.contains(['/', '\\']) {
        return Err(reject("must not contain path separators"));
    }
    if value.chars().any(char::is_control) {
        return Err(reject("must not contain control characters"));
    }
    Ok(())
}

/// The four descriptor fields the packager relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleMetadata {
    /// Registry key, archive root directory, and archive name prefix.
    pub name: ModuleName,
    /// Published version.
    pub version: ModuleVersion,
    /// Free-form tier label, passed through to the registry.
    pub tier: String,
    /// One-line statement of what the module does.
    pub responsibility: String,
}

/// Read and validate the descriptor at `path`.
///
/// # Errors
///
/// Returns [`DescriptorError::Read`] if the file cannot be read, and any
/// error produced by [`parse_descriptor`].
pub fn read_descriptor(path: &Utf8Path) -> Result<ModuleMetadata, DescriptorError> {
    let text = fs::read_to_string(path).map_err(|source| DescriptorError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_descriptor(&text, path)
}

/// Parse descriptor text; `origin` is used only in error messages.
///
/// Unquoted scalars keep their source text, so `version: 1.10` yields
/// `"1.10"` and `tier: 01` yields `"01"`. A key that is absent, null, or
/// blank counts as missing.
///
/// # Errors
///
/// Returns [`DescriptorError::MetadataIncomplete`] listing every missing
/// key, [`DescriptorError::Parse`] / [`DescriptorError::NotAMapping`] for
/// malformed documents, and [`DescriptorError::NonScalarField`] /
/// [`DescriptorError::InvalidField`] for unusable values.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use module_packager::descriptor::parse_descriptor;
///
/// let text = "name: reviewer\nversion: 1.10\ntier: decision\nresponsibility: Review code\n";
/// let meta = parse_descriptor(text, Utf8Path::new("reviewer/module.yaml")).expect("valid");
/// assert_eq!(meta.version.as_str(), "1.10");
/// ```
pub fn parse_descriptor(text: &str, origin: &Utf8Path) -> Result<ModuleMetadata, DescriptorError> {
    let parse_err = |source| DescriptorError::Parse {
        path: origin.to_path_buf(),
        source,
    };
    let document: Value = serde_yaml::from_str(text).map_err(parse_err)?;
    let raw = match &document {
        // An empty file parses as null; report it as missing every key.
        Value::Null => RawDescriptor::default(),
        Value::Mapping(_) => {
            check_scalars(&document, origin)?;
            serde_yaml::from_str(text).map_err(parse_err)?
        }
        _ => {
            return Err(DescriptorError::NotAMapping {
                path: origin.to_path_buf(),
            });
        }
    };

    let found = [raw.name, raw.version, raw.tier, raw.responsibility]
        .map(|value| value.filter(|text| !text.trim().is_empty()));
    let missing: Vec<&'static str> = found
        .iter()
        .zip(REQUIRED_KEYS)
        .filter_map(|(value, key)| value.is_none().then_some(key))
        .collect();
    let [Some(name), Some(version), Some(tier), Some(responsibility)] = found else {
        return Err(DescriptorError::MetadataIncomplete {
            path: origin.to_path_buf(),
            missing,
        });
    };

    let invalid = |source| DescriptorError::InvalidField {
        path: origin.to_path_buf(),
        source,
    };
    Ok(ModuleMetadata {
        name: ModuleName::try_from(name).map_err(invalid)?,
        version: ModuleVersion::try_from(version).map_err(invalid)?,
        tier,
        responsibility,
    })
}

/// The required keys as written in the file.
///
/// Deserializing a plain scalar into `String` yields its source text, where
/// going through [`Value`] would reformat numbers (`1.10` to `1.1`).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDescriptor {
    name: Option<String>,
    version: Option<String>,
    tier: Option<String>,
    responsibility: Option<String>,
}

/// Reject lists and mappings under any required key.
fn check_scalars(document: &Value, origin: &Utf8Path) -> Result<(), DescriptorError> {
    match REQUIRED_KEYS
        .into_iter()
        .find(|key| document.get(key).is_some_and(is_collection))
    {
        Some(key) => Err(DescriptorError::NonScalarField {
            path: origin.to_path_buf(),
            key,
        }),
        None => Ok(()),
    }
}

fn is_collection(value: &Value) -> bool {
    match value {
        Value::Sequence(_) | Value::Mapping(_) => true,
        Value::Tagged(tagged) => is_collection(&tagged.value),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => false,
    }
}
