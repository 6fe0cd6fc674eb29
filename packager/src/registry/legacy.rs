//! Previous-schema registry loading.
//!
//! The v1 registry carries human-authored metadata (descriptions, authors,
//! tags) and the category table that module descriptors do not. Only those
//! fields are read; everything else in the document is ignored.
//!
//! Reading is lenient below the top level: numbers and booleans in text
//! fields are rendered as text, unusable values read as absent, and a module
//! record that is not an object is skipped with a warning.

use camino::{Utf8Path, Utf8PathBuf};
use log::warn;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use thiserror::Error;

/// Errors arising while loading the legacy registry.
#[derive(Debug, Error)]
pub enum LegacyRegistryError {
    /// The file could not be read.
    #[error("failed to read legacy registry {path}: {source}")]
    Read {
        /// Path of the registry file.
        path: Utf8PathBuf,
        /// The underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// The file is not JSON of the expected shape.
    #[error("legacy registry {path} is malformed: {source}")]
    Parse {
        /// Path of the registry file.
        path: Utf8PathBuf,
        /// The parser's diagnostic.
        #[source]
        source: serde_json::Error,
    },
}

/// Human-authored metadata recorded for one module in the legacy registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LegacyModule {
    /// Long-form description.
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    /// Author attribution.
    #[serde(default, deserialize_with = "lenient_text")]
    pub author: Option<String>,
    /// Search tags, published as keywords.
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: Option<Vec<String>>,
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(scalar_text(&Value::deserialize(deserializer)?))
}

/// A list keeps its scalar items; a lone string is a single tag.
fn lenient_tags<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<String>>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => Some(items.iter().filter_map(scalar_text).collect()),
        Value::String(tag) => Some(vec![tag]),
        _ => None,
    })
}

impl LegacyModule {
    /// The description, unless absent or empty.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        non_empty(self.description.as_deref())
    }

    /// The author, unless absent or empty.
    #[must_use]
    pub fn author(&self) -> Option<&str> {
        non_empty(self.author.as_deref())
    }

    /// The tags, or an empty slice.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        self.tags.as_deref().unwrap_or_default()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.is_empty())
}

/// The parts of a v1 registry document consulted by the build.
///
/// # Examples
///
/// ```
/// use module_packager::registry::legacy::LegacyRegistry;
///
/// let json = r#"{"modules": {"reviewer": {"author": "ziel"}}, "categories": {"dev": []}}"#;
/// let legacy = LegacyRegistry::from_json(json).expect("valid");
/// assert_eq!(legacy.module("reviewer").and_then(|m| m.author()), Some("ziel"));
/// assert!(legacy.module("missing").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LegacyRegistry {
    #[serde(default, deserialize_with = "lenient_modules")]
    modules: HashMap<String, LegacyModule>,
    #[serde(default = "empty_categories")]
    categories: Value,
}

fn lenient_modules<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<HashMap<String, LegacyModule>, D::Error> {
    let records = Option::<HashMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(records
        .into_iter()
        .filter_map(|(name, record)| match serde_json::from_value(record) {
            Ok(module) => Some((name, module)),
            Err(err) => {
                warn!("legacy registry: ignoring record for {name}: {err}");
                None
            }
        })
        .collect())
}

fn empty_categories() -> Value {
    Value::Object(serde_json::Map::new())
}

impl Default for LegacyRegistry {
    fn default() -> Self {
        Self {
            modules: HashMap::new(),
            categories: empty_categories(),
        }
    }
}

impl LegacyRegistry {
    /// Read and parse the registry at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LegacyRegistryError::Read`] if the file cannot be read and
    /// [`LegacyRegistryError::Parse`] if it is not a registry document.
    pub fn load(path: &Utf8Path) -> Result<Self, LegacyRegistryError> {
        let text = fs::read_to_string(path).map_err(|source| LegacyRegistryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| LegacyRegistryError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a registry document from text.
    ///
    /// # Errors
    ///
    /// Returns the parser's error if `text` is not a registry document.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The record for `name`, if the legacy registry has one.
    #[must_use]
    pub fn module(&self, name: &str) -> Option<&LegacyModule> {
        self.modules.get(name)
    }

    /// The category table, passed through verbatim.
    #[must_use]
    pub fn categories(&self) -> &Value {
        &self.categories
    }
}
