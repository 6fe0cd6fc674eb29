//! Registry entry assembly.
//!
//! [`assemble_entry`] is a pure function from this build's facts and the
//! module's legacy record (if any) to a v2 registry entry. Identity and
//! distribution fields always come from the build; `description`, `author`
//! and `keywords` prefer the legacy record and fall back to defaults.

use crate::archive::enumerate::ModuleFileManifest;
use crate::archive::packaging::ArchiveArtifact;
use crate::config::PublishParams;
use crate::descriptor::{ModuleMetadata, ModuleName, ModuleVersion};
use crate::registry::legacy::LegacyModule;
use crate::timestamp::BuildTimestamp;
use serde::Serialize;

/// `$schema` marker of each registry entry.
pub const ENTRY_SCHEMA_URL: &str = "https://cognitive-modules.dev/schema/registry-entry-v1.json";

/// Module specification version recorded in `identity.spec_version`.
pub const SPEC_VERSION: &str = "2.2";

/// Author recorded when the legacy registry names none.
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// One module's record in the registry index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryEntry {
    /// Schema marker.
    #[serde(rename = "$schema")]
    pub schema: &'static str,
    /// Who the module is.
    pub identity: Identity,
    /// Descriptive metadata.
    pub metadata: EntryMetadata,
    /// Runtime and module requirements.
    pub dependencies: Dependencies,
    /// Where to fetch the archive and how to verify it.
    pub distribution: Distribution,
    /// Publication times.
    pub timestamps: Timestamps,
}

impl RegistryEntry {
    /// The module name this entry is keyed by.
    #[must_use]
    pub fn name(&self) -> &ModuleName {
        &self.identity.name
    }
}

/// `identity` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Module name.
    pub name: ModuleName,
    /// Publishing namespace.
    pub namespace: String,
    /// Module version.
    pub version: ModuleVersion,
    /// Module specification version.
    pub spec_version: &'static str,
}

/// `metadata` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryMetadata {
    /// Human-readable description.
    pub description: String,
    /// Same text as `description`; kept for older clients.
    pub description_zh: String,
    /// Author attribution.
    pub author: String,
    /// Tier label from the descriptor.
    pub tier: String,
    /// SPDX license identifier.
    pub license: String,
    /// Repository URL.
    pub repository: String,
    /// Homepage URL.
    pub homepage: String,
    /// Search keywords.
    pub keywords: Vec<String>,
}

/// `dependencies` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependencies {
    /// Minimum runtime version.
    pub runtime_min: String,
    /// Required modules. Always empty; no resolver exists yet.
    pub modules: Vec<String>,
}

/// `distribution` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Distribution {
    /// Download URL of the archive.
    pub tarball: String,
    /// `sha256:<hex>` of the archive bytes.
    pub checksum: String,
    /// Archive length in bytes.
    pub size_bytes: u64,
    /// The module's source files, relative to the module directory.
    pub files: ModuleFileManifest,
}

/// `timestamps` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timestamps {
    /// First publication; this build's timestamp.
    pub created_at: BuildTimestamp,
    /// Last update; this build's timestamp.
    pub updated_at: BuildTimestamp,
    /// Always null for freshly built entries.
    pub deprecated_at: Option<BuildTimestamp>,
}

/// Everything this build learned about one module.
#[derive(Debug, Clone, Copy)]
pub struct BuildFacts<'a> {
    /// Descriptor fields.
    pub metadata: &'a ModuleMetadata,
    /// The packaged archive.
    pub artifact: &'a ArchiveArtifact,
    /// The module's source files.
    pub files: &'a ModuleFileManifest,
}

/// Form the release download URL for `file_name`.
///
/// # Examples
///
/// ```
/// use module_packager::registry::entry::tarball_url;
///
/// assert_eq!(
///     tarball_url("https://github.com/Cognary/cognitive/", "v2.2.7", "a-1.0.0.tar.gz"),
///     "https://github.com/Cognary/cognitive/releases/download/v2.2.7/a-1.0.0.tar.gz"
/// );
/// ```
#[must_use]
pub fn tarball_url(repository: &str, tag: &str, file_name: &str) -> String {
    format!(
        "{}/releases/download/{tag}/{file_name}",
        repository.trim_end_matches('/')
    )
}

/// Merge build facts with the legacy record into a registry entry.
#[must_use]
pub fn assemble_entry(
    facts: BuildFacts<'_>,
    legacy: Option<&LegacyModule>,
    publish: &PublishParams,
) -> RegistryEntry {
    let meta = facts.metadata;
    let description = legacy
        .and_then(LegacyModule::description)
        .unwrap_or(&meta.responsibility)
        .to_owned();
    let author = legacy
        .and_then(LegacyModule::author)
        .unwrap_or(UNKNOWN_AUTHOR)
        .to_owned();
    let keywords = legacy.map(LegacyModule::tags).unwrap_or_default().to_vec();

    RegistryEntry {
        schema: ENTRY_SCHEMA_URL,
        identity: Identity {
            name: meta.name.clone(),
            namespace: publish.namespace.clone(),
            version: meta.version.clone(),
            spec_version: SPEC_VERSION,
        },
        metadata: EntryMetadata {
            description_zh: description.clone(),
            description,
            author,
            tier: meta.tier.clone(),
            license: publish.license.clone(),
            repository: publish.repository.clone(),
            homepage: publish.homepage.clone(),
            keywords,
        },
        dependencies: Dependencies {
            runtime_min: publish.runtime_min.clone(),
            modules: Vec::new(),
        },
        distribution: Distribution {
            tarball: tarball_url(
                &publish.repository,
                &publish.release_tag,
                facts.artifact.file_name(),
            ),
            checksum: facts.artifact.sha256.checksum(),
            size_bytes: facts.artifact.size_bytes,
            files: facts.files.clone(),
        },
        timestamps: Timestamps {
            created_at: publish.timestamp,
            updated_at: publish.timestamp,
            deprecated_at: None,
        },
    }
}

#[cfg(test)]
#[expect(clippy::expect_used, reason = "tests fail fast on broken fixtures")]
#[path = "entry_tests.rs"]
mod tests;
