//! Registry build orchestration.
//!
//! The build runs in two passes. The planning pass reads every descriptor,
//! applies the `only` filter, rejects duplicate names, and enumerates each
//! selected module so that unsafe trees fail the run before any archive is
//! written. The build pass then packages the modules one at a time in
//! discovery order and assembles their entries. The index is written last,
//! and only if every module succeeded.

use crate::archive::enumerate::enumerate_module_files;
use crate::archive::packaging::{PackageParams, package_module};
use crate::config::BuildConfig;
use crate::descriptor::{ModuleMetadata, ModuleName, read_descriptor};
use crate::discovery::discover_modules;
use crate::error::{BuildError, Result};
use crate::registry::entry::{BuildFacts, RegistryEntry, assemble_entry};
use crate::registry::index::{RegistryIndex, write_index};
use crate::registry::legacy::LegacyRegistry;
use camino::Utf8PathBuf;
use log::{debug, info, warn};
use std::collections::HashMap;

/// What a successful build produced.
#[derive(Debug, Clone)]
pub struct BuildSummary {
    /// Where the index was written.
    pub registry_path: Utf8PathBuf,
    /// Where the archives were written.
    pub out_dir: Utf8PathBuf,
    /// The index as written.
    pub index: RegistryIndex,
}

/// A module selected for this build.
#[derive(Debug)]
struct PlannedModule {
    root: Utf8PathBuf,
    metadata: ModuleMetadata,
}

/// Build every selected module and write the registry index.
///
/// # Errors
///
/// Returns the first [`BuildError`] encountered. The index is not written
/// when any module fails.
pub fn build_registry(config: &BuildConfig) -> Result<BuildSummary> {
    let legacy = load_legacy(config)?;
    let planned = plan_modules(config)?;

    let mut entries = Vec::with_capacity(planned.len());
    for module in &planned {
        entries.push(build_module(module, config, &legacy)?);
    }

    let index = RegistryIndex::new(
        entries,
        legacy.categories().clone(),
        config.publish.timestamp,
    );
    write_index(&index, &config.registry_out)?;
    info!(
        "wrote registry index with {} module(s) to {}",
        index.stats().total_modules,
        config.registry_out
    );

    Ok(BuildSummary {
        registry_path: config.registry_out.clone(),
        out_dir: config.out_dir.clone(),
        index,
    })
}

fn load_legacy(config: &BuildConfig) -> Result<LegacyRegistry> {
    match &config.legacy_registry {
        Some(path) => {
            debug!("loading legacy registry {path}");
            Ok(LegacyRegistry::load(path)?)
        }
        None => Ok(LegacyRegistry::default()),
    }
}

fn plan_modules(config: &BuildConfig) -> Result<Vec<PlannedModule>> {
    let mut planned = Vec::new();
    let mut seen: HashMap<ModuleName, Utf8PathBuf> = HashMap::new();

    for discovered in discover_modules(&config.modules_dir)? {
        let metadata = read_descriptor(&discovered.descriptor)?;
        if !is_selected(config, &metadata.name) {
            debug!("skipping {}: not selected", metadata.name);
            continue;
        }
        if let Some(first) = seen.insert(metadata.name.clone(), discovered.descriptor.clone()) {
            return Err(BuildError::DuplicateModule {
                name: metadata.name,
                first,
                second: discovered.descriptor,
            });
        }
        // Rejects unsafe trees before any archive exists. The manifest is
        // dropped: `package_module` walks the tree again at build time and
        // packages what it finds then.
        enumerate_module_files(&discovered.root).map_err(BuildError::module(&metadata.name))?;
        planned.push(PlannedModule {
            root: discovered.root,
            metadata,
        });
    }

    warn_unmatched(config, &seen);
    Ok(planned)
}

fn is_selected(config: &BuildConfig, name: &ModuleName) -> bool {
    config.only.is_empty() || config.only.contains(name.as_str())
}

fn warn_unmatched(config: &BuildConfig, seen: &HashMap<ModuleName, Utf8PathBuf>) {
    let found: Vec<&str> = seen.keys().map(ModuleName::as_str).collect();
    for requested in &config.only {
        if !found.contains(&requested.as_str()) {
            warn!("--only {requested}: no module with that name");
        }
    }
}

fn build_module(
    module: &PlannedModule,
    config: &BuildConfig,
    legacy: &LegacyRegistry,
) -> Result<RegistryEntry> {
    let name = &module.metadata.name;
    let packaged = package_module(PackageParams {
        module_root: &module.root,
        out_dir: &config.out_dir,
        metadata: &module.metadata,
    })
    .map_err(BuildError::module(name))?;
    info!(
        "packaged {} ({} files, {} bytes)",
        packaged.name,
        packaged.files.len(),
        packaged.artifact.size_bytes
    );

    Ok(assemble_entry(
        BuildFacts {
            metadata: &module.metadata,
            artifact: &packaged.artifact,
            files: &packaged.files,
        },
        legacy.module(name.as_str()),
        &config.publish,
    ))
}

#[cfg(test)]
#[expect(clippy::expect_used, reason = "tests fail fast on broken fixtures")]
#[path = "pipeline_tests.rs"]
mod tests;
