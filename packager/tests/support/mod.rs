//! Test support utilities for packager behavioural tests.
//!
//! [`ModuleTree`] lays out a throwaway repository with a modules directory
//! and produces a [`BuildConfig`] pointing into it.

use camino::{Utf8Path, Utf8PathBuf};
use module_packager::config::{BuildConfig, PublishParams};
use module_packager::timestamp::BuildTimestamp;
use std::collections::BTreeSet;
use std::fs;
use tempfile::TempDir;

/// Fixed build timestamp used by every scenario.
pub const BUILD_TIMESTAMP: &str = "2026-02-11T00:00:00Z";

/// A temporary repository holding modules under `modules/`.
pub struct ModuleTree {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Default for ModuleTree {
    fn default() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("UTF-8 temp dir");
        fs::create_dir_all(root.join("modules")).expect("mkdir modules");
        Self { _dir: dir, root }
    }
}

impl ModuleTree {
    /// The repository root.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Create a module with a complete descriptor and one prompt file.
    pub fn add_module(&self, name: &str, version: &str, responsibility: &str) {
        self.write(
            &format!("modules/{name}/module.yaml"),
            &format!(
                "name: {name}\nversion: \"{version}\"\ntier: exec\nresponsibility: \"{responsibility}\"\n"
            ),
        );
        self.write(&format!("modules/{name}/prompt.md"), &format!("You are {name}."));
    }

    /// Write `contents` to `relative` under the root, creating parents.
    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir parents");
        }
        fs::write(&path, contents).expect("write file");
    }

    /// Configuration building every module into `dist/` and `registry.json`.
    pub fn config(&self) -> BuildConfig {
        BuildConfig {
            modules_dir: self.root.join("modules"),
            legacy_registry: None,
            out_dir: self.root.join("dist"),
            registry_out: self.root.join("registry.json"),
            only: BTreeSet::new(),
            publish: PublishParams {
                release_tag: "v2.2.7".to_owned(),
                namespace: "official".to_owned(),
                runtime_min: "2.2.0".to_owned(),
                repository: "https://github.com/Cognary/cognitive".to_owned(),
                homepage: "https://cognary.github.io/cognitive/".to_owned(),
                license: "MIT".to_owned(),
                timestamp: BuildTimestamp::parse(BUILD_TIMESTAMP).expect("valid timestamp"),
            },
        }
    }
}
