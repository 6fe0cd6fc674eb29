//! Behaviour-driven tests for registry index generation.
//!
//! These scenarios build a throwaway modules tree and inspect the written
//! index as JSON. Tests use the rstest-bdd v0.5.0 mutable world pattern.

#![expect(clippy::expect_used, reason = "tests fail fast on broken fixtures")]

mod support;

use module_packager::error::BuildError;
use module_packager::pipeline::build_registry;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::Value;
use std::fs;
use support::{BUILD_TIMESTAMP, ModuleTree};

const ENTRY_BLOCKS: [(&str, &[&str]); 5] = [
    ("identity", &["name", "namespace", "version", "spec_version"]),
    (
        "metadata",
        &[
            "description",
            "description_zh",
            "author",
            "tier",
            "license",
            "repository",
            "homepage",
            "keywords",
        ],
    ),
    ("dependencies", &["runtime_min", "modules"]),
    ("distribution", &["tarball", "checksum", "size_bytes", "files"]),
    ("timestamps", &["created_at", "updated_at", "deprecated_at"]),
];

// ---------------------------------------------------------------------------
// World types
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RegistryWorld {
    tree: ModuleTree,
    legacy_registry: bool,
    error: Option<BuildError>,
}

#[fixture]
fn world() -> RegistryWorld {
    RegistryWorld::default()
}

fn run_build(world: &mut RegistryWorld, only: &[&str]) {
    let mut config = world.tree.config();
    if world.legacy_registry {
        config.legacy_registry = Some(world.tree.root().join("v1.json"));
    }
    config.only = only.iter().map(|name| (*name).to_owned()).collect();
    world.error = build_registry(&config).err();
}

fn read_index(world: &RegistryWorld) -> Value {
    if let Some(err) = &world.error {
        panic!("build failed: {err}");
    }
    let bytes = fs::read(world.tree.config().registry_out).expect("read index");
    serde_json::from_slice(&bytes).expect("parse index")
}

fn entry(world: &RegistryWorld, name: &str) -> Value {
    let index = read_index(world);
    index["modules"]
        .get(name)
        .cloned()
        .unwrap_or_else(|| panic!("no entry for {name}"))
}

// ---------------------------------------------------------------------------
// Step definitions
// ---------------------------------------------------------------------------

#[given("a module \"{name}\" at version \"{version}\" responsible for \"{responsibility}\"")]
fn given_module(world: &mut RegistryWorld, name: String, version: String, responsibility: String) {
    world.tree.add_module(&name, &version, &responsibility);
}

#[given(
    "the legacy registry describes \"{name}\" as \"{description}\" by \"{author}\" tagged \"{tag}\""
)]
fn given_legacy_record(
    world: &mut RegistryWorld,
    name: String,
    description: String,
    author: String,
    tag: String,
) {
    let document = serde_json::json!({
        "modules": {
            name.as_str(): {"description": description, "author": author, "tags": [tag]}
        },
        "categories": {"review": {"modules": [name]}}
    });
    world.tree.write("v1.json", &document.to_string());
    world.legacy_registry = true;
}

#[given("an empty legacy registry")]
fn given_empty_legacy(world: &mut RegistryWorld) {
    world.tree.write("v1.json", r#"{"modules": {}}"#);
    world.legacy_registry = true;
}

#[when("the registry is built")]
fn when_built(world: &mut RegistryWorld) {
    run_build(world, &[]);
}

#[when("the registry is built for only \"{name}\"")]
fn when_built_only(world: &mut RegistryWorld, name: String) {
    run_build(world, &[name.as_str()]);
}

#[then("the entry \"{name}\" has description \"{description}\" and author \"{author}\"")]
fn then_description_and_author(
    world: &mut RegistryWorld,
    name: String,
    description: String,
    author: String,
) {
    let metadata = &entry(world, &name)["metadata"];
    assert_eq!(metadata["description"], description.as_str());
    assert_eq!(metadata["description_zh"], description.as_str());
    assert_eq!(metadata["author"], author.as_str());
}

#[then("the entry \"{name}\" has keywords \"{keyword}\"")]
fn then_keywords(world: &mut RegistryWorld, name: String, keyword: String) {
    assert_eq!(
        entry(world, &name)["metadata"]["keywords"],
        serde_json::json!([keyword])
    );
}

#[then("the entry \"{name}\" has no keywords")]
fn then_no_keywords(world: &mut RegistryWorld, name: String) {
    assert_eq!(
        entry(world, &name)["metadata"]["keywords"],
        serde_json::json!([])
    );
}

#[then("the index contains exactly the modules \"{listing}\"")]
fn then_modules(world: &mut RegistryWorld, listing: String) {
    let index = read_index(world);
    let expected: Vec<&str> = listing.split(", ").collect();
    let names: Vec<&str> = index["modules"]
        .as_object()
        .expect("modules object")
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(names, expected);
    assert_eq!(index["featured"], serde_json::json!(expected));
}

#[then("no archive named \"{file_name}\" exists")]
fn then_no_archive(world: &mut RegistryWorld, file_name: String) {
    assert!(!world.tree.config().out_dir.join(file_name).exists());
}

#[then("every entry has all required fields")]
fn then_schema_complete(world: &mut RegistryWorld) {
    let index = read_index(world);
    for (name, entry) in index["modules"].as_object().expect("modules object") {
        assert!(entry.get("$schema").is_some(), "{name}: missing $schema");
        for (block, fields) in ENTRY_BLOCKS {
            let section = entry
                .get(block)
                .unwrap_or_else(|| panic!("{name}: missing {block}"));
            for field in fields {
                assert!(
                    section.get(*field).is_some(),
                    "{name}: missing {block}.{field}"
                );
            }
        }
        assert_eq!(entry["timestamps"]["created_at"], BUILD_TIMESTAMP);
        assert!(entry["timestamps"]["deprecated_at"].is_null());
    }
}

#[then("the index statistics count {count} modules")]
fn then_stats(world: &mut RegistryWorld, count: usize) {
    let index = read_index(world);
    assert_eq!(index["stats"]["total_modules"], count);
    assert_eq!(index["stats"]["total_downloads"], 0);
    assert_eq!(index["stats"]["last_updated"], BUILD_TIMESTAMP);
    assert_eq!(index["updated"], BUILD_TIMESTAMP);
}

#[then("the index file contains only ASCII bytes")]
fn then_ascii(world: &mut RegistryWorld) {
    assert!(world.error.is_none(), "build failed");
    let bytes = fs::read(world.tree.config().registry_out).expect("read index");
    assert!(bytes.is_ascii(), "index must be ASCII-only");
    assert_eq!(bytes.last(), Some(&b'\n'));
}

// ---------------------------------------------------------------------------
// Scenario bindings
// ---------------------------------------------------------------------------

#[scenario(
    path = "tests/features/registry.feature",
    name = "Legacy metadata takes precedence"
)]
fn scenario_legacy_precedence(world: RegistryWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/registry.feature",
    name = "Missing legacy record falls back to descriptor data"
)]
fn scenario_legacy_fallback(world: RegistryWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/registry.feature",
    name = "Only the requested module is built"
)]
fn scenario_only_filter(world: RegistryWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/registry.feature",
    name = "Every entry carries the complete schema"
)]
fn scenario_schema_complete(world: RegistryWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/registry.feature",
    name = "Non-ASCII metadata is escaped in the index file"
)]
fn scenario_ascii_safety(world: RegistryWorld) {
    let _ = world;
}
