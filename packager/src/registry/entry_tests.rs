//! Unit tests for registry entry assembly.

use super::*;
use crate::archive::digest::Sha256Digest;
use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

struct Facts {
    metadata: ModuleMetadata,
    artifact: ArchiveArtifact,
    files: ModuleFileManifest,
}

impl Facts {
    fn view(&self) -> BuildFacts<'_> {
        BuildFacts {
            metadata: &self.metadata,
            artifact: &self.artifact,
            files: &self.files,
        }
    }
}

#[fixture]
fn facts() -> Facts {
    Facts {
        metadata: ModuleMetadata {
            name: ModuleName::try_from("code-reviewer").expect("valid"),
            version: ModuleVersion::try_from("1.2.0").expect("valid"),
            tier: "decision".to_owned(),
            responsibility: "Review pull requests".to_owned(),
        },
        artifact: ArchiveArtifact {
            path: Utf8PathBuf::from("/out/code-reviewer-1.2.0.tar.gz"),
            size_bytes: 2048,
            sha256: Sha256Digest::try_from("ab".repeat(32)).expect("valid"),
        },
        files: ModuleFileManifest::from_paths(vec![
            "prompt.md".to_owned(),
            "module.yaml".to_owned(),
        ]),
    }
}

#[fixture]
fn publish() -> PublishParams {
    PublishParams {
        release_tag: "v2.2.7".to_owned(),
        namespace: "official".to_owned(),
        runtime_min: "2.2.0".to_owned(),
        repository: "https://github.com/Cognary/cognitive".to_owned(),
        homepage: "https://cognary.github.io/cognitive/".to_owned(),
        license: "MIT".to_owned(),
        timestamp: BuildTimestamp::parse("2026-02-01T08:30:00Z").expect("valid"),
    }
}

fn legacy(description: Option<&str>, author: Option<&str>, tags: &[&str]) -> LegacyModule {
    LegacyModule {
        description: description.map(str::to_owned),
        author: author.map(str::to_owned),
        tags: Some(tags.iter().map(|tag| (*tag).to_owned()).collect()),
    }
}

#[rstest]
fn legacy_metadata_takes_precedence(facts: Facts, publish: PublishParams) {
    let record = legacy(Some("Reviews code"), Some("ziel"), &["review", "quality"]);
    let entry = assemble_entry(facts.view(), Some(&record), &publish);

    assert_eq!(entry.metadata.description, "Reviews code");
    assert_eq!(entry.metadata.description_zh, "Reviews code");
    assert_eq!(entry.metadata.author, "ziel");
    assert_eq!(entry.metadata.keywords, ["review", "quality"]);
}

#[rstest]
fn absent_legacy_record_falls_back(facts: Facts, publish: PublishParams) {
    let entry = assemble_entry(facts.view(), None, &publish);

    assert_eq!(entry.metadata.description, "Review pull requests");
    assert_eq!(entry.metadata.description_zh, "Review pull requests");
    assert_eq!(entry.metadata.author, UNKNOWN_AUTHOR);
    assert!(entry.metadata.keywords.is_empty());
}

#[rstest]
fn empty_legacy_fields_fall_back(facts: Facts, publish: PublishParams) {
    let record = legacy(Some(""), Some(""), &[]);
    let entry = assemble_entry(facts.view(), Some(&record), &publish);

    assert_eq!(entry.metadata.description, "Review pull requests");
    assert_eq!(entry.metadata.author, UNKNOWN_AUTHOR);
}

#[rstest]
fn distribution_describes_the_artifact(facts: Facts, publish: PublishParams) {
    let entry = assemble_entry(facts.view(), None, &publish);

    assert_eq!(
        entry.distribution.tarball,
        "https://github.com/Cognary/cognitive/releases/download/v2.2.7/code-reviewer-1.2.0.tar.gz"
    );
    assert_eq!(entry.distribution.checksum, format!("sha256:{}", "ab".repeat(32)));
    assert_eq!(entry.distribution.size_bytes, 2048);
    assert_eq!(entry.distribution.files.as_slice(), ["module.yaml", "prompt.md"]);
}

#[rstest]
fn serialized_entry_has_every_block_in_order(facts: Facts, publish: PublishParams) {
    let entry = assemble_entry(facts.view(), None, &publish);
    let value: Value = serde_json::to_value(&entry).expect("serialize");

    let keys: Vec<&str> = value
        .as_object()
        .expect("object")
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(
        keys,
        [
            "$schema",
            "identity",
            "metadata",
            "dependencies",
            "distribution",
            "timestamps"
        ]
    );
    assert_eq!(
        value["identity"],
        json!({
            "name": "code-reviewer",
            "namespace": "official",
            "version": "1.2.0",
            "spec_version": "2.2",
        })
    );
    assert_eq!(
        value["dependencies"],
        json!({"runtime_min": "2.2.0", "modules": []})
    );
    assert_eq!(
        value["timestamps"],
        json!({
            "created_at": "2026-02-01T08:30:00Z",
            "updated_at": "2026-02-01T08:30:00Z",
            "deprecated_at": null,
        })
    );
}

#[rstest]
#[case::plain("https://example.com/repo", "https://example.com/repo/releases/download/t/f")]
#[case::trailing_slash("https://example.com/repo/", "https://example.com/repo/releases/download/t/f")]
#[case::many_slashes("https://example.com/repo//", "https://example.com/repo/releases/download/t/f")]
fn tarball_url_trims_trailing_slashes(#[case] repository: &str, #[case] expected: &str) {
    assert_eq!(tarball_url(repository, "t", "f"), expected);
}
