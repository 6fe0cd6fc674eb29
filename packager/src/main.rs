//! Registry asset builder entrypoint.
//!
//! Packages every module into a release archive and writes the v2 registry
//! index. Process-level inputs (working directory, `SOURCE_DATE_EPOCH`, the
//! system clock) are read here and handed to the library explicitly.

use camino::Utf8PathBuf;
use clap::Parser;
use module_packager::cli::Cli;
use module_packager::config::ConfigError;
use module_packager::error::Result;
use module_packager::pipeline::{BuildSummary, build_registry};
use module_packager::timestamp::{SOURCE_DATE_EPOCH, SystemClock};
use std::io::Write;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Route `log` records to stderr; `RUST_LOG` overrides the flag-derived level.
fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_directive()));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
    if let Err(err) = installed {
        write_line(
            &mut std::io::stderr(),
            format!("warning: logging unavailable: {err}"),
        );
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write) -> Result<()> {
    let cwd = current_dir()?;
    let source_date_epoch = std::env::var(SOURCE_DATE_EPOCH).ok();
    let config = cli.build_config(&cwd, source_date_epoch.as_deref(), &SystemClock)?;
    let summary = build_registry(&config)?;
    report(&summary, stdout);
    Ok(())
}

fn current_dir() -> std::result::Result<Utf8PathBuf, ConfigError> {
    let cwd = std::env::current_dir().map_err(|source| ConfigError::CurrentDir { source })?;
    Utf8PathBuf::from_path_buf(cwd).map_err(|path| ConfigError::NonUtf8Root { path })
}

fn report(summary: &BuildSummary, stdout: &mut dyn Write) {
    write_line(stdout, format!("Wrote registry: {}", summary.registry_path));
    write_line(stdout, format!("Wrote tarballs: {}", summary.out_dir));
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_line(stderr, format!("error: {err}"));
            1
        }
    }
}

fn write_line(out: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(out, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

#[cfg(test)]
#[expect(clippy::expect_used, reason = "tests fail fast on broken fixtures")]
mod tests {
    use super::*;
    use module_packager::error::BuildError;
    use module_packager::timestamp::BuildTimestamp;

    #[test]
    fn exit_code_for_run_result_returns_zero_on_success() {
        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Ok(()), &mut stderr);
        assert_eq!(exit_code, 0);
        assert!(stderr.is_empty());
    }

    #[test]
    fn exit_code_for_run_result_prints_error_and_returns_one() {
        let mut stderr = Vec::new();
        let exit_code =
            exit_code_for_run_result(Err(BuildError::from(ConfigError::MissingTag)), &mut stderr);
        assert_eq!(exit_code, 1);

        let text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(text.starts_with("error: a release tag is required"));
    }

    #[test]
    fn report_prints_registry_then_tarball_paths() {
        let summary = BuildSummary {
            registry_path: Utf8PathBuf::from("/repo/cognitive-registry.v2.json"),
            out_dir: Utf8PathBuf::from("/repo/dist/registry-assets"),
            index: module_packager::registry::index::RegistryIndex::new(
                Vec::new(),
                serde_json::json!({}),
                BuildTimestamp::from_epoch_seconds("0").expect("valid"),
            ),
        };
        let mut stdout = Vec::new();
        report(&summary, &mut stdout);

        assert_eq!(
            String::from_utf8(stdout).expect("UTF-8"),
            "Wrote registry: /repo/cognitive-registry.v2.json\n\
             Wrote tarballs: /repo/dist/registry-assets\n"
        );
    }

    #[test]
    fn run_honours_source_date_epoch_and_reports_paths() {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("UTF-8");
        let module = root.join("cognitive").join("modules").join("echo");
        std::fs::create_dir_all(&module).expect("mkdir");
        std::fs::write(
            module.join("module.yaml"),
            "name: echo\nversion: 0.1.0\ntier: exec\nresponsibility: Repeat input\n",
        )
        .expect("write descriptor");
        let cli = Cli::parse_from([
            "build-registry-assets",
            "--tag",
            "v0.1.0",
            "--no-legacy-registry",
            "--root",
            root.as_str(),
        ]);

        let mut stdout = Vec::new();
        temp_env::with_var(SOURCE_DATE_EPOCH, Some("86400"), || run(&cli, &mut stdout))
            .expect("build succeeds");

        let index: serde_json::Value = serde_json::from_slice(
            &std::fs::read(root.join("cognitive-registry.v2.json")).expect("read index"),
        )
        .expect("parse index");
        assert_eq!(index["updated"], "1970-01-02T00:00:00Z");
        assert!(root.join("dist/registry-assets/echo-0.1.0.tar.gz").is_file());
        let printed = String::from_utf8(stdout).expect("UTF-8");
        assert!(printed.contains("Wrote registry: "));
        assert!(printed.contains("Wrote tarballs: "));
    }
}
