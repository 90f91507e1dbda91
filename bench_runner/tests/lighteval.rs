#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use anyhow::Result;
use bench_runner::{Backend, BenchmarkRunner, Dtype, LightevalRunner, RunConfiguration};
use tempfile::tempdir;

fn config() -> RunConfiguration {
    RunConfiguration::new("org/model", Backend::Accelerate, "mmlu|abc")
}

fn write_script(dir: &Path, name: &str, body: &str) -> Result<String> {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body))?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    Ok(path.to_string_lossy().into_owned())
}

#[test]
fn zero_exit_is_success() -> Result<()> {
    let root = tempdir()?;
    let runner = LightevalRunner::new(root.path())?.with_program("true");

    let result = runner.run(&config());

    assert!(result.success);
    assert!(result.results_file.is_none());
    assert!(result.output_dir.starts_with(root.path().join("lighteval")));
    Ok(())
}

#[test]
fn non_zero_exit_is_failure() -> Result<()> {
    let root = tempdir()?;
    let runner = LightevalRunner::new(root.path())?.with_program("false");

    let result = runner.run(&config());

    assert!(!result.success);
    Ok(())
}

#[test]
fn missing_executable_is_failure() -> Result<()> {
    let root = tempdir()?;
    let runner = LightevalRunner::new(root.path())?.with_program("lighteval-definitely-not-installed");

    let result = runner.run(&config());

    assert!(!result.success);
    assert!(result.stdout.is_empty());
    Ok(())
}

#[test]
fn failure_keeps_captured_output() -> Result<()> {
    let root = tempdir()?;
    let script = write_script(root.path(), "fake-lighteval", "echo out-line\necho err-line >&2\nexit 3")?;
    let runner = LightevalRunner::new(root.path())?.with_program(script);

    let result = runner.run(&config());

    assert!(!result.success);
    assert_eq!(result.stdout.trim(), "out-line");
    assert_eq!(result.stderr.trim(), "err-line");
    Ok(())
}

#[test]
fn results_json_is_detected_in_output_dir() -> Result<()> {
    let root = tempdir()?;
    // The output directory is always the last argument.
    let script = write_script(
        root.path(),
        "fake-lighteval",
        "for last; do :; done\nmkdir -p \"$last\"\necho '{}' > \"$last/results.json\"\necho \"$1 $2\"",
    )?;
    let runner = LightevalRunner::new(root.path())?.with_program(script);
    let config = RunConfiguration::new("org/model", Backend::Vllm, "mmlu|abc").with_dtype(Dtype::Bfloat16);

    let result = runner.run(&config);

    assert!(result.success);
    assert_eq!(result.results_file, Some(result.output_dir.join("results.json")));
    assert_eq!(
        result.stdout.trim(),
        "vllm pretrained=org/model,trust_remote_code=True,dtype=bfloat16"
    );
    Ok(())
}

#[test]
fn child_inherits_environment() -> Result<()> {
    let root = tempdir()?;
    let script = write_script(root.path(), "fake-lighteval", "echo \"$PATH\"")?;
    let runner = LightevalRunner::new(root.path())?.with_program(script);

    let result = runner.run(&config());

    assert!(result.success);
    assert_eq!(result.stdout.trim(), std::env::var("PATH")?);
    Ok(())
}
