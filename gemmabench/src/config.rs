use anyhow::{bail, Context, Result};
use bench_runner::{Framework, DEFAULT_BATCH_SIZE};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_TASKS_FILE: &str = "data/lighteval_supported_tasks.yaml";
pub const RESULTS_DIR: &str = "results";
pub const LIGHTEVAL_TASKS_URL: &str =
    "https://raw.githubusercontent.com/huggingface/lighteval/refs/heads/main/docs/source/available-tasks.mdx";
pub const DEFAULT_HUB_ENDPOINT: &str = "https://huggingface.co";

pub const HF_TOKEN_VAR: &str = "HF_TOKEN";
pub const HF_ENDPOINT_VAR: &str = "HF_ENDPOINT";

#[derive(Debug, Parser)]
#[command(name = "gemmabench", version, about = "Interactive launcher for lighteval benchmark runs")]
pub struct Cli {
    /// Benchmark framework to drive
    #[arg(long, default_value = "lighteval")]
    pub framework: String,

    /// YAML file listing the supported tasks per suite
    #[arg(long, default_value = DEFAULT_TASKS_FILE)]
    pub tasks_file: PathBuf,

    /// Root directory for run outputs
    #[arg(long, default_value = RESULTS_DIR)]
    pub results_dir: PathBuf,

    /// Batch size override for backends other than vllm
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: u32,

    /// Extra model argument forwarded to lighteval (repeatable)
    #[arg(long = "model-arg", value_name = "KEY=VALUE")]
    pub model_args: Vec<String>,

    /// Persist HF_TOKEN to the Hugging Face token file for spawned tools
    #[arg(long)]
    pub save_token: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub framework: Framework,
    pub hf_token: Option<String>,
    pub hub_endpoint: String,
    pub tasks_file: PathBuf,
    pub results_dir: PathBuf,
    pub batch_size: u32,
    pub extra_model_args: Vec<String>,
    pub save_token: bool,
}

impl AppConfig {
    /// Loads `.env` (if any) into the process environment, then resolves the CLI.
    pub fn load(cli: Cli) -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file loaded: {}", e);
        }
        Self::from_env(cli, |key| std::env::var(key).ok())
    }

    pub fn from_env<F>(cli: Cli, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let framework: Framework = cli.framework.parse()?;

        for pair in &cli.model_args {
            match pair.split_once('=') {
                Some((key, _)) if !key.trim().is_empty() => {}
                _ => bail!("Invalid --model-arg '{}': expected KEY=VALUE", pair),
            }
            if pair.contains(',') {
                bail!("Invalid --model-arg '{}': values cannot contain ','", pair);
            }
        }

        let hf_token = env(HF_TOKEN_VAR).filter(|token| !token.trim().is_empty());
        if hf_token.is_none() {
            warn!("{} not found in environment or .env. Access to gated models will fail.", HF_TOKEN_VAR);
        }

        Ok(Self {
            framework,
            hf_token,
            hub_endpoint: env(HF_ENDPOINT_VAR).unwrap_or_else(|| DEFAULT_HUB_ENDPOINT.to_string()),
            tasks_file: cli.tasks_file,
            results_dir: cli.results_dir,
            batch_size: cli.batch_size,
            extra_model_args: cli.model_args,
            save_token: cli.save_token,
        })
    }
}

/// Creates the results root and drops a `.gitkeep` marker into it.
pub fn prepare_results_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create results directory {:?}", path))?;

    let marker = path.join(".gitkeep");
    if !marker.exists() {
        if let Err(e) = std::fs::File::create(&marker) {
            warn!("Could not create .gitkeep in {:?}: {}", path, e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("gemmabench").chain(args.iter().copied()))
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() -> Result<()> {
        let config = AppConfig::from_env(cli(&[]), env(&[("HF_TOKEN", "hf_abc")]))?;

        assert_eq!(config.framework, Framework::Lighteval);
        assert_eq!(config.hf_token.as_deref(), Some("hf_abc"));
        assert_eq!(config.hub_endpoint, DEFAULT_HUB_ENDPOINT);
        assert_eq!(config.tasks_file, PathBuf::from(DEFAULT_TASKS_FILE));
        assert_eq!(config.results_dir, PathBuf::from(RESULTS_DIR));
        assert_eq!(config.batch_size, 1);
        assert!(!config.save_token);
        Ok(())
    }

    #[test]
    fn test_unsupported_framework_is_fatal() {
        let result = AppConfig::from_env(cli(&["--framework", "lm-eval-harness"]), env(&[]));
        assert!(result.is_err());
    }

    #[test]
    fn test_blank_token_counts_as_missing() -> Result<()> {
        let config = AppConfig::from_env(cli(&[]), env(&[("HF_TOKEN", "  ")]))?;
        assert!(config.hf_token.is_none());
        Ok(())
    }

    #[test]
    fn test_model_args_are_validated() -> Result<()> {
        let config = AppConfig::from_env(
            cli(&["--model-arg", "revision=main", "--model-arg", "max_model_length=4096"]),
            env(&[("HF_ENDPOINT", "http://localhost:8080")]),
        )?;
        assert_eq!(config.extra_model_args, vec!["revision=main", "max_model_length=4096"]);
        assert_eq!(config.hub_endpoint, "http://localhost:8080");

        assert!(AppConfig::from_env(cli(&["--model-arg", "revision"]), env(&[])).is_err());
        assert!(AppConfig::from_env(cli(&["--model-arg", "=main"]), env(&[])).is_err());
        assert!(AppConfig::from_env(cli(&["--model-arg", "a=b,c=d"]), env(&[])).is_err());
        Ok(())
    }

    #[test]
    fn test_prepare_results_dir_creates_marker() -> Result<()> {
        let root = tempdir()?;
        let results = root.path().join("results");

        prepare_results_dir(&results)?;
        prepare_results_dir(&results)?;

        assert!(results.join(".gitkeep").is_file());
        Ok(())
    }
}
