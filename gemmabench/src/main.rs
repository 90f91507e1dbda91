use anyhow::Result;
use bench_runner::{Framework, LightevalRunner};
use clap::Parser;
use std::process::ExitCode;
use system_probe::HardwareProber;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use gemmabench::catalog::CatalogCache;
use gemmabench::config::{prepare_results_dir, AppConfig, Cli};
use gemmabench::hub::{self, HubRegistry};
use gemmabench::launch;
use gemmabench::prompt::Prompter;
use gemmabench::wizard::Wizard;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    println!("Welcome to Gemmabench!");

    let config = AppConfig::load(cli)?;
    println!("Using benchmark framework: {}", config.framework);

    prepare_results_dir(&config.results_dir)?;

    if config.save_token {
        match (&config.hf_token, hub::token_path()) {
            (Some(token), Some(path)) => hub::save_token(token, &path)?,
            (None, _) => warn!("Cannot save token globally as HF_TOKEN is not set."),
            (_, None) => warn!("Cannot locate the Hugging Face token file; set HF_HOME."),
        }
    }

    let runner = match config.framework {
        Framework::Lighteval => LightevalRunner::new(&config.results_dir)?,
    };
    let registry = HubRegistry::new(config.hub_endpoint.clone(), config.hf_token.clone())?;
    let prober = HardwareProber::system();
    let catalog = CatalogCache::new(&config.tasks_file);

    let mut wizard = Wizard::new(Prompter::stdio(), &config, &registry, &prober, &catalog);
    let run_config = match wizard.run()? {
        Some(run_config) => run_config,
        None => {
            println!("Failed to get valid task details. Exiting.");
            return Ok(ExitCode::FAILURE);
        }
    };

    info!(model = %run_config.model_id, task = %run_config.task, "Launching benchmark");
    if launch(&runner, &run_config, &config.results_dir) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
