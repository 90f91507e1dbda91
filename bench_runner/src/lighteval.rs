use anyhow::{Context, Result};
use chrono::Local;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};

use crate::command::BenchCommand;
use crate::config::{Backend, Dtype, RunConfiguration};
use crate::error::RunError;
use crate::progress::Spinner;
use crate::{BenchmarkRunner, RunResult};

pub const FRAMEWORK_NAME: &str = "lighteval";
pub const RESULTS_FILE: &str = "results.json";
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

const BATCH_SIZE_FLAG: &str = "--override-batch-size";
const OUTPUT_DIR_FLAG: &str = "--output-dir";

struct CapturedOutput {
    stdout: String,
    stderr: String,
}

/// Drives the `lighteval` CLI as a single blocking subprocess.
pub struct LightevalRunner {
    program: String,
    results_dir: PathBuf,
}

impl LightevalRunner {
    /// Results for this framework live in `<results_root>/lighteval`.
    pub fn new(results_root: impl AsRef<Path>) -> Result<Self> {
        let results_dir = results_root.as_ref().join(FRAMEWORK_NAME);
        std::fs::create_dir_all(&results_dir)
            .with_context(|| format!("Failed to create results directory {:?}", results_dir))?;

        Ok(Self {
            program: FRAMEWORK_NAME.to_string(),
            results_dir,
        })
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    pub fn build_command(&self, config: &RunConfiguration, timestamp: &str) -> BenchCommand {
        let task_args = task_args(config);
        let output_dir = self.results_dir.join(format!(
            "{}_{}_{}_{}",
            config.model_id.replace('/', "_"),
            task_args.replace(['|', ':'], "_"),
            config.backend,
            timestamp
        ));

        let mut args = vec![
            config.backend.launcher().to_string(),
            model_args(config),
            task_args,
        ];

        if config.backend != Backend::Vllm {
            args.push(BATCH_SIZE_FLAG.to_string());
            args.push(config.batch_size.to_string());
        }

        args.push(OUTPUT_DIR_FLAG.to_string());
        args.push(output_dir.to_string_lossy().into_owned());

        BenchCommand {
            program: self.program.clone(),
            args,
            output_dir,
        }
    }

    fn execute(&self, command: &BenchCommand) -> Result<CapturedOutput, RunError> {
        let spinner = Spinner::start(format!("Running {} (this may take a while)...", command.program));
        let result = command.to_command().output();
        spinner.finish();

        let output = match result {
            Ok(output) => output,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(RunError::CommandNotFound {
                    program: command.program.clone(),
                })
            }
            Err(source) => {
                return Err(RunError::Launch {
                    program: command.program.clone(),
                    source,
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(RunError::Failed {
                program: command.program.clone(),
                status: output.status,
                stdout,
                stderr,
            });
        }

        Ok(CapturedOutput { stdout, stderr })
    }
}

/// Comma-joined `key=value` pairs handed to lighteval as the model argument.
pub fn model_args(config: &RunConfiguration) -> String {
    let mut pairs = vec![
        format!("pretrained={}", config.model_id),
        "trust_remote_code=True".to_string(),
    ];
    pairs.extend(config.extra_model_args.iter().cloned());

    if config.backend.requires_dtype() {
        if pairs.iter().any(|pair| pair.starts_with("dtype=")) {
            warn!("dtype already present in model arguments; skipping automatic addition");
        } else {
            let dtype = config.dtype.unwrap_or(Dtype::Auto);
            info!("Using {} backend with dtype={}", config.backend, dtype);
            pairs.push(format!("dtype={}", dtype));
        }
    }

    pairs.join(",")
}

/// `suite|name|few_shot|truncation`
pub fn task_args(config: &RunConfiguration) -> String {
    format!(
        "{}|{}|{}",
        config.task,
        config.few_shot,
        u8::from(config.allow_truncation)
    )
}

fn report_failure(err: &RunError) {
    error!("{}", err);
    match err {
        RunError::CommandNotFound { program } => {
            println!("\nError: '{}' command not found.", program);
            println!("Please ensure lighteval is installed correctly in your environment (pip install lighteval).");
        }
        RunError::Failed { program, status, stdout, stderr } => {
            println!("\nError: {} command failed.", program);
            match status.code() {
                Some(code) => println!("Return code: {}", code),
                None => println!("Terminated by signal ({})", status),
            }
            println!("--- stdout ---\n{}", stdout);
            println!("--- stderr ---\n{}", stderr);
        }
        RunError::Launch { source, .. } => {
            println!("\nAn unexpected error occurred during benchmark execution: {}", source);
        }
    }
}

impl BenchmarkRunner for LightevalRunner {
    fn framework_name(&self) -> &'static str {
        FRAMEWORK_NAME
    }

    #[instrument(skip(self, config), fields(model = %config.model_id, backend = %config.backend, task = %config.task))]
    fn run(&self, config: &RunConfiguration) -> RunResult {
        println!("\nStarting lighteval benchmark for model: {}", config.model_id);
        println!(
            "Task: {} | few-shot: {} | truncation: {}",
            config.task, config.few_shot, config.allow_truncation
        );
        println!("Using backend: {}", config.backend);

        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let command = self.build_command(config, &timestamp);

        println!("\nExecuting command:");
        println!("{}", command.display());

        match self.execute(&command) {
            Ok(output) => {
                println!("\n--- lighteval stdout ---");
                println!("{}", output.stdout);
                if !output.stderr.is_empty() {
                    println!("--- lighteval stderr ---");
                    println!("{}", output.stderr);
                }
                println!("\nBenchmark finished successfully.");

                let results_file = command.output_dir.join(RESULTS_FILE);
                let results_file = if results_file.exists() {
                    println!("Results saved in directory: {}", command.output_dir.display());
                    println!("Main results file: {}", results_file.display());
                    Some(results_file)
                } else {
                    println!(
                        "Benchmark completed, but {} not found in {}. Check logs/stdout.",
                        RESULTS_FILE,
                        command.output_dir.display()
                    );
                    None
                };

                RunResult {
                    success: true,
                    output_dir: command.output_dir,
                    stdout: output.stdout,
                    stderr: output.stderr,
                    results_file,
                }
            }
            Err(err) => {
                report_failure(&err);
                let (stdout, stderr) = err.captured();
                RunResult::failed(command.output_dir.clone(), stdout.to_string(), stderr.to_string())
            }
        }
    }
}
