use std::path::PathBuf;

pub mod command;
pub mod config;
pub mod error;
pub mod lighteval;
pub mod progress;

#[cfg(feature = "mock")]
pub mod mock_runner;

pub use command::BenchCommand;
pub use config::{Backend, Dtype, Framework, RunConfiguration, DEFAULT_BATCH_SIZE, DEFAULT_FEW_SHOT};
pub use error::RunError;
pub use lighteval::LightevalRunner;

#[cfg(feature = "mock")]
pub use mock_runner::MockRunner;

/// Outcome of a single benchmark invocation.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub success: bool,
    pub output_dir: PathBuf,
    pub stdout: String,
    pub stderr: String,
    /// Set when the harness left a `results.json` behind.
    pub results_file: Option<PathBuf>,
}

impl RunResult {
    pub fn failed(output_dir: PathBuf, stdout: String, stderr: String) -> Self {
        Self {
            success: false,
            output_dir,
            stdout,
            stderr,
            results_file: None,
        }
    }
}

/// A benchmark framework that can turn a finished configuration into a run.
///
/// Implementations never panic or return errors out of `run`; every failure
/// is folded into `RunResult::success`.
pub trait BenchmarkRunner {
    fn framework_name(&self) -> &'static str;
    fn run(&self, config: &RunConfiguration) -> RunResult;
}
