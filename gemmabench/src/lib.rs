pub mod catalog;
pub mod config;
pub mod hub;
pub mod prompt;
pub mod wizard;

use bench_runner::{BenchmarkRunner, RunConfiguration};
use std::path::Path;
use tracing::{error, info};

/// Hands a finished configuration to the runner and reports the outcome.
pub fn launch(runner: &dyn BenchmarkRunner, config: &RunConfiguration, results_root: &Path) -> bool {
    info!(framework = runner.framework_name(), "Dispatching benchmark run");
    let result = runner.run(config);

    if result.success {
        println!("\nBenchmark process completed.");
        println!(
            "Check the '{}' directory for results.",
            results_root.join(runner.framework_name()).display()
        );
    } else {
        error!("Benchmark run failed; output directory was {:?}", result.output_dir);
        println!("\nBenchmark process failed.");
    }
    result.success
}
