use std::cell::RefCell;
use std::path::PathBuf;

use crate::config::RunConfiguration;
use crate::{BenchmarkRunner, RunResult};

/// Records every configuration it is handed and answers with a fixed outcome.
pub struct MockRunner {
    succeed: bool,
    runs: RefCell<Vec<RunConfiguration>>,
}

impl MockRunner {
    pub fn new(succeed: bool) -> Self {
        Self {
            succeed,
            runs: RefCell::new(Vec::new()),
        }
    }

    pub fn runs(&self) -> Vec<RunConfiguration> {
        self.runs.borrow().clone()
    }
}

impl BenchmarkRunner for MockRunner {
    fn framework_name(&self) -> &'static str {
        "mock"
    }

    fn run(&self, config: &RunConfiguration) -> RunResult {
        self.runs.borrow_mut().push(config.clone());
        RunResult {
            success: self.succeed,
            output_dir: PathBuf::from("results").join("mock"),
            stdout: String::new(),
            stderr: String::new(),
            results_file: None,
        }
    }
}
