use std::io;
use std::process::ExitStatus;

use thiserror::Error;

/// Ways a harness invocation can go wrong once the command line is built.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("'{program}' command not found")]
    CommandNotFound { program: String },

    #[error("{program} command failed ({status})")]
    Failed {
        program: String,
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },

    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl RunError {
    /// Captured process output, when the child got far enough to produce any.
    pub fn captured(&self) -> (&str, &str) {
        match self {
            RunError::Failed { stdout, stderr, .. } => (stdout.as_str(), stderr.as_str()),
            _ => ("", ""),
        }
    }
}
