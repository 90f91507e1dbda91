use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};
use tracing::debug;

const TICK_INTERVAL: Duration = Duration::from_millis(120);

/// Spinner shown while a blocking child process runs.
pub struct Spinner {
    bar: ProgressBar,
    start_time: Instant,
}

impl Spinner {
    pub fn start(message: impl Into<String>) -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.set_message(message.into());
        bar.enable_steady_tick(TICK_INTERVAL);

        Self {
            bar,
            start_time: Instant::now(),
        }
    }

    pub fn finish(self) -> Duration {
        self.bar.finish_and_clear();
        let elapsed = self.start_time.elapsed();
        debug!("Child process finished after {:.2}s", elapsed.as_secs_f64());
        elapsed
    }
}
