//! Progress indicators for long-running operations

use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

/// Create a spinner for indeterminate operations
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .expect("Failed to create spinner template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Spinner for the readiness polls, showing elapsed time while the
/// fixed-interval loop runs underneath
pub struct WaitProgress {
    pb: ProgressBar,
    what: String,
    started: Instant,
}

impl WaitProgress {
    pub fn new(what: &str) -> Self {
        Self {
            pb: create_spinner(&format!("Waiting for {}...", what)),
            what: what.to_string(),
            started: Instant::now(),
        }
    }

    pub fn tick_status(&self, status: &str) {
        self.pb.set_message(format!(
            "Waiting for {} ({}, {}s elapsed)",
            self.what,
            status,
            self.started.elapsed().as_secs()
        ));
    }

    pub fn finish_success(&self) {
        self.pb.finish_with_message(format!(
            "✓ {} ready after {}s",
            self.what,
            self.started.elapsed().as_secs()
        ));
    }

    pub fn finish_error(&self, error: &str) {
        self.pb
            .finish_with_message(format!("✗ {} failed: {}", self.what, error));
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

/// Helper to run a function with a spinner
pub fn with_spinner<F, T>(message: &str, f: F) -> T
where
    F: FnOnce() -> T,
{
    let pb = create_spinner(message);
    let result = f();
    pb.finish_and_clear();
    result
}

/// Helper to run a function with a spinner and show result
pub fn with_spinner_result<F, T, E>(message: &str, success_msg: &str, f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: std::fmt::Display,
{
    let pb = create_spinner(message);
    match f() {
        Ok(result) => {
            pb.finish_with_message(format!("✓ {}", success_msg));
            Ok(result)
        }
        Err(e) => {
            pb.finish_with_message(format!("✗ Failed: {}", e));
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_spinner() {
        let pb = create_spinner("Test operation");
        assert!(pb.message().contains("Test operation"));
        pb.finish_and_clear();
    }

    #[test]
    fn test_wait_progress() {
        let wp = WaitProgress::new("k3s service");
        wp.tick_status("activating");
        wp.finish();
    }

    #[test]
    fn test_with_spinner() {
        let result = with_spinner("Testing", || 42);
        assert_eq!(result, 42);
    }
}
