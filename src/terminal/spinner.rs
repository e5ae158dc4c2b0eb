use indicatif::{ProgressBar, ProgressStyle};
use std::{future::Future, time::Duration};

const TICK: Duration = Duration::from_millis(100);

/// Shows a spinner with `message` on stderr while `task` runs.
pub async fn with_spinner<T>(message: &str, task: impl Future<Output = T>) -> T {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(TICK);
    let result = task.await;
    spinner.finish_and_clear();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_task_result() {
        assert_eq!(42, with_spinner("Thinking...", async { 42 }).await);
    }
}
