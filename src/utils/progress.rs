use std::io::{self, Write};

/// Single-line progress bar for batch loops, rendered to stderr
///
/// Shows batch counts plus a trailing message, which the training loop uses
/// for the running loss. Kept separate from the stdout log so redirecting
/// output captures only the log lines.
pub struct ProgressBar {
    total: usize,
    current: usize,
    prefix: String,
    message: String,
    width: usize,
}

impl ProgressBar {
    /// Create a new progress bar over `total` batches
    #[must_use]
    pub fn new(total: usize, prefix: &str) -> Self {
        Self {
            total,
            current: 0,
            prefix: prefix.to_string(),
            message: String::new(),
            width: 30,
        }
    }

    /// Set the trailing message shown after the counts. Takes effect at the
    /// next `inc`/`update`.
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    /// Set absolute progress and display
    pub fn update(&mut self, current: usize) {
        self.current = current;
        self.render();
    }

    /// Advance by one batch and display
    pub fn inc(&mut self) {
        self.current += 1;
        self.render();
    }

    /// Wipe the bar from the line
    pub fn finish(&self) {
        eprint!("\r{:width$}\r", "", width = self.line_len());
        let _ = io::stderr().flush();
    }

    fn render(&self) {
        let filled = if self.total > 0 {
            (self.current * self.width / self.total).min(self.width)
        } else {
            0
        };

        let bar: String = "█".repeat(filled) + &"░".repeat(self.width - filled);

        eprint!(
            "\r{} [{}] {}/{} {}",
            self.prefix, bar, self.current, self.total, self.message
        );
        let _ = io::stderr().flush();
    }

    // Upper bound on the rendered line width, for the wipe in `finish`.
    fn line_len(&self) -> usize {
        self.prefix.chars().count() + self.width + self.message.chars().count() + 24
    }
}

impl Drop for ProgressBar {
    fn drop(&mut self) {
        self.finish();
    }
}
