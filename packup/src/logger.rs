//! Console implementation of the core `Logger`.

use indicatif::ProgressBar;
use owo_colors::OwoColorize;

use packup_core::Logger;

use crate::formatting::{print_error, print_info, print_success, print_warning};

/// Prints through the status formatters. Debug output goes to `tracing`, so
/// `-v` controls it. Quiet mode keeps only warnings and errors.
pub struct ConsoleLogger {
    quiet: bool,
    progress: Option<ProgressBar>,
}

impl ConsoleLogger {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            progress: None,
        }
    }

    /// Routes output above the given progress bar instead of through it.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    fn emit(&self, print: impl FnOnce()) {
        match &self.progress {
            Some(pb) => pb.suspend(print),
            None => print(),
        }
    }
}

impl Logger for ConsoleLogger {
    fn debug(&self, message: &str) {
        tracing::debug!("{}", message);
    }

    fn info(&self, message: &str) {
        if !self.quiet {
            self.emit(|| print_info(message));
        }
    }

    fn warn(&self, message: &str) {
        self.emit(|| print_warning(message));
    }

    fn error(&self, message: &str) {
        self.emit(|| print_error(message));
    }

    fn log(&self, message: &str) {
        if !self.quiet {
            self.emit(|| println!("  {}", message.bright_black()));
        }
    }

    fn success(&self, message: &str) {
        if !self.quiet {
            self.emit(|| print_success(message));
        }
    }
}
