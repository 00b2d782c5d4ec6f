//! One-line status messages printed by the console logger and commands.
//!
//! Errors and warnings go to stderr, everything else to stdout, so piping
//! `packup plan --json` never picks up diagnostics.

use owo_colors::{OwoColorize, Style};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
}

impl Status {
    pub fn symbol(self) -> &'static str {
        match self {
            Status::Success => "✓",
            Status::Error => "✗",
            Status::Warning => "!",
            Status::Info => "•",
        }
    }

    fn style(self) -> Style {
        match self {
            Status::Success => Style::new().green(),
            Status::Error => Style::new().red().bold(),
            Status::Warning => Style::new().yellow().bold(),
            Status::Info => Style::new().cyan(),
        }
    }

    fn is_diagnostic(self) -> bool {
        matches!(self, Status::Error | Status::Warning)
    }

    /// The symbol in the status colour, followed by the message. Only
    /// errors and warnings colour the message too.
    pub fn line(self, message: &str) -> String {
        let symbol_text = self.symbol();
        let symbol = symbol_text.style(self.style());
        if self.is_diagnostic() {
            format!("  {} {}", symbol, message.style(self.style()))
        } else {
            format!("  {} {}", symbol, message)
        }
    }
}

fn print_status(status: Status, message: &str) {
    let line = status.line(message);
    if status.is_diagnostic() {
        eprintln!("{}", line);
    } else {
        println!("{}", line);
    }
}

pub fn print_success(message: &str) {
    print_status(Status::Success, message);
}

pub fn print_error(message: &str) {
    print_status(Status::Error, message);
}

pub fn print_warning(message: &str) {
    print_status(Status::Warning, message);
}

pub fn print_info(message: &str) {
    print_status(Status::Info, message);
}
