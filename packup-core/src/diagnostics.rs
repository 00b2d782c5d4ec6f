//! Compiler diagnostics and their severities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// "Starting compilation in watch mode..."
pub const WATCH_STARTING: u32 = 6031;
/// "File change detected. Starting incremental compilation..."
pub const WATCH_FILE_CHANGE: u32 = 6032;
/// "Found 1 error. Watching for file changes."
pub const WATCH_FOUND_ONE_ERROR: u32 = 6193;
/// "Found {0} errors. Watching for file changes."
pub const WATCH_FOUND_ERRORS: u32 = 6194;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Suggestion,
    Message,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Suggestion => "suggestion",
            Severity::Message => "message",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "error" => Some(Severity::Error),
            "warning" => Some(Severity::Warning),
            "suggestion" => Some(Severity::Suggestion),
            "message" => Some(Severity::Message),
            _ => None,
        }
    }
}

/// Source location of a diagnostic (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

/// A compiler-reported issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: u32,
    pub message: String,
    pub location: Option<Location>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: u32, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, file: impl Into<String>, line: u32, column: u32) -> Self {
        self.location = Some(Location {
            file: file.into(),
            line,
            column,
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// The watch-mode "Found 0 errors. Watching for file changes." report.
    pub fn is_clean_rebuild(&self) -> bool {
        self.code == WATCH_FOUND_ERRORS && self.message.contains("Found 0 errors")
    }

    /// Any of the end-of-rebuild summaries, clean or not.
    pub fn is_rebuild_summary(&self) -> bool {
        matches!(self.code, WATCH_FOUND_ONE_ERROR | WATCH_FOUND_ERRORS)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(location) = &self.location {
            write!(
                f,
                "{}:{}:{} - ",
                location.file, location.line, location.column
            )?;
        }
        write!(f, "{} TS{}: {}", self.severity.as_str(), self.code, self.message)
    }
}

/// Diagnostic counts by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticSummary {
    pub errors: usize,
    pub warnings: usize,
    pub suggestions: usize,
    pub messages: usize,
}

impl DiagnosticSummary {
    pub fn from_diagnostics(diagnostics: &[Diagnostic]) -> Self {
        let mut summary = Self::default();
        for diagnostic in diagnostics {
            match diagnostic.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
                Severity::Suggestion => summary.suggestions += 1,
                Severity::Message => summary.messages += 1,
            }
        }
        summary
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}
