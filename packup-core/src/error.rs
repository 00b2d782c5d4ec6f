//! Error types and result aliases.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error in {context}: {error}")]
    Toml {
        error: toml::de::Error,
        context: String,
    },

    #[error("Could not find a package.json in {0} or any of its parent directories")]
    ManifestNotFound(PathBuf),

    #[error("Failed to parse {path}: {message}")]
    ManifestParse { path: PathBuf, message: String },

    #[error("Invalid package.json:\n{}", format_lines(.errors))]
    InvalidManifest { errors: Vec<String> },

    #[error("Invalid package.json exports:\n{}", format_lines(.errors))]
    InvalidExports { errors: Vec<String> },

    #[error("{0}")]
    DistPath(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{engine} failed: {message}")]
    Engine { engine: String, message: String },

    #[error("Task {task} failed: {message}")]
    TaskExecution { task: String, message: String },

    #[error("Task {task} reported {} error(s):\n{}", .errors.len(), format_lines(.errors))]
    Diagnostics { task: String, errors: Vec<String> },

    #[error("Missing build outputs:\n{}", format_lines(.missing))]
    MissingOutputs { missing: Vec<String> },
}

fn format_lines(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| format!("  - {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::Toml {
            error,
            context: "packup.toml".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
