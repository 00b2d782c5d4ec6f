//! Declaration emit through the TypeScript compiler CLI.
//!
//! Every run goes through a generated tsconfig that extends the package's own
//! and pins the options a declaration-only build needs. Output is read with
//! `--pretty false`, which keeps diagnostics on one predictable line each.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tracing::debug;

use packup_core::diagnostics::{
    Diagnostic, Severity, WATCH_FILE_CHANGE, WATCH_FOUND_ERRORS, WATCH_FOUND_ONE_ERROR,
    WATCH_STARTING,
};
use packup_core::error::{Error, Result};
use packup_core::path_utils::find_common_ancestor;
use packup_core::{DeclarationEngine, DtsRequest, Emitter, WatchHandle};

use crate::process::{find_binary, run_captured, ProcessWatcher};

const ENGINE: &str = "tsc";

static LOCATED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<file>.+?)\((?P<line>\d+),(?P<column>\d+)\): (?P<severity>error|warning|suggestion|message) TS(?P<code>\d+): (?P<message>.*)$",
    )
    .expect("static regex is valid")
});

static GLOBAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<severity>error|warning|suggestion|message) TS(?P<code>\d+): (?P<message>.*)$")
        .expect("static regex is valid")
});

static WATCH_STATUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[?\d{1,2}:\d{2}:\d{2}(?:\s?[AaPp][Mm])?\]? - (?P<message>.*)$")
        .expect("static regex is valid")
});

static FOUND_ERRORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Found (?P<count>\d+) errors?\b").expect("static regex is valid"));

/// Drives `tsc` from `node_modules/.bin` or `PATH`.
#[derive(Debug, Clone, Default)]
pub struct TscEngine {
    binary: Option<PathBuf>,
}

impl TscEngine {
    pub fn new(binary: Option<PathBuf>) -> Self {
        Self { binary }
    }

    fn command(&self, request: &DtsRequest, config: &Path) -> Result<Command> {
        let binary = find_binary(&request.cwd, ENGINE, self.binary.as_deref())?;
        let mut command = Command::new(binary);
        command
            .current_dir(&request.cwd)
            .arg("--project")
            .arg(config)
            .arg("--pretty")
            .arg("false");
        Ok(command)
    }
}

impl DeclarationEngine for TscEngine {
    fn name(&self) -> &'static str {
        ENGINE
    }

    fn emit(&self, request: &DtsRequest) -> Result<Vec<Diagnostic>> {
        let config = write_build_config(request)?;
        let mut command = self.command(request, &config)?;
        debug!(config = %config.display(), "running tsc");

        let output = run_captured(ENGINE, &mut command)?;
        let mut parser = TscOutputParser::default();
        let mut diagnostics = Vec::new();
        for stream in [&output.stdout, &output.stderr] {
            for line in String::from_utf8_lossy(stream).lines() {
                diagnostics.extend(parser.push_line(line));
            }
        }
        diagnostics.extend(parser.finish());

        if !output.status.success() && !diagnostics.iter().any(Diagnostic::is_error) {
            return Err(Error::Engine {
                engine: ENGINE.to_string(),
                message: format!(
                    "exited with {} without reporting diagnostics: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(diagnostics)
    }

    fn watch(
        &self,
        request: &DtsRequest,
        diagnostics: Emitter<Diagnostic>,
    ) -> Result<Box<dyn WatchHandle>> {
        let config = write_build_config(request)?;
        let mut command = self.command(request, &config)?;
        command.arg("--watch").arg("--preserveWatchOutput");
        debug!(config = %config.display(), "starting tsc watcher");

        let mut parser = TscOutputParser::default();
        let watcher = ProcessWatcher::spawn(ENGINE, command, move |line| {
            for diagnostic in parser.push_line(line) {
                diagnostics.emit(diagnostic);
            }
        })?;
        Ok(Box::new(watcher.keep_alive(config)))
    }
}

/// Writes the generated config next to the package's tsconfig so relative
/// settings keep resolving from the same directory.
fn write_build_config(request: &DtsRequest) -> Result<tempfile::TempPath> {
    let dir = request
        .tsconfig
        .path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| request.cwd.clone());

    let contents = build_config(request);
    let mut file = tempfile::Builder::new()
        .prefix(".tsconfig.packup-")
        .suffix(".json")
        .tempfile_in(&dir)?;
    file.write_all(serde_json::to_string_pretty(&contents)?.as_bytes())?;
    file.flush()?;
    Ok(file.into_temp_path())
}

/// The generated config: the package's own tsconfig with declaration-only
/// emit forced on and the program limited to the requested entries.
pub fn build_config(request: &DtsRequest) -> Value {
    let mut options = serde_json::Map::new();
    options.insert("declaration".into(), Value::Bool(true));
    options.insert("emitDeclarationOnly".into(), Value::Bool(true));
    options.insert("noEmit".into(), Value::Bool(false));
    options.insert("composite".into(), Value::Bool(false));
    options.insert("incremental".into(), Value::Bool(false));
    options.insert("outDir".into(), Value::String(path_string(&request.out_dir)));
    options.insert(
        "declarationDir".into(),
        Value::String(path_string(&request.out_dir)),
    );

    if !request.tsconfig.compiler_options.contains_key("rootDir") {
        if let Some(root) = root_dir(request) {
            options.insert("rootDir".into(), Value::String(path_string(&root)));
        }
    }

    let files: Vec<String> = request.root_names.iter().map(|p| path_string(p)).collect();
    json!({
        "extends": path_string(&request.tsconfig.path),
        "compilerOptions": options,
        "files": files,
        "include": [],
    })
}

/// Common directory of every file the program can see, so outputs mirror the
/// source tree under `outDir`.
fn root_dir(request: &DtsRequest) -> Option<PathBuf> {
    let mut files: Vec<&PathBuf> = request.tsconfig.file_names.iter().collect();
    files.extend(request.root_names.iter());
    find_common_ancestor(&files)
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Incremental parser for `tsc --pretty false` output.
///
/// Indented lines continue the previous diagnostic's message, so a
/// diagnostic is only complete once the next one starts, a watch status
/// arrives, or [`finish`](Self::finish) is called.
#[derive(Debug, Default)]
pub struct TscOutputParser {
    pending: Option<Diagnostic>,
}

impl TscOutputParser {
    /// Feeds one line and returns the diagnostics it completed.
    pub fn push_line(&mut self, line: &str) -> Vec<Diagnostic> {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            return Vec::new();
        }

        if line.starts_with(char::is_whitespace) {
            if let Some(pending) = &mut self.pending {
                pending.message.push('\n');
                pending.message.push_str(line.trim());
                return Vec::new();
            }
        }

        let mut completed: Vec<Diagnostic> = self.pending.take().into_iter().collect();

        if let Some(status) = parse_watch_status(line) {
            completed.push(status);
        } else if let Some(diagnostic) = parse_diagnostic(line) {
            self.pending = Some(diagnostic);
        } else {
            debug!(line, "unrecognised tsc output");
        }
        completed
    }

    pub fn finish(&mut self) -> Option<Diagnostic> {
        self.pending.take()
    }
}

fn parse_diagnostic(line: &str) -> Option<Diagnostic> {
    if let Some(caps) = LOCATED.captures(line) {
        let severity = Severity::from_str(&caps["severity"])?;
        let code = caps["code"].parse().ok()?;
        let line_no = caps["line"].parse().ok()?;
        let column = caps["column"].parse().ok()?;
        return Some(
            Diagnostic::new(severity, code, &caps["message"]).at(&caps["file"], line_no, column),
        );
    }
    let caps = GLOBAL.captures(line)?;
    let severity = Severity::from_str(&caps["severity"])?;
    let code = caps["code"].parse().ok()?;
    Some(Diagnostic::new(severity, code, &caps["message"]))
}

fn parse_watch_status(line: &str) -> Option<Diagnostic> {
    let caps = WATCH_STATUS.captures(line)?;
    let message = caps["message"].to_string();

    let code = if message.starts_with("Starting compilation in watch mode") {
        WATCH_STARTING
    } else if message.starts_with("File change detected") {
        WATCH_FILE_CHANGE
    } else if let Some(found) = FOUND_ERRORS.captures(&message) {
        match found["count"].parse::<u32>() {
            Ok(1) => WATCH_FOUND_ONE_ERROR,
            _ => WATCH_FOUND_ERRORS,
        }
    } else {
        0
    };
    Some(Diagnostic::new(Severity::Message, code, message))
}
