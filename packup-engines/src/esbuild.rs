//! Bundling through the esbuild CLI.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use packup_core::error::{Error, Result};
use packup_core::{BundleEvent, BundleOutput, BundleRequest, Bundler, Emitter, Format, Runtime, WatchHandle};

use crate::process::{find_binary, run_captured, ProcessWatcher};

const ENGINE: &str = "esbuild";

/// Used when none of the configured targets can be expressed for esbuild.
pub const FALLBACK_TARGET: &str = "es2020";

static ENGINE_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)(chrome|edge|firefox|safari|ios_saf|ios|opera|node|deno|ie|hermes|rhino)\s*(\d+(?:\.\d+){0,2})$")
        .expect("static regex is valid")
});

static ES_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)(esnext|es\d{1,4})$").expect("static regex is valid"));

/// Drives `esbuild` from `node_modules/.bin` or `PATH`.
#[derive(Debug, Clone, Default)]
pub struct EsbuildEngine {
    binary: Option<PathBuf>,
}

impl EsbuildEngine {
    pub fn new(binary: Option<PathBuf>) -> Self {
        Self { binary }
    }

    fn command(&self, request: &BundleRequest) -> Result<Command> {
        let binary = find_binary(&request.cwd, ENGINE, self.binary.as_deref())?;
        let mut command = Command::new(binary);
        command.current_dir(&request.cwd);
        Ok(command)
    }
}

impl Bundler for EsbuildEngine {
    fn name(&self) -> &'static str {
        ENGINE
    }

    fn bundle(&self, request: &BundleRequest) -> Result<BundleOutput> {
        let metafile = tempfile::Builder::new()
            .prefix("packup-meta-")
            .suffix(".json")
            .tempfile()?
            .into_temp_path();

        let mut command = self.command(request)?;
        command
            .args(bundle_args(request))
            .arg("--log-level=warning")
            .arg(format!("--metafile={}", metafile.display()));
        debug!(out_dir = %request.out_dir.display(), format = %request.format, "running esbuild");

        let started = Instant::now();
        let output = run_captured(ENGINE, &mut command)?;
        let duration = started.elapsed();

        let log = String::from_utf8_lossy(&output.stderr);
        let messages = parse_messages(&log);
        if !output.status.success() {
            let errors = if messages.errors.is_empty() {
                log.trim().to_string()
            } else {
                messages.errors.join("\n")
            };
            return Err(Error::Engine {
                engine: ENGINE.to_string(),
                message: errors,
            });
        }

        let meta = std::fs::read_to_string(&metafile)?;
        let files = metafile_outputs(&request.cwd, &serde_json::from_str(&meta)?);

        Ok(BundleOutput {
            files,
            warnings: messages.warnings,
            duration,
        })
    }

    fn watch(
        &self,
        request: &BundleRequest,
        events: Emitter<BundleEvent>,
    ) -> Result<Box<dyn WatchHandle>> {
        let mut command = self.command(request)?;
        command
            .args(bundle_args(request))
            .arg("--log-level=info")
            .arg("--watch=forever");
        debug!(out_dir = %request.out_dir.display(), format = %request.format, "starting esbuild watcher");

        let mut parser = WatchOutputParser::new();
        events.emit(BundleEvent::Start);
        events.emit(BundleEvent::BundleStart);
        let watcher = ProcessWatcher::spawn(ENGINE, command, move |line| {
            for event in parser.push_line(line) {
                events.emit(event);
            }
        })?;
        Ok(Box::new(watcher))
    }
}

/// Command-line arguments shared by one-shot and watch bundles.
pub fn bundle_args(request: &BundleRequest) -> Vec<String> {
    let mut args = vec!["--bundle".to_string(), "--color=false".to_string()];

    for entry in &request.entries {
        args.push(format!("{}={}", entry.file_name, entry.source.display()));
    }

    args.push(format!("--outdir={}", request.out_dir.display()));
    args.push(format!("--out-extension:.js={}", request.out_extension));
    args.push(format!("--format={}", request.format.as_str()));

    let platform = match request.runtime {
        Runtime::Node => "node",
        Runtime::Web => "browser",
        Runtime::Universal => "neutral",
    };
    args.push(format!("--platform={}", platform));
    if request.runtime == Runtime::Universal {
        args.push("--main-fields=module,main".to_string());
    }

    args.push(format!("--target={}", esbuild_targets(&request.targets).join(",")));

    for dependency in &request.external {
        args.push(format!("--external:{}", dependency));
        args.push(format!("--external:{}/*", dependency));
    }

    // esbuild only splits ESM output.
    if request.format == Format::Esm {
        args.push("--splitting".to_string());
        args.push(format!("--chunk-names={}/[name]-[hash]", request.chunk_dir));
    }

    if request.minify {
        args.push("--minify".to_string());
    }
    if request.sourcemap {
        args.push("--sourcemap".to_string());
    }
    args
}

/// Converts browserslist-style queries (`node 18`, `chrome 90`) into esbuild
/// targets. Queries esbuild cannot express, such as `> 0.5%` or
/// `last 2 versions`, are dropped.
pub fn esbuild_targets(queries: &[String]) -> Vec<String> {
    let mut targets: Vec<String> = Vec::new();
    for query in queries {
        let query = query.trim();
        let converted = if let Some(caps) = ES_VERSION.captures(query) {
            caps[1].to_lowercase()
        } else if let Some(caps) = ENGINE_VERSION.captures(query) {
            let engine = match caps[1].to_lowercase().as_str() {
                "ios_saf" => "ios".to_string(),
                other => other.to_string(),
            };
            format!("{}{}", engine, &caps[2])
        } else {
            debug!(query, "dropping target esbuild cannot express");
            continue;
        };
        if !targets.contains(&converted) {
            targets.push(converted);
        }
    }
    if targets.is_empty() {
        targets.push(FALLBACK_TARGET.to_string());
    }
    targets
}

/// Files listed under `outputs` in an esbuild metafile. Keys are relative to
/// the working directory esbuild ran in.
pub fn metafile_outputs(cwd: &Path, meta: &Value) -> Vec<PathBuf> {
    meta.get("outputs")
        .and_then(Value::as_object)
        .map(|outputs| outputs.keys().map(|key| cwd.join(key)).collect())
        .unwrap_or_default()
}

/// Errors and warnings from esbuild's log output.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LogMessages {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Splits esbuild's log into messages. A message starts on a `✘ [ERROR]` or
/// `▲ [WARNING]` line; the indented lines after it (the code frame) belong to it.
pub fn parse_messages(log: &str) -> LogMessages {
    let mut messages = LogMessages::default();
    let mut current: Option<(bool, String)> = None;

    let flush = |current: &mut Option<(bool, String)>, messages: &mut LogMessages| {
        if let Some((is_error, text)) = current.take() {
            let text = text.trim_end().to_string();
            if is_error {
                messages.errors.push(text);
            } else {
                messages.warnings.push(text);
            }
        }
    };

    for line in log.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(rest) = error_message(line) {
            flush(&mut current, &mut messages);
            current = Some((true, rest.to_string()));
        } else if let Some(rest) = warning_message(line) {
            flush(&mut current, &mut messages);
            current = Some((false, rest.to_string()));
        } else if line.starts_with(char::is_whitespace) {
            if let Some((_, text)) = &mut current {
                text.push('\n');
                text.push_str(line);
            }
        } else {
            flush(&mut current, &mut messages);
        }
    }
    flush(&mut current, &mut messages);
    messages
}

fn error_message(line: &str) -> Option<&str> {
    line.trim_start()
        .strip_prefix("✘ [ERROR]")
        .or_else(|| line.trim_start().strip_prefix("X [ERROR]"))
        .map(str::trim)
}

fn warning_message(line: &str) -> Option<&str> {
    line.trim_start()
        .strip_prefix("▲ [WARNING]")
        .map(str::trim)
}

/// Turns `esbuild --watch` log lines into bundle events.
///
/// The watcher reports `[watch] build started` before each rebuild and
/// `[watch] build finished` after every build, including the first. A build
/// that logged errors ends without a `BundleEnd`.
#[derive(Debug)]
pub struct WatchOutputParser {
    started: Instant,
    failed: bool,
}

impl WatchOutputParser {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            failed: false,
        }
    }

    pub fn push_line(&mut self, line: &str) -> Vec<BundleEvent> {
        let trimmed = line.trim();
        if trimmed.starts_with("[watch] build started") {
            self.started = Instant::now();
            self.failed = false;
            return vec![BundleEvent::Start, BundleEvent::BundleStart];
        }
        if trimmed.starts_with("[watch] build finished") {
            let mut events = Vec::with_capacity(2);
            if !self.failed {
                events.push(BundleEvent::BundleEnd {
                    duration: self.started.elapsed(),
                });
            }
            events.push(BundleEvent::End);
            return events;
        }
        if let Some(message) = error_message(line) {
            self.failed = true;
            return vec![BundleEvent::Error(message.to_string())];
        }
        Vec::new()
    }
}

impl Default for WatchOutputParser {
    fn default() -> Self {
        Self::new()
    }
}
