//! Engine traits implemented by native tool drivers.
//!
//! Engines know how to run one tool (a TypeScript declaration compiler, a
//! bundler, a tsconfig reader). They do not plan, print or decide failure
//! policy; that is the job of the task handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::context::BuildContext;
use crate::diagnostics::Diagnostic;
use crate::error::{Error, Result};
use crate::format::{Format, Runtime};
use crate::stream::Emitter;
use crate::task::JsTask;

/// A resolved TypeScript configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TsConfig {
    pub path: PathBuf,
    pub file_names: Vec<PathBuf>,
    pub compiler_options: Map<String, Value>,
}

/// Locates and reads the TypeScript configuration that governs a source file.
pub trait TsConfigLoader: Send + Sync {
    /// Returns `Ok(None)` when no configuration applies to `source`.
    fn load(&self, cwd: &Path, source: &Path, explicit: Option<&Path>) -> Result<Option<TsConfig>>;
}

/// Everything a declaration compiler needs for one program.
#[derive(Debug, Clone)]
pub struct DtsRequest {
    pub cwd: PathBuf,
    pub tsconfig: TsConfig,
    pub root_names: Vec<PathBuf>,
    /// Declarations land here; `declaration` and `emitDeclarationOnly` are forced on.
    pub out_dir: PathBuf,
}

/// Handle to a long-lived native watcher.
pub trait WatchHandle: Send {
    /// Stops the watcher and releases its resources.
    fn close(&mut self);
}

/// TypeScript declaration emitter.
pub trait DeclarationEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Emits declarations once and returns pre-emit and emit diagnostics.
    fn emit(&self, request: &DtsRequest) -> Result<Vec<Diagnostic>>;

    /// Starts an incremental watch program; diagnostics are pushed as they
    /// are reported.
    fn watch(
        &self,
        request: &DtsRequest,
        diagnostics: Emitter<Diagnostic>,
    ) -> Result<Box<dyn WatchHandle>>;
}

/// One entry point of a bundle request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    pub source: PathBuf,
    /// Output path relative to `out_dir`, without extension.
    pub file_name: String,
}

/// Library-mode bundle of entries sharing a format.
#[derive(Debug, Clone)]
pub struct BundleRequest {
    pub cwd: PathBuf,
    pub entries: Vec<BundleEntry>,
    pub format: Format,
    pub runtime: Runtime,
    pub targets: Vec<String>,
    pub out_dir: PathBuf,
    pub out_extension: &'static str,
    pub external: Vec<String>,
    /// Shared chunks go under this directory inside `out_dir`.
    pub chunk_dir: String,
    pub minify: bool,
    pub sourcemap: bool,
}

pub const CHUNK_DIR: &str = "_chunks";

impl BundleRequest {
    /// Builds the request for a planned JS task.
    pub fn from_task(ctx: &BuildContext, task: &JsTask) -> Result<Self> {
        let source = task.source().ok_or_else(|| Error::TaskExecution {
            task: task.key(),
            message: "bundle has no entries".to_string(),
        })?;

        let output = ctx.resolve(&task.output);
        let relative = output
            .strip_prefix(&ctx.dist_path)
            .map_err(|_| Error::TaskExecution {
                task: task.key(),
                message: format!(
                    "{} is outside of the dist directory {}",
                    output.display(),
                    ctx.dist_path.display()
                ),
            })?;
        let out_extension = ctx.extension(task.format);
        let file_name = file_name_without_extension(relative, out_extension);

        Ok(Self {
            cwd: ctx.cwd.clone(),
            entries: vec![BundleEntry {
                source: ctx.resolve(source),
                file_name,
            }],
            format: task.format,
            runtime: task.runtime,
            targets: ctx.targets_for(task.runtime).to_vec(),
            out_dir: ctx.dist_path.clone(),
            out_extension,
            external: ctx.external.clone(),
            chunk_dir: CHUNK_DIR.to_string(),
            minify: ctx.config.minify,
            sourcemap: ctx.config.sourcemap,
        })
    }

    /// Full path a given entry is written to.
    pub fn output_path(&self, entry: &BundleEntry) -> PathBuf {
        self.out_dir
            .join(format!("{}{}", entry.file_name, self.out_extension))
    }
}

fn file_name_without_extension(relative: &Path, extension: &str) -> String {
    let name = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    name.strip_suffix(extension)
        .map(str::to_string)
        .unwrap_or(name)
}

/// Result of a one-shot bundle.
#[derive(Debug, Clone, Default)]
pub struct BundleOutput {
    pub files: Vec<PathBuf>,
    pub warnings: Vec<String>,
    pub duration: Duration,
}

/// Events a bundler watcher reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleEvent {
    Start,
    BundleStart,
    BundleEnd { duration: Duration },
    End,
    Error(String),
}

/// JavaScript bundler.
pub trait Bundler: Send + Sync {
    fn name(&self) -> &'static str;

    fn bundle(&self, request: &BundleRequest) -> Result<BundleOutput>;

    fn watch(
        &self,
        request: &BundleRequest,
        events: Emitter<BundleEvent>,
    ) -> Result<Box<dyn WatchHandle>>;
}

/// The engines handed to the runner at call time.
#[derive(Clone)]
pub struct Engines {
    pub tsconfig: Arc<dyn TsConfigLoader>,
    pub dts: Arc<dyn DeclarationEngine>,
    pub bundler: Arc<dyn Bundler>,
}

impl Engines {
    pub fn new(
        tsconfig: Arc<dyn TsConfigLoader>,
        dts: Arc<dyn DeclarationEngine>,
        bundler: Arc<dyn Bundler>,
    ) -> Self {
        Self {
            tsconfig,
            dts,
            bundler,
        }
    }
}
