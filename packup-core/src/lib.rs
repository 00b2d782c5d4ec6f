//! Core library for planning and running package builds.
//!
//! A `package.json` is validated, its export map resolved into canonical
//! export records, and those records planned into a deduplicated list of
//! declaration and bundle tasks. Tasks run through handlers that share one
//! contract for one-shot builds and long-lived watchers.

pub mod check;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod exports;
pub mod format;
pub mod handlers;
pub mod logger;
pub mod manifest;
pub mod path_utils;
pub mod runner;
pub mod stream;
pub mod task;

pub use check::check_outputs;
pub use config::{BundleConfig, Config, ConfigOverrides};
pub use context::{create_build_context, BuildContext};
pub use diagnostics::{Diagnostic, Severity};
pub use engine::{
    BundleEvent, BundleOutput, BundleRequest, Bundler, DeclarationEngine, DtsRequest, Engines,
    TsConfig, TsConfigLoader, WatchHandle,
};
pub use error::{Error, Result};
pub use exports::{resolve_exports, Export};
pub use format::{ExtMap, Format, ModuleType, Runtime};
pub use handlers::{TaskHandler, TaskScope};
pub use logger::{Logger, MemoryLogger, TracingLogger};
pub use manifest::{load_manifest, LoadedManifest, Manifest};
pub use runner::{Plan, TaskResult, TaskRunner};
pub use stream::{Emitter, TaskStream};
pub use task::{create_tasks, BuildTask, DtsTask, JsTask};
