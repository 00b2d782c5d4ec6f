use std::path::PathBuf;

use indexmap::IndexMap;

use crate::context::BuildContext;
use crate::diagnostics::{Diagnostic, DiagnosticSummary, Severity, WATCH_FILE_CHANGE};
use crate::engine::{DtsRequest, Engines, TsConfig};
use crate::error::{Error, Result};
use crate::logger::Logger;
use crate::stream::TaskStream;
use crate::task::{DtsEntry, DtsTask};

use super::{blocking_stream, format_duration, TaskHandler, TaskScope};

const TASK_NAME: &str = "build:dts";

/// Emits declarations for every entry in one pass per tsconfig.
#[derive(Debug, Clone, Copy, Default)]
pub struct DtsBuildHandler;

/// Incremental declaration watcher, one compiler watch program per entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct DtsWatchHandler;

/// What a declaration build produced.
#[derive(Debug, Clone, Default)]
pub struct DtsBuildOutput {
    pub emitted: Vec<DtsEntry>,
    pub skipped: Vec<DtsEntry>,
    pub diagnostics: Vec<Diagnostic>,
}

/// A diagnostic reported by one entry's watch program.
#[derive(Debug, Clone)]
pub struct DtsWatchEvent {
    pub import_id: String,
    pub diagnostic: Diagnostic,
}

fn print_entries(scope: &TaskScope, task: &DtsTask) {
    let logger = &scope.logger;
    logger.log("Building type files:");
    for entry in &task.entries {
        logger.log(&format!(
            "  {}: {} -> {}",
            entry.import_id, entry.source_path, entry.target_path
        ));
    }
}

fn explicit_tsconfig(ctx: &BuildContext) -> Option<PathBuf> {
    ctx.config.tsconfig.as_ref().map(|path| ctx.cwd.join(path))
}

/// Groups entries by the tsconfig that governs them. Entries without one are
/// returned separately.
fn group_by_tsconfig(
    ctx: &BuildContext,
    engines: &Engines,
    entries: &[DtsEntry],
) -> Result<(IndexMap<PathBuf, (TsConfig, Vec<DtsEntry>)>, Vec<DtsEntry>)> {
    let explicit = explicit_tsconfig(ctx);
    let mut groups: IndexMap<PathBuf, (TsConfig, Vec<DtsEntry>)> = IndexMap::new();
    let mut skipped = Vec::new();

    for entry in entries {
        let source = ctx.resolve(&entry.source_path);
        match engines
            .tsconfig
            .load(&ctx.cwd, &source, explicit.as_deref())?
        {
            Some(tsconfig) => {
                groups
                    .entry(tsconfig.path.clone())
                    .or_insert_with(|| (tsconfig, Vec::new()))
                    .1
                    .push(entry.clone());
            }
            None => skipped.push(entry.clone()),
        }
    }

    Ok((groups, skipped))
}

fn request_for(ctx: &BuildContext, tsconfig: TsConfig, entries: &[DtsEntry]) -> DtsRequest {
    DtsRequest {
        cwd: ctx.cwd.clone(),
        tsconfig,
        root_names: entries
            .iter()
            .map(|entry| ctx.resolve(&entry.source_path))
            .collect(),
        out_dir: ctx.dist_path.clone(),
    }
}

fn warn_skipped(logger: &dyn Logger, entry: &DtsEntry) {
    logger.warn(&format!(
        "no tsconfig found for {}, skipping type declarations for {}",
        entry.source_path, entry.import_id
    ));
}

fn build_declarations(
    ctx: &BuildContext,
    engines: &Engines,
    logger: &dyn Logger,
    task: &DtsTask,
) -> Result<DtsBuildOutput> {
    let (groups, skipped) = group_by_tsconfig(ctx, engines, &task.entries)?;
    for entry in &skipped {
        warn_skipped(logger, entry);
    }

    let mut output = DtsBuildOutput {
        skipped,
        ..Default::default()
    };

    for (path, (tsconfig, entries)) in groups {
        logger.debug(&format!(
            "Emitting declarations for {} entries using {}",
            entries.len(),
            path.display()
        ));
        let request = request_for(ctx, tsconfig, &entries);
        output.diagnostics.extend(engines.dts.emit(&request)?);
        output.emitted.extend(entries);
    }

    let errors: Vec<String> = output
        .diagnostics
        .iter()
        .filter(|diagnostic| diagnostic.is_error())
        .map(ToString::to_string)
        .collect();
    if !errors.is_empty() {
        for diagnostic in output.diagnostics.iter().filter(|d| !d.is_error()) {
            log_diagnostic(logger, diagnostic, true);
        }
        return Err(Error::Diagnostics {
            task: TASK_NAME.to_string(),
            errors,
        });
    }

    Ok(output)
}

fn log_diagnostic(logger: &dyn Logger, diagnostic: &Diagnostic, verbose: bool) {
    let message = diagnostic.to_string();
    match diagnostic.severity {
        Severity::Error => logger.error(&message),
        Severity::Warning => logger.warn(&message),
        Severity::Suggestion | Severity::Message if verbose => logger.info(&message),
        Severity::Suggestion | Severity::Message => logger.debug(&message),
    }
}

impl TaskHandler for DtsBuildHandler {
    type Task = DtsTask;
    type Output = DtsBuildOutput;

    fn print(&self, scope: &mut TaskScope, task: &DtsTask) {
        print_entries(scope, task);
    }

    fn run(&self, scope: &TaskScope, task: &DtsTask) -> TaskStream<Result<DtsBuildOutput>> {
        let ctx = scope.ctx.clone();
        let engines = scope.engines.clone();
        let logger = scope.logger.clone();
        let task = task.clone();
        blocking_stream(TASK_NAME.to_string(), move || {
            build_declarations(&ctx, &engines, logger.as_ref(), &task)
        })
    }

    fn success(&self, scope: &mut TaskScope, _task: &DtsTask, output: DtsBuildOutput) {
        let logger = &scope.logger;
        for diagnostic in &output.diagnostics {
            log_diagnostic(logger.as_ref(), diagnostic, true);
        }

        for entry in &output.emitted {
            let target = scope.ctx.resolve(&entry.target_path);
            if !target.is_file() {
                logger.warn(&format!(
                    "expected declaration file {} was not emitted for {}",
                    entry.target_path, entry.import_id
                ));
            }
        }

        let summary = DiagnosticSummary::from_diagnostics(&output.diagnostics);
        let elapsed = scope
            .elapsed()
            .map(|d| format!(" in {}", format_duration(d)))
            .unwrap_or_default();
        logger.success(&format!(
            "Built type files for {} entries ({} skipped, {} warnings){}",
            output.emitted.len(),
            output.skipped.len(),
            summary.warnings,
            elapsed
        ));
    }

    fn fail(&self, scope: &mut TaskScope, _task: &DtsTask, error: &Error) {
        scope
            .logger
            .error(&format!("Failed to build type files: {}", error));
    }
}

impl TaskHandler for DtsWatchHandler {
    type Task = DtsTask;
    type Output = DtsWatchEvent;

    fn print(&self, scope: &mut TaskScope, task: &DtsTask) {
        print_entries(scope, task);
    }

    fn run(&self, scope: &TaskScope, task: &DtsTask) -> TaskStream<Result<DtsWatchEvent>> {
        let (emitter, stream) = TaskStream::channel();
        let ctx = scope.ctx.as_ref();
        let explicit = explicit_tsconfig(ctx);
        let mut handles = Vec::new();
        let mut forwarders = Vec::new();

        for entry in &task.entries {
            let source = ctx.resolve(&entry.source_path);
            let tsconfig = match scope
                .engines
                .tsconfig
                .load(&ctx.cwd, &source, explicit.as_deref())
            {
                Ok(Some(tsconfig)) => tsconfig,
                Ok(None) => {
                    warn_skipped(scope.logger.as_ref(), entry);
                    continue;
                }
                Err(e) => {
                    emitter.emit(Err(e));
                    continue;
                }
            };

            let request = request_for(ctx, tsconfig, std::slice::from_ref(entry));
            let (diagnostics, mut incoming) = TaskStream::<Diagnostic>::channel();
            match scope.engines.dts.watch(&request, diagnostics) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    emitter.emit(Err(e));
                    continue;
                }
            }

            let emitter = emitter.clone();
            let import_id = entry.import_id.clone();
            forwarders.push(tokio::spawn(async move {
                while let Some(diagnostic) = incoming.next().await {
                    let event = DtsWatchEvent {
                        import_id: import_id.clone(),
                        diagnostic,
                    };
                    if !emitter.emit(Ok(event)) {
                        break;
                    }
                }
            }));
        }

        stream.on_teardown(move || {
            for forwarder in forwarders {
                forwarder.abort();
            }
            for mut handle in handles {
                handle.close();
            }
        })
    }

    fn success(&self, scope: &mut TaskScope, task: &DtsTask, event: DtsWatchEvent) {
        let diagnostic = &event.diagnostic;
        if diagnostic.code == WATCH_FILE_CHANGE {
            scope.start();
            return;
        }
        if diagnostic.is_clean_rebuild() {
            self.print(scope, task);
            let elapsed = scope
                .elapsed()
                .map(|d| format!(" in {}", format_duration(d)))
                .unwrap_or_default();
            scope.logger.success(&format!(
                "Rebuilt type files for {}{}",
                event.import_id, elapsed
            ));
            return;
        }
        match diagnostic.severity {
            Severity::Error | Severity::Warning => {
                log_diagnostic(scope.logger.as_ref(), diagnostic, false)
            }
            Severity::Suggestion | Severity::Message => {}
        }
    }

    fn fail(&self, scope: &mut TaskScope, _task: &DtsTask, error: &Error) {
        scope
            .logger
            .error(&format!("Type file watcher error: {}", error));
    }
}
