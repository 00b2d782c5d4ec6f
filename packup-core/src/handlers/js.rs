use crate::engine::{BundleEvent, BundleOutput, BundleRequest};
use crate::error::{Error, Result};
use crate::stream::TaskStream;
use crate::task::JsTask;

use super::{blocking_stream, format_duration, TaskHandler, TaskScope};

/// Bundles one `(format, output)` task once.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsBuildHandler;

/// Keeps one bundler watcher alive per `(format, output)` task.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsWatchHandler;

fn print_task(scope: &TaskScope, task: &JsTask) {
    let logger = &scope.logger;
    logger.log("Building javascript files:");
    logger.log(&format!("  format: {}", task.format));
    logger.log(&format!("  runtime: {}", task.runtime));
    logger.log(&format!(
        "  targets: {}",
        scope.ctx.targets_for(task.runtime).join(", ")
    ));
    logger.log(&format!("  output: {}", task.output));
    for entry in &task.entries {
        logger.log(&format!("  entry: {} ({})", entry.path, entry.entry));
    }
}

impl TaskHandler for JsBuildHandler {
    type Task = JsTask;
    type Output = BundleOutput;

    fn print(&self, scope: &mut TaskScope, task: &JsTask) {
        print_task(scope, task);
    }

    fn run(&self, scope: &TaskScope, task: &JsTask) -> TaskStream<Result<BundleOutput>> {
        let request = match BundleRequest::from_task(&scope.ctx, task) {
            Ok(request) => request,
            Err(e) => return TaskStream::once(Err(e)),
        };
        let bundler = scope.engines.bundler.clone();
        blocking_stream(task.key(), move || bundler.bundle(&request))
    }

    fn success(&self, scope: &mut TaskScope, task: &JsTask, output: BundleOutput) {
        let logger = &scope.logger;
        for warning in &output.warnings {
            logger.warn(warning);
        }
        for file in &output.files {
            logger.debug(&format!("  wrote {}", file.display()));
        }
        logger.success(&format!(
            "Built {} ({}) in {}",
            task.output,
            task.format,
            format_duration(output.duration)
        ));
    }

    fn fail(&self, scope: &mut TaskScope, task: &JsTask, error: &Error) {
        scope
            .logger
            .error(&format!("Failed to build {}: {}", task.key(), error));
    }
}

impl TaskHandler for JsWatchHandler {
    type Task = JsTask;
    type Output = BundleEvent;

    fn print(&self, scope: &mut TaskScope, task: &JsTask) {
        print_task(scope, task);
    }

    fn run(&self, scope: &TaskScope, task: &JsTask) -> TaskStream<Result<BundleEvent>> {
        let request = match BundleRequest::from_task(&scope.ctx, task) {
            Ok(request) => request,
            Err(e) => return TaskStream::once(Err(e)),
        };

        let (emitter, stream) = TaskStream::channel();
        let (events, mut incoming) = TaskStream::<BundleEvent>::channel();
        let mut handle = match scope.engines.bundler.watch(&request, events) {
            Ok(handle) => handle,
            Err(e) => return TaskStream::once(Err(e)),
        };

        let key = task.key();
        let forwarder = tokio::spawn(async move {
            while let Some(event) = incoming.next().await {
                let item = match event {
                    BundleEvent::Error(message) => Err(Error::TaskExecution {
                        task: key.clone(),
                        message,
                    }),
                    other => Ok(other),
                };
                if !emitter.emit(item) {
                    break;
                }
            }
        });

        stream.on_teardown(move || {
            forwarder.abort();
            handle.close();
        })
    }

    fn success(&self, scope: &mut TaskScope, task: &JsTask, event: BundleEvent) {
        match event {
            BundleEvent::Start | BundleEvent::BundleStart => scope.start(),
            BundleEvent::BundleEnd { duration } => {
                self.print(scope, task);
                scope.logger.success(&format!(
                    "Rebuilt {} ({}) in {}",
                    task.output,
                    task.format,
                    format_duration(duration)
                ));
            }
            BundleEvent::End => {}
            BundleEvent::Error(message) => scope.logger.error(&message),
        }
    }

    fn fail(&self, scope: &mut TaskScope, task: &JsTask, error: &Error) {
        scope
            .logger
            .error(&format!("Bundle error in {}: {}", task.key(), error));
    }
}
