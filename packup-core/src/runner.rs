//! Plans a package and executes its tasks in build or watch mode.

use std::fs;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;

use crate::config::{Config, ConfigOverrides};
use crate::context::BuildContext;
use crate::engine::Engines;
use crate::error::{Error, Result};
use crate::handlers::{
    DtsBuildHandler, DtsWatchHandler, JsBuildHandler, JsWatchHandler, TaskHandler, TaskScope,
};
use crate::logger::Logger;
use crate::manifest::load_manifest;
use crate::task::{create_tasks, BuildTask};

/// A validated build context with its planned tasks.
#[derive(Debug, Clone)]
pub struct Plan {
    pub ctx: Arc<BuildContext>,
    pub tasks: Vec<BuildTask>,
}

impl Plan {
    /// Loads the nearest manifest and `packup.toml`, then plans the tasks.
    /// Every validation problem surfaces here, before anything is built.
    pub fn load(cwd: &Path, overrides: &ConfigOverrides, logger: &dyn Logger) -> Result<Self> {
        let loaded = load_manifest(cwd, logger)?;
        let mut config = Config::load(loaded.root())?;
        overrides.apply(&mut config);

        let ctx = BuildContext::new(&loaded, config)?;
        logger.debug(&format!("dist path: {}", ctx.dist_path.display()));
        logger.debug(&format!("externals: {}", ctx.external.join(", ")));

        let tasks = create_tasks(&ctx, logger);
        Ok(Self {
            ctx: Arc::new(ctx),
            tasks,
        })
    }
}

/// Result of executing one task in build mode.
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// Name of the task that was executed.
    pub task_name: String,
    /// Whether the task succeeded.
    pub success: bool,
    /// Error message when the task failed.
    pub error: Option<String>,
    pub duration: Duration,
}

/// Executes planned tasks.
pub struct TaskRunner {
    logger: Arc<dyn Logger>,
    engines: Engines,
}

impl TaskRunner {
    pub fn new(logger: Arc<dyn Logger>, engines: Engines) -> Self {
        Self { logger, engines }
    }

    fn scope(&self, plan: &Plan) -> TaskScope {
        TaskScope::new(plan.ctx.clone(), self.logger.clone(), self.engines.clone())
    }

    /// Runs every task once, in plan order. Stops at the first failure; the
    /// failing task is the last entry of the returned results.
    pub async fn build(&self, plan: &Plan) -> Result<Vec<TaskResult>> {
        clean_dist(&plan.ctx)?;

        let mut results = Vec::with_capacity(plan.tasks.len());
        for task in &plan.tasks {
            let mut scope = self.scope(plan);
            let started = Instant::now();
            let outcome = match task {
                BuildTask::Dts(task) => run_once(&DtsBuildHandler, &mut scope, task).await,
                BuildTask::Js(task) => run_once(&JsBuildHandler, &mut scope, task).await,
            };

            let success = outcome.is_ok();
            results.push(TaskResult {
                task_name: task.name(),
                success,
                error: outcome.err().map(|e| e.to_string()),
                duration: started.elapsed(),
            });
            if !success {
                break;
            }
        }

        Ok(results)
    }

    /// Subscribes to every task concurrently and keeps them running until
    /// `shutdown` resolves. Task failures are logged and never end the session.
    pub async fn watch<F>(&self, plan: &Plan, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut sessions = Vec::with_capacity(plan.tasks.len());

        for task in plan.tasks.clone() {
            let scope = self.scope(plan);
            let stop = stop_rx.clone();
            sessions.push(tokio::spawn(async move {
                match task {
                    BuildTask::Dts(task) => run_watch(DtsWatchHandler, scope, task, stop).await,
                    BuildTask::Js(task) => run_watch(JsWatchHandler, scope, task, stop).await,
                }
            }));
        }

        shutdown.await;
        self.logger.info("Stopping watchers...");
        let _ = stop_tx.send(true);

        for session in sessions {
            session.await.map_err(|e| Error::TaskExecution {
                task: "watch".to_string(),
                message: format!("watch session ended abnormally: {}", e),
            })?;
        }

        Ok(())
    }
}

/// Drives a build-mode stream to completion.
async fn run_once<H: TaskHandler>(handler: &H, scope: &mut TaskScope, task: &H::Task) -> Result<()> {
    handler.print(scope, task);
    scope.start();

    let mut stream = handler.run(scope, task);
    while let Some(item) = stream.next().await {
        match item {
            Ok(output) => handler.success(scope, task, output),
            Err(e) => {
                handler.fail(scope, task, &e);
                return Err(e);
            }
        }
    }
    Ok(())
}

/// Drives a watch-mode stream until it ends or `stop` flips. Dropping the
/// stream on exit tears down its watcher.
async fn run_watch<H: TaskHandler>(
    handler: H,
    mut scope: TaskScope,
    task: H::Task,
    mut stop: watch::Receiver<bool>,
) {
    handler.print(&mut scope, &task);
    scope.start();

    let mut stream = handler.run(&scope, &task);
    loop {
        tokio::select! {
            item = stream.next() => match item {
                Some(Ok(output)) => handler.success(&mut scope, &task, output),
                Some(Err(e)) => handler.fail(&mut scope, &task, &e),
                None => break,
            },
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
        }
    }

    stream.unsubscribe();
}

/// Removes and recreates the output directory.
pub fn clean_dist(ctx: &BuildContext) -> Result<()> {
    if ctx.dist_path.exists() {
        fs::remove_dir_all(&ctx.dist_path)?;
    }
    fs::create_dir_all(&ctx.dist_path)?;
    Ok(())
}
