//! Task handlers: one build and one watch handler per task kind.
//!
//! Handlers are stateless. Everything that changes during a run lives in the
//! [`TaskScope`] created for that run, so two handlers of the same kind can
//! run side by side without sharing anything mutable.

mod dts;
mod js;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::context::BuildContext;
use crate::engine::Engines;
use crate::error::{Error, Result};
use crate::logger::Logger;
use crate::stream::TaskStream;

pub use dts::{DtsBuildHandler, DtsBuildOutput, DtsWatchEvent, DtsWatchHandler};
pub use js::{JsBuildHandler, JsWatchHandler};

/// Per-run state threaded through every handler call.
#[derive(Clone)]
pub struct TaskScope {
    pub ctx: Arc<BuildContext>,
    pub logger: Arc<dyn Logger>,
    pub engines: Engines,
    started: Option<Instant>,
}

impl TaskScope {
    pub fn new(ctx: Arc<BuildContext>, logger: Arc<dyn Logger>, engines: Engines) -> Self {
        Self {
            ctx,
            logger,
            engines,
            started: None,
        }
    }

    /// Marks the start of a (re)build.
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.started.map(|started| started.elapsed())
    }
}

/// Uniform contract every task kind implements.
pub trait TaskHandler: Send + Sync {
    type Task: Send + Sync;
    type Output: Send + 'static;

    /// Describes the task. Logging only.
    fn print(&self, scope: &mut TaskScope, task: &Self::Task);

    /// Starts the work. Build handlers yield once and complete; watch handlers
    /// keep yielding until unsubscribed.
    fn run(&self, scope: &TaskScope, task: &Self::Task) -> TaskStream<Result<Self::Output>>;

    fn success(&self, scope: &mut TaskScope, task: &Self::Task, output: Self::Output);

    fn fail(&self, scope: &mut TaskScope, task: &Self::Task, error: &Error);
}

/// Runs blocking engine work off the async runtime as a one-shot stream.
pub(crate) fn blocking_stream<T, F>(task_name: String, work: F) -> TaskStream<Result<T>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    TaskStream::from_future(async move {
        tokio::task::spawn_blocking(work)
            .await
            .map_err(|e| Error::TaskExecution {
                task: task_name,
                message: format!("worker panicked or was cancelled: {}", e),
            })?
    })
}

pub(crate) fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs_f64();
    if seconds < 1.0 {
        format!("{:.0}ms", seconds * 1000.0)
    } else {
        format!("{:.2}s", seconds)
    }
}
