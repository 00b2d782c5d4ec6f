//! Build task data models and the task planner.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::context::BuildContext;
use crate::exports::{Export, ROOT_EXPORT};
use crate::format::{Format, Runtime};
use crate::logger::Logger;
use crate::manifest::SubTarget;

/// One declaration file to emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DtsEntry {
    /// Module specifier consumers import, e.g. `pkg/utils`.
    pub import_id: String,
    pub export_path: String,
    pub source_path: String,
    pub target_path: String,
}

/// Emits declarations for every export with `types`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DtsTask {
    pub entries: Vec<DtsEntry>,
}

/// One entry point of a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsEntry {
    pub path: String,
    pub entry: String,
}

/// Bundles all entries that share one `(format, output)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsTask {
    pub format: Format,
    pub output: String,
    pub runtime: Runtime,
    pub entries: Vec<JsEntry>,
}

impl JsTask {
    /// Deduplication key, `<format>:<output>`.
    pub fn key(&self) -> String {
        task_key(self.format, &self.output)
    }

    /// Source that produces `output`. The first registered entry owns it.
    pub fn source(&self) -> Option<&str> {
        self.entries.first().map(|entry| entry.entry.as_str())
    }

    /// Export paths served by this bundle.
    pub fn export_paths(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.path.as_str()).collect()
    }
}

/// A planned unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BuildTask {
    Dts(DtsTask),
    Js(JsTask),
}

impl BuildTask {
    pub fn name(&self) -> String {
        match self {
            BuildTask::Dts(_) => "build:dts".to_string(),
            BuildTask::Js(task) => format!("build:js:{}", task.key()),
        }
    }
}

pub fn task_key(format: Format, output: &str) -> String {
    format!("{}:{}", format, output)
}

/// Joins a package name with an export path the way consumers import it.
pub fn import_id(package_name: &str, export_path: &str) -> String {
    let subpath = export_path
        .trim_start_matches('.')
        .trim_start_matches('/')
        .trim_end_matches('/');
    if subpath.is_empty() || export_path == ROOT_EXPORT {
        package_name.to_string()
    } else {
        format!("{}/{}", package_name, subpath)
    }
}

/// Guesses the runtime of an export from its path.
///
/// This is a naming convention, not a contract: an explicit runtime on a
/// configured bundle always wins, and anything unrecognised falls back to
/// the configured default.
pub fn classify_runtime(export: &Export, fallback: Runtime) -> Runtime {
    if let Some(runtime) = export.runtime {
        return runtime;
    }
    let path = export.path.to_ascii_lowercase();
    if ["server", "node"].iter().any(|hint| path.contains(hint)) {
        Runtime::Node
    } else if ["admin", "browser", "client", "web"]
        .iter()
        .any(|hint| path.contains(hint))
    {
        Runtime::Web
    } else {
        fallback
    }
}

struct Planner<'a> {
    logger: &'a dyn Logger,
    dts: DtsTask,
    js: IndexMap<String, JsTask>,
}

impl<'a> Planner<'a> {
    fn upsert(
        &mut self,
        format: Format,
        output: &str,
        runtime: Runtime,
        export_path: &str,
        source: Option<&str>,
    ) {
        let Some(source) = source else {
            self.logger.warn(&format!(
                "export {:?} declares a {} output {:?} but no source; skipping",
                export_path, format, output
            ));
            return;
        };

        let key = task_key(format, output);
        let task = self.js.entry(key.clone()).or_insert_with(|| JsTask {
            format,
            output: output.to_string(),
            runtime,
            entries: Vec::new(),
        });

        if task.runtime != runtime {
            self.logger.warn(&format!(
                "{} is shared by exports targeting {} and {}; keeping {}",
                key, task.runtime, runtime, task.runtime
            ));
        }
        if let Some(first) = task.entries.first() {
            if first.entry != source {
                self.logger.warn(&format!(
                    "{} is declared by {:?} from {:?} and by {:?} from {:?}; keeping {:?}",
                    key, first.path, first.entry, export_path, source, first.entry
                ));
            }
        }

        task.entries.push(JsEntry {
            path: export_path.to_string(),
            entry: source.to_string(),
        });
    }

    fn sub_target(&mut self, export: &Export, sub: &SubTarget, runtime: Runtime) {
        let source = sub.source.as_deref().or(export.source.as_deref());
        if let Some(output) = &sub.require {
            self.upsert(Format::Cjs, output, runtime, &export.path, source);
        }
        if let Some(output) = &sub.import {
            self.upsert(Format::Esm, output, runtime, &export.path, source);
        }
    }
}

/// Turns the context's exports and bundles into a deduplicated task list.
///
/// The declaration task, when present, comes first; JS tasks follow in the
/// order their key was first registered.
pub fn create_tasks(ctx: &BuildContext, logger: &dyn Logger) -> Vec<BuildTask> {
    let mut planner = Planner {
        logger,
        dts: DtsTask::default(),
        js: IndexMap::new(),
    };

    for export in ctx.all_entries() {
        if let Some(types) = &export.types {
            match &export.source {
                Some(source) => planner.dts.entries.push(DtsEntry {
                    import_id: import_id(&ctx.package_name, &export.path),
                    export_path: export.path.clone(),
                    source_path: source.clone(),
                    target_path: types.clone(),
                }),
                None => logger.warn(&format!(
                    "export {:?} declares types {:?} but no source; skipping declarations",
                    export.path, types
                )),
            }
        }

        let runtime = classify_runtime(export, ctx.config.runtime);
        let source = export.source.as_deref();
        if let Some(output) = &export.require {
            planner.upsert(Format::Cjs, output, runtime, &export.path, source);
        }
        if let Some(output) = &export.import {
            planner.upsert(Format::Esm, output, runtime, &export.path, source);
        }
        if let Some(browser) = &export.browser {
            planner.sub_target(export, browser, Runtime::Web);
        }
        if let Some(node) = &export.node {
            planner.sub_target(export, node, Runtime::Node);
        }
    }

    let mut tasks = Vec::with_capacity(planner.js.len() + 1);
    if !planner.dts.entries.is_empty() {
        tasks.push(BuildTask::Dts(planner.dts));
    }
    tasks.extend(planner.js.into_values().map(BuildTask::Js));
    tasks
}
