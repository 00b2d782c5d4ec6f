use std::path::Path;

use packup_core::logger::LogLevel;
use packup_core::manifest::Manifest;
use packup_core::task::{classify_runtime, import_id};
use packup_core::{
    create_build_context, create_tasks, BuildTask, BundleConfig, Config, Export, Format,
    MemoryLogger, Runtime,
};
use serde_json::json;

fn plan(value: serde_json::Value, config: Config) -> (Vec<BuildTask>, MemoryLogger) {
    let manifest: Manifest = serde_json::from_value(value).unwrap();
    let ctx = create_build_context(Path::new("/work/pkg"), &manifest, config).unwrap();
    let logger = MemoryLogger::new();
    let tasks = create_tasks(&ctx, &logger);
    (tasks, logger)
}

fn js_tasks(tasks: &[BuildTask]) -> Vec<&packup_core::JsTask> {
    tasks
        .iter()
        .filter_map(|task| match task {
            BuildTask::Js(js) => Some(js),
            BuildTask::Dts(_) => None,
        })
        .collect()
}

#[test]
fn test_root_fields_plan_declarations_and_both_formats() {
    let (tasks, _) = plan(
        json!({
            "name": "pkg",
            "version": "0.0.0",
            "main": "./dist/index.js",
            "module": "./dist/index.mjs",
            "types": "./dist/index.d.ts",
            "source": "./src/index.ts"
        }),
        Config::default(),
    );

    assert_eq!(tasks.len(), 3);

    let BuildTask::Dts(dts) = &tasks[0] else {
        panic!("declaration task must come first");
    };
    assert_eq!(dts.entries.len(), 1);
    assert_eq!(dts.entries[0].import_id, "pkg");
    assert_eq!(dts.entries[0].source_path, "./src/index.ts");
    assert_eq!(dts.entries[0].target_path, "./dist/index.d.ts");

    let js = js_tasks(&tasks);
    assert_eq!(js.len(), 2);
    assert_eq!(js[0].format, Format::Cjs);
    assert_eq!(js[0].output, "./dist/index.js");
    assert_eq!(js[0].entries.len(), 1);
    assert_eq!(js[1].format, Format::Esm);
    assert_eq!(js[1].output, "./dist/index.mjs");
    assert_eq!(js[1].entries.len(), 1);
    assert_eq!(tasks[1].name(), "build:js:cjs:./dist/index.js");
}

#[test]
fn test_exports_sharing_an_output_merge_into_one_task() {
    let (tasks, logger) = plan(
        json!({
            "name": "pkg",
            "version": "1.0.0",
            "exports": {
                "./package.json": "./package.json",
                "./a": {"source": "./src/shared.ts", "require": "./dist/shared.js"},
                "./b": {"source": "./src/shared.ts", "require": "./dist/shared.js"}
            }
        }),
        Config::default(),
    );

    let js = js_tasks(&tasks);
    assert_eq!(js.len(), 1);
    assert_eq!(js[0].entries.len(), 2);
    assert_eq!(js[0].export_paths(), vec!["./a", "./b"]);
    assert!(logger.messages(LogLevel::Warn).is_empty());
}

#[test]
fn test_conflicting_sources_keep_the_first_and_warn() {
    let (tasks, logger) = plan(
        json!({
            "name": "pkg",
            "version": "1.0.0",
            "exports": {
                "./package.json": "./package.json",
                "./a": {"source": "./src/a.ts", "require": "./dist/shared.js"},
                "./b": {"source": "./src/b.ts", "require": "./dist/shared.js"}
            }
        }),
        Config::default(),
    );

    let js = js_tasks(&tasks);
    assert_eq!(js[0].source(), Some("./src/a.ts"));
    assert_eq!(logger.messages(LogLevel::Warn).len(), 1);
}

#[test]
fn test_named_export_import_ids_and_runtimes() {
    let (tasks, _) = plan(
        json!({
            "name": "@scope/pkg",
            "version": "1.0.0",
            "exports": {
                "./package.json": "./package.json",
                "./server": {
                    "types": "./dist/server.d.ts",
                    "source": "./src/server.ts",
                    "require": "./dist/server.js"
                },
                "./client": {
                    "types": "./dist/client.d.ts",
                    "source": "./src/client.ts",
                    "import": "./dist/client.mjs"
                },
                "./utils": {"source": "./src/utils.ts", "import": "./dist/utils.mjs"}
            }
        }),
        Config::default(),
    );

    let BuildTask::Dts(dts) = &tasks[0] else {
        panic!("declaration task must come first");
    };
    let ids: Vec<&str> = dts.entries.iter().map(|e| e.import_id.as_str()).collect();
    assert_eq!(ids, vec!["@scope/pkg/server", "@scope/pkg/client"]);

    let runtimes: Vec<Runtime> = js_tasks(&tasks).iter().map(|t| t.runtime).collect();
    assert_eq!(runtimes, vec![Runtime::Node, Runtime::Web, Runtime::Universal]);
}

#[test]
fn test_sub_targets_plan_their_own_tasks() {
    let (tasks, _) = plan(
        json!({
            "name": "pkg",
            "version": "1.0.0",
            "exports": {
                "./package.json": "./package.json",
                ".": {
                    "source": "./src/index.ts",
                    "browser": {"source": "./src/browser.ts", "import": "./dist/browser.mjs"},
                    "node": {"require": "./dist/node.js"},
                    "import": "./dist/index.mjs"
                }
            }
        }),
        Config::default(),
    );

    let js = js_tasks(&tasks);
    assert_eq!(js.len(), 3);
    assert_eq!(js[1].runtime, Runtime::Web);
    assert_eq!(js[1].source(), Some("./src/browser.ts"));
    assert_eq!(js[2].runtime, Runtime::Node);
    assert_eq!(js[2].source(), Some("./src/index.ts"));
}

#[test]
fn test_outputs_without_source_are_skipped_with_warning() {
    let (tasks, logger) = plan(
        json!({
            "name": "pkg",
            "version": "1.0.0",
            "main": "./dist/index.js",
            "types": "./dist/index.d.ts"
        }),
        Config::default(),
    );

    assert!(tasks.is_empty());
    assert_eq!(logger.messages(LogLevel::Warn).len(), 2);
}

#[test]
fn test_configured_bundle_runtime_overrides_heuristic() {
    let config = Config {
        bundles: vec![BundleConfig {
            source: "./src/web-worker.ts".to_string(),
            import: None,
            require: Some("./dist/worker.js".to_string()),
            types: None,
            runtime: Some(Runtime::Node),
        }],
        ..Config::default()
    };
    let (tasks, _) = plan(
        json!({
            "name": "pkg",
            "version": "1.0.0",
            "main": "./dist/index.js",
            "source": "./src/index.ts"
        }),
        config,
    );

    let js = js_tasks(&tasks);
    assert_eq!(js.len(), 2);
    assert_eq!(js[1].runtime, Runtime::Node);
}

#[test]
fn test_import_id_forms() {
    assert_eq!(import_id("pkg", "."), "pkg");
    assert_eq!(import_id("pkg", "./utils"), "pkg/utils");
    assert_eq!(import_id("@s/pkg", "./a/b/"), "@s/pkg/a/b");
}

#[test]
fn test_classify_runtime_uses_fallback() {
    let export = Export {
        path: "./misc".to_string(),
        ..Default::default()
    };
    assert_eq!(classify_runtime(&export, Runtime::Universal), Runtime::Universal);
    assert_eq!(classify_runtime(&export, Runtime::Web), Runtime::Web);

    let admin = Export {
        path: "./admin".to_string(),
        ..Default::default()
    };
    assert_eq!(classify_runtime(&admin, Runtime::Universal), Runtime::Web);
}

#[test]
fn test_tasks_serialize_with_type_tag() {
    let (tasks, _) = plan(
        json!({
            "name": "pkg",
            "version": "1.0.0",
            "types": "./dist/index.d.ts",
            "source": "./src/index.ts"
        }),
        Config::default(),
    );

    let value = serde_json::to_value(&tasks).unwrap();
    assert_eq!(value[0]["type"], "dts");
    assert_eq!(value[0]["entries"][0]["importId"], "pkg");
}
