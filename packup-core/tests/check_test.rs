use std::fs;

use packup_core::{check_outputs, ConfigOverrides, Error, MemoryLogger, Plan};
use tempfile::TempDir;

fn write_package(dir: &std::path::Path) {
    fs::write(
        dir.join("package.json"),
        r#"{
            "name": "pkg",
            "version": "1.0.0",
            "main": "./dist/index.js",
            "module": "./dist/index.mjs",
            "types": "./dist/index.d.ts",
            "source": "./src/index.ts"
        }"#,
    )
    .unwrap();
}

#[test]
fn test_all_missing_outputs_are_reported_together() {
    let temp_dir = TempDir::new().unwrap();
    write_package(temp_dir.path());
    fs::create_dir_all(temp_dir.path().join("dist")).unwrap();
    fs::write(temp_dir.path().join("dist/index.js"), "").unwrap();

    let plan = Plan::load(temp_dir.path(), &ConfigOverrides::default(), &MemoryLogger::new()).unwrap();
    match check_outputs(&plan.ctx) {
        Err(Error::MissingOutputs { missing }) => {
            assert_eq!(missing, vec!["./dist/index.mjs", "./dist/index.d.ts"]);
        }
        other => panic!("expected missing outputs, got {:?}", other),
    }
}

#[test]
fn test_present_outputs_pass() {
    let temp_dir = TempDir::new().unwrap();
    write_package(temp_dir.path());
    let dist = temp_dir.path().join("dist");
    fs::create_dir_all(&dist).unwrap();
    for file in ["index.js", "index.mjs", "index.d.ts"] {
        fs::write(dist.join(file), "").unwrap();
    }

    let plan = Plan::load(temp_dir.path(), &ConfigOverrides::default(), &MemoryLogger::new()).unwrap();
    let checked = check_outputs(&plan.ctx).unwrap();
    assert_eq!(checked.len(), 3);
}
