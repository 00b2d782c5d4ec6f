use std::fs;

use packup_core::logger::LogLevel;
use packup_core::manifest::{find_manifest, parse_manifest, validate_manifest};
use packup_core::{load_manifest, Error, MemoryLogger, ModuleType};
use serde_json::json;
use tempfile::TempDir;

#[test]
fn test_minimal_manifest_is_valid() {
    let report = validate_manifest(&json!({"name": "pkg", "version": "0.0.0"}));
    assert!(report.is_valid(), "{:?}", report.errors);
    assert!(report.warnings.is_empty());
}

#[test]
fn test_missing_name_and_version_are_both_reported() {
    let report = validate_manifest(&json!({"main": "./dist/index.js"}));
    assert_eq!(report.errors.len(), 2);
    assert!(report.errors.iter().any(|e| e.contains("`name`")));
    assert!(report.errors.iter().any(|e| e.contains("`version`")));
}

#[test]
fn test_invalid_type_is_rejected() {
    let report = validate_manifest(&json!({"name": "pkg", "version": "1.0.0", "type": "esm"}));
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("`type`"));
}

#[test]
fn test_json_export_must_map_to_itself() {
    let report = validate_manifest(&json!({
        "name": "pkg",
        "version": "1.0.0",
        "exports": {"./package.json": "./other.json"}
    }));
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("./package.json"));
}

#[test]
fn test_unknown_export_key_is_an_error() {
    let report = validate_manifest(&json!({
        "name": "pkg",
        "version": "1.0.0",
        "exports": {
            "./package.json": "./package.json",
            ".": {"source": "./src/index.ts", "deno": "./dist/index.js"}
        }
    }));
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("unknown key `deno`"));
}

#[test]
fn test_types_must_come_first_and_default_last() {
    let report = validate_manifest(&json!({
        "name": "pkg",
        "version": "1.0.0",
        "exports": {
            "./package.json": "./package.json",
            ".": {
                "source": "./src/index.ts",
                "default": "./dist/index.js",
                "types": "./dist/index.d.ts",
                "require": "./dist/index.js"
            }
        }
    }));
    assert_eq!(report.errors.len(), 2, "{:?}", report.errors);
    assert!(report.errors.iter().any(|e| e.contains(".types` must be the first key")));
    assert!(report.errors.iter().any(|e| e.contains(".default` must be the last key")));
}

#[test]
fn test_condition_order_problems_are_warnings() {
    let report = validate_manifest(&json!({
        "name": "pkg",
        "version": "1.0.0",
        "exports": {
            "./package.json": "./package.json",
            ".": {
                "types": "./dist/index.d.ts",
                "require": "./dist/index.js",
                "import": "./dist/index.mjs",
                "module": "./dist/index.mjs"
            }
        }
    }));
    assert!(report.is_valid(), "{:?}", report.errors);
    assert_eq!(report.warnings.len(), 2);
}

#[test]
fn test_sub_target_keys_are_checked() {
    let report = validate_manifest(&json!({
        "name": "pkg",
        "version": "1.0.0",
        "exports": {
            "./package.json": "./package.json",
            ".": {
                "source": "./src/index.ts",
                "browser": {"types": "./dist/browser.d.ts"},
                "node": {"types": "./dist/node.d.ts", "import": "./dist/node.mjs"}
            }
        }
    }));
    assert_eq!(report.errors.len(), 1, "{:?}", report.errors);
    assert!(report.errors[0].contains("browser"));
}

#[test]
fn test_parse_manifest_surfaces_warnings_through_logger() {
    let logger = MemoryLogger::new();
    let manifest = parse_manifest(
        r#"{
            "name": "pkg",
            "version": "1.0.0",
            "type": "module",
            "browserslist": "defaults",
            "exports": {
                "./package.json": "./package.json",
                ".": {"require": "./dist/index.cjs", "import": "./dist/index.js"}
            }
        }"#,
        &logger,
    )
    .unwrap();

    assert_eq!(manifest.module_type, ModuleType::Module);
    assert_eq!(manifest.browserslist, Some(vec!["defaults".to_string()]));
    assert_eq!(logger.messages(LogLevel::Warn).len(), 1);
}

#[test]
fn test_parse_manifest_aggregates_errors() {
    let logger = MemoryLogger::new();
    let err = parse_manifest(r#"{"type": "nope"}"#, &logger).unwrap_err();
    match err {
        Error::InvalidManifest { errors } => assert_eq!(errors.len(), 3),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_load_manifest_walks_up_from_nested_directory() {
    let temp_dir = TempDir::new().unwrap();
    let nested = temp_dir.path().join("src").join("lib");
    fs::create_dir_all(&nested).unwrap();
    fs::write(
        temp_dir.path().join("package.json"),
        r#"{"name": "pkg", "version": "1.0.0"}"#,
    )
    .unwrap();

    let found = find_manifest(&nested).unwrap();
    assert_eq!(found, temp_dir.path().join("package.json"));

    let loaded = load_manifest(&nested, &MemoryLogger::new()).unwrap();
    assert_eq!(loaded.manifest.name, "pkg");
    assert_eq!(loaded.root(), temp_dir.path());
}

#[test]
fn test_load_manifest_reports_malformed_json_with_path() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("package.json"), "{ not json").unwrap();

    let err = load_manifest(temp_dir.path(), &MemoryLogger::new()).unwrap_err();
    assert!(matches!(err, Error::ManifestParse { .. }));
}
