use std::fs;
use std::path::Path;

use packup_core::TsConfigLoader;
use packup_engines::tsconfig::{
    compile_glob, find_tsconfig, parse_jsonc, read_tsconfig, MATCH_OPTIONS,
};
use packup_engines::FileTsConfigLoader;
use tempfile::TempDir;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn test_parse_jsonc_strips_comments_and_trailing_commas() {
    let value = parse_jsonc(
        r#"{
            // line comment
            "compilerOptions": {
                /* block */ "strict": true,
                "paths": {"@/*": ["./src/*"]},
            },
            "include": ["src/**/*",],
        }"#,
    )
    .unwrap();
    assert_eq!(value["compilerOptions"]["strict"], true);
    assert_eq!(value["compilerOptions"]["paths"]["@/*"][0], "./src/*");
    assert_eq!(value["include"][0], "src/**/*");
}

#[test]
fn test_parse_jsonc_keeps_comment_markers_inside_strings() {
    let value = parse_jsonc(r#"{"url": "http://example.com/*x*/", "a": "\"//\""}"#).unwrap();
    assert_eq!(value["url"], "http://example.com/*x*/");
    assert_eq!(value["a"], "\"//\"");
}

fn matches(pattern: &str, path: &str) -> bool {
    compile_glob(pattern).unwrap().matches_with(path, MATCH_OPTIONS)
}

#[test]
fn test_glob_patterns() {
    assert!(matches("/p/src/**/*", "/p/src/index.ts"));
    assert!(matches("/p/src/**/*", "/p/src/a/b/c.ts"));
    assert!(!matches("/p/src/**/*", "/p/test/index.ts"));

    assert!(matches("/p/src/*.ts", "/p/src/index.ts"));
    assert!(!matches("/p/src/*.ts", "/p/src/nested/index.ts"));

    assert!(matches("/p/src", "/p/src/deep/file.ts"));
    assert!(!matches("/p/src", "/p/srcs/file.ts"));
}

#[test]
fn test_dotted_directory_is_expanded() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(&root.join("src/v1.0/index.ts"), "export {}");
    write(&root.join("src/other.ts"), "export {}");
    write(&root.join("tsconfig.json"), r#"{"include": ["src/v1.0"]}"#);

    let config = read_tsconfig(&root.join("tsconfig.json")).unwrap();
    assert_eq!(config.file_names.len(), 1);
    assert!(config.file_names[0].ends_with("src/v1.0/index.ts"));
}

#[test]
fn test_read_tsconfig_expands_include_and_exclude() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(&root.join("src/index.ts"), "export {}");
    write(&root.join("src/util/strings.ts"), "export {}");
    write(&root.join("src/index.test.ts"), "export {}");
    write(&root.join("src/readme.md"), "");
    write(&root.join("dist/index.d.ts"), "");
    write(&root.join("node_modules/dep/index.ts"), "");
    write(
        &root.join("tsconfig.json"),
        r#"{
            "compilerOptions": {"outDir": "dist"},
            "exclude": ["src/**/*.test.ts"]
        }"#,
    );

    let config = read_tsconfig(&root.join("tsconfig.json")).unwrap();
    let mut names: Vec<String> = config
        .file_names
        .iter()
        .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
        .collect();
    names.sort();
    assert_eq!(names, vec!["src/index.ts", "src/util/strings.ts"]);
    assert_eq!(config.compiler_options["outDir"], "dist");
}

#[test]
fn test_extends_merges_compiler_options() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(&root.join("src/index.ts"), "export {}");
    write(
        &root.join("configs/base.json"),
        r#"{
            "compilerOptions": {"strict": true, "target": "es2019"},
            "include": ["../src"]
        }"#,
    );
    write(
        &root.join("tsconfig.json"),
        r#"{
            "extends": "./configs/base",
            "compilerOptions": {"target": "es2022"}
        }"#,
    );

    let config = read_tsconfig(&root.join("tsconfig.json")).unwrap();
    assert_eq!(config.compiler_options["strict"], true);
    assert_eq!(config.compiler_options["target"], "es2022");
    assert_eq!(config.file_names, vec![root.join("src/index.ts")]);
}

#[test]
fn test_extends_from_node_modules_package() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(&root.join("src/index.ts"), "export {}");
    write(
        &root.join("node_modules/@acme/tsconfig/tsconfig.json"),
        r#"{"compilerOptions": {"declarationMap": true}}"#,
    );
    write(&root.join("tsconfig.json"), r#"{"extends": "@acme/tsconfig"}"#);

    let config = read_tsconfig(&root.join("tsconfig.json")).unwrap();
    assert_eq!(config.compiler_options["declarationMap"], true);
}

#[test]
fn test_unresolvable_extends_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    write(
        &temp_dir.path().join("tsconfig.json"),
        r#"{"extends": "./missing.json"}"#,
    );
    assert!(read_tsconfig(&temp_dir.path().join("tsconfig.json")).is_err());
}

#[test]
fn test_find_tsconfig_prefers_nearest_and_build_config() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(&root.join("tsconfig.json"), "{}");
    write(&root.join("tsconfig.build.json"), "{}");
    write(&root.join("packages/a/tsconfig.json"), "{}");

    let nested = find_tsconfig(root, &root.join("packages/a/src/index.ts")).unwrap();
    assert_eq!(nested, root.join("packages/a/tsconfig.json"));

    let top = find_tsconfig(root, &root.join("src/index.ts")).unwrap();
    assert_eq!(top, root.join("tsconfig.build.json"));
}

#[test]
fn test_loader_returns_none_without_config() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("pkg");
    write(&root.join("src/index.ts"), "export {}");

    let loaded = FileTsConfigLoader
        .load(&root, &root.join("src/index.ts"), None)
        .unwrap();
    assert!(loaded.is_none());
}

#[test]
fn test_loader_rejects_missing_explicit_config() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let missing = root.join("tsconfig.lib.json");
    assert!(FileTsConfigLoader
        .load(root, &root.join("src/index.ts"), Some(&missing))
        .is_err());
}
