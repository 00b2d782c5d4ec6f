use std::path::PathBuf;

use packup_core::diagnostics::{
    WATCH_FILE_CHANGE, WATCH_FOUND_ERRORS, WATCH_FOUND_ONE_ERROR, WATCH_STARTING,
};
use packup_core::{Diagnostic, DtsRequest, Severity, TsConfig};
use packup_engines::tsc::{build_config, TscOutputParser};
use serde_json::Map;

fn parse(lines: &[&str]) -> Vec<Diagnostic> {
    let mut parser = TscOutputParser::default();
    let mut diagnostics = Vec::new();
    for line in lines {
        diagnostics.extend(parser.push_line(line));
    }
    diagnostics.extend(parser.finish());
    diagnostics
}

#[test]
fn test_located_diagnostic() {
    let diagnostics = parse(&[
        "src/index.ts(3,7): error TS2322: Type 'string' is not assignable to type 'number'.",
    ]);
    assert_eq!(diagnostics.len(), 1);
    let d = &diagnostics[0];
    assert_eq!(d.severity, Severity::Error);
    assert_eq!(d.code, 2322);
    let location = d.location.as_ref().unwrap();
    assert_eq!(location.file, "src/index.ts");
    assert_eq!((location.line, location.column), (3, 7));
    assert_eq!(
        d.to_string(),
        "src/index.ts:3:7 - error TS2322: Type 'string' is not assignable to type 'number'."
    );
}

#[test]
fn test_global_diagnostic_and_continuation_lines() {
    let diagnostics = parse(&[
        "error TS5083: Cannot read file '/p/tsconfig.base.json'.",
        "src/a.ts(1,1): error TS2345: Argument of type '{ a: number; }' is not assignable.",
        "  Property 'b' is missing in type '{ a: number; }'.",
        "",
        "src/b.ts(10,2): warning TS6133: 'x' is declared but its value is never read.",
    ]);
    assert_eq!(diagnostics.len(), 3);
    assert!(diagnostics[0].location.is_none());
    assert_eq!(diagnostics[0].code, 5083);
    assert!(diagnostics[1].message.ends_with("\nProperty 'b' is missing in type '{ a: number; }'."));
    assert_eq!(diagnostics[2].severity, Severity::Warning);
}

#[test]
fn test_watch_status_lines() {
    let diagnostics = parse(&[
        "10:23:45 AM - Starting compilation in watch mode...",
        "10:23:47 AM - Found 0 errors. Watching for file changes.",
        "10:24:01 AM - File change detected. Starting incremental compilation...",
        "src/index.ts(1,7): error TS2322: Type 'string' is not assignable to type 'number'.",
        "10:24:02 AM - Found 1 error. Watching for file changes.",
        "[14:00:00] - Found 2 errors. Watching for file changes.",
    ]);

    let codes: Vec<u32> = diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(
        codes,
        vec![
            WATCH_STARTING,
            WATCH_FOUND_ERRORS,
            WATCH_FILE_CHANGE,
            2322,
            WATCH_FOUND_ONE_ERROR,
            WATCH_FOUND_ERRORS
        ]
    );
    assert!(diagnostics[1].is_clean_rebuild());
    assert!(!diagnostics[5].is_clean_rebuild());
    assert!(diagnostics[4].is_rebuild_summary());
    assert_eq!(diagnostics[0].severity, Severity::Message);
}

#[test]
fn test_status_flushes_pending_diagnostic_immediately() {
    let mut parser = TscOutputParser::default();
    assert!(parser
        .push_line("src/index.ts(1,7): error TS2322: bad")
        .is_empty());
    let flushed = parser.push_line("10:24:02 AM - Found 1 error. Watching for file changes.");
    assert_eq!(flushed.len(), 2);
    assert_eq!(flushed[0].code, 2322);
    assert!(parser.finish().is_none());
}

#[test]
fn test_build_config_pins_declaration_options() {
    let request = DtsRequest {
        cwd: PathBuf::from("/p"),
        tsconfig: TsConfig {
            path: PathBuf::from("/p/tsconfig.json"),
            file_names: vec![
                PathBuf::from("/p/src/index.ts"),
                PathBuf::from("/p/src/util/strings.ts"),
            ],
            compiler_options: Map::new(),
        },
        root_names: vec![PathBuf::from("/p/src/index.ts")],
        out_dir: PathBuf::from("/p/dist"),
    };

    let config = build_config(&request);
    assert_eq!(config["extends"], "/p/tsconfig.json");
    assert_eq!(config["files"][0], "/p/src/index.ts");
    let options = &config["compilerOptions"];
    assert_eq!(options["declaration"], true);
    assert_eq!(options["emitDeclarationOnly"], true);
    assert_eq!(options["noEmit"], false);
    assert_eq!(options["outDir"], "/p/dist");
    assert_eq!(options["rootDir"], "/p/src");
}

#[test]
fn test_build_config_keeps_explicit_root_dir() {
    let mut compiler_options = Map::new();
    compiler_options.insert("rootDir".to_string(), serde_json::json!("."));
    let request = DtsRequest {
        cwd: PathBuf::from("/p"),
        tsconfig: TsConfig {
            path: PathBuf::from("/p/tsconfig.json"),
            file_names: vec![PathBuf::from("/p/src/index.ts")],
            compiler_options,
        },
        root_names: vec![PathBuf::from("/p/src/index.ts")],
        out_dir: PathBuf::from("/p/dist"),
    };

    let config = build_config(&request);
    assert!(config["compilerOptions"].get("rootDir").is_none());
}
