//! `tsconfig.json` discovery and loading.
//!
//! Handles the subset of TypeScript's config semantics a declaration build
//! needs: comments and trailing commas, `extends` chains, and expansion of
//! `files`/`include`/`exclude` into concrete file names.

use std::fs;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use walkdir::WalkDir;

use packup_core::error::{Error, Result};
use packup_core::path_utils::normalize;
use packup_core::{TsConfig, TsConfigLoader};

/// Config file names tried in each directory, in order.
pub const CONFIG_NAMES: &[&str] = &["tsconfig.build.json", "tsconfig.json"];

const TS_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".mts", ".cts"];
const MAX_EXTENDS_DEPTH: usize = 16;

static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",(\s*[}\]])").expect("static regex is valid"));

/// Reads tsconfig files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTsConfigLoader;

impl TsConfigLoader for FileTsConfigLoader {
    fn load(&self, cwd: &Path, source: &Path, explicit: Option<&Path>) -> Result<Option<TsConfig>> {
        let path = match explicit {
            Some(path) if path.is_file() => path.to_path_buf(),
            Some(path) => {
                return Err(Error::Config(format!(
                    "tsconfig {} does not exist",
                    path.display()
                )))
            }
            None => match find_tsconfig(cwd, source) {
                Some(path) => path,
                None => return Ok(None),
            },
        };
        read_tsconfig(&path).map(Some)
    }
}

/// Searches from the source file's directory up to `cwd` for a config file.
pub fn find_tsconfig(cwd: &Path, source: &Path) -> Option<PathBuf> {
    let cwd = normalize(cwd);
    let start = source.parent().map(normalize)?;
    for dir in start.ancestors() {
        for name in CONFIG_NAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        if dir == cwd {
            break;
        }
    }
    None
}

/// Loads a config, resolving its `extends` chain and file list.
pub fn read_tsconfig(path: &Path) -> Result<TsConfig> {
    let path = normalize(path);
    let raw = merged_config(&path, 0)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let compiler_options = raw
        .get("compilerOptions")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let file_names = expand_file_names(dir, &raw, &compiler_options);

    Ok(TsConfig {
        path,
        file_names,
        compiler_options,
    })
}

/// Parses JSON with comments and trailing commas.
pub fn parse_jsonc(content: &str) -> std::result::Result<Value, serde_json::Error> {
    let stripped = strip_comments(content);
    let cleaned = TRAILING_COMMA.replace_all(&stripped, "$1");
    serde_json::from_str(&cleaned)
}

fn strip_comments(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        let next = chars.peek().copied();
        match (c, next) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut previous = '\0';
                for next in chars.by_ref() {
                    if previous == '*' && next == '/' {
                        break;
                    }
                    previous = next;
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Reads one config and folds its `extends` parent underneath it. Paths in
/// `files`/`include`/`exclude` are made absolute relative to the file that
/// declared them.
fn merged_config(path: &Path, depth: usize) -> Result<Map<String, Value>> {
    if depth > MAX_EXTENDS_DEPTH {
        return Err(Error::Config(format!(
            "tsconfig extends chain is too deep at {}",
            path.display()
        )));
    }

    let content = fs::read_to_string(path)?;
    let value = parse_jsonc(&content).map_err(|e| {
        Error::Config(format!("failed to parse {}: {}", path.display(), e))
    })?;
    let Value::Object(mut config) = value else {
        return Err(Error::Config(format!(
            "{} must contain a JSON object",
            path.display()
        )));
    };

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    for key in ["files", "include", "exclude"] {
        if let Some(Value::Array(items)) = config.get_mut(key) {
            for item in items.iter_mut() {
                if let Value::String(pattern) = item {
                    *pattern = absolutize(dir, pattern);
                }
            }
        }
    }

    let parent = match config.remove("extends") {
        Some(Value::String(target)) => Some(resolve_extends(dir, &target)?),
        Some(_) => {
            return Err(Error::Config(format!(
                "`extends` in {} must be a string",
                path.display()
            )))
        }
        None => None,
    };

    let Some(parent) = parent else {
        return Ok(config);
    };

    let mut merged = merged_config(&parent, depth + 1)?;
    let parent_options = merged
        .remove("compilerOptions")
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default();
    let mut options = parent_options;
    if let Some(Value::Object(own)) = config.remove("compilerOptions") {
        options.extend(own);
    }
    merged.extend(config);
    merged.insert("compilerOptions".to_string(), Value::Object(options));
    Ok(merged)
}

fn absolutize(dir: &Path, pattern: &str) -> String {
    normalize(&dir.join(pattern)).to_string_lossy().replace('\\', "/")
}

fn resolve_extends(dir: &Path, target: &str) -> Result<PathBuf> {
    // `./base` and `./tsconfig.base` both name `.json` files.
    let candidates = |p: PathBuf| {
        let mut with_json = p.clone().into_os_string();
        with_json.push(".json");
        [p, PathBuf::from(with_json)]
    };

    if target.starts_with('.') || Path::new(target).is_absolute() {
        for candidate in candidates(normalize(&dir.join(target))) {
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    } else {
        for base in dir.ancestors() {
            let package_dir = base.join("node_modules").join(target);
            let [exact, with_json] = candidates(package_dir.clone());
            for candidate in [exact, with_json, package_dir.join("tsconfig.json")] {
                if candidate.is_file() {
                    return Ok(candidate);
                }
            }
        }
    }

    Err(Error::Config(format!(
        "cannot resolve tsconfig `extends` target {:?} from {}",
        target,
        dir.display()
    )))
}

fn is_typescript(path: &Path) -> bool {
    let name = path.to_string_lossy();
    TS_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

fn expand_file_names(dir: &Path, config: &Map<String, Value>, options: &Map<String, Value>) -> Vec<PathBuf> {
    let strings = |key: &str| -> Option<Vec<String>> {
        config.get(key).and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
    };

    let files = strings("files");
    let include = strings("include").unwrap_or_else(|| {
        if files.is_some() {
            Vec::new()
        } else {
            vec![absolutize(dir, "**/*")]
        }
    });

    let mut exclude: Vec<String> = strings("exclude").unwrap_or_default();
    for key in ["outDir", "declarationDir"] {
        if let Some(out) = options.get(key).and_then(Value::as_str) {
            exclude.push(absolutize(dir, out));
        }
    }

    let include: Vec<Pattern> = include.iter().filter_map(|p| compile_glob(p)).collect();
    let exclude: Vec<Pattern> = exclude.iter().filter_map(|p| compile_glob(p)).collect();

    let mut names: Vec<PathBuf> = files
        .unwrap_or_default()
        .into_iter()
        .map(PathBuf::from)
        .collect();

    if !include.is_empty() {
        let walker = WalkDir::new(dir)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.file_name() != "node_modules");
        for entry in walker.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_file() || !is_typescript(path) {
                continue;
            }
            let text = path.to_string_lossy().replace('\\', "/");
            if include.iter().any(|p| p.matches_with(&text, MATCH_OPTIONS))
                && !exclude.iter().any(|p| p.matches_with(&text, MATCH_OPTIONS))
                && !names.iter().any(|existing| existing == path)
            {
                names.push(path.to_path_buf());
            }
        }
    }

    names
}

/// `*` and `?` stay inside one path segment; `**` crosses segments.
pub const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compiles a tsconfig `include`/`exclude` entry. An entry whose last segment
/// has no wildcard names a directory when it is one on disk or has no
/// extension, and then matches everything beneath it.
pub fn compile_glob(pattern: &str) -> Option<Pattern> {
    let mut pattern = pattern.trim_end_matches('/').to_string();
    let last = pattern.rsplit('/').next().unwrap_or("");
    let wildcard = last.contains('*') || last.contains('?');
    if !wildcard && (Path::new(&pattern).is_dir() || !last.contains('.')) {
        pattern.push_str("/**/*");
    }
    Pattern::new(&pattern).ok()
}
