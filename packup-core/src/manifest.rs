//! Package manifest (`package.json`) discovery, schema validation and parsing.
//!
//! Validation runs on the raw JSON value before deserialization so every
//! violation can be reported with the field path, what was expected and what
//! was received. `serde_json` is built with `preserve_order`, which keeps the
//! key order of export objects intact for the ordering rules.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::format::ModuleType;
use crate::logger::Logger;
use crate::path_utils::normalize;

pub const MANIFEST_FILE: &str = "package.json";

/// Keys accepted inside a non-`.json` export entry.
pub const EXPORT_KEYS: &[&str] = &[
    "types", "source", "browser", "node", "module", "import", "require", "default",
];

const BROWSER_KEYS: &[&str] = &["source", "import", "require"];
const NODE_KEYS: &[&str] = &["source", "types", "module", "import", "require"];

/// A validated package manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub name: String,
    pub version: String,
    #[serde(rename = "type", default)]
    pub module_type: ModuleType,
    #[serde(default)]
    pub main: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub types: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub exports: Option<IndexMap<String, ExportValue>>,
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,
    #[serde(default)]
    pub peer_dependencies: IndexMap<String, String>,
    #[serde(default, deserialize_with = "deserialize_browserslist")]
    pub browserslist: Option<Vec<String>>,
}

/// Value of one export map key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExportValue {
    /// Literal path, only valid for `*.json` keys.
    Path(String),
    Entry(ExportEntry),
}

/// Condition object of one export map key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportEntry {
    #[serde(default)]
    pub types: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub browser: Option<SubTarget>,
    #[serde(default)]
    pub node: Option<SubTarget>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub import: Option<String>,
    #[serde(default)]
    pub require: Option<String>,
    #[serde(default)]
    pub default: Option<String>,
}

/// Runtime specific (`browser` / `node`) condition block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTarget {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub types: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub import: Option<String>,
    #[serde(default)]
    pub require: Option<String>,
}

fn deserialize_browserslist<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Queries {
        One(String),
        Many(Vec<String>),
    }

    Ok(Option::<Queries>::deserialize(deserializer)?.map(|queries| match queries {
        Queries::One(query) => vec![query],
        Queries::Many(queries) => queries,
    }))
}

/// A manifest together with where it was found.
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    pub path: PathBuf,
    pub manifest: Manifest,
}

impl LoadedManifest {
    /// Directory holding the manifest; the package root.
    pub fn root(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Walks upward from `cwd` until a `package.json` is found.
pub fn find_manifest(cwd: &Path) -> Result<PathBuf> {
    cwd.ancestors()
        .map(|dir| dir.join(MANIFEST_FILE))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| Error::ManifestNotFound(cwd.to_path_buf()))
}

/// Locates, reads, validates and parses the nearest manifest.
pub fn load_manifest(cwd: &Path, logger: &dyn Logger) -> Result<LoadedManifest> {
    let cwd = if cwd.is_absolute() {
        normalize(cwd)
    } else {
        normalize(&std::env::current_dir()?.join(cwd))
    };
    let path = find_manifest(&cwd)?;
    logger.debug(&format!("Loading manifest from {}", path.display()));

    let content = fs::read_to_string(&path)?;
    let manifest = parse_manifest(&content, logger).map_err(|e| match e {
        Error::Json(error) => Error::ManifestParse {
            path: path.clone(),
            message: error.to_string(),
        },
        other => other,
    })?;

    Ok(LoadedManifest { path, manifest })
}

/// Parses manifest text, validating it against the schema first.
pub fn parse_manifest(content: &str, logger: &dyn Logger) -> Result<Manifest> {
    let value: Value = serde_json::from_str(content)?;
    let report = validate_manifest(&value);
    for warning in &report.warnings {
        logger.warn(warning);
    }
    if !report.errors.is_empty() {
        return Err(Error::InvalidManifest {
            errors: report.errors,
        });
    }
    Ok(serde_json::from_value(value)?)
}

/// Result of a schema validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn error(&mut self, message: String) {
        self.errors.push(message);
    }

    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validates raw manifest JSON. Collects every violation instead of stopping
/// at the first.
pub fn validate_manifest(value: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();

    let Some(root) = value.as_object() else {
        report.error(format!(
            "package.json must be an object, received {}",
            describe(value)
        ));
        return report;
    };

    required_string(root, "name", &mut report);
    required_string(root, "version", &mut report);

    if let Some(module_type) = root.get("type") {
        match module_type.as_str() {
            Some(s) if ModuleType::from_str(s).is_some() => {}
            _ => report.error(format!(
                "`type` must be one of \"commonjs\" | \"module\", received {}",
                describe(module_type)
            )),
        }
    }

    for field in ["main", "module", "types", "source"] {
        optional_string(root, field, &mut report);
    }

    for field in ["dependencies", "peerDependencies"] {
        if let Some(deps) = root.get(field) {
            match deps.as_object() {
                Some(map) => {
                    for (name, range) in map {
                        if !range.is_string() {
                            report.error(format!(
                                "`{}[\"{}\"]` must be a string, received {}",
                                field,
                                name,
                                describe(range)
                            ));
                        }
                    }
                }
                None => report.error(format!(
                    "`{}` must be an object of strings, received {}",
                    field,
                    describe(deps)
                )),
            }
        }
    }

    if let Some(browserslist) = root.get("browserslist") {
        let valid = match browserslist {
            Value::String(_) => true,
            Value::Array(items) => items.iter().all(Value::is_string),
            _ => false,
        };
        if !valid {
            report.error(format!(
                "`browserslist` must be a string or an array of strings, received {}",
                describe(browserslist)
            ));
        }
    }

    if let Some(exports) = root.get("exports") {
        match exports.as_object() {
            Some(map) => validate_exports(map, &mut report),
            None => report.error(format!(
                "`exports` must be an object, received {}",
                describe(exports)
            )),
        }
    }

    report
}

fn validate_exports(exports: &Map<String, Value>, report: &mut ValidationReport) {
    for (key, value) in exports {
        let field = format!("exports[\"{}\"]", key);

        if key.ends_with(".json") {
            match value.as_str() {
                Some(path) if path == key => {}
                _ => report.error(format!(
                    "`{}` must be the literal string \"{}\", received {}",
                    field,
                    key,
                    describe(value)
                )),
            }
            continue;
        }

        let Some(entry) = value.as_object() else {
            report.error(format!(
                "`{}` must be an object with any of {{{}}}, received {}",
                field,
                EXPORT_KEYS.join(", "),
                describe(value)
            ));
            continue;
        };

        for (condition, target) in entry {
            match condition.as_str() {
                "browser" => validate_sub_target(&field, condition, target, BROWSER_KEYS, report),
                "node" => validate_sub_target(&field, condition, target, NODE_KEYS, report),
                c if EXPORT_KEYS.contains(&c) => {
                    if !target.is_string() {
                        report.error(format!(
                            "`{}.{}` must be a string, received {}",
                            field,
                            condition,
                            describe(target)
                        ));
                    }
                }
                _ => report.error(format!(
                    "`{}` contains unknown key `{}`; expected one of {{{}}}",
                    field,
                    condition,
                    EXPORT_KEYS.join(", ")
                )),
            }
        }

        validate_key_order(&field, entry, report);
    }
}

fn validate_sub_target(
    field: &str,
    condition: &str,
    target: &Value,
    allowed: &[&str],
    report: &mut ValidationReport,
) {
    let Some(object) = target.as_object() else {
        report.error(format!(
            "`{}.{}` must be an object with any of {{{}}}, received {}",
            field,
            condition,
            allowed.join(", "),
            describe(target)
        ));
        return;
    };

    for (key, value) in object {
        if !allowed.contains(&key.as_str()) {
            report.error(format!(
                "`{}.{}` contains unknown key `{}`; expected one of {{{}}}",
                field,
                condition,
                key,
                allowed.join(", ")
            ));
        } else if !value.is_string() {
            report.error(format!(
                "`{}.{}.{}` must be a string, received {}",
                field,
                condition,
                key,
                describe(value)
            ));
        }
    }
}

fn validate_key_order(field: &str, entry: &Map<String, Value>, report: &mut ValidationReport) {
    let keys: Vec<&str> = entry.keys().map(String::as_str).collect();
    let position = |name: &str| keys.iter().position(|k| *k == name);

    if let Some(index) = position("types") {
        if index != 0 {
            report.error(format!(
                "`{}.types` must be the first key, found at position {}",
                field,
                index + 1
            ));
        }
    }

    if let Some(index) = position("default") {
        if index != keys.len() - 1 {
            report.error(format!(
                "`{}.default` must be the last key, found at position {} of {}",
                field,
                index + 1,
                keys.len()
            ));
        }
    }

    if let (Some(import), Some(require)) = (position("import"), position("require")) {
        if import > require {
            report.warn(format!(
                "`{}`: `import` should come before `require`",
                field
            ));
        }
    }

    if let (Some(module), Some(import)) = (position("module"), position("import")) {
        if module > import {
            report.warn(format!(
                "`{}`: `module` should come before `import`",
                field
            ));
        }
    }
}

fn required_string(root: &Map<String, Value>, field: &str, report: &mut ValidationReport) {
    match root.get(field) {
        None | Some(Value::Null) => report.error(format!("`{}` is a required field", field)),
        Some(Value::String(_)) => {}
        Some(other) => report.error(format!(
            "`{}` must be a string, received {}",
            field,
            describe(other)
        )),
    }
}

fn optional_string(root: &Map<String, Value>, field: &str, report: &mut ValidationReport) {
    if let Some(value) = root.get(field) {
        if !value.is_string() {
            report.error(format!(
                "`{}` must be a string, received {}",
                field,
                describe(value)
            ));
        }
    }
}

/// Short rendering of a received value for error messages.
fn describe(value: &Value) -> String {
    let mut rendered = value.to_string();
    if rendered.chars().count() > 60 {
        rendered = rendered.chars().take(57).collect::<String>() + "...";
    }
    let kind = match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    format!("{} {}", kind, rendered)
}
