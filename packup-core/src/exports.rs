//! Canonical export records built from the legacy root fields and the export map.
//!
//! Every consistency problem is collected and reported as a single
//! [`Error::InvalidExports`] so one run shows all of them.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::format::{ExtMap, Format, ModuleType, Runtime};
use crate::manifest::{ExportValue, Manifest, SubTarget};

pub const ROOT_EXPORT: &str = ".";
pub const PACKAGE_JSON_EXPORT: &str = "./package.json";

/// One public entry point of the package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Export {
    /// Export map key; `.` for the package root.
    #[serde(rename = "_path")]
    pub path: String,
    /// Whether the entry came from a non-root export map key.
    #[serde(rename = "_exported")]
    pub exported: bool,
    pub types: Option<String>,
    pub source: Option<String>,
    pub require: Option<String>,
    pub import: Option<String>,
    pub default: Option<String>,
    pub browser: Option<SubTarget>,
    pub node: Option<SubTarget>,
    /// Explicit runtime; only set for configured bundles.
    pub runtime: Option<Runtime>,
}

impl Export {
    fn is_empty(&self) -> bool {
        self.types.is_none()
            && self.source.is_none()
            && self.require.is_none()
            && self.import.is_none()
            && self.default.is_none()
            && self.browser.is_none()
            && self.node.is_none()
    }

    /// Every `(format, output)` pair this export produces, sub-targets included.
    pub fn outputs(&self) -> Vec<(Format, &str)> {
        let mut declared: Vec<(Format, &Option<String>)> =
            vec![(Format::Cjs, &self.require), (Format::Esm, &self.import)];
        for sub in [&self.browser, &self.node].into_iter().flatten() {
            declared.push((Format::Cjs, &sub.require));
            declared.push((Format::Esm, &sub.import));
        }

        let mut outputs = Vec::with_capacity(declared.len());
        for (format, path) in declared {
            if let Some(path) = path {
                outputs.push((format, path.as_str()));
            }
        }
        outputs
    }
}

/// Produces the canonical export list for a manifest.
pub fn resolve_exports(manifest: &Manifest) -> Result<Vec<Export>> {
    let mut errors = Vec::new();

    let mut root = Export {
        path: ROOT_EXPORT.to_string(),
        types: manifest.types.clone(),
        source: manifest.source.clone(),
        require: manifest.main.clone(),
        import: manifest.module.clone(),
        default: manifest.module.clone().or_else(|| manifest.main.clone()),
        ..Default::default()
    };
    let mut named = Vec::new();

    if let Some(exports) = &manifest.exports {
        match exports.get(PACKAGE_JSON_EXPORT) {
            Some(ExportValue::Path(path)) if path == PACKAGE_JSON_EXPORT => {}
            _ => errors.push(format!(
                "`exports` must declare \"{0}\": \"{0}\"",
                PACKAGE_JSON_EXPORT
            )),
        }

        for (key, value) in exports {
            let ExportValue::Entry(entry) = value else {
                continue;
            };

            let import = esm_output(key, &entry.import, &entry.module, &mut errors);

            if key == ROOT_EXPORT {
                merge_field(&mut root.require, &entry.require, "require", "main", &mut errors);
                merge_field(&mut root.import, &import, "import", "module", &mut errors);
                merge_field(&mut root.types, &entry.types, "types", "types", &mut errors);
                merge_field(&mut root.source, &entry.source, "source", "source", &mut errors);
                if entry.default.is_some() {
                    root.default = entry.default.clone();
                }
                if entry.browser.is_some() {
                    root.browser = entry.browser.clone();
                }
                if entry.node.is_some() {
                    root.node = entry.node.clone();
                }
                continue;
            }

            named.push(Export {
                path: key.clone(),
                exported: true,
                types: entry.types.clone(),
                source: entry.source.clone(),
                require: entry.require.clone(),
                import,
                default: entry.default.clone(),
                browser: entry.browser.clone(),
                node: entry.node.clone(),
                runtime: None,
            });
        }
    }

    let mut resolved = Vec::with_capacity(named.len() + 1);
    if !root.is_empty() {
        resolved.push(root);
    }
    resolved.extend(named);

    errors.extend(check_extensions(&resolved, manifest.module_type));

    if !errors.is_empty() {
        return Err(Error::InvalidExports { errors });
    }

    Ok(resolved)
}

/// `import` and `module` name the same ESM output; both may be present only
/// when they agree.
fn esm_output(
    key: &str,
    import: &Option<String>,
    module: &Option<String>,
    errors: &mut Vec<String>,
) -> Option<String> {
    if let (Some(import), Some(module)) = (import, module) {
        if import != module {
            errors.push(format!(
                "`exports[{:?}].import` ({:?}) and `exports[{:?}].module` ({:?}) must be equal",
                key, import, key, module
            ));
        }
    }
    import.clone().or_else(|| module.clone())
}

fn merge_field(
    root: &mut Option<String>,
    exported: &Option<String>,
    condition: &str,
    legacy: &str,
    errors: &mut Vec<String>,
) {
    match (root.as_ref(), exported) {
        (Some(current), Some(declared)) if current != declared => errors.push(format!(
            "`exports[\".\"].{}` ({:?}) and `{}` ({:?}) must be equal",
            condition, declared, legacy, current
        )),
        (None, Some(declared)) => *root = Some(declared.clone()),
        _ => {}
    }
}

/// Checks that every `require`/`import` path carries the extension the
/// package `type` implies for its format.
pub fn check_extensions(exports: &[Export], module_type: ModuleType) -> Vec<String> {
    let ext_map = ExtMap;
    let mut errors = Vec::new();

    for export in exports {
        let mut check = |label: String, format: Format, path: &Option<String>| {
            let Some(path) = path else {
                return;
            };
            let expected = ext_map.extension(module_type, format);
            if !path.ends_with(expected) {
                errors.push(format!(
                    "{} {:?} must end with {:?} when package type is {:?}",
                    label,
                    path,
                    expected,
                    module_type.as_str()
                ));
            }
        };

        let label = |condition: &str| format!("`exports[{:?}].{}`", export.path, condition);
        check(label("require"), Format::Cjs, &export.require);
        check(label("import"), Format::Esm, &export.import);
        if let Some(browser) = &export.browser {
            check(label("browser.require"), Format::Cjs, &browser.require);
            check(label("browser.import"), Format::Esm, &browser.import);
        }
        if let Some(node) = &export.node {
            check(label("node.require"), Format::Cjs, &node.require);
            check(label("node.import"), Format::Esm, &node.import);
        }
    }

    errors
}
