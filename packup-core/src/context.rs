//! Build context shared by every planned task.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::exports::{check_extensions, resolve_exports, Export};
use crate::format::{ExtMap, Format, ModuleType, Runtime};
use crate::manifest::{LoadedManifest, Manifest};
use crate::path_utils::{contains, find_common_ancestor, normalize, resolve};

/// Browserslist queries used for `*` when the manifest has none.
pub const DEFAULT_BROWSERSLIST: &[&str] = &[
    "last 3 major versions",
    "Firefox ESR",
    "last 2 Opera versions",
    "not dead",
    "node 18.0.0",
];

pub const DEFAULT_NODE_TARGET: &str = "node 18";
pub const DEFAULT_WEB_TARGET: &str = "esnext";

/// Immutable, pre-computed information shared by all tasks of one invocation.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub cwd: PathBuf,
    pub dist_path: PathBuf,
    pub package_name: String,
    pub module_type: ModuleType,
    pub exports: IndexMap<String, Export>,
    /// Extra bundles from `packup.toml`, planned after the exports.
    pub bundles: Vec<Export>,
    pub external: Vec<String>,
    pub targets: BTreeMap<Runtime, Vec<String>>,
    pub ext_map: ExtMap,
    pub config: Config,
}

impl BuildContext {
    /// Builds the context for a loaded manifest rooted at its own directory.
    pub fn new(loaded: &LoadedManifest, config: Config) -> Result<Self> {
        create_build_context(loaded.root(), &loaded.manifest, config)
    }

    pub fn extension(&self, format: Format) -> &'static str {
        self.ext_map.extension(self.module_type, format)
    }

    pub fn targets_for(&self, runtime: Runtime) -> &[String] {
        self.targets
            .get(&runtime)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Absolute path of a manifest-relative file.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        resolve(&self.cwd, relative)
    }

    /// Exports followed by configured bundles, in planning order.
    pub fn all_entries(&self) -> impl Iterator<Item = &Export> {
        self.exports.values().chain(self.bundles.iter())
    }
}

/// Assembles the build context for the package rooted at `cwd`.
pub fn create_build_context(cwd: &Path, manifest: &Manifest, config: Config) -> Result<BuildContext> {
    let exports = resolve_exports(manifest)?;
    let bundles = config.bundle_exports();

    let bundle_errors = check_extensions(&bundles, manifest.module_type);
    if !bundle_errors.is_empty() {
        return Err(Error::InvalidExports {
            errors: bundle_errors,
        });
    }

    let external = collect_externals(manifest, &config);
    let targets = build_targets(manifest.browserslist.as_deref());

    let mut outputs: Vec<PathBuf> = exports
        .iter()
        .chain(bundles.iter())
        .flat_map(|export| export.outputs())
        .map(|(_, path)| resolve(cwd, path))
        .collect();
    if outputs.is_empty() {
        outputs = exports
            .iter()
            .chain(bundles.iter())
            .filter_map(|export| export.types.as_deref())
            .map(|path| resolve(cwd, path))
            .collect();
    }
    let dist_path = find_dist_path(cwd, &outputs)?;

    Ok(BuildContext {
        cwd: cwd.to_path_buf(),
        dist_path,
        package_name: manifest.name.clone(),
        module_type: manifest.module_type,
        exports: exports
            .into_iter()
            .map(|export| (export.path.clone(), export))
            .collect(),
        bundles,
        external,
        targets,
        ext_map: ExtMap,
        config,
    })
}

fn collect_externals(manifest: &Manifest, config: &Config) -> Vec<String> {
    let names: IndexSet<String> = manifest
        .dependencies
        .keys()
        .chain(manifest.peer_dependencies.keys())
        .chain(config.externals.iter())
        .cloned()
        .collect();
    names.into_iter().collect()
}

/// Per-runtime target lists.
pub fn build_targets(browserslist: Option<&[String]>) -> BTreeMap<Runtime, Vec<String>> {
    let universal = match browserslist {
        Some(queries) if !queries.is_empty() => queries.to_vec(),
        _ => DEFAULT_BROWSERSLIST.iter().map(|q| q.to_string()).collect(),
    };

    BTreeMap::from([
        (Runtime::Node, vec![DEFAULT_NODE_TARGET.to_string()]),
        (Runtime::Web, vec![DEFAULT_WEB_TARGET.to_string()]),
        (Runtime::Universal, universal),
    ])
}

/// Computes the single output directory shared by every output file.
pub fn find_dist_path<P: AsRef<Path>>(cwd: &Path, outputs: &[P]) -> Result<PathBuf> {
    if outputs.is_empty() {
        return Ok(cwd.join("dist"));
    }

    let dist_path = find_common_ancestor(outputs)
        .ok_or_else(|| Error::DistPath("could not detect dist path".to_string()))?;

    let cwd = normalize(cwd);
    // An ancestor of the package root would interleave outputs with sources.
    if contains(&dist_path, &cwd) {
        return Err(Error::DistPath(
            "all output files must share a common parent directory which is not the root package directory"
                .to_string(),
        ));
    }
    // Build mode deletes the dist path, so it must belong to the package.
    if !contains(&cwd, &dist_path) {
        return Err(Error::DistPath(format!(
            "all output files must be located within the package directory, but they share {}",
            dist_path.display()
        )));
    }

    Ok(dist_path)
}
