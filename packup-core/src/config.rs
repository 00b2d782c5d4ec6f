//! `packup.toml` build configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::exports::Export;
use crate::format::Runtime;

pub const CONFIG_FILE: &str = "packup.toml";

/// An extra bundle declared outside of the export map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundleConfig {
    pub source: String,
    #[serde(default)]
    pub import: Option<String>,
    #[serde(default)]
    pub require: Option<String>,
    #[serde(default)]
    pub types: Option<String>,
    #[serde(default)]
    pub runtime: Option<Runtime>,
}

impl BundleConfig {
    pub fn to_export(&self) -> Export {
        Export {
            path: self.source.clone(),
            exported: false,
            types: self.types.clone(),
            source: Some(self.source.clone()),
            require: self.require.clone(),
            import: self.import.clone(),
            runtime: self.runtime,
            ..Default::default()
        }
    }
}

/// Paths to native tool binaries, when not discovered automatically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnginesConfig {
    #[serde(default)]
    pub tsc: Option<PathBuf>,
    #[serde(default)]
    pub esbuild: Option<PathBuf>,
}

/// Build configuration as defined in `packup.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub bundles: Vec<BundleConfig>,
    #[serde(default)]
    pub externals: Vec<String>,
    /// Runtime for exports the path heuristic cannot place.
    #[serde(default)]
    pub runtime: Runtime,
    #[serde(default)]
    pub minify: bool,
    #[serde(default = "default_sourcemap")]
    pub sourcemap: bool,
    #[serde(default)]
    pub tsconfig: Option<PathBuf>,
    #[serde(default)]
    pub engines: EnginesConfig,
}

fn default_sourcemap() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bundles: Vec::new(),
            externals: Vec::new(),
            runtime: Runtime::Universal,
            minify: false,
            sourcemap: true,
            tsconfig: None,
            engines: EnginesConfig::default(),
        }
    }
}

impl Config {
    /// Loads `packup.toml` from the package root, falling back to defaults
    /// when the file does not exist.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content).map_err(|error| Error::Toml {
            error,
            context: path.display().to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for bundle in &self.bundles {
            if bundle.import.is_none() && bundle.require.is_none() && bundle.types.is_none() {
                return Err(Error::Config(format!(
                    "bundle {:?} declares none of import, require or types",
                    bundle.source
                )));
            }
        }
        Ok(())
    }

    pub fn bundle_exports(&self) -> Vec<Export> {
        self.bundles.iter().map(BundleConfig::to_export).collect()
    }
}

/// Command-line overrides applied on top of `packup.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub minify: Option<bool>,
    pub sourcemap: Option<bool>,
    pub tsconfig: Option<PathBuf>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(minify) = self.minify {
            config.minify = minify;
        }
        if let Some(sourcemap) = self.sourcemap {
            config.sourcemap = sourcemap;
        }
        if let Some(tsconfig) = &self.tsconfig {
            config.tsconfig = Some(tsconfig.clone());
        }
    }
}
