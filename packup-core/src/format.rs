//! Module formats, module types, runtimes and the extension map tying them together.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The `type` field of a package manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleType {
    #[default]
    CommonJs,
    Module,
}

impl ModuleType {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleType::CommonJs => "commonjs",
            ModuleType::Module => "module",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "commonjs" => Some(ModuleType::CommonJs),
            "module" => Some(ModuleType::Module),
            _ => None,
        }
    }
}

/// JavaScript output format of a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Cjs,
    Esm,
}

impl Format {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Cjs => "cjs",
            Format::Esm => "esm",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compilation target bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Runtime {
    #[serde(rename = "node")]
    Node,
    #[serde(rename = "web")]
    Web,
    #[default]
    #[serde(rename = "*")]
    Universal,
}

impl Runtime {
    pub const ALL: [Runtime; 3] = [Runtime::Node, Runtime::Web, Runtime::Universal];

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Runtime::Node => "node",
            Runtime::Web => "web",
            Runtime::Universal => "*",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "node" => Some(Runtime::Node),
            "web" | "browser" => Some(Runtime::Web),
            "*" | "universal" => Some(Runtime::Universal),
            _ => None,
        }
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps `(module type, format)` to the file extension a bundle must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtMap;

impl ExtMap {
    pub fn extension(&self, module_type: ModuleType, format: Format) -> &'static str {
        match (module_type, format) {
            (ModuleType::CommonJs, Format::Cjs) => ".js",
            (ModuleType::CommonJs, Format::Esm) => ".mjs",
            (ModuleType::Module, Format::Cjs) => ".cjs",
            (ModuleType::Module, Format::Esm) => ".js",
        }
    }
}
