pub mod esbuild;
pub mod process;
pub mod tsc;
pub mod tsconfig;

pub use esbuild::EsbuildEngine;
pub use tsc::TscEngine;
pub use tsconfig::FileTsConfigLoader;

use std::sync::Arc;

use packup_core::config::EnginesConfig;
use packup_core::Engines;

/// The native engines, with binaries taken from `[engines]` when configured.
pub fn default_engines(config: &EnginesConfig) -> Engines {
    Engines::new(
        Arc::new(FileTsConfigLoader),
        Arc::new(TscEngine::new(config.tsc.clone())),
        Arc::new(EsbuildEngine::new(config.esbuild.clone())),
    )
}
