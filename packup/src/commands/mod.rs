//! Command implementations for the CLI.

mod build;
mod check;
mod plan;
mod watch;

use anyhow::Result;

pub use build::cmd_build;
pub use check::cmd_check;
pub use plan::cmd_plan;
pub use watch::cmd_watch;

fn create_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| anyhow::anyhow!("Failed to create tokio runtime: {}", e))
}
