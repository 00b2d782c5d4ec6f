//! Watch mode command.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use packup_core::{ConfigOverrides, Plan, TaskRunner};
use packup_engines::default_engines;
use tokio::sync::oneshot;

use crate::formatting::{print_key_value, print_section_header, print_warning};
use crate::logger::ConsoleLogger;

use super::create_runtime;

pub fn cmd_watch(cwd: PathBuf, overrides: ConfigOverrides, quiet: bool) -> Result<()> {
    let logger = Arc::new(ConsoleLogger::new(quiet));
    let plan = Plan::load(&cwd, &overrides, logger.as_ref())?;

    if plan.tasks.is_empty() {
        print_warning("Nothing to watch: no export declares types, require or import");
        return Ok(());
    }

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let stop_tx = Mutex::new(Some(stop_tx));
    ctrlc::set_handler(move || {
        if let Some(tx) = stop_tx.lock().ok().and_then(|mut tx| tx.take()) {
            let _ = tx.send(());
        }
    })
    .map_err(|e| anyhow::anyhow!("Failed to set signal handler: {}", e))?;

    if !quiet {
        print_section_header("Watch Mode");
        print_key_value("Package", &plan.ctx.package_name);
        print_key_value("Output", &plan.ctx.dist_path.display().to_string());
        print_key_value("Tasks", &plan.tasks.len().to_string());
        println!("  Press Ctrl+C to stop");
        println!();
    }

    let runner = TaskRunner::new(logger, default_engines(&plan.ctx.config.engines));
    let rt = create_runtime()?;
    rt.block_on(runner.watch(&plan, async move {
        let _ = stop_rx.await;
    }))?;

    if !quiet {
        println!();
        print_warning("Watch mode stopped");
    }
    Ok(())
}
