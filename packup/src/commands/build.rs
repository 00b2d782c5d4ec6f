//! One-shot build command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use packup_core::{ConfigOverrides, Plan, TaskRunner};
use packup_engines::default_engines;

use crate::formatting::{
    create_spinner, format_duration, print_results_table, print_success, print_summary_box,
    print_warning,
};
use crate::logger::ConsoleLogger;

use super::create_runtime;

pub fn cmd_build(cwd: PathBuf, overrides: ConfigOverrides, quiet: bool) -> Result<()> {
    let start = Instant::now();
    let plan = Plan::load(&cwd, &overrides, &ConsoleLogger::new(quiet))?;

    if plan.tasks.is_empty() {
        print_warning("Nothing to build: no export declares types, require or import");
        return Ok(());
    }

    let spinner = create_spinner(&format!("Building {}", plan.ctx.package_name), quiet);
    let logger = Arc::new(ConsoleLogger::new(quiet).with_progress(spinner.clone()));
    let runner = TaskRunner::new(logger, default_engines(&plan.ctx.config.engines));

    let rt = create_runtime()?;
    let results = rt.block_on(runner.build(&plan));
    spinner.finish_and_clear();
    let results = results?;

    let succeeded = results.iter().filter(|r| r.success).count();
    let failed = results.len() - succeeded;
    let not_run = plan.tasks.len() - results.len();

    if !quiet {
        println!();
        print_results_table(&results);
        println!();
        print_summary_box(
            "Build Summary",
            &[
                ("Package", &plan.ctx.package_name),
                ("Output", &plan.ctx.dist_path.display().to_string()),
                ("Succeeded", &succeeded.to_string()),
                ("Failed", &failed.to_string()),
                ("Not run", &not_run.to_string()),
                ("Duration", &format_duration(start.elapsed())),
            ],
        );
        println!();
    }

    if failed > 0 {
        anyhow::bail!(
            "Build failed: {} task(s) failed, {} not run",
            failed,
            not_run
        );
    }

    if !quiet {
        print_success(&format!("Built {} tasks", succeeded));
    }
    Ok(())
}
