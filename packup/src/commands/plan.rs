//! Prints the planned tasks without running them.

use std::path::PathBuf;

use anyhow::Result;
use packup_core::{ConfigOverrides, Plan};
use serde_json::json;

use crate::formatting::{print_key_value, print_plan_table, print_section_header};
use crate::logger::ConsoleLogger;

pub fn cmd_plan(cwd: PathBuf, overrides: ConfigOverrides, json: bool, quiet: bool) -> Result<()> {
    // Keep stdout parseable: planner warnings still reach stderr.
    let plan = Plan::load(&cwd, &overrides, &ConsoleLogger::new(quiet || json))?;
    let ctx = &plan.ctx;

    if json {
        let output = json!({
            "name": ctx.package_name,
            "cwd": ctx.cwd,
            "distPath": ctx.dist_path,
            "type": ctx.module_type.as_str(),
            "external": ctx.external,
            "targets": ctx.targets,
            "tasks": plan.tasks,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_section_header(&format!("Build plan for {}", ctx.package_name));
    print_key_value("Root", &ctx.cwd.display().to_string());
    print_key_value("Output", &ctx.dist_path.display().to_string());
    print_key_value("Type", ctx.module_type.as_str());
    if !ctx.external.is_empty() {
        print_key_value("External", &ctx.external.join(", "));
    }
    println!();

    if plan.tasks.is_empty() {
        println!("  (no tasks)");
    } else {
        print_plan_table(&plan.tasks);
    }
    Ok(())
}
