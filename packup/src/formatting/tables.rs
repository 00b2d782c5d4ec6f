//! Table formatting utilities using comfy-table.

use comfy_table::{Cell, Table};

use packup_core::{BuildTask, TaskResult};

use super::{format_duration, Status};

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(*h).add_attribute(comfy_table::Attribute::Bold))
                .collect::<Vec<_>>(),
        )
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS)
        .set_content_arrangement(comfy_table::ContentArrangement::Dynamic);
    table
}

/// Prints one row per planned task.
pub fn print_plan_table(tasks: &[BuildTask]) {
    let mut table = new_table(&["Task", "Runtime", "Output", "Entries"]);

    for task in tasks {
        match task {
            BuildTask::Dts(dts) => {
                let entries = dts
                    .entries
                    .iter()
                    .map(|e| format!("{} ({})", e.import_id, e.source_path))
                    .collect::<Vec<_>>()
                    .join("\n");
                let targets = dts
                    .entries
                    .iter()
                    .map(|e| e.target_path.as_str())
                    .collect::<Vec<_>>()
                    .join("\n");
                table.add_row(vec![
                    Cell::new(task.name()).fg(comfy_table::Color::Cyan),
                    Cell::new("-").fg(comfy_table::Color::DarkGrey),
                    Cell::new(targets),
                    Cell::new(entries),
                ]);
            }
            BuildTask::Js(js) => {
                let entries = js
                    .entries
                    .iter()
                    .map(|e| format!("{} ({})", e.path, e.entry))
                    .collect::<Vec<_>>()
                    .join("\n");
                table.add_row(vec![
                    Cell::new(task.name()).fg(comfy_table::Color::White),
                    Cell::new(js.runtime.as_str()).fg(comfy_table::Color::DarkGrey),
                    Cell::new(&js.output),
                    Cell::new(entries),
                ]);
            }
        }
    }

    println!("{}", table);
}

/// Prints the outcome of a build run.
pub fn print_results_table(results: &[TaskResult]) {
    let mut table = new_table(&["Status", "Task", "Duration", "Details"]);

    for result in results {
        if result.success {
            table.add_row(vec![
                Cell::new(Status::Success.symbol()).fg(comfy_table::Color::Green),
                Cell::new(&result.task_name).fg(comfy_table::Color::White),
                Cell::new(format_duration(result.duration)).fg(comfy_table::Color::DarkGrey),
                Cell::new(""),
            ]);
        } else {
            let details = result
                .error
                .as_deref()
                .unwrap_or("Task failed")
                .trim()
                .to_string();
            table.add_row(vec![
                Cell::new(Status::Error.symbol()).fg(comfy_table::Color::Red),
                Cell::new(&result.task_name).fg(comfy_table::Color::Red),
                Cell::new(format_duration(result.duration)).fg(comfy_table::Color::DarkGrey),
                Cell::new(details).fg(comfy_table::Color::Red),
            ]);
        }
    }

    println!("{}", table);
}
