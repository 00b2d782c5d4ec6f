//! Terminal output: status lines, key/value blocks, tables and spinners.

mod output;
mod progress;
mod status;
mod tables;

pub use output::{format_duration, print_key_value, print_section_header, print_summary_box};
pub use progress::create_spinner;
pub use status::{print_error, print_info, print_success, print_warning, Status};
pub use tables::{print_plan_table, print_results_table};
