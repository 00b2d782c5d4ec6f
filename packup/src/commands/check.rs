//! Verifies that a previous build produced every declared output.

use std::path::PathBuf;

use anyhow::Result;
use packup_core::{check_outputs, ConfigOverrides, Error, Plan};

use crate::formatting::{print_error, print_success};
use crate::logger::ConsoleLogger;

pub fn cmd_check(cwd: PathBuf, quiet: bool) -> Result<()> {
    let plan = Plan::load(&cwd, &ConfigOverrides::default(), &ConsoleLogger::new(quiet))?;

    match check_outputs(&plan.ctx) {
        Ok(checked) => {
            if !quiet {
                print_success(&format!("All {} declared outputs exist", checked.len()));
            }
            Ok(())
        }
        Err(Error::MissingOutputs { missing }) => {
            for path in &missing {
                print_error(&format!("missing {}", path));
            }
            anyhow::bail!("{} declared output(s) missing", missing.len())
        }
        Err(e) => Err(e.into()),
    }
}
