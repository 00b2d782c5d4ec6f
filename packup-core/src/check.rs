//! Post-build verification that every declared output exists.

use std::path::PathBuf;

use indexmap::IndexSet;

use crate::context::BuildContext;
use crate::error::{Error, Result};

/// Checks every `require`, `import` and `types` path of the context's exports
/// and bundles. Returns the checked files, or all missing ones at once.
pub fn check_outputs(ctx: &BuildContext) -> Result<Vec<PathBuf>> {
    let mut declared: IndexSet<&str> = IndexSet::new();
    for export in ctx.all_entries() {
        declared.extend(export.outputs().into_iter().map(|(_, path)| path));
        declared.extend(export.types.as_deref());
    }

    let mut checked = Vec::with_capacity(declared.len());
    let mut missing = Vec::new();
    for relative in declared {
        let path = ctx.resolve(relative);
        if path.is_file() {
            checked.push(path);
        } else {
            missing.push(relative.to_string());
        }
    }

    if !missing.is_empty() {
        return Err(Error::MissingOutputs { missing });
    }
    Ok(checked)
}
