//! Shared path utilities for locating build outputs.

use std::path::{Component, Path, PathBuf};

/// Lexically normalizes a path, folding `.` and `..` components without
/// touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Resolves a manifest-relative path (such as `./dist/index.js`) against `root`.
pub fn resolve(root: &Path, relative: &str) -> PathBuf {
    normalize(&root.join(relative))
}

/// Returns `true` when `child` is `parent` or lies beneath it.
///
/// # Arguments
///
/// * `parent` - Candidate containing directory
/// * `child` - Path to test
///
/// # Returns
///
/// `true` if the relative path from `parent` to `child` never escapes upward.
pub fn contains(parent: &Path, child: &Path) -> bool {
    match pathdiff::diff_paths(child, parent) {
        Some(relative) => !relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))),
        None => false,
    }
}

/// Finds the nearest directory containing every file in `files`.
///
/// Each file is first reduced to its directory. Starting from the first
/// directory, the candidate climbs one level at a time until it contains the
/// next directory. Returns `None` if the candidate runs out of parents.
pub fn find_common_ancestor<P: AsRef<Path>>(files: &[P]) -> Option<PathBuf> {
    let mut dirs = files
        .iter()
        .map(|file| normalize(file.as_ref()))
        .map(|file| file.parent().map(Path::to_path_buf).unwrap_or(file));

    let mut candidate = dirs.next()?;

    for dir in dirs {
        while dir != candidate {
            if contains(&candidate, &dir) {
                break;
            }
            candidate = candidate.parent()?.to_path_buf();
        }
    }

    Some(candidate)
}
