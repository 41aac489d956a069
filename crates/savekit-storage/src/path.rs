//! Small filesystem helpers shared by layouts and the saver.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Marker embedded in the name of a checkpoint directory still being written.
pub const TMP_DIR_MARKER: &str = ".orbax-checkpoint-tmp";

/// Returns `true` if `path` names an in-progress (uncommitted) checkpoint.
pub fn is_path_temporary(path: &Path) -> bool {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.contains(TMP_DIR_MARKER) || name.ends_with(".tmp"),
        None => false,
    }
}

/// Immediate entries of `dir`, in filesystem enumeration order.
pub fn entries(dir: &Path) -> io::Result<Vec<PathBuf>> {
    fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect()
}

/// Names of the immediate subdirectories of `dir`, in enumeration order.
///
/// Entries whose names are not valid UTF-8 are skipped.
pub fn subdirectory_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for path in entries(dir)? {
        if !path.is_dir() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Returns `true` if `relative` stays inside whatever directory it is joined to.
pub fn is_contained_relative(relative: &Path) -> bool {
    !relative.as_os_str().is_empty()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
