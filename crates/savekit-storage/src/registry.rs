//! Layout resolution: from a path and an expected convention to a validated
//! [`LayoutInstance`], and from there to the directory holding the pytree.

use std::path::Path;

use crate::error::StorageError;
use crate::layout::{CheckpointLayout, LayoutConvention, LayoutInstance, NativeLayout};
use crate::path::subdirectory_names;

/// Binds `path` to the layout variant for `convention` and validates it.
///
/// A validation failure is re-raised as `InvalidLayout` naming the path and
/// the convention, with the variant's error kept as the source.
pub fn get_checkpoint_layout(
    path: &Path,
    convention: LayoutConvention,
) -> Result<LayoutInstance, StorageError> {
    tracing::debug!(path = %path.display(), %convention, "resolving checkpoint layout");

    let mut layout = LayoutInstance::new(path, convention);
    match layout.validate() {
        Ok(()) => Ok(layout),
        Err(e) => Err(StorageError::InvalidLayout {
            path: path.to_path_buf(),
            convention: Some(convention),
            message: format!(
                "could not recognize the checkpoint at {} as a valid {} checkpoint. If the \
                 checkpoint does not follow the native format, pass an explicit layout \
                 convention (for example `--layout flat_tensor`)",
                path.display(),
                convention
            ),
            candidates: Vec::new(),
            source: Some(Box::new(e)),
        }),
    }
}

/// Works out which checkpointable of `layout` holds the pytree.
///
/// A non-empty explicit name is returned untouched. Layouts other than a legacy native
/// directory (no indicator file) keep the default root. For legacy
/// directories the path is first tried as a direct pointer to the pytree, then
/// each immediate subdirectory is tried in enumeration order.
pub fn resolve_pytree_checkpointable(
    layout: LayoutInstance,
    checkpointable_name: Option<String>,
) -> Result<(LayoutInstance, Option<String>), StorageError> {
    // An empty name means the same as no name.
    let checkpointable_name = checkpointable_name.filter(|name| !name.is_empty());
    if checkpointable_name.is_some() {
        return Ok((layout, checkpointable_name));
    }

    let native = match &layout {
        LayoutInstance::Native(native) if !native.has_indicator_file() => native,
        _ => return Ok((layout, checkpointable_name)),
    };

    let path = native.path();
    let leaf = path.file_name().and_then(|n| n.to_str());
    if let (Some(parent), Some(leaf)) = (parent_dir(path), leaf) {
        let parent_layout = NativeLayout::new(parent);
        if parent_layout.validate_pytree(Some(leaf)).is_ok() {
            tracing::debug!(
                path = %path.display(),
                checkpointable = leaf,
                "legacy checkpoint path points directly at a pytree"
            );
            return Ok((LayoutInstance::Native(parent_layout), Some(leaf.to_string())));
        }
    }

    let candidates = subdirectory_names(path)?;
    for name in &candidates {
        if native.validate_pytree(Some(name)).is_ok() {
            tracing::debug!(
                path = %path.display(),
                checkpointable = %name,
                "resolved legacy pytree checkpointable"
            );
            let name = name.clone();
            return Ok((layout, Some(name)));
        }
    }

    Err(StorageError::InvalidLayout {
        path: path.to_path_buf(),
        convention: Some(LayoutConvention::Native),
        message: format!(
            "detected a legacy checkpoint at {}, but failed to resolve a checkpointable name \
             for the pytree. Found subdirectory names: {:?}",
            path.display(),
            candidates
        ),
        candidates,
        source: None,
    })
}

/// Directory containing `path`. A relative single-component path lives in
/// the current directory.
fn parent_dir(path: &Path) -> Option<&Path> {
    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Some(Path::new(".")),
        parent => parent,
    }
}

/// Resolves the layout and the pytree checkpointable, then validates the
/// pytree at the resolved location.
pub fn get_checkpoint_layout_pytree(
    path: &Path,
    convention: LayoutConvention,
    checkpointable_name: Option<&str>,
) -> Result<(LayoutInstance, Option<String>), StorageError> {
    let layout = get_checkpoint_layout(path, convention)?;
    let (layout, name) =
        resolve_pytree_checkpointable(layout, checkpointable_name.map(str::to_string))?;
    layout.validate_pytree(name.as_deref())?;
    Ok((layout, name))
}
