//! The native structured checkpoint directory.
//!
//! A current-format checkpoint directory contains the indicator file
//! [`CHECKPOINT_INDICATOR_FILE`] and one subdirectory per checkpointable.
//! Legacy ("V0") checkpoints lack the indicator; they are still accepted when
//! they carry step metadata, or when the directory (or one of its
//! subdirectories) holds a pytree metadata file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::layout::{invalid_layout, CheckpointLayout, LayoutConvention};
use crate::path::{entries, is_path_temporary, subdirectory_names};

/// Present in every checkpoint written in the current format.
pub const CHECKPOINT_INDICATOR_FILE: &str = "orbax.checkpoint";
/// Step-level metadata (timestamps, custom metadata).
pub const CHECKPOINT_METADATA_FILE: &str = "_CHECKPOINT_METADATA";
/// Marks a directory as the root of a pytree payload.
pub const PYTREE_METADATA_FILE: &str = "_METADATA";

const OCDBT_MANIFEST_FILE: &str = "ocdbt.manifest";
const ZARRAY_FILE: &str = ".zarray";

const GENERAL_ERROR_MESSAGE: &str = "A valid checkpoint path should always contain a file named \
'orbax.checkpoint', unless it was written in the legacy format. Legacy checkpoints are resolved \
by scanning for a subdirectory holding a '_METADATA' file.";

/// Decoded `_CHECKPOINT_METADATA`. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    #[serde(default)]
    pub item_handlers: Option<serde_json::Value>,
    #[serde(default)]
    pub init_timestamp_nsecs: Option<u64>,
    #[serde(default)]
    pub commit_timestamp_nsecs: Option<u64>,
    #[serde(default)]
    pub custom_metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// A native checkpoint directory.
#[derive(Debug, Clone)]
pub struct NativeLayout {
    path: PathBuf,
    /// Set by `validate`; `None` until then.
    indicator_seen: Option<bool>,
}

impl NativeLayout {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        NativeLayout {
            path: path.into(),
            indicator_seen: None,
        }
    }

    /// Returns `true` if the directory carries the current-format indicator.
    ///
    /// Uses the observation cached by `validate` when available.
    pub fn has_indicator_file(&self) -> bool {
        self.indicator_seen
            .unwrap_or_else(|| self.path.join(CHECKPOINT_INDICATOR_FILE).exists())
    }

    /// Reads the step metadata file, if present.
    pub fn checkpoint_metadata(&self) -> Result<Option<CheckpointMetadata>, StorageError> {
        let file = self.path.join(CHECKPOINT_METADATA_FILE);
        if !file.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&file)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn probe(&mut self) -> Result<(), StorageError> {
        let path = &self.path;
        if !path.exists() {
            return Err(StorageError::malformed(
                path,
                format!("checkpoint path {} does not exist", path.display()),
            ));
        }
        if !path.is_dir() {
            return Err(StorageError::malformed(
                path,
                format!("checkpoint path {} is not a directory", path.display()),
            ));
        }
        if is_path_temporary(path) {
            return Err(StorageError::malformed(
                path,
                format!("found incomplete checkpoint at {}", path.display()),
            ));
        }

        let subpaths = entries(path)?;

        // The indicator file is sufficient on its own.
        let has_indicator = subpaths
            .iter()
            .any(|p| p.file_name().is_some_and(|n| n == CHECKPOINT_INDICATOR_FILE));
        self.indicator_seen = Some(has_indicator);
        if has_indicator {
            return Ok(());
        }

        if path.join(CHECKPOINT_METADATA_FILE).exists() {
            return Ok(());
        }
        if path.join(PYTREE_METADATA_FILE).exists() {
            return Ok(());
        }
        if subpaths
            .iter()
            .any(|p| p.is_dir() && p.join(PYTREE_METADATA_FILE).exists())
        {
            return Ok(());
        }

        Err(StorageError::malformed(
            path,
            format!(
                "checkpoint path {} could not be identified as a native checkpoint. \
                 The path must conform to one of the following conditions:\n  \
                 - contain the indicator file {};\n  \
                 - contain the {} file;\n  \
                 - point directly to a pytree checkpointable (contain {});\n  \
                 - contain a subdirectory which is a pytree checkpointable.",
                path.display(),
                CHECKPOINT_INDICATOR_FILE,
                CHECKPOINT_METADATA_FILE,
                PYTREE_METADATA_FILE,
            ),
        ))
    }

    fn probe_pytree(&self, checkpointable_name: Option<&str>) -> Result<(), StorageError> {
        let pytree_dir = match checkpointable_name {
            Some(name) => self.path.join(name),
            None => self.path.clone(),
        };
        if let Some(name) = checkpointable_name {
            if !pytree_dir.exists() {
                let subdirs = subdirectory_names(&self.path).unwrap_or_default();
                return Err(StorageError::malformed(
                    &self.path,
                    format!(
                        "checkpoint path {} must contain a subdirectory named \"{}\". \
                         Found subdirectories: {:?}",
                        self.path.display(),
                        name,
                        subdirs
                    ),
                ));
            }
        }
        if !pytree_dir.join(PYTREE_METADATA_FILE).exists() {
            return Err(StorageError::malformed(
                &pytree_dir,
                format!(
                    "checkpoint path {} does not contain a pytree metadata file",
                    pytree_dir.display()
                ),
            ));
        }
        if !has_tensorstore_data_files(&pytree_dir) {
            tracing::warn!(
                path = %self.path.display(),
                "tensorstore data files not found; the checkpoint may be malformed unless it \
                 consists entirely of strings or other non-array leaves"
            );
        }
        Ok(())
    }
}

fn has_tensorstore_data_files(dir: &Path) -> bool {
    if dir.join(OCDBT_MANIFEST_FILE).exists() {
        return true;
    }
    match entries(dir) {
        Ok(children) => children.iter().any(|c| c.join(ZARRAY_FILE).exists()),
        Err(_) => false,
    }
}

impl CheckpointLayout for NativeLayout {
    fn path(&self) -> &Path {
        &self.path
    }

    fn convention(&self) -> LayoutConvention {
        LayoutConvention::Native
    }

    fn validate(&mut self) -> Result<(), StorageError> {
        self.probe().map_err(|e| {
            invalid_layout(
                &self.path,
                LayoutConvention::Native,
                format!(
                    "failed to interpret path {} as a native checkpoint. {}",
                    self.path.display(),
                    GENERAL_ERROR_MESSAGE
                ),
                e,
            )
        })
    }

    fn validate_pytree(&self, checkpointable_name: Option<&str>) -> Result<(), StorageError> {
        self.probe_pytree(checkpointable_name).map_err(|e| {
            invalid_layout(
                &self.path,
                LayoutConvention::Native,
                format!(
                    "failed to interpret path {} as a native pytree checkpoint. {}",
                    self.path.display(),
                    GENERAL_ERROR_MESSAGE
                ),
                e,
            )
        })
    }
}

/// Returns `true` if `path` validates as a native checkpoint.
pub fn is_native_checkpoint(path: &Path) -> bool {
    NativeLayout::new(path).validate().is_ok()
}
