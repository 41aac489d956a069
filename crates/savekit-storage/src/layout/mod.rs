//! On-disk checkpoint layouts.
//!
//! Every supported convention implements [`CheckpointLayout`]. The registry
//! hands callers a [`LayoutInstance`], a closed enum over the concrete
//! variants, so code that needs variant-specific behavior (the legacy
//! checkpointable search only applies to [`NativeLayout`]) can match on it
//! exhaustively.

pub mod flat;
pub mod native;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

pub use flat::FlatTensorLayout;
pub use native::NativeLayout;

/// On-disk format family a caller expects at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutConvention {
    /// Structured checkpoint directory with metadata files per checkpointable.
    Native,
    /// A single safetensors container.
    FlatTensor,
}

impl LayoutConvention {
    pub fn as_str(self) -> &'static str {
        match self {
            LayoutConvention::Native => "native",
            LayoutConvention::FlatTensor => "flat_tensor",
        }
    }
}

impl fmt::Display for LayoutConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutConvention {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" | "orbax" => Ok(LayoutConvention::Native),
            "flat_tensor" | "flat" | "safetensors" => Ok(LayoutConvention::FlatTensor),
            _ => Err(StorageError::Precondition(format!(
                "unsupported checkpoint layout: '{}'",
                s
            ))),
        }
    }
}

/// The validation contract shared by all layout variants.
///
/// Validation only probes the filesystem; it never writes.
pub trait CheckpointLayout {
    /// Path the layout is bound to.
    fn path(&self) -> &Path;

    /// Convention this layout implements.
    fn convention(&self) -> LayoutConvention;

    /// Checks that the path is a checkpoint in this convention.
    ///
    /// Takes `&mut self` so a variant may cache what it observed.
    fn validate(&mut self) -> Result<(), StorageError>;

    /// Checks that `checkpointable_name` (or the layout root, if `None`)
    /// holds a pytree payload.
    fn validate_pytree(&self, checkpointable_name: Option<&str>) -> Result<(), StorageError>;
}

/// A resolved layout, owned by the caller for the duration of a read.
#[derive(Debug, Clone)]
pub enum LayoutInstance {
    Native(NativeLayout),
    FlatTensor(FlatTensorLayout),
}

impl LayoutInstance {
    /// Constructs the unvalidated variant for `convention`.
    pub fn new(path: &Path, convention: LayoutConvention) -> Self {
        match convention {
            LayoutConvention::Native => LayoutInstance::Native(NativeLayout::new(path)),
            LayoutConvention::FlatTensor => {
                LayoutInstance::FlatTensor(FlatTensorLayout::new(path))
            }
        }
    }

    pub fn as_native(&self) -> Option<&NativeLayout> {
        match self {
            LayoutInstance::Native(layout) => Some(layout),
            LayoutInstance::FlatTensor(_) => None,
        }
    }

    pub fn as_flat_tensor(&self) -> Option<&FlatTensorLayout> {
        match self {
            LayoutInstance::FlatTensor(layout) => Some(layout),
            LayoutInstance::Native(_) => None,
        }
    }
}

impl CheckpointLayout for LayoutInstance {
    fn path(&self) -> &Path {
        match self {
            LayoutInstance::Native(layout) => layout.path(),
            LayoutInstance::FlatTensor(layout) => layout.path(),
        }
    }

    fn convention(&self) -> LayoutConvention {
        match self {
            LayoutInstance::Native(layout) => layout.convention(),
            LayoutInstance::FlatTensor(layout) => layout.convention(),
        }
    }

    fn validate(&mut self) -> Result<(), StorageError> {
        match self {
            LayoutInstance::Native(layout) => layout.validate(),
            LayoutInstance::FlatTensor(layout) => layout.validate(),
        }
    }

    fn validate_pytree(&self, checkpointable_name: Option<&str>) -> Result<(), StorageError> {
        match self {
            LayoutInstance::Native(layout) => layout.validate_pytree(checkpointable_name),
            LayoutInstance::FlatTensor(layout) => layout.validate_pytree(checkpointable_name),
        }
    }
}

/// Wraps a variant-level failure into an `InvalidLayout` naming the path.
pub(crate) fn invalid_layout(
    path: &Path,
    convention: LayoutConvention,
    message: String,
    cause: StorageError,
) -> StorageError {
    StorageError::InvalidLayout {
        path: path.to_path_buf(),
        convention: Some(convention),
        message,
        candidates: Vec::new(),
        source: Some(Box::new(cause)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convention_parses_aliases() {
        assert_eq!("native".parse::<LayoutConvention>().unwrap(), LayoutConvention::Native);
        assert_eq!("ORBAX".parse::<LayoutConvention>().unwrap(), LayoutConvention::Native);
        assert_eq!(
            "safetensors".parse::<LayoutConvention>().unwrap(),
            LayoutConvention::FlatTensor
        );
        assert_eq!(
            "flat_tensor".parse::<LayoutConvention>().unwrap(),
            LayoutConvention::FlatTensor
        );
    }

    #[test]
    fn unknown_convention_is_precondition_violation() {
        match "tfrecord".parse::<LayoutConvention>() {
            Err(StorageError::Precondition(msg)) => assert!(msg.contains("tfrecord")),
            other => panic!("expected Precondition, got {:?}", other),
        }
    }

    #[test]
    fn convention_serde_and_display_agree() {
        let json = serde_json::to_string(&LayoutConvention::FlatTensor).unwrap();
        assert_eq!(json, format!("\"{}\"", LayoutConvention::FlatTensor));
    }

    #[test]
    fn instance_reports_its_convention() {
        let layout = LayoutInstance::new(Path::new("/tmp/x"), LayoutConvention::FlatTensor);
        assert_eq!(layout.convention(), LayoutConvention::FlatTensor);
        assert_eq!(layout.path(), Path::new("/tmp/x"));
        assert!(layout.as_native().is_none());
        assert!(layout.as_flat_tensor().is_some());
    }
}
