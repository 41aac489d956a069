//! Storage error types for savekit-storage.
//!
//! [`StorageError`] covers layout detection failures, caller precondition
//! violations, manifest integrity problems and the I/O and codec errors of
//! the underlying crates.

use std::path::PathBuf;

use savekit_core::CoreError;
use thiserror::Error;

use crate::layout::LayoutConvention;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The path does not conform to the requested or attempted layout.
    ///
    /// `candidates` lists the checkpointable names that were tried, when a
    /// search took place. `source` keeps the variant-level cause.
    #[error("invalid checkpoint layout at {}: {message}", path.display())]
    InvalidLayout {
        path: PathBuf,
        convention: Option<LayoutConvention>,
        message: String,
        candidates: Vec<String>,
        #[source]
        source: Option<Box<StorageError>>,
    },

    /// A probe found the path unusable (missing, not a directory, temporary,
    /// missing marker files). Surfaces as the source of an `InvalidLayout`.
    #[error("{reason}")]
    Malformed { path: PathBuf, reason: String },

    /// Caller misuse: unsupported layout tag, missing or outdated save
    /// options, contradictory supplemental info.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// A data integrity violation was detected in a loaded manifest.
    #[error("integrity error: {reason}")]
    IntegrityError { reason: String },

    /// Module graph error raised while naming or reading objects.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Filesystem I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest protobuf encoding failed.
    #[error("manifest encode error: {0}")]
    Encode(#[from] prost::EncodeError),

    /// Manifest protobuf decoding failed.
    #[error("manifest decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A safetensors container could not be parsed.
    #[error("safetensors error: {0}")]
    SafeTensors(#[from] safetensors::SafeTensorError),
}

impl StorageError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StorageError::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for [`StorageError::InvalidLayout`].
    pub fn is_invalid_layout(&self) -> bool {
        matches!(self, StorageError::InvalidLayout { .. })
    }

    /// Candidate names tried before an `InvalidLayout` was raised.
    pub fn candidates(&self) -> &[String] {
        match self {
            StorageError::InvalidLayout { candidates, .. } => candidates,
            _ => &[],
        }
    }
}
