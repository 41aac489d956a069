//! Supplemental data attached to a saved module.
//!
//! Each record is either kept inline in the manifest or externalized into a
//! file next to it (`save_as`), in which case the manifest only stores the
//! relative file location.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::path::is_contained_relative;

/// Where the bytes of an [`UnstructuredData`] live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    InlinedString(String),
    InlinedBytes(Vec<u8>),
    /// Path relative to the export directory.
    FileLocation(String),
}

/// An opaque blob with optional descriptive tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnstructuredData {
    pub payload: Payload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl UnstructuredData {
    pub fn inlined_string(s: impl Into<String>) -> Self {
        Self::from_payload(Payload::InlinedString(s.into()))
    }

    pub fn inlined_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::from_payload(Payload::InlinedBytes(bytes.into()))
    }

    pub fn file_location(relative: impl Into<String>) -> Self {
        Self::from_payload(Payload::FileLocation(relative.into()))
    }

    fn from_payload(payload: Payload) -> Self {
        UnstructuredData {
            payload,
            mime_type: None,
            version: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    fn inlined_bytes_ref(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::InlinedString(s) => Some(s.as_bytes()),
            Payload::InlinedBytes(b) => Some(b),
            Payload::FileLocation(_) => None,
        }
    }
}

/// A supplemental record plus an optional file name to externalize it to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplementalInfo {
    pub data: UnstructuredData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_as: Option<String>,
}

impl SupplementalInfo {
    pub fn inline(data: UnstructuredData) -> Self {
        SupplementalInfo { data, save_as: None }
    }

    pub fn save_as(data: UnstructuredData, file_name: impl Into<String>) -> Self {
        SupplementalInfo {
            data,
            save_as: Some(file_name.into()),
        }
    }
}

/// The global supplemental info of a save: one record or a named mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Supplemental {
    Single(SupplementalInfo),
    Named(IndexMap<String, SupplementalInfo>),
}

/// [`Supplemental`] after externalization, as recorded in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavedSupplemental {
    Single(UnstructuredData),
    Named(IndexMap<String, UnstructuredData>),
}

/// Writes every record that asks for it into `base_path` and returns the
/// records as they should appear in the manifest.
///
/// All records are checked before anything is written.
pub fn save_supplementals(
    info: Option<&Supplemental>,
    base_path: &Path,
) -> Result<Option<SavedSupplemental>, StorageError> {
    let Some(info) = info else {
        return Ok(None);
    };

    match info {
        Supplemental::Single(single) => {
            check(single)?;
            Ok(Some(SavedSupplemental::Single(save_single(single, base_path)?)))
        }
        Supplemental::Named(named) => {
            for single in named.values() {
                check(single)?;
            }
            let mut saved = IndexMap::with_capacity(named.len());
            for (name, single) in named {
                saved.insert(name.clone(), save_single(single, base_path)?);
            }
            Ok(Some(SavedSupplemental::Named(saved)))
        }
    }
}

fn check(info: &SupplementalInfo) -> Result<(), StorageError> {
    let Some(save_as) = &info.save_as else {
        return Ok(());
    };
    if !is_contained_relative(Path::new(save_as)) {
        return Err(StorageError::Precondition(format!(
            "save_as must be a relative path inside the export directory, got '{}'",
            save_as
        )));
    }
    if let Payload::FileLocation(location) = &info.data.payload {
        return Err(StorageError::Precondition(format!(
            "supplemental data is already a file location ('{}') and cannot be saved as '{}'",
            location, save_as
        )));
    }
    Ok(())
}

fn save_single(info: &SupplementalInfo, base_path: &Path) -> Result<UnstructuredData, StorageError> {
    let (Some(save_as), Some(bytes)) = (&info.save_as, info.data.inlined_bytes_ref()) else {
        return Ok(info.data.clone());
    };

    let target = base_path.join(save_as);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&target, bytes)?;
    tracing::debug!(file = %target.display(), bytes = bytes.len(), "wrote supplemental data");

    Ok(UnstructuredData {
        payload: Payload::FileLocation(save_as.clone()),
        mime_type: info.data.mime_type.clone(),
        version: info.data.version.clone(),
    })
}
