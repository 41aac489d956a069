//! The flat single-file tensor layout.
//!
//! The whole checkpoint is one safetensors container: either the path itself
//! (`*.safetensors`) or [`FLAT_TENSOR_FILE`] inside the path. Validation maps
//! the file and parses its header; tensor data is never touched.

use std::fs::File;
use std::path::{Path, PathBuf};

use safetensors::tensor::{Dtype, Metadata};
use safetensors::SafeTensors;
use serde::Serialize;

use crate::error::StorageError;
use crate::layout::{invalid_layout, CheckpointLayout, LayoutConvention};

/// Fixed location of the container inside a flat checkpoint directory.
pub const FLAT_TENSOR_FILE: &str = "model.safetensors";
/// Extension accepted when the path points at the container directly.
pub const FLAT_TENSOR_EXTENSION: &str = "safetensors";

/// 8-byte little-endian header length prefix.
const HEADER_LEN_BYTES: u64 = 8;

/// Name, dtype and shape of one tensor in the container header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlatTensorInfo {
    pub name: String,
    pub dtype: String,
    pub shape: Vec<usize>,
}

/// A safetensors-backed checkpoint.
#[derive(Debug, Clone)]
pub struct FlatTensorLayout {
    path: PathBuf,
}

impl FlatTensorLayout {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FlatTensorLayout { path: path.into() }
    }

    /// Location of the container file for this layout.
    pub fn tensor_file(&self) -> PathBuf {
        if self.path.is_dir() {
            self.path.join(FLAT_TENSOR_FILE)
        } else {
            self.path.clone()
        }
    }

    /// Tensors listed in the container header, sorted by name.
    pub fn tensor_specs(&self) -> Result<Vec<FlatTensorInfo>, StorageError> {
        let metadata = self.read_header()?;
        let mut specs: Vec<FlatTensorInfo> = metadata
            .tensors()
            .into_iter()
            .map(|(name, info)| {
                Ok(FlatTensorInfo {
                    name,
                    dtype: dtype_name(info.dtype)?,
                    shape: info.shape.clone(),
                })
            })
            .collect::<Result<_, StorageError>>()?;
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(specs)
    }

    fn read_header(&self) -> Result<Metadata, StorageError> {
        let file_path = self.tensor_file();
        if !file_path.is_file() {
            return Err(StorageError::malformed(
                &self.path,
                format!(
                    "expected a .{} file or a directory containing {} at {}",
                    FLAT_TENSOR_EXTENSION,
                    FLAT_TENSOR_FILE,
                    self.path.display()
                ),
            ));
        }
        if file_path == self.path
            && file_path.extension().and_then(|e| e.to_str()) != Some(FLAT_TENSOR_EXTENSION)
        {
            return Err(StorageError::malformed(
                &self.path,
                format!("{} is not a .{} file", self.path.display(), FLAT_TENSOR_EXTENSION),
            ));
        }

        let file = File::open(&file_path)?;
        let file_size = file.metadata()?.len();
        if file_size < HEADER_LEN_BYTES {
            return Err(StorageError::malformed(
                &file_path,
                format!("{} is too small to hold a safetensors header", file_path.display()),
            ));
        }

        // SAFETY: the mapping is read-only and dropped before returning; a
        // concurrent writer can only make header parsing fail.
        let mmap = unsafe { memmap2::MmapOptions::new().map(&file)? };
        let (_, metadata) = SafeTensors::read_metadata(&mmap)?;
        Ok(metadata)
    }
}

/// Dtype as spelled in the safetensors header (`"F32"`, `"BF16"`, ...).
fn dtype_name(dtype: Dtype) -> Result<String, StorageError> {
    match serde_json::to_value(dtype)? {
        serde_json::Value::String(name) => Ok(name),
        other => Ok(other.to_string()),
    }
}

impl CheckpointLayout for FlatTensorLayout {
    fn path(&self) -> &Path {
        &self.path
    }

    fn convention(&self) -> LayoutConvention {
        LayoutConvention::FlatTensor
    }

    fn validate(&mut self) -> Result<(), StorageError> {
        self.read_header().map(|_| ()).map_err(|e| {
            invalid_layout(
                &self.path,
                LayoutConvention::FlatTensor,
                format!(
                    "failed to interpret path {} as a safetensors checkpoint",
                    self.path.display()
                ),
                e,
            )
        })
    }

    fn validate_pytree(&self, checkpointable_name: Option<&str>) -> Result<(), StorageError> {
        if let Some(name) = checkpointable_name {
            return Err(invalid_layout(
                &self.path,
                LayoutConvention::FlatTensor,
                format!(
                    "a safetensors checkpoint has no named checkpointables; got \"{}\"",
                    name
                ),
                StorageError::malformed(&self.path, "flat layouts hold exactly one pytree"),
            ));
        }
        self.read_header().map(|_| ()).map_err(|e| {
            invalid_layout(
                &self.path,
                LayoutConvention::FlatTensor,
                format!(
                    "failed to interpret path {} as a safetensors pytree",
                    self.path.display()
                ),
                e,
            )
        })
    }
}

/// Hand-assembled safetensors bytes for tests across the crate.
#[cfg(test)]
pub(crate) fn safetensors_bytes(tensors: &[(&str, &str, Vec<usize>)]) -> Vec<u8> {
    let mut header = serde_json::Map::new();
    let mut offset = 0usize;
    for (name, dtype, shape) in tensors {
        let width = match *dtype {
            "F64" | "I64" | "U64" => 8,
            "F32" | "I32" | "U32" => 4,
            "F16" | "BF16" | "I16" | "U16" => 2,
            _ => 1,
        };
        let len = shape.iter().product::<usize>() * width;
        header.insert(
            name.to_string(),
            serde_json::json!({ "dtype": dtype, "shape": shape, "data_offsets": [offset, offset + len] }),
        );
        offset += len;
    }
    let header = serde_json::to_vec(&header).unwrap();
    let mut bytes = (header.len() as u64).to_le_bytes().to_vec();
    bytes.extend_from_slice(&header);
    bytes.extend(std::iter::repeat(0u8).take(offset));
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn directory_with_container_validates() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join(FLAT_TENSOR_FILE),
            safetensors_bytes(&[("a", "I32", vec![9]), ("b", "F32", vec![3])]),
        )
        .unwrap();

        let mut layout = FlatTensorLayout::new(tmp.path());
        layout.validate().unwrap();
        layout.validate_pytree(None).unwrap();

        let specs = layout.tensor_specs().unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "a");
        assert_eq!(specs[0].shape, vec![9]);
        assert_eq!(specs[1].dtype, "F32");
    }

    #[test]
    fn dtypes_use_header_spelling() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join(FLAT_TENSOR_FILE),
            safetensors_bytes(&[("h", "BF16", vec![2]), ("m", "BOOL", vec![1])]),
        )
        .unwrap();

        let specs = FlatTensorLayout::new(tmp.path()).tensor_specs().unwrap();
        let dtypes: Vec<&str> = specs.iter().map(|s| s.dtype.as_str()).collect();
        assert_eq!(dtypes, vec!["BF16", "BOOL"]);
        assert_eq!(dtype_name(Dtype::F16).unwrap(), "F16");
    }

    #[test]
    fn direct_file_path_validates() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("test_checkpoint.safetensors");
        fs::write(&file, safetensors_bytes(&[("w", "F64", vec![2, 2])])).unwrap();

        let mut layout = FlatTensorLayout::new(&file);
        layout.validate().unwrap();
        assert_eq!(layout.tensor_file(), file);
    }

    #[test]
    fn wrong_extension_is_invalid() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("weights.bin");
        fs::write(&file, safetensors_bytes(&[("w", "F32", vec![1])])).unwrap();
        assert!(FlatTensorLayout::new(&file).validate().is_err());
    }

    #[test]
    fn corrupt_header_is_invalid() {
        let tmp = tempfile::tempdir().unwrap();
        let mut bytes = safetensors_bytes(&[("w", "F32", vec![4])]);
        bytes.truncate(bytes.len() - 4);
        fs::write(tmp.path().join(FLAT_TENSOR_FILE), bytes).unwrap();

        let err = FlatTensorLayout::new(tmp.path()).validate().unwrap_err();
        assert!(err.is_invalid_layout());
    }

    #[test]
    fn tiny_file_is_invalid() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(FLAT_TENSOR_FILE), b"abc").unwrap();
        assert!(FlatTensorLayout::new(tmp.path()).validate().is_err());
    }

    #[test]
    fn empty_directory_is_invalid() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(FlatTensorLayout::new(tmp.path()).validate().is_err());
    }

    #[test]
    fn named_checkpointable_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join(FLAT_TENSOR_FILE),
            safetensors_bytes(&[("w", "F32", vec![1])]),
        )
        .unwrap();
        let err = FlatTensorLayout::new(tmp.path())
            .validate_pytree(Some("params"))
            .unwrap_err();
        assert!(err.to_string().contains("params"));
    }
}
