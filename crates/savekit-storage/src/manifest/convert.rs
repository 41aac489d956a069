//! Conversions between in-memory types and their manifest wire form.
//!
//! Going to the wire only fails for dimensions past `i64::MAX`. Coming back
//! validates what the wire type cannot express: dtype names, dimension values
//! and required payloads.

use indexmap::IndexMap;
use savekit_core::{DType, TensorSpec};

use crate::error::StorageError;
use crate::manifest::proto::{self, manifest, unstructured_data};
use crate::supplemental::{Payload, SavedSupplemental, UnstructuredData};

/// Wire value of a dynamic dimension.
pub const DYNAMIC_DIM: i64 = -1;

pub fn tensor_spec_to_proto(spec: &TensorSpec) -> Result<proto::TensorSpec, StorageError> {
    let dims = spec
        .shape
        .iter()
        .map(|d| match d {
            Some(n) => i64::try_from(*n).map_err(|_| {
                StorageError::Precondition(format!(
                    "tensor dimension {} does not fit in a manifest dimension",
                    n
                ))
            }),
            None => Ok(DYNAMIC_DIM),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(proto::TensorSpec {
        dtype: spec.dtype.as_str().to_string(),
        dims,
    })
}

pub fn tensor_spec_from_proto(spec: &proto::TensorSpec) -> Result<TensorSpec, StorageError> {
    let dtype: DType = spec.dtype.parse()?;
    let mut dims = Vec::with_capacity(spec.dims.len());
    for &d in &spec.dims {
        match d {
            DYNAMIC_DIM => dims.push(None),
            n if n >= 0 => dims.push(Some(n as u64)),
            n => {
                return Err(StorageError::IntegrityError {
                    reason: format!("invalid tensor dimension {}", n),
                })
            }
        }
    }
    Ok(TensorSpec::with_dims(dtype, dims))
}

pub fn unstructured_data_to_proto(data: &UnstructuredData) -> proto::UnstructuredData {
    let payload = match &data.payload {
        Payload::InlinedString(s) => unstructured_data::Payload::InlinedString(s.clone()),
        Payload::InlinedBytes(b) => unstructured_data::Payload::InlinedBytes(b.clone()),
        Payload::FileLocation(f) => unstructured_data::Payload::FileLocation(f.clone()),
    };
    proto::UnstructuredData {
        payload: Some(payload),
        mime_type: data.mime_type.clone().unwrap_or_default(),
        version: data.version.clone().unwrap_or_default(),
    }
}

pub fn unstructured_data_from_proto(
    data: &proto::UnstructuredData,
) -> Result<UnstructuredData, StorageError> {
    let payload = match &data.payload {
        Some(unstructured_data::Payload::InlinedString(s)) => Payload::InlinedString(s.clone()),
        Some(unstructured_data::Payload::InlinedBytes(b)) => Payload::InlinedBytes(b.clone()),
        Some(unstructured_data::Payload::FileLocation(f)) => Payload::FileLocation(f.clone()),
        None => {
            return Err(StorageError::IntegrityError {
                reason: "supplemental data without a payload".to_string(),
            })
        }
    };
    // proto3 strings cannot be absent; empty means unset.
    let non_empty = |s: &String| (!s.is_empty()).then(|| s.clone());
    Ok(UnstructuredData {
        payload,
        mime_type: non_empty(&data.mime_type),
        version: non_empty(&data.version),
    })
}

pub fn supplemental_to_proto(saved: &SavedSupplemental) -> manifest::SupplementalInfo {
    match saved {
        SavedSupplemental::Single(data) => {
            manifest::SupplementalInfo::Supplemental(unstructured_data_to_proto(data))
        }
        SavedSupplemental::Named(named) => {
            manifest::SupplementalInfo::SupplementalMap(proto::SupplementalMap {
                entries: named
                    .iter()
                    .map(|(k, v)| (k.clone(), unstructured_data_to_proto(v)))
                    .collect(),
            })
        }
    }
}

/// Named entries come back in key order; the wire map does not keep
/// insertion order.
pub fn supplemental_from_proto(
    info: &manifest::SupplementalInfo,
) -> Result<SavedSupplemental, StorageError> {
    match info {
        manifest::SupplementalInfo::Supplemental(data) => {
            Ok(SavedSupplemental::Single(unstructured_data_from_proto(data)?))
        }
        manifest::SupplementalInfo::SupplementalMap(map) => {
            let named: IndexMap<String, UnstructuredData> = map
                .entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), unstructured_data_from_proto(v)?)))
                .collect::<Result<_, StorageError>>()?;
            Ok(SavedSupplemental::Named(named))
        }
    }
}
