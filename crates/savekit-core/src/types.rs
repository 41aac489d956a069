//! Tensor element types and shape specifications.
//!
//! [`TensorSpec`] describes a variable or a function argument without
//! carrying any values: values belong to the tensor framework that produced
//! them. Shapes use [`SmallVec`] since almost every tensor has rank <= 4.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::CoreError;

/// Element type of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F16,
    Bf16,
    F32,
    F64,
}

impl DType {
    /// Canonical lowercase name, used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::I8 => "i8",
            DType::I16 => "i16",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::U8 => "u8",
            DType::U16 => "u16",
            DType::U32 => "u32",
            DType::U64 => "u64",
            DType::F16 => "f16",
            DType::Bf16 => "bf16",
            DType::F32 => "f32",
            DType::F64 => "f64",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dtype = match s {
            "bool" => DType::Bool,
            "i8" => DType::I8,
            "i16" => DType::I16,
            "i32" => DType::I32,
            "i64" => DType::I64,
            "u8" => DType::U8,
            "u16" => DType::U16,
            "u32" => DType::U32,
            "u64" => DType::U64,
            "f16" => DType::F16,
            "bf16" => DType::Bf16,
            "f32" => DType::F32,
            "f64" => DType::F64,
            _ => return Err(CoreError::UnknownDType { name: s.to_string() }),
        };
        Ok(dtype)
    }
}

/// Shape and dtype of a tensor. A `None` dimension is dynamic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorSpec {
    pub dtype: DType,
    pub shape: SmallVec<[Option<u64>; 4]>,
}

impl TensorSpec {
    /// Creates a spec with a fully static shape.
    pub fn new(dtype: DType, shape: &[u64]) -> Self {
        TensorSpec {
            dtype,
            shape: shape.iter().map(|&d| Some(d)).collect(),
        }
    }

    /// Creates a rank-0 spec.
    pub fn scalar(dtype: DType) -> Self {
        TensorSpec {
            dtype,
            shape: SmallVec::new(),
        }
    }

    /// Creates a spec whose dimensions may be dynamic.
    pub fn with_dims(dtype: DType, dims: impl IntoIterator<Item = Option<u64>>) -> Self {
        TensorSpec {
            dtype,
            shape: dims.into_iter().collect(),
        }
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Returns `true` if every dimension is known.
    pub fn is_static(&self) -> bool {
        self.shape.iter().all(Option::is_some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dtype_names_roundtrip() {
        let all = [
            DType::Bool,
            DType::I8,
            DType::I16,
            DType::I32,
            DType::I64,
            DType::U8,
            DType::U16,
            DType::U32,
            DType::U64,
            DType::F16,
            DType::Bf16,
            DType::F32,
            DType::F64,
        ];
        for dtype in all {
            assert_eq!(dtype.as_str().parse::<DType>().unwrap(), dtype);
        }
    }

    #[test]
    fn unknown_dtype_errors() {
        match "complex64".parse::<DType>() {
            Err(CoreError::UnknownDType { name }) => assert_eq!(name, "complex64"),
            other => panic!("expected UnknownDType, got {:?}", other),
        }
    }

    #[test]
    fn dtype_serde_matches_wire_name() {
        let json = serde_json::to_string(&DType::Bf16).unwrap();
        assert_eq!(json, "\"bf16\"");
    }

    #[test]
    fn static_and_dynamic_shapes() {
        let spec = TensorSpec::new(DType::F32, &[5, 10]);
        assert_eq!(spec.rank(), 2);
        assert!(spec.is_static());

        let dynamic = TensorSpec::with_dims(DType::F32, [None, Some(10)]);
        assert_eq!(dynamic.rank(), 2);
        assert!(!dynamic.is_static());

        assert_eq!(TensorSpec::scalar(DType::I64).rank(), 0);
    }
}
