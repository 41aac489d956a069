//! Protobuf wire types of `manifest.pb`.
//!
//! Declared with `prost` derives rather than generated from a `.proto` file.
//! Every map is a `BTreeMap`, so encoding the same manifest twice yields the
//! same bytes.

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Clone, PartialEq, prost::Message, Serialize)]
pub struct Manifest {
    #[prost(uint32, tag = "1")]
    pub version: u32,
    /// Assigned variable name -> entry.
    #[prost(btree_map = "string, message", tag = "2")]
    pub variables: BTreeMap<String, VariableEntry>,
    /// Assigned function name -> entry.
    #[prost(btree_map = "string, message", tag = "3")]
    pub functions: BTreeMap<String, FunctionEntry>,
    /// Root key -> names of the grouped concrete functions.
    #[prost(btree_map = "string, message", tag = "4")]
    pub polymorphic_functions: BTreeMap<String, PolymorphicEntry>,
    /// Root key -> what it refers to.
    #[prost(btree_map = "string, message", tag = "5")]
    pub objects: BTreeMap<String, ObjectRef>,
    /// Alias -> assigned function name.
    #[prost(btree_map = "string, string", tag = "6")]
    pub function_aliases: BTreeMap<String, String>,
    #[prost(oneof = "manifest::SupplementalInfo", tags = "7, 8")]
    pub supplemental_info: Option<manifest::SupplementalInfo>,
}

pub mod manifest {
    use serde::Serialize;

    #[derive(Clone, PartialEq, prost::Oneof, Serialize)]
    #[serde(rename_all = "snake_case")]
    pub enum SupplementalInfo {
        #[prost(message, tag = "7")]
        Supplemental(super::UnstructuredData),
        #[prost(message, tag = "8")]
        SupplementalMap(super::SupplementalMap),
    }
}

#[derive(Clone, PartialEq, prost::Message, Serialize)]
pub struct VariableEntry {
    #[prost(message, optional, tag = "1")]
    pub spec: Option<TensorSpec>,
}

#[derive(Clone, PartialEq, prost::Message, Serialize)]
pub struct FunctionEntry {
    #[prost(message, repeated, tag = "1")]
    pub input_signature: Vec<TensorSpec>,
    #[prost(message, repeated, tag = "2")]
    pub output_signature: Vec<TensorSpec>,
    #[prost(message, optional, tag = "3")]
    pub body: Option<FunctionBody>,
    /// Assigned names of the captured variables, in capture order.
    #[prost(string, repeated, tag = "4")]
    pub capture_names: Vec<String>,
}

#[derive(Clone, PartialEq, prost::Message, Serialize)]
pub struct FunctionBody {
    #[prost(string, tag = "1")]
    pub format: String,
    #[prost(bytes = "vec", tag = "2")]
    #[serde(skip_serializing)]
    pub program: Vec<u8>,
    /// Hex blake3 digest of `program`.
    #[prost(string, tag = "3")]
    pub blake3: String,
}

#[derive(Clone, PartialEq, prost::Message, Serialize)]
pub struct PolymorphicEntry {
    #[prost(string, repeated, tag = "1")]
    pub concrete_function_names: Vec<String>,
}

#[derive(Clone, PartialEq, prost::Message, Serialize)]
pub struct ObjectRef {
    #[prost(oneof = "object_ref::Kind", tags = "1, 2, 3")]
    pub kind: Option<object_ref::Kind>,
}

pub mod object_ref {
    use serde::Serialize;

    #[derive(Clone, PartialEq, prost::Oneof, Serialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Kind {
        #[prost(string, tag = "1")]
        Variable(String),
        #[prost(string, tag = "2")]
        Function(String),
        #[prost(string, tag = "3")]
        PolymorphicFunction(String),
    }
}

#[derive(Clone, PartialEq, prost::Message, Serialize)]
pub struct TensorSpec {
    #[prost(string, tag = "1")]
    pub dtype: String,
    /// `-1` marks a dynamic dimension.
    #[prost(int64, repeated, tag = "2")]
    pub dims: Vec<i64>,
}

#[derive(Clone, PartialEq, prost::Message, Serialize)]
pub struct UnstructuredData {
    #[prost(oneof = "unstructured_data::Payload", tags = "1, 2, 3")]
    pub payload: Option<unstructured_data::Payload>,
    #[prost(string, tag = "4")]
    pub mime_type: String,
    #[prost(string, tag = "5")]
    pub version: String,
}

pub mod unstructured_data {
    use serde::Serialize;

    #[derive(Clone, PartialEq, prost::Oneof, Serialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Payload {
        #[prost(string, tag = "1")]
        InlinedString(String),
        #[prost(bytes = "vec", tag = "2")]
        InlinedBytes(Vec<u8>),
        #[prost(string, tag = "3")]
        FileLocation(String),
    }
}

#[derive(Clone, PartialEq, prost::Message, Serialize)]
pub struct SupplementalMap {
    #[prost(btree_map = "string, message", tag = "1")]
    pub entries: BTreeMap<String, UnstructuredData>,
}
