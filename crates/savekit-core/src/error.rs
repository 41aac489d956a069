//! Core error types for savekit-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering
//! malformed module graphs and bad tensor specs.

use crate::id::{FunctionId, PolyFunctionId, VariableId};
use thiserror::Error;

/// Core errors produced by the savekit-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A variable handle does not address this module's arena.
    #[error("variable not found: VariableId({id})", id = id.0)]
    VariableNotFound { id: VariableId },

    /// A concrete function handle does not address this module's arena.
    #[error("function not found: FunctionId({id})", id = id.0)]
    FunctionNotFound { id: FunctionId },

    /// A polymorphic function handle does not address this module's arena.
    #[error("polymorphic function not found: PolyFunctionId({id})", id = id.0)]
    PolymorphicFunctionNotFound { id: PolyFunctionId },

    /// A child with this key is already attached to the module root.
    #[error("duplicate key in module: '{key}'")]
    DuplicateKey { key: String },

    /// A dtype name that is not one of the known element types.
    #[error("unknown dtype: '{name}'")]
    UnknownDType { name: String },
}
