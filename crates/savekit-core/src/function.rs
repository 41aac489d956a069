//! Variables, concrete functions and polymorphic function groups.
//!
//! A [`ConcreteFunction`] is one specialization of a computation with fixed
//! input/output signatures. Its program is an opaque [`FunctionBody`] blob
//! produced by the tensor framework; savekit stores it and hands it back
//! unchanged. Variables the function reads are listed in
//! [`captured_vars`](ConcreteFunction::captured_vars) by handle, so the same
//! variable can be shared between any number of functions.

use serde::{Deserialize, Serialize};

use crate::id::{FunctionId, VariableId};
use crate::types::TensorSpec;

/// A model variable. Only its spec lives here; values are external.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub spec: TensorSpec,
}

impl Variable {
    pub fn new(spec: TensorSpec) -> Self {
        Variable { spec }
    }
}

/// Serialized program of a concrete function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionBody {
    /// Name of the program representation, e.g. `"stablehlo"`.
    pub format: String,
    /// Opaque serialized program.
    pub program: Vec<u8>,
}

impl FunctionBody {
    pub fn new(format: impl Into<String>, program: impl Into<Vec<u8>>) -> Self {
        FunctionBody {
            format: format.into(),
            program: program.into(),
        }
    }
}

/// A fully specialized callable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcreteFunction {
    pub input_signature: Vec<TensorSpec>,
    pub output_signature: Vec<TensorSpec>,
    pub body: FunctionBody,
    /// Variables read by the body, in argument order.
    pub captured_vars: Vec<VariableId>,
}

impl ConcreteFunction {
    /// Creates a function with no captures.
    pub fn new(
        input_signature: Vec<TensorSpec>,
        output_signature: Vec<TensorSpec>,
        body: FunctionBody,
    ) -> Self {
        ConcreteFunction {
            input_signature,
            output_signature,
            body,
            captured_vars: Vec::new(),
        }
    }

    /// Builder-style setter for the captured variables.
    pub fn with_captures(mut self, captured_vars: Vec<VariableId>) -> Self {
        self.captured_vars = captured_vars;
        self
    }
}

/// One logical callable specialized over several input signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolymorphicFunction {
    pub name: String,
    pub concrete_fns: Vec<FunctionId>,
}
