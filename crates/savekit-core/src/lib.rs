pub mod error;
pub mod function;
pub mod id;
pub mod module;
pub mod naming;
pub mod types;

// Re-export commonly used types
pub use error::CoreError;
pub use function::{ConcreteFunction, FunctionBody, PolymorphicFunction, Variable};
pub use id::{FunctionId, PolyFunctionId, VariableId};
pub use module::{Module, Object};
pub use naming::{assign_names, NameTables};
pub use types::{DType, TensorSpec};
