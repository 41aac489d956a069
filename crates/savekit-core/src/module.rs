//! The exportable module graph.
//!
//! [`Module`] owns three arenas (variables, concrete functions, polymorphic
//! functions) and a root mapping from string keys to [`Object`] handles.
//! Objects are created in the arenas first and then attached under one or
//! more keys; attaching the same handle twice, or capturing a variable that
//! is also attached at the root, shares the object rather than copying it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::function::{ConcreteFunction, PolymorphicFunction, Variable};
use crate::id::{FunctionId, PolyFunctionId, VariableId};

/// A node reachable from the module root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Object {
    Variable(VariableId),
    ConcreteFunction(FunctionId),
    PolymorphicFunction(PolyFunctionId),
}

/// Arena-backed module graph with an insertion-ordered root mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Module {
    variables: Vec<Variable>,
    functions: Vec<ConcreteFunction>,
    polymorphic_functions: Vec<PolymorphicFunction>,
    /// Root key -> child. Iteration order is insertion order.
    children: IndexMap<String, Object>,
}

impl Module {
    /// Creates an empty module.
    pub fn new() -> Self {
        Module::default()
    }

    // -------------------------------------------------------------------
    // Arena allocation
    // -------------------------------------------------------------------

    /// Allocates a variable without attaching it to the root.
    pub fn new_variable(&mut self, variable: Variable) -> VariableId {
        let id = VariableId(self.variables.len() as u32);
        self.variables.push(variable);
        id
    }

    /// Allocates a concrete function without attaching it to the root.
    ///
    /// Returns [`CoreError::VariableNotFound`] if a capture does not belong
    /// to this module.
    pub fn new_concrete_function(
        &mut self,
        function: ConcreteFunction,
    ) -> Result<FunctionId, CoreError> {
        for &var in &function.captured_vars {
            self.variable(var)?;
        }
        let id = FunctionId(self.functions.len() as u32);
        self.functions.push(function);
        Ok(id)
    }

    /// Allocates a polymorphic function grouping existing concrete functions.
    pub fn new_polymorphic_function(
        &mut self,
        name: impl Into<String>,
        concrete_fns: Vec<FunctionId>,
    ) -> Result<PolyFunctionId, CoreError> {
        for &f in &concrete_fns {
            self.function(f)?;
        }
        let id = PolyFunctionId(self.polymorphic_functions.len() as u32);
        self.polymorphic_functions.push(PolymorphicFunction {
            name: name.into(),
            concrete_fns,
        });
        Ok(id)
    }

    // -------------------------------------------------------------------
    // Root attachment
    // -------------------------------------------------------------------

    /// Attaches an existing object under `key`.
    ///
    /// Returns [`CoreError::DuplicateKey`] if `key` is taken, or a not-found
    /// error if the handle does not belong to this module.
    pub fn add(&mut self, key: impl Into<String>, object: Object) -> Result<(), CoreError> {
        let key = key.into();
        match object {
            Object::Variable(id) => {
                self.variable(id)?;
            }
            Object::ConcreteFunction(id) => {
                self.function(id)?;
            }
            Object::PolymorphicFunction(id) => {
                self.polymorphic_function(id)?;
            }
        }
        if self.children.contains_key(&key) {
            return Err(CoreError::DuplicateKey { key });
        }
        self.children.insert(key, object);
        Ok(())
    }

    /// Allocates a variable and attaches it under `key`.
    pub fn add_variable(
        &mut self,
        key: impl Into<String>,
        variable: Variable,
    ) -> Result<VariableId, CoreError> {
        let key = key.into();
        if self.children.contains_key(&key) {
            return Err(CoreError::DuplicateKey { key });
        }
        let id = self.new_variable(variable);
        self.children.insert(key, Object::Variable(id));
        Ok(id)
    }

    /// Allocates a concrete function and attaches it under `key`.
    pub fn add_concrete_function(
        &mut self,
        key: impl Into<String>,
        function: ConcreteFunction,
    ) -> Result<FunctionId, CoreError> {
        let key = key.into();
        if self.children.contains_key(&key) {
            return Err(CoreError::DuplicateKey { key });
        }
        let id = self.new_concrete_function(function)?;
        self.children.insert(key, Object::ConcreteFunction(id));
        Ok(id)
    }

    /// Groups existing concrete functions and attaches the group under `key`.
    pub fn add_polymorphic_function(
        &mut self,
        key: impl Into<String>,
        concrete_fns: Vec<FunctionId>,
    ) -> Result<PolyFunctionId, CoreError> {
        let key = key.into();
        if self.children.contains_key(&key) {
            return Err(CoreError::DuplicateKey { key });
        }
        let id = self.new_polymorphic_function(key.clone(), concrete_fns)?;
        self.children.insert(key, Object::PolymorphicFunction(id));
        Ok(id)
    }

    // -------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------

    /// Root key -> child mapping, in insertion order.
    pub fn children(&self) -> &IndexMap<String, Object> {
        &self.children
    }

    pub fn variable(&self, id: VariableId) -> Result<&Variable, CoreError> {
        self.variables
            .get(id.index())
            .ok_or(CoreError::VariableNotFound { id })
    }

    pub fn function(&self, id: FunctionId) -> Result<&ConcreteFunction, CoreError> {
        self.functions
            .get(id.index())
            .ok_or(CoreError::FunctionNotFound { id })
    }

    pub fn polymorphic_function(
        &self,
        id: PolyFunctionId,
    ) -> Result<&PolymorphicFunction, CoreError> {
        self.polymorphic_functions
            .get(id.index())
            .ok_or(CoreError::PolymorphicFunctionNotFound { id })
    }

    /// Number of allocated variables, attached or not.
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Number of allocated concrete functions, attached or not.
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }
}
