//! Stable names for every variable and concrete function in a module.
//!
//! Names are path-like strings derived from root keys:
//!
//! - an object attached directly at the root is named by its key;
//! - the `i`-th specialization of a polymorphic function `key` is named
//!   `key/concrete_{i}`;
//! - the `i`-th capture of a function named `f` is named `f/capture_{i}`.
//!
//! An object reachable by several paths keeps the first name it receives.
//! "First" is defined by a last-in-first-out walk of the root mapping: the
//! work list is seeded with the root children in insertion order and popped
//! from the back, and polymorphic specializations are pushed in order (so
//! the last specialization is named first). Changing the walk order changes
//! the output, so the same module always yields byte-identical tables.

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::CoreError;
use crate::id::{FunctionId, VariableId};
use crate::module::{Module, Object};

/// Handle -> assigned name tables. Iteration order is assignment order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NameTables {
    pub variables: IndexMap<VariableId, String>,
    pub functions: IndexMap<FunctionId, String>,
}

impl NameTables {
    pub fn variable_name(&self, id: VariableId) -> Option<&str> {
        self.variables.get(&id).map(String::as_str)
    }

    pub fn function_name(&self, id: FunctionId) -> Option<&str> {
        self.functions.get(&id).map(String::as_str)
    }
}

/// Walks `module` from its root and names every reachable variable and
/// concrete function.
///
/// Returns a not-found error if the module holds a dangling handle.
pub fn assign_names(module: &Module) -> Result<NameTables, CoreError> {
    let mut tables = NameTables::default();
    let mut to_visit: Vec<(String, Object)> = module
        .children()
        .iter()
        .map(|(key, object)| (key.clone(), *object))
        .collect();

    while let Some((key, child)) = to_visit.pop() {
        match child {
            Object::ConcreteFunction(id) => {
                if tables.functions.contains_key(&id) {
                    continue;
                }
                let function = module.function(id)?;
                for (i, &var) in function.captured_vars.iter().enumerate() {
                    module.variable(var)?;
                    tables
                        .variables
                        .entry(var)
                        .or_insert_with(|| format!("{key}/capture_{i}"));
                }
                tables.functions.insert(id, key);
            }
            Object::PolymorphicFunction(id) => {
                let poly = module.polymorphic_function(id)?;
                to_visit.extend(
                    poly.concrete_fns
                        .iter()
                        .enumerate()
                        .map(|(i, &f)| (format!("{key}/concrete_{i}"), Object::ConcreteFunction(f))),
                );
            }
            Object::Variable(id) => {
                module.variable(id)?;
                tables.variables.entry(id).or_insert(key);
            }
        }
    }

    Ok(tables)
}
