//! Assembles a [`Manifest`] from a module graph.

use std::collections::BTreeMap;
use std::fmt::Display;

use indexmap::IndexMap;
use savekit_core::{assign_names, CoreError, FunctionId, Module, NameTables, Object, VariableId};

use crate::error::StorageError;
use crate::manifest::convert::{supplemental_to_proto, tensor_spec_to_proto};
use crate::manifest::proto::{
    object_ref, FunctionBody, FunctionEntry, Manifest, ObjectRef, PolymorphicEntry,
    VariableEntry,
};
use crate::supplemental::SavedSupplemental;

/// Hex blake3 digest recorded next to every function body.
pub fn body_digest(program: &[u8]) -> String {
    blake3::hash(program).to_hex().to_string()
}

/// Names every reachable object of `module` and builds its manifest.
///
/// `function_aliases` maps alias -> function handle; each handle must be
/// reachable from the root, otherwise it has no name to point at.
pub fn build_manifest(
    module: &Module,
    version: u32,
    function_aliases: &IndexMap<String, FunctionId>,
    supplemental: Option<&SavedSupplemental>,
) -> Result<Manifest, StorageError> {
    let names = assign_names(module)?;
    tracing::debug!(
        variables = names.variables.len(),
        functions = names.functions.len(),
        "assigned object names"
    );

    let mut manifest = Manifest {
        version,
        supplemental_info: supplemental.map(supplemental_to_proto),
        ..Manifest::default()
    };

    let mut variable_owners: BTreeMap<&str, VariableId> = BTreeMap::new();
    for (&id, name) in &names.variables {
        if let Some(other) = variable_owners.insert(name.as_str(), id) {
            return Err(name_collision("variable", name, other, id));
        }
        let variable = module.variable(id)?;
        manifest.variables.insert(
            name.clone(),
            VariableEntry {
                spec: Some(tensor_spec_to_proto(&variable.spec)?),
            },
        );
    }

    let mut function_owners: BTreeMap<&str, FunctionId> = BTreeMap::new();
    for (&id, name) in &names.functions {
        if let Some(other) = function_owners.insert(name.as_str(), id) {
            return Err(name_collision("function", name, other, id));
        }
        let function = module.function(id)?;
        let capture_names = function
            .captured_vars
            .iter()
            .map(|&var| variable_name(&names, var))
            .collect::<Result<Vec<_>, _>>()?;
        manifest.functions.insert(
            name.clone(),
            FunctionEntry {
                input_signature: function
                    .input_signature
                    .iter()
                    .map(tensor_spec_to_proto)
                    .collect::<Result<_, _>>()?,
                output_signature: function
                    .output_signature
                    .iter()
                    .map(tensor_spec_to_proto)
                    .collect::<Result<_, _>>()?,
                body: Some(FunctionBody {
                    format: function.body.format.clone(),
                    program: function.body.program.clone(),
                    blake3: body_digest(&function.body.program),
                }),
                capture_names,
            },
        );
    }

    for (key, object) in module.children() {
        let kind = match *object {
            Object::Variable(id) => object_ref::Kind::Variable(variable_name(&names, id)?),
            Object::ConcreteFunction(id) => object_ref::Kind::Function(function_name(&names, id)?),
            Object::PolymorphicFunction(id) => {
                let poly = module.polymorphic_function(id)?;
                let concrete_function_names = poly
                    .concrete_fns
                    .iter()
                    .map(|&f| function_name(&names, f))
                    .collect::<Result<Vec<_>, _>>()?;
                manifest.polymorphic_functions.insert(
                    key.clone(),
                    PolymorphicEntry {
                        concrete_function_names,
                    },
                );
                object_ref::Kind::PolymorphicFunction(key.clone())
            }
        };
        manifest
            .objects
            .insert(key.clone(), ObjectRef { kind: Some(kind) });
    }

    for (alias, &id) in function_aliases {
        let Some(name) = names.function_name(id) else {
            return Err(StorageError::Precondition(format!(
                "function alias '{}' refers to function {} which is not reachable from the module root",
                alias, id
            )));
        };
        manifest
            .function_aliases
            .insert(alias.clone(), name.to_string());
    }

    Ok(manifest)
}

/// Two distinct objects were given the same path-like name, e.g. a root key
/// `f/capture_0` next to the first capture of function `f`.
fn name_collision(
    kind: &str,
    name: &str,
    first: impl Display,
    second: impl Display,
) -> StorageError {
    StorageError::Precondition(format!(
        "{kind} name '{name}' is assigned to both {kind} {first} and {kind} {second}; \
         rename the root key that shadows the derived name"
    ))
}

fn variable_name(names: &NameTables, id: VariableId) -> Result<String, StorageError> {
    names
        .variable_name(id)
        .map(str::to_string)
        .ok_or(StorageError::Core(CoreError::VariableNotFound { id }))
}

fn function_name(names: &NameTables, id: FunctionId) -> Result<String, StorageError> {
    names
        .function_name(id)
        .map(str::to_string)
        .ok_or(StorageError::Core(CoreError::FunctionNotFound { id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supplemental::UnstructuredData;
    use savekit_core::{ConcreteFunction, DType, FunctionBody as Body, TensorSpec, Variable};

    fn weights() -> Variable {
        Variable::new(TensorSpec::new(DType::F32, &[4, 4]))
    }

    fn function(captures: Vec<VariableId>) -> ConcreteFunction {
        ConcreteFunction::new(
            vec![TensorSpec::with_dims(DType::F32, [None, Some(4)])],
            vec![TensorSpec::with_dims(DType::F32, [None, Some(4)])],
            Body::new("stablehlo", b"module @main {}".to_vec()),
        )
        .with_captures(captures)
    }

    #[test]
    fn two_variables_and_a_capturing_function() {
        let mut m = Module::new();
        m.add_variable("w", weights()).unwrap();
        m.add_variable("b", Variable::new(TensorSpec::new(DType::F32, &[4]))).unwrap();
        let hidden = m.new_variable(Variable::new(TensorSpec::scalar(DType::I64)));
        let f = m.add_concrete_function("serve", function(vec![hidden])).unwrap();

        let mut aliases = IndexMap::new();
        aliases.insert("tpu_main".to_string(), f);
        let manifest = build_manifest(&m, 2, &aliases, None).unwrap();

        let vars: Vec<&String> = manifest.variables.keys().collect();
        assert_eq!(vars, vec!["b", "serve/capture_0", "w"]);
        assert_eq!(manifest.functions.len(), 1);

        let entry = &manifest.functions["serve"];
        assert_eq!(entry.capture_names, vec!["serve/capture_0"]);
        assert_eq!(entry.input_signature[0].dims, vec![-1, 4]);
        let body = entry.body.as_ref().unwrap();
        assert_eq!(body.blake3, body_digest(b"module @main {}"));

        assert_eq!(manifest.function_aliases["tpu_main"], "serve");
        assert_eq!(
            manifest.objects["w"].kind,
            Some(object_ref::Kind::Variable("w".to_string()))
        );
        assert!(manifest.supplemental_info.is_none());
    }

    #[test]
    fn polymorphic_entries_list_concrete_names() {
        let mut m = Module::new();
        let f0 = m.new_concrete_function(function(vec![])).unwrap();
        let f1 = m.new_concrete_function(function(vec![])).unwrap();
        m.add_polymorphic_function("predict", vec![f0, f1]).unwrap();

        let manifest = build_manifest(&m, 2, &IndexMap::new(), None).unwrap();
        assert_eq!(
            manifest.polymorphic_functions["predict"].concrete_function_names,
            vec!["predict/concrete_0", "predict/concrete_1"]
        );
        assert_eq!(
            manifest.objects["predict"].kind,
            Some(object_ref::Kind::PolymorphicFunction("predict".to_string()))
        );
    }

    #[test]
    fn alias_to_unreachable_function_is_precondition() {
        let mut m = Module::new();
        let orphan = m.new_concrete_function(function(vec![])).unwrap();
        let mut aliases = IndexMap::new();
        aliases.insert("main".to_string(), orphan);

        match build_manifest(&m, 2, &aliases, None) {
            Err(StorageError::Precondition(msg)) => assert!(msg.contains("main")),
            other => panic!("expected Precondition, got {:?}", other),
        }
    }

    #[test]
    fn root_key_shadowing_a_capture_name_is_rejected() {
        let mut m = Module::new();
        let hidden = m.new_variable(weights());
        m.add_concrete_function("f", function(vec![hidden])).unwrap();
        m.add_variable("f/capture_0", weights()).unwrap();

        match build_manifest(&m, 2, &IndexMap::new(), None) {
            Err(StorageError::Precondition(msg)) => assert!(msg.contains("f/capture_0")),
            other => panic!("expected Precondition, got {:?}", other),
        }
    }

    #[test]
    fn root_key_shadowing_a_concrete_name_is_rejected() {
        let mut m = Module::new();
        let f0 = m.new_concrete_function(function(vec![])).unwrap();
        m.add_polymorphic_function("p", vec![f0]).unwrap();
        m.add_concrete_function("p/concrete_0", function(vec![])).unwrap();

        match build_manifest(&m, 2, &IndexMap::new(), None) {
            Err(StorageError::Precondition(msg)) => assert!(msg.contains("p/concrete_0")),
            other => panic!("expected Precondition, got {:?}", other),
        }
    }

    #[test]
    fn supplemental_is_embedded() {
        let m = Module::new();
        let saved = SavedSupplemental::Single(UnstructuredData::file_location("meta.json"));
        let manifest = build_manifest(&m, 3, &IndexMap::new(), Some(&saved)).unwrap();
        assert_eq!(manifest.version, 3);
        assert!(manifest.supplemental_info.is_some());
    }

    #[test]
    fn encoding_is_byte_stable() {
        use prost::Message;

        let mut m = Module::new();
        for key in ["z", "a", "m"] {
            m.add_variable(key, weights()).unwrap();
        }
        let first = build_manifest(&m, 2, &IndexMap::new(), None).unwrap().encode_to_vec();
        let second = build_manifest(&m, 2, &IndexMap::new(), None).unwrap().encode_to_vec();
        assert_eq!(first, second);
    }
}
