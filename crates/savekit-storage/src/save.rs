//! Saving a module as `manifest.pb` plus supplemental files, and loading the
//! manifest back with integrity checks.

use std::fs;
use std::io::Write;
use std::path::Path;

use indexmap::IndexMap;
use prost::Message;
use savekit_core::{FunctionId, Module};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::StorageError;
use crate::manifest::convert::{supplemental_from_proto, tensor_spec_from_proto};
use crate::manifest::proto::object_ref;
use crate::manifest::{body_digest, build_manifest, Manifest, MANIFEST_FILENAME};
use crate::supplemental::{save_supplementals, Supplemental};

/// Lowest format version that writes a manifest.
pub const MANIFEST_VERSION_THRESHOLD: u32 = 2;

/// Caller-supplied options of [`save`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveOptions {
    /// Alias -> function handle, recorded against the function's assigned name.
    pub function_aliases: IndexMap<String, FunctionId>,
    /// Format version; must be at least [`MANIFEST_VERSION_THRESHOLD`].
    pub version: Option<u32>,
    pub supplemental_info: Option<Supplemental>,
}

impl SaveOptions {
    pub fn new(version: u32) -> Self {
        SaveOptions {
            version: Some(version),
            ..SaveOptions::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_alias(mut self, alias: impl Into<String>, function: FunctionId) -> Self {
        self.function_aliases.insert(alias.into(), function);
        self
    }

    pub fn with_supplemental(mut self, supplemental: Supplemental) -> Self {
        self.supplemental_info = Some(supplemental);
        self
    }
}

/// Saves `module` into the directory `path`, creating it if needed.
///
/// Supplemental records with `save_as` are written first, then the manifest.
/// The manifest goes through a temporary file in `path` that is renamed into
/// place, so an interrupted save never leaves a truncated `manifest.pb`.
pub fn save(module: &Module, path: &Path, options: Option<&SaveOptions>) -> Result<(), StorageError> {
    let options = options.ok_or_else(|| {
        StorageError::Precondition(format!(
            "options must be provided to save version >= {}",
            MANIFEST_VERSION_THRESHOLD
        ))
    })?;
    let version = match options.version {
        Some(v) if v >= MANIFEST_VERSION_THRESHOLD => v,
        other => {
            return Err(StorageError::Precondition(format!(
                "save requires version >= {}, got {:?}",
                MANIFEST_VERSION_THRESHOLD, other
            )))
        }
    };
    tracing::info!(version, path = %path.display(), "saving module");

    fs::create_dir_all(path)?;
    let supplemental = save_supplementals(options.supplemental_info.as_ref(), path)?;
    let manifest = build_manifest(
        module,
        version,
        &options.function_aliases,
        supplemental.as_ref(),
    )?;
    write_manifest(&manifest, path)
}

fn write_manifest(manifest: &Manifest, dir: &Path) -> Result<(), StorageError> {
    let bytes = manifest.encode_to_vec();
    let target = dir.join(MANIFEST_FILENAME);

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(&target).map_err(|e| StorageError::Io(e.error))?;

    tracing::debug!(file = %target.display(), bytes = bytes.len(), "wrote manifest");
    Ok(())
}

/// Reads `manifest.pb` from the export directory `path` and checks it.
///
/// Every function body must match its recorded digest, every spec must
/// decode, and every cross-reference (captures, objects, polymorphic groups,
/// aliases) must name an existing entry.
pub fn load_manifest(path: &Path) -> Result<Manifest, StorageError> {
    let file = path.join(MANIFEST_FILENAME);
    let bytes = fs::read(&file)?;
    let manifest = Manifest::decode(bytes.as_slice())?;
    verify(&manifest)?;
    tracing::debug!(
        file = %file.display(),
        version = manifest.version,
        functions = manifest.functions.len(),
        "loaded manifest"
    );
    Ok(manifest)
}

fn verify(manifest: &Manifest) -> Result<(), StorageError> {
    let integrity = |reason: String| StorageError::IntegrityError { reason };

    for (name, entry) in &manifest.variables {
        let spec = entry
            .spec
            .as_ref()
            .ok_or_else(|| integrity(format!("variable '{}' has no spec", name)))?;
        tensor_spec_from_proto(spec)?;
    }

    for (name, entry) in &manifest.functions {
        let body = entry
            .body
            .as_ref()
            .ok_or_else(|| integrity(format!("function '{}' has no body", name)))?;
        if body_digest(&body.program) != body.blake3 {
            return Err(integrity(format!(
                "body of function '{}' does not match its recorded digest",
                name
            )));
        }
        for spec in entry.input_signature.iter().chain(&entry.output_signature) {
            tensor_spec_from_proto(spec)?;
        }
        for capture in &entry.capture_names {
            if !manifest.variables.contains_key(capture) {
                return Err(integrity(format!(
                    "function '{}' captures unknown variable '{}'",
                    name, capture
                )));
            }
        }
    }

    for (key, entry) in &manifest.polymorphic_functions {
        for name in &entry.concrete_function_names {
            if !manifest.functions.contains_key(name) {
                return Err(integrity(format!(
                    "polymorphic function '{}' groups unknown function '{}'",
                    key, name
                )));
            }
        }
    }

    for (key, object) in &manifest.objects {
        let resolved = match &object.kind {
            Some(object_ref::Kind::Variable(n)) => manifest.variables.contains_key(n),
            Some(object_ref::Kind::Function(n)) => manifest.functions.contains_key(n),
            Some(object_ref::Kind::PolymorphicFunction(n)) => {
                manifest.polymorphic_functions.contains_key(n)
            }
            None => false,
        };
        if !resolved {
            return Err(integrity(format!("object '{}' has a dangling reference", key)));
        }
    }

    for (alias, name) in &manifest.function_aliases {
        if !manifest.functions.contains_key(name) {
            return Err(integrity(format!(
                "alias '{}' refers to unknown function '{}'",
                alias, name
            )));
        }
    }

    if let Some(info) = &manifest.supplemental_info {
        supplemental_from_proto(info)?;
    }
    Ok(())
}
