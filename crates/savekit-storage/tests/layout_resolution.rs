//! End-to-end layout detection tests over scratch directories.
//!
//! Each test lays out a checkpoint on disk the way a writer would, then runs
//! the public resolution entry points against it:
//! - current-format native directories
//! - flat safetensors containers, as a file or as a directory
//! - legacy native directories pointing at a pytree or containing one
//! - paths that match no convention

use std::fs;
use std::path::Path;

use savekit_storage::layout::flat::FLAT_TENSOR_FILE;
use savekit_storage::layout::native::{
    CHECKPOINT_INDICATOR_FILE, CHECKPOINT_METADATA_FILE, PYTREE_METADATA_FILE,
};
use savekit_storage::{
    get_checkpoint_layout, get_checkpoint_layout_pytree, CheckpointLayout, LayoutConvention,
    LayoutInstance, StorageError,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn write_pytree(dir: &Path) {
    fs::create_dir_all(dir.join("a")).unwrap();
    fs::write(dir.join(PYTREE_METADATA_FILE), "{}").unwrap();
    fs::write(dir.join("a").join(".zarray"), "{}").unwrap();
}

fn write_native_checkpoint(dir: &Path) {
    write_pytree(&dir.join("pytree"));
    fs::write(dir.join(CHECKPOINT_INDICATOR_FILE), "").unwrap();
    fs::write(dir.join(CHECKPOINT_METADATA_FILE), "{}").unwrap();
}

/// One F32 tensor named `w` with `n` elements.
fn safetensors_file(n: usize) -> Vec<u8> {
    let header = format!(
        r#"{{"w":{{"dtype":"F32","shape":[{}],"data_offsets":[0,{}]}}}}"#,
        n,
        n * 4
    );
    let mut bytes = (header.len() as u64).to_le_bytes().to_vec();
    bytes.extend_from_slice(header.as_bytes());
    bytes.extend(std::iter::repeat(0u8).take(n * 4));
    bytes
}

// ---------------------------------------------------------------------------
// Convention detection
// ---------------------------------------------------------------------------

#[test]
fn native_directory_resolves_to_native_layout() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("step_100");
    write_native_checkpoint(&dir);

    let layout = get_checkpoint_layout(&dir, LayoutConvention::Native).unwrap();
    assert!(matches!(layout, LayoutInstance::Native(_)));
    assert!(layout.as_native().unwrap().has_indicator_file());

    let (layout, name) =
        get_checkpoint_layout_pytree(&dir, LayoutConvention::Native, Some("pytree")).unwrap();
    assert_eq!(layout.path(), dir.as_path());
    assert_eq!(name.as_deref(), Some("pytree"));
}

#[test]
fn flat_directory_resolves_to_flat_layout() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join(FLAT_TENSOR_FILE), safetensors_file(3)).unwrap();

    let (layout, name) =
        get_checkpoint_layout_pytree(tmp.path(), LayoutConvention::FlatTensor, None).unwrap();
    assert!(name.is_none());
    let flat = layout.as_flat_tensor().unwrap();
    let specs = flat.tensor_specs().unwrap();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].shape, vec![3]);
}

#[test]
fn flat_file_resolves_to_flat_layout() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("test_checkpoint.safetensors");
    fs::write(&file, safetensors_file(1)).unwrap();

    let layout = get_checkpoint_layout(&file, LayoutConvention::FlatTensor).unwrap();
    assert_eq!(layout.convention(), LayoutConvention::FlatTensor);
}

#[test]
fn native_checkpoint_is_not_a_flat_checkpoint() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("0");
    write_native_checkpoint(&dir);

    let err = get_checkpoint_layout(&dir, LayoutConvention::FlatTensor).unwrap_err();
    match err {
        StorageError::InvalidLayout {
            path, convention, ..
        } => {
            assert_eq!(path, dir);
            assert_eq!(convention, Some(LayoutConvention::FlatTensor));
        }
        other => panic!("expected InvalidLayout, got {:?}", other),
    }
}

#[test]
fn empty_directory_is_no_checkpoint() {
    let tmp = tempfile::tempdir().unwrap();
    for convention in [LayoutConvention::Native, LayoutConvention::FlatTensor] {
        let err = get_checkpoint_layout(tmp.path(), convention).unwrap_err();
        assert!(err.is_invalid_layout());
        assert!(err.to_string().contains(&tmp.path().display().to_string()));
    }
}

#[test]
fn unknown_convention_string_is_precondition() {
    let err = "tensorflow".parse::<LayoutConvention>().unwrap_err();
    assert!(matches!(err, StorageError::Precondition(_)));
}

// ---------------------------------------------------------------------------
// Legacy checkpoints
// ---------------------------------------------------------------------------

#[test]
fn legacy_path_at_pytree_root_resolves_to_parent() {
    let tmp = tempfile::tempdir().unwrap();
    let ckpt = tmp.path().join("ckpt");
    write_pytree(&ckpt.join("default"));

    let (layout, name) =
        get_checkpoint_layout_pytree(&ckpt.join("default"), LayoutConvention::Native, None)
            .unwrap();
    assert_eq!(layout.path(), ckpt.as_path());
    assert_eq!(name.as_deref(), Some("default"));
}

#[test]
fn legacy_directory_with_params_subdirectory() {
    let tmp = tempfile::tempdir().unwrap();
    let ckpt = tmp.path().join("ckpt");
    write_pytree(&ckpt.join("params"));

    let (layout, name) = get_checkpoint_layout_pytree(&ckpt, LayoutConvention::Native, None).unwrap();
    assert_eq!(layout.path(), ckpt.as_path());
    assert_eq!(name.as_deref(), Some("params"));
    assert!(!layout.as_native().unwrap().has_indicator_file());
}

#[test]
fn legacy_directory_without_pytree_lists_every_candidate() {
    let tmp = tempfile::tempdir().unwrap();
    let ckpt = tmp.path().join("ckpt");
    for sub in ["opt_state", "rng", "metrics"] {
        fs::create_dir_all(ckpt.join(sub)).unwrap();
    }
    fs::write(ckpt.join(CHECKPOINT_METADATA_FILE), "{}").unwrap();

    let err = get_checkpoint_layout_pytree(&ckpt, LayoutConvention::Native, None).unwrap_err();
    assert!(err.is_invalid_layout());
    let mut candidates = err.candidates().to_vec();
    candidates.sort();
    assert_eq!(candidates, vec!["metrics", "opt_state", "rng"]);
    for name in ["metrics", "opt_state", "rng"] {
        assert!(err.to_string().contains(name));
    }
}

#[test]
fn explicit_missing_name_fails_final_validation() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("0");
    write_native_checkpoint(&dir);

    let err = get_checkpoint_layout_pytree(&dir, LayoutConvention::Native, Some("state"))
        .unwrap_err();
    assert!(err.is_invalid_layout());
}
