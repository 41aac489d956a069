//! On-disk side of savekit: checkpoint layout detection and the manifest
//! writer/reader for exported modules.
//!
//! # Architecture
//!
//! The load path and the save path share on-disk constants but nothing else:
//! - **Load**: [`get_checkpoint_layout`] binds a path to a
//!   [`LayoutInstance`] and validates it; [`resolve_pytree_checkpointable`]
//!   then works out where the pytree payload lives, including for legacy
//!   checkpoints that predate the indicator file.
//! - **Save**: [`save`] externalizes supplemental data, names the module
//!   graph, and writes `manifest.pb`; [`load_manifest`] reads it back and
//!   checks body digests and cross-references.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`layout`]: CheckpointLayout trait and the native / flat variants
//! - [`registry`]: layout and pytree checkpointable resolution
//! - [`supplemental`]: supplemental data records and their externalization
//! - [`manifest`]: manifest wire types, conversions and builder
//! - [`save`]: SaveOptions, save and load_manifest
//! - [`path`]: filesystem helpers

pub mod error;
pub mod layout;
pub mod manifest;
pub mod path;
pub mod registry;
pub mod save;
pub mod supplemental;

// Re-export key types for ergonomic use.
pub use error::StorageError;
pub use layout::{CheckpointLayout, FlatTensorLayout, LayoutConvention, LayoutInstance, NativeLayout};
pub use manifest::{build_manifest, Manifest, MANIFEST_FILENAME};
pub use registry::{get_checkpoint_layout, get_checkpoint_layout_pytree, resolve_pytree_checkpointable};
pub use save::{load_manifest, save, SaveOptions, MANIFEST_VERSION_THRESHOLD};
pub use supplemental::{
    save_supplementals, Payload, SavedSupplemental, Supplemental, SupplementalInfo,
    UnstructuredData,
};
