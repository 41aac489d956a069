//! The `manifest.pb` descriptor of a saved module.
//!
//! - [`proto`]: prost wire types
//! - [`convert`]: in-memory <-> wire conversions
//! - [`builder`]: module graph -> [`Manifest`]

pub mod builder;
pub mod convert;
pub mod proto;

pub use builder::{body_digest, build_manifest};
pub use proto::Manifest;

/// File name of the manifest inside an export directory.
pub const MANIFEST_FILENAME: &str = "manifest.pb";
