//! Content loaders for reading map data from files.
//!
//! Each loader turns one RON file into the definitions the map model's
//! catalogs are built from.

pub mod animations;
pub mod factory;
pub mod faces;

pub use animations::AnimationLoader;
pub use factory::ContentFactory;
pub use faces::{FaceLoader, FaceSpec};

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
