//! Data-driven face and animation definitions.
//!
//! The server announces faces and animations at runtime; this crate loads the
//! locally cached definitions from RON files so that a session (or a replay)
//! starts with a populated catalog:
//! - Face catalogs (number, name, tile extent)
//! - Animation catalogs (ordered face lists, looping)
//!
//! Content feeds the map model's oracles and never appears in map state.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{AnimationLoader, ContentFactory, FaceLoader, FaceSpec};
