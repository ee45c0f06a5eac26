//! Collaborators the map model consults but does not own.
//!
//! Faces and animation definitions arrive through separate protocol commands
//! (and from the local face cache); the map model refers to them by number and
//! resolves them here.
mod animations;
mod faces;

pub use animations::{Animation, AnimationCatalog, AnimationKind};
pub use faces::{Face, FaceCatalog, FaceOracle};
