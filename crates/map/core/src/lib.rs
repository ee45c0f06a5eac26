//! Client-side map model shared by the updater runtime and offline tools.
//!
//! `map-core` holds the viewport-relative map grid, the multi-tile head/tail
//! bookkeeping, fog-of-war derivation and the animation engine. It performs no
//! I/O and takes no locks; [`MapGrid`] and [`MapAnimations`] are plain data
//! structures that the runtime wraps in its batch discipline.
pub mod animation;
pub mod config;
pub mod debug;
pub mod env;
pub mod error;
pub mod state;

pub use animation::{AnimationState, FaceUpdate, MapAnimations, StateId};
pub use config::MapConfig;
pub use debug::render_region;
pub use env::{Animation, AnimationCatalog, AnimationKind, Face, FaceCatalog, FaceOracle};
pub use error::{ErrorSeverity, MapError, Result};
pub use state::{
    AnimationId, FaceNum, HeadRef, Location, MapGrid, MapSquare, SquarePos, SquareUpdate,
};
