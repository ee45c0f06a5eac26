//! Map state: identifiers, squares and the grid.
mod grid;
mod square;
mod types;

pub use grid::{HeadRef, MapGrid};
pub use square::{MapSquare, SquareUpdate};
pub use types::{AnimationId, FaceNum, Location, SquarePos};
