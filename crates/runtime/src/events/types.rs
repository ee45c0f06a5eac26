use std::collections::BTreeSet;

use map_core::SquarePos;
use serde::{Deserialize, Serialize};

use super::Topic;

/// Notification published after a batch or a map reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapEvent {
    /// A batch completed; `squares` are the redrawn viewport squares.
    Changed { squares: BTreeSet<SquarePos> },
    /// The viewport was scrolled by `(dx, dy)`.
    Scrolled { dx: i32, dy: i32 },
    /// The viewport dimensions changed.
    SizeChanged { width: u32, height: u32 },
    /// The server started a new map.
    Newmap,
}

impl MapEvent {
    pub fn topic(&self) -> Topic {
        match self {
            MapEvent::Changed { .. } => Topic::Squares,
            MapEvent::Scrolled { .. } | MapEvent::SizeChanged { .. } | MapEvent::Newmap => {
                Topic::Viewport
            }
        }
    }
}
