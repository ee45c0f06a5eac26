//! Topic-based event bus for map events.
//!
//! Observers registered on the updater run synchronously inside the batch;
//! the bus serves asynchronous consumers (renderers, recorders) that only need
//! to know what changed.

mod bus;
mod types;

pub use bus::{EventBus, Topic};
pub use types::MapEvent;
