//! Map update coordination for the client.
//!
//! This crate wires the pure map model of `map-core` into a thread-safe
//! updater. Producers (the network reader, the face loader, the tick source)
//! apply changes in batches; renderers read the grid and receive one
//! notification per completed batch.
//!
//! Modules are organized by responsibility:
//! - [`updater`] hosts the coordinator, its builder and the batch guard
//! - [`observers`] defines the synchronous observer interface
//! - [`events`] provides a topic-based event bus for asynchronous consumers
//! - [`messages`] describes decoded protocol messages
//! - [`config`] holds the tunables and their environment loader
pub mod config;
pub mod events;
pub mod messages;
pub mod observers;
pub mod updater;

pub use config::UpdaterConfig;
pub use events::{EventBus, MapEvent, Topic};
pub use messages::{MapCommand, MapMessage};
pub use observers::MapObserver;
pub use updater::{MapBatch, MapHandle, MapUpdater, MapUpdaterBuilder};

pub use map_core::{MapError, Result};
