//! Session replay client for the map model.
//!
//! # Architecture
//!
//! ```text
//! mapreplay (composition root)
//!   ├─→ network task     (blocking: dispatches recorded messages)
//!   ├─→ face loader task (inserts late face definitions, reports them)
//!   └─→ renderer task    (consumes `Changed` events from the event bus)
//! ```
//!
//! All three share one [`map_runtime::MapUpdater`]. The network and face
//! loader tasks are producers; the renderer only reads.

pub mod config;
pub mod faces;
pub mod logging;
pub mod replay;
pub mod script;

pub use config::MapReplayConfig;
pub use faces::LiveFaces;
pub use replay::{ReplaySummary, replay, run};
pub use script::ReplayScript;
