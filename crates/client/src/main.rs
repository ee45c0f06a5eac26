//! Map session replay binary.
//!
//! Replays a recorded session through the map updater and prints the final
//! viewport.
//!
//! # Examples
//!
//! ```bash
//! MAP_DATA_DIR=demos/replay \
//! MAP_SCRIPT_FILE=demos/replay/session.ron \
//! RUST_LOG=debug cargo run -p map-client
//! ```

use anyhow::Result;
use map_client::{MapReplayConfig, logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = MapReplayConfig::from_env();
    logging::setup_logging(config.session_id.as_deref())?;

    tracing::info!(script = %config.script_file.display(), "starting replay");
    tracing::debug!(?config, "replay configuration");

    let summary = map_client::run(&config).await?;
    if summary.rejected > 0 {
        tracing::warn!(
            rejected = summary.rejected,
            total = summary.messages,
            "some messages were rejected"
        );
    }

    print!("{}", summary.viewport);
    Ok(())
}
