use std::path::PathBuf;

use map_client::{MapReplayConfig, run};
use map_runtime::UpdaterConfig;

fn demo_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos/replay")
}

#[tokio::test]
async fn demo_session_replays_cleanly() {
    let dir = demo_dir();
    let config = MapReplayConfig {
        updater: UpdaterConfig {
            animation_seed: Some(7),
            ..UpdaterConfig::default()
        },
        data_dir: Some(dir.clone()),
        faces_file: None,
        animations_file: Some(dir.join("animations.ron")),
        script_file: dir.join("session.ron"),
        session_id: None,
    };

    let summary = run(&config).await.unwrap();

    assert_eq!(summary.rejected, 0);
    assert_eq!(summary.late_faces, 1);
    let rows: Vec<&str> = summary.viewport.lines().collect();
    assert_eq!(rows.len(), 5);
    // The top row scrolled away; the multi-tile head keeps its remaining tail.
    assert_eq!(rows[0], "[H0=_,T6=M][H0=_,H6=M][][][]");
    // Both synced animations show the same frame.
    assert!(rows[2].ends_with("[H0=~][H0=~]") || rows[2].ends_with("[H0==][H0==]"));
}
