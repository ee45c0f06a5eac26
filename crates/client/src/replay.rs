//! Replays a recorded session through a [`MapUpdater`].

use std::sync::Arc;

use anyhow::{Context, Result};
use map_content::{AnimationLoader, ContentFactory, FaceLoader};
use map_core::{AnimationCatalog, Face, FaceCatalog, render_region};
use map_runtime::{MapEvent, MapMessage, MapUpdater, Topic, UpdaterConfig};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::config::MapReplayConfig;
use crate::faces::LiveFaces;
use crate::script::ReplayScript;

/// Outcome of a replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Messages dispatched, including rejected ones.
    pub messages: usize,
    /// Messages with at least one command that failed validation.
    pub rejected: usize,
    pub late_faces: usize,
    /// Final viewport in the debug region format.
    pub viewport: String,
}

/// Loads catalogs and the script named by `config` and replays it.
///
/// Explicit catalog files take precedence over the content directory.
pub async fn run(config: &MapReplayConfig) -> Result<ReplaySummary> {
    let factory = config.data_dir.as_deref().map(ContentFactory::new);
    let faces: FaceCatalog = match (&config.faces_file, &factory) {
        (Some(path), _) => FaceLoader::load(path)?.into_iter().collect(),
        (None, Some(factory)) => factory.load_faces()?,
        (None, None) => FaceCatalog::new(),
    };
    let animations: AnimationCatalog = match (&config.animations_file, &factory) {
        (Some(path), _) => AnimationLoader::load(path)?.into_iter().collect(),
        (None, Some(factory)) => factory.load_animations()?,
        (None, None) => AnimationCatalog::new(),
    };
    let script = ReplayScript::load(&config.script_file)?;
    info!(
        faces = faces.len(),
        animations = animations.len(),
        messages = script.messages.len(),
        "content loaded"
    );

    replay(config.updater.clone(), faces, animations, script).await
}

/// Replays `script`.
///
/// Messages are dispatched from a blocking network task. Late faces are
/// handed to the face loader task once all messages went out; the loader
/// inserts each definition and reports it to the updater. A renderer task
/// follows the `Changed` events until the replay ends.
pub async fn replay(
    config: UpdaterConfig,
    faces: FaceCatalog,
    animations: AnimationCatalog,
    script: ReplayScript,
) -> Result<ReplaySummary> {
    let faces = Arc::new(LiveFaces::new(faces));
    let updater = Arc::new(
        MapUpdater::builder()
            .config(config)
            .faces(faces.clone())
            .animations(animations)
            .build(),
    );

    let renderer = tokio::spawn(render_changes(updater.subscribe(Topic::Squares)));

    let (face_tx, face_rx) = mpsc::unbounded_channel();
    let loader = tokio::spawn(load_faces(Arc::clone(&updater), faces, face_rx));

    let ReplayScript {
        messages,
        late_faces,
    } = script;
    let network = {
        let updater = Arc::clone(&updater);
        tokio::task::spawn_blocking(move || {
            let outcome = dispatch_all(&updater, messages)?;
            for spec in late_faces {
                if face_tx.send(Face::from(spec)).is_err() {
                    warn!("face loader stopped early");
                    break;
                }
            }
            Ok::<_, anyhow::Error>(outcome)
        })
    };

    let (messages, rejected) = network.await.context("network task panicked")??;
    let late_faces = loader.await.context("face loader task panicked")??;
    renderer.abort();

    let (width, height) = (updater.width(), updater.height());
    let viewport = render_region(&updater.map().read(), 0, 0, width, height);
    info!(messages, rejected, late_faces, "replay finished");

    Ok(ReplaySummary {
        messages,
        rejected,
        late_faces,
        viewport,
    })
}

/// Dispatches messages in order. Validation errors are counted and the replay
/// continues; fatal errors abort it.
fn dispatch_all(updater: &MapUpdater, messages: Vec<MapMessage>) -> Result<(usize, usize)> {
    let mut rejected = 0;
    let total = messages.len();
    for (index, message) in messages.into_iter().enumerate() {
        if let Err(err) = updater.dispatch(message) {
            if !err.severity().is_recoverable() {
                return Err(err).with_context(|| format!("message {index} failed"));
            }
            warn!(index, code = err.error_code(), %err, "message rejected");
            rejected += 1;
        }
    }
    Ok((total, rejected))
}

/// Inserts faces as they arrive. Reporting a face waits for the batch lock,
/// so it runs on the blocking pool next to the network producer.
async fn load_faces(
    updater: Arc<MapUpdater>,
    faces: Arc<LiveFaces>,
    mut incoming: mpsc::UnboundedReceiver<Face>,
) -> Result<usize> {
    let mut loaded = 0;
    while let Some(face) = incoming.recv().await {
        let num = faces.insert(face);
        let updater = Arc::clone(&updater);
        tokio::task::spawn_blocking(move || updater.face_updated(num))
            .await
            .context("face update panicked")?;
        debug!(face = %num, "face loaded");
        loaded += 1;
    }
    Ok(loaded)
}

async fn render_changes(mut events: broadcast::Receiver<MapEvent>) {
    loop {
        match events.recv().await {
            Ok(MapEvent::Changed { squares }) => debug!(squares = squares.len(), "redraw"),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "renderer lagged behind, full redraw needed");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc as std_mpsc;
    use std::thread;

    use map_core::{FaceNum, FaceOracle};

    use super::*;

    fn catalog() -> FaceCatalog {
        [Face::new(FaceNum(1), "M", 2, 2), Face::new(FaceNum(2), "_", 1, 1)]
            .into_iter()
            .collect()
    }

    #[tokio::test]
    async fn replays_multi_tile_scenario() {
        let script = ReplayScript::parse(
            "(
                messages: [
                    NewMap(width: 2, height: 2),
                    Update(commands: [
                        Face(location: (x: 0, y: 0, layer: 0), face: 2),
                        Face(location: (x: 1, y: 0, layer: 0), face: 2),
                        Face(location: (x: 0, y: 1, layer: 0), face: 2),
                        Face(location: (x: 1, y: 1, layer: 0), face: 2),
                        Face(location: (x: 1, y: 1, layer: 6), face: 1),
                    ]),
                    Update(commands: [Clear(x: 99, y: 0)]),
                ],
                late_faces: [(num: 9, name: \"statue\")],
            )",
        )
        .unwrap();

        let summary = replay(UpdaterConfig::default(), catalog(), AnimationCatalog::new(), script)
            .await
            .unwrap();

        assert_eq!(summary.messages, 3);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.late_faces, 1);
        assert_eq!(
            summary.viewport,
            "[H0=_,T6=M][H0=_,T6=M]\n[H0=_,T6=M][H0=_,H6=M]\n"
        );
    }

    #[tokio::test]
    async fn fatal_errors_abort_the_replay() {
        let script = ReplayScript {
            messages: vec![MapMessage::NewMap {
                width: 0,
                height: 4,
            }],
            late_faces: Vec::new(),
        };

        let err = replay(UpdaterConfig::default(), catalog(), AnimationCatalog::new(), script)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("message 0"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn face_loader_waits_for_the_batch_lock_off_the_runtime() {
        let faces = Arc::new(LiveFaces::new(catalog()));
        let updater = Arc::new(MapUpdater::builder().faces(faces.clone()).build());
        updater.new_map(2, 2).unwrap();

        // Another producer holds a batch until the runtime thread releases it.
        let (held_tx, held_rx) = std_mpsc::channel();
        let (release_tx, release_rx) = std_mpsc::channel::<()>();
        let producer = {
            let updater = Arc::clone(&updater);
            thread::spawn(move || {
                let batch = updater.begin();
                held_tx.send(()).unwrap();
                release_rx.recv().unwrap();
                batch.end(false);
            })
        };
        held_rx.recv().unwrap();

        let (face_tx, face_rx) = mpsc::unbounded_channel();
        let loader = tokio::spawn(load_faces(Arc::clone(&updater), faces.clone(), face_rx));
        face_tx.send(Face::new(FaceNum(9), "statue", 1, 1)).unwrap();
        drop(face_tx);

        // The loader runs while the batch is held; the single runtime thread
        // must stay free to release it.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        release_tx.send(()).unwrap();
        producer.join().unwrap();

        assert_eq!(loader.await.unwrap().unwrap(), 1);
        assert_eq!(faces.face(FaceNum(9)).unwrap().name, "statue");
    }
}
