//! Producers on separate threads share one updater; observers must only ever
//! see completed batches.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use map_core::{Face, FaceCatalog, FaceNum, Location, MapGrid, SquarePos};
use map_runtime::{MapObserver, MapUpdater, Topic};

/// Counts batches where the two mirrored squares disagree.
#[derive(Default)]
struct MirrorCheck {
    batches: AtomicUsize,
    torn: AtomicUsize,
}

impl MapObserver for MirrorCheck {
    fn map_changed(&self, map: &MapGrid, _squares: &BTreeSet<SquarePos>) {
        self.batches.fetch_add(1, Ordering::SeqCst);
        let left = map.face(0, 0, 0).map(|face| face.num);
        let right = map.face(3, 0, 0).map(|face| face.num);
        if left != right {
            self.torn.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn catalog() -> FaceCatalog {
    (1..=4)
        .map(|num| Face::new(FaceNum(num), format!("f{num}"), 1, 1))
        .collect()
}

#[test]
fn network_and_face_loader_threads_never_tear_batches() {
    const ROUNDS: u32 = 200;

    let check = Arc::new(MirrorCheck::default());
    let updater = MapUpdater::builder()
        .faces(Arc::new(catalog()))
        .observer(check.clone())
        .build();
    updater.new_map(4, 4).unwrap();
    let barrier = Barrier::new(3);

    thread::scope(|scope| {
        // Network thread: every batch writes the same face to both squares.
        scope.spawn(|| {
            barrier.wait();
            for round in 0..ROUNDS {
                let face = FaceNum(1 + round % 4);
                let mut batch = updater.begin();
                batch.face(Location::new(0, 0, 0), face).unwrap();
                batch.face(Location::new(3, 0, 0), face).unwrap();
                batch.end(false);
            }
        });

        // Face loader thread: reports images as they finish.
        scope.spawn(|| {
            barrier.wait();
            for round in 0..ROUNDS {
                updater.face_updated(FaceNum(1 + round % 4));
            }
        });

        // Renderer: reads the grid concurrently.
        scope.spawn(|| {
            barrier.wait();
            let map = updater.map();
            for _ in 0..ROUNDS {
                let grid = map.read();
                assert_eq!(grid.width(), 4);
            }
        });
    });

    assert!(check.batches.load(Ordering::SeqCst) > 0);
    assert_eq!(check.torn.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn events_reach_async_subscribers() {
    let updater = Arc::new(MapUpdater::builder().faces(Arc::new(catalog())).build());
    let mut squares = updater.subscribe(Topic::Squares);

    let producer = Arc::clone(&updater);
    tokio::task::spawn_blocking(move || {
        producer.new_map(3, 3).unwrap();
        let mut batch = producer.begin();
        batch.face(Location::new(2, 1, 0), FaceNum(2)).unwrap();
        batch.end(false);
    })
    .await
    .unwrap();

    let event = squares.recv().await.unwrap();
    let map_runtime::MapEvent::Changed { squares } = event else {
        panic!("expected a change event");
    };
    assert!(squares.contains(&SquarePos::new(2, 1)));
}
