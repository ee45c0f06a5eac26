//! Synchronous map observers.
//!
//! Observers run on the producer thread while the batch lock is held, after
//! the batch state is final. They must not call back into the updater's
//! batch API.

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

use map_core::{MapGrid, SquarePos};

/// Receives map notifications. All methods default to no-ops.
pub trait MapObserver: Send + Sync {
    /// A batch completed. `squares` holds the viewport squares to redraw.
    fn map_changed(&self, map: &MapGrid, squares: &BTreeSet<SquarePos>) {
        let _ = (map, squares);
    }

    /// The viewport size changed.
    fn map_size_changed(&self, width: u32, height: u32) {
        let _ = (width, height);
    }

    /// The viewport scrolled; `(x, y)` now shows what was at `(x + dx, y + dy)`.
    fn map_scrolled(&self, dx: i32, dy: i32) {
        let _ = (dx, dy);
    }

    /// A new map started; all previous map data is gone.
    fn newmap(&self) {}
}

/// Registered observers, compared by pointer identity.
#[derive(Default)]
pub(crate) struct ObserverList {
    observers: RwLock<Vec<Arc<dyn MapObserver>>>,
}

impl ObserverList {
    pub(crate) fn add(&self, observer: Arc<dyn MapObserver>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    pub(crate) fn remove(&self, observer: &Arc<dyn MapObserver>) -> bool {
        let mut observers = self.observers.write().unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|o| !same_observer(o, observer));
        observers.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Calls `f` on a snapshot of the observers, so observers may register
    /// or remove observers while being notified.
    pub(crate) fn each(&self, mut f: impl FnMut(&dyn MapObserver)) {
        let snapshot = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in &snapshot {
            f(observer.as_ref());
        }
    }
}

fn same_observer(a: &Arc<dyn MapObserver>, b: &Arc<dyn MapObserver>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl MapObserver for Counter {
        fn newmap(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn removes_by_identity() {
        let list = ObserverList::default();
        let a: Arc<dyn MapObserver> = Arc::new(Counter::default());
        let b: Arc<dyn MapObserver> = Arc::new(Counter::default());
        list.add(Arc::clone(&a));
        list.add(Arc::clone(&b));

        assert!(list.remove(&a));
        assert!(!list.remove(&a));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn notifies_every_observer() {
        let list = ObserverList::default();
        let counter = Arc::new(Counter::default());
        list.add(counter.clone());
        list.add(counter.clone());

        list.each(|observer| observer.newmap());
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }
}
