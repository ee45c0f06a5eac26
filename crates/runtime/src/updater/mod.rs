//! The map update coordinator.
//!
//! [`MapUpdater`] owns the map grid and the animation engine and applies
//! decoded protocol commands to them. Two locks protect the state:
//!
//! - the batch lock (`Mutex<UpdaterState>`) serializes producers: the network
//!   thread applying update commands, the face loader reporting finished
//!   images, and the tick source;
//! - the grid lock (`RwLock<MapGrid>`) lets renderers read the grid while a
//!   producer works on a batch.
//!
//! The batch lock is always acquired first. Observers run after a batch is
//! final, so they never see a partially applied update.

mod batch;

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use map_core::{
    Animation, AnimationCatalog, AnimationId, Face, FaceCatalog, FaceNum, FaceOracle, Location,
    MapAnimations, MapConfig, MapError, MapGrid, Result,
};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::config::UpdaterConfig;
use crate::events::{EventBus, MapEvent, Topic};
use crate::messages::MapMessage;
use crate::observers::{MapObserver, ObserverList};

pub use batch::MapBatch;

/// State guarded by the batch lock.
struct UpdaterState {
    width: u32,
    height: u32,
    animations: MapAnimations,
    catalog: AnimationCatalog,
    /// Multi-tile faces set outside the viewport; they are removed before the
    /// next scroll so their tails do not linger.
    out_of_view: HashSet<Location>,
}

impl UpdaterState {
    fn is_visible(&self, location: Location) -> bool {
        location.square().is_within(self.width, self.height)
    }
}

/// Read-only access to the map grid for renderers.
#[derive(Clone)]
pub struct MapHandle {
    grid: Arc<RwLock<MapGrid>>,
}

impl MapHandle {
    /// Locks the grid for reading. Producers wait until the guard is dropped.
    pub fn read(&self) -> RwLockReadGuard<'_, MapGrid> {
        self.grid.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Applies map updates and notifies observers once per batch.
pub struct MapUpdater {
    config: MapConfig,
    faces: Arc<dyn FaceOracle>,
    state: Mutex<UpdaterState>,
    grid: Arc<RwLock<MapGrid>>,
    observers: ObserverList,
    events: EventBus,
}

impl MapUpdater {
    /// Create a new updater builder
    pub fn builder() -> MapUpdaterBuilder {
        MapUpdaterBuilder::new()
    }

    /// Opens a batch. Blocks while another producer holds one.
    pub fn begin(&self) -> MapBatch<'_> {
        MapBatch::new(self, self.lock_state())
    }

    /// Starts a new map of `width`x`height` squares.
    ///
    /// Size observers fire only if the size changed; newmap observers always
    /// fire.
    pub fn new_map(&self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 || width > MapConfig::MAX_MAP_SIZE || height > MapConfig::MAX_MAP_SIZE
        {
            return Err(MapError::InvalidMapSize { width, height });
        }
        let mut state = self.lock_state();
        self.apply_new_map(&mut state, width, height);
        Ok(())
    }

    /// Drops all map data, keeping the current size.
    pub fn reset(&self) {
        let mut state = self.lock_state();
        let (width, height) = (state.width, state.height);
        self.apply_new_map(&mut state, width, height);
    }

    /// Advances animations to server tick `tick_no`.
    pub fn tick(&self, tick_no: u32) {
        let mut batch = self.begin();
        batch.advance_animations(tick_no);
        batch.end(false);
    }

    /// Marks every visible square showing `face` for redraw after its image
    /// became available.
    pub fn face_updated(&self, face: FaceNum) {
        let batch = self.begin();
        self.grid_mut().update_face(face);
        batch.end(false);
    }

    /// Registers an animation definition received from the server.
    pub fn add_animation(&self, id: AnimationId, flags: u16, faces: Vec<FaceNum>) {
        self.lock_state()
            .catalog
            .insert(Animation::new(id, flags, faces));
    }

    /// Applies one decoded protocol message.
    ///
    /// An update runs in a single batch. A rejected command is logged and
    /// skipped and the remaining commands still apply. The first error is
    /// returned after the batch ended. Only fatal errors stop the batch early.
    pub fn dispatch(&self, message: MapMessage) -> Result<()> {
        match message {
            MapMessage::NewMap { width, height } => self.new_map(width, height),
            MapMessage::Update {
                commands,
                always_notify,
            } => {
                let mut batch = self.begin();
                let mut first_error = None;
                for (index, command) in commands.iter().enumerate() {
                    let Err(err) = batch.apply(command) else {
                        continue;
                    };
                    let fatal = !err.severity().is_recoverable();
                    warn!(index, code = err.error_code(), %err, "map command rejected");
                    first_error.get_or_insert(err);
                    if fatal {
                        break;
                    }
                }
                batch.end(always_notify);
                first_error.map_or(Ok(()), Err)
            }
            MapMessage::Tick { tick } => {
                self.tick(tick);
                Ok(())
            }
            MapMessage::FaceUpdated { face } => {
                self.face_updated(face);
                Ok(())
            }
            MapMessage::AddAnimation { id, flags, faces } => {
                self.add_animation(id, flags, faces);
                Ok(())
            }
        }
    }

    /// Read-only access to the grid.
    pub fn map(&self) -> MapHandle {
        MapHandle {
            grid: Arc::clone(&self.grid),
        }
    }

    pub fn width(&self) -> u32 {
        self.grid_read().width()
    }

    pub fn height(&self) -> u32 {
        self.grid_read().height()
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn add_observer(&self, observer: Arc<dyn MapObserver>) {
        self.observers.add(observer);
        debug!(observers = self.observers.len(), "observer added");
    }

    /// Removes a previously added observer. Returns whether it was registered.
    pub fn remove_observer(&self, observer: &Arc<dyn MapObserver>) -> bool {
        self.observers.remove(observer)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to a topic of the event bus.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<MapEvent> {
        self.events.subscribe(topic)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn lock_state(&self) -> MutexGuard<'_, UpdaterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn grid_mut(&self) -> RwLockWriteGuard<'_, MapGrid> {
        self.grid.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn grid_read(&self) -> RwLockReadGuard<'_, MapGrid> {
        self.grid.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply_new_map(&self, state: &mut UpdaterState, width: u32, height: u32) {
        let changed = state.width != width || state.height != height;
        state.width = width;
        state.height = height;
        state.animations.set_map_size(width, height);
        state.out_of_view.clear();
        self.grid_mut().reset(width, height);
        debug!(width, height, changed, "new map");

        if changed {
            self.observers.each(|o| o.map_size_changed(width, height));
            self.events.publish(MapEvent::SizeChanged { width, height });
        }
        self.observers.each(|o| o.newmap());
        self.events.publish(MapEvent::Newmap);
    }

    /// Resolves a face number. Faces the oracle does not know yet are
    /// represented by a placeholder until `face_updated` reports them.
    fn resolve_face(&self, num: FaceNum) -> Option<Arc<Face>> {
        if num.is_none() {
            return None;
        }
        Some(
            self.faces
                .face(num)
                .unwrap_or_else(|| Arc::new(Face::placeholder(num))),
        )
    }
}

/// Builder for [`MapUpdater`].
pub struct MapUpdaterBuilder {
    config: UpdaterConfig,
    faces: Option<Arc<dyn FaceOracle>>,
    animations: AnimationCatalog,
    observers: Vec<Arc<dyn MapObserver>>,
}

impl MapUpdaterBuilder {
    fn new() -> Self {
        Self {
            config: UpdaterConfig::default(),
            faces: None,
            animations: AnimationCatalog::new(),
            observers: Vec::new(),
        }
    }

    /// Override updater configuration
    pub fn config(mut self, config: UpdaterConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the face oracle. Defaults to an empty catalog, which makes every
    /// face a placeholder.
    pub fn faces(mut self, faces: Arc<dyn FaceOracle>) -> Self {
        self.faces = Some(faces);
        self
    }

    /// Preload animation definitions.
    pub fn animations(mut self, animations: AnimationCatalog) -> Self {
        self.animations = animations;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn MapObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn build(self) -> MapUpdater {
        let animations = match self.config.animation_seed {
            Some(seed) => MapAnimations::with_seed(seed),
            None => MapAnimations::new(),
        };
        let observers = ObserverList::default();
        for observer in self.observers {
            observers.add(observer);
        }

        MapUpdater {
            config: self.config.map_config(),
            faces: self
                .faces
                .unwrap_or_else(|| Arc::new(FaceCatalog::new())),
            state: Mutex::new(UpdaterState {
                width: 0,
                height: 0,
                animations,
                catalog: self.animations,
                out_of_view: HashSet::new(),
            }),
            grid: Arc::new(RwLock::new(MapGrid::new())),
            observers,
            events: EventBus::with_capacity(self.config.event_buffer_size),
        }
    }
}

impl Default for MapUpdaterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
