//! Animation engine.
//!
//! Tracks which locations show an animation and advances playback on server
//! ticks. The engine never touches the grid: every mutation returns the
//! [`FaceUpdate`]s the caller has to apply.
//!
//! States live in an arena. Locations hold slot indices; a slot is freed
//! once its last location goes away.
mod state;

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::config::MapConfig;
use crate::env::{Animation, AnimationKind};
use crate::state::{AnimationId, Location};

pub use state::{AnimationState, FaceUpdate, StateId};

#[derive(Debug)]
pub struct MapAnimations {
    width: u32,
    height: u32,
    rng: StdRng,
    slots: Vec<Option<AnimationState>>,
    free_slots: Vec<usize>,
    by_location: HashMap<Location, StateId>,
    sync: HashMap<AnimationId, StateId>,
    /// States created since the last tick; they take that tick as baseline.
    pending: Vec<StateId>,
}

impl Default for MapAnimations {
    fn default() -> Self {
        Self::new()
    }
}

impl MapAnimations {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Creates an engine whose random start frames are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            width: 0,
            height: 0,
            rng,
            slots: Vec::new(),
            free_slots: Vec::new(),
            by_location: HashMap::new(),
            sync: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Number of live animation states.
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.by_location.is_empty()
    }

    pub fn state(&self, id: StateId) -> Option<&AnimationState> {
        self.slots.get(id.0)?.as_ref()
    }

    pub fn state_id(&self, location: Location) -> Option<StateId> {
        self.by_location.get(&location).copied()
    }

    /// Returns the animation state shown at `location`.
    pub fn at(&self, location: Location) -> Option<&AnimationState> {
        self.state(self.state_id(location)?)
    }

    /// Starts an animation at `location`, replacing whatever ran there.
    pub fn add(
        &mut self,
        location: Location,
        animation: Arc<Animation>,
        kind: AnimationKind,
    ) -> Vec<FaceUpdate> {
        self.remove(location);

        let id = match kind {
            AnimationKind::Normal => self.enroll(AnimationState::new(animation, 0)),
            AnimationKind::Random => {
                let frame = self.rng.gen_range(0..animation.frame_count());
                self.enroll(AnimationState::new(animation, frame))
            }
            AnimationKind::Sync => match self.sync.get(&animation.id).copied() {
                Some(id) => id,
                None => {
                    let animation_id = animation.id;
                    let id = self.enroll(AnimationState::new(animation, 0));
                    self.sync.insert(animation_id, id);
                    id
                }
            },
        };

        trace!(%location, ?id, %kind, "animation added");
        self.by_location.insert(location, id);
        self.state_mut(id)
            .and_then(|state| state.attach(location))
            .into_iter()
            .collect()
    }

    /// Detaches `location` from its animation.
    pub fn remove(&mut self, location: Location) {
        let Some(id) = self.by_location.remove(&location) else {
            return;
        };
        let unused = self.state_mut(id).is_some_and(|state| {
            state.detach(location);
            state.is_unused()
        });
        if unused {
            self.release(id);
        }
    }

    /// Detaches every layer of a square.
    pub fn remove_square(&mut self, x: i32, y: i32) {
        for layer in 0..MapConfig::NUM_LAYERS as u8 {
            self.remove(Location::new(x, y, layer));
        }
    }

    /// Changes the speed of the animation at `location`.
    ///
    /// Returns `None` if no animation runs there.
    pub fn update_speed(&mut self, location: Location, speed: u8) -> Option<Vec<FaceUpdate>> {
        let id = self.state_id(location)?;
        self.state_mut(id).map(|state| state.set_speed(speed))
    }

    /// Advances every animation to `tick_no`.
    pub fn tick(&mut self, tick_no: u32) -> Vec<FaceUpdate> {
        for id in std::mem::take(&mut self.pending) {
            if let Some(state) = self.state_mut(id) {
                state.set_tick_no(tick_no);
            }
        }

        self.slots
            .iter_mut()
            .flatten()
            .flat_map(|state| state.advance(tick_no))
            .collect()
    }

    /// Forgets all animations.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_slots.clear();
        self.by_location.clear();
        self.sync.clear();
        self.pending.clear();
    }

    /// Sets the viewport size; all animations are dropped.
    pub fn set_map_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.clear();
    }

    /// Rebases all locations after a viewport scroll by `(dx, dy)`.
    ///
    /// Locations outside the viewport before or after the scroll are dropped,
    /// together with states left without locations.
    pub fn scroll(&mut self, dx: i32, dy: i32) {
        let (width, height) = (self.width, self.height);
        self.by_location.clear();

        let mut unused = Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(state) = slot else { continue };
            state.scroll(dx, dy, width, height);
            if state.is_unused() {
                unused.push(StateId(index));
            }
            for &location in state.locations() {
                self.by_location.insert(location, StateId(index));
            }
        }
        for id in unused {
            self.release(id);
        }
    }

    fn state_mut(&mut self, id: StateId) -> Option<&mut AnimationState> {
        self.slots.get_mut(id.0)?.as_mut()
    }

    fn enroll(&mut self, state: AnimationState) -> StateId {
        let id = match self.free_slots.pop() {
            Some(index) => {
                self.slots[index] = Some(state);
                StateId(index)
            }
            None => {
                self.slots.push(Some(state));
                StateId(self.slots.len() - 1)
            }
        };
        self.pending.push(id);
        id
    }

    fn release(&mut self, id: StateId) {
        let Some(state) = self.slots.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        if self.sync.get(&state.animation().id) == Some(&id) {
            self.sync.remove(&state.animation().id);
        }
        self.pending.retain(|&pending| pending != id);
        self.free_slots.push(id.0);
    }
}
