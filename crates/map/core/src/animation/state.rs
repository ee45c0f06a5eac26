use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::warn;

use crate::env::Animation;
use crate::state::{FaceNum, Location};

/// Slot index of an [`AnimationState`] inside the engine's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(pub(crate) usize);

/// A face the engine wants written into the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FaceUpdate {
    pub location: Location,
    pub face: FaceNum,
}

/// Playback position of an animation shown at one or more locations.
///
/// Sync animations share one state across all their locations; normal and
/// random animations own a state per location.
#[derive(Clone, Debug)]
pub struct AnimationState {
    animation: Arc<Animation>,
    /// Ticks per frame; `0` freezes the current frame.
    speed: u8,
    tick_no: u32,
    frame: u32,
    /// Ticks elapsed within the current frame.
    delay: u32,
    last_face: Option<FaceNum>,
    locations: BTreeSet<Location>,
}

impl AnimationState {
    pub fn new(animation: Arc<Animation>, frame: u32) -> Self {
        let frame = frame % animation.frame_count();
        Self {
            animation,
            speed: 1,
            tick_no: 0,
            frame,
            delay: 0,
            last_face: None,
            locations: BTreeSet::new(),
        }
    }

    pub fn animation(&self) -> &Arc<Animation> {
        &self.animation
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn tick_no(&self) -> u32 {
        self.tick_no
    }

    /// Face most recently written to the locations, if any.
    pub fn last_face(&self) -> Option<FaceNum> {
        self.last_face
    }

    pub fn locations(&self) -> &BTreeSet<Location> {
        &self.locations
    }

    pub fn is_unused(&self) -> bool {
        self.locations.is_empty()
    }

    /// Sets the tick baseline without advancing.
    pub fn set_tick_no(&mut self, tick_no: u32) {
        self.tick_no = tick_no;
    }

    /// Changes the playback speed, keeping the current frame.
    pub fn set_speed(&mut self, speed: u8) -> Vec<FaceUpdate> {
        if self.speed == speed {
            return Vec::new();
        }
        self.delay = match speed {
            0 => 0,
            speed => self.delay.min(u32::from(speed) - 1),
        };
        self.speed = speed;
        self.refresh()
    }

    /// Advances playback to `tick_no`.
    pub fn advance(&mut self, tick_no: u32) -> Vec<FaceUpdate> {
        if tick_no < self.tick_no {
            warn!(
                tick = tick_no,
                previous = self.tick_no,
                animation = %self.animation.id,
                "ignoring inconsistent tick value"
            );
        } else if self.speed > 0 {
            let speed = u64::from(self.speed);
            let total = u64::from(self.delay) + u64::from(tick_no - self.tick_no);
            let frames = u64::from(self.animation.frame_count());
            let next = u64::from(self.frame) + total / speed;
            self.frame = if self.animation.looping {
                (next % frames) as u32
            } else {
                next.min(frames - 1) as u32
            };
            self.delay = (total % speed) as u32;
        }
        self.tick_no = tick_no;
        self.refresh()
    }

    /// Adds a location. A state that already displays a face hands it to the
    /// new location right away.
    pub fn attach(&mut self, location: Location) -> Option<FaceUpdate> {
        self.locations.insert(location);
        self.last_face.map(|face| FaceUpdate { location, face })
    }

    pub fn detach(&mut self, location: Location) -> bool {
        self.locations.remove(&location)
    }

    /// Rebases the locations after a viewport scroll, dropping those that
    /// were or become invisible.
    pub fn scroll(&mut self, dx: i32, dy: i32, width: u32, height: u32) {
        self.locations = std::mem::take(&mut self.locations)
            .into_iter()
            .filter(|location| location.square().is_within(width, height))
            .map(|location| Location::new(location.x - dx, location.y - dy, location.layer))
            .filter(|location| location.square().is_within(width, height))
            .collect();
    }

    fn refresh(&mut self) -> Vec<FaceUpdate> {
        let face = self.animation.face(self.frame);
        if self.last_face == Some(face) {
            return Vec::new();
        }
        self.last_face = Some(face);
        self.locations
            .iter()
            .map(|&location| FaceUpdate { location, face })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AnimationId;

    fn animation(frames: u32) -> Arc<Animation> {
        Arc::new(Animation::new(
            AnimationId(1),
            0,
            (0..frames).map(|i| FaceNum(100 + i)).collect(),
        ))
    }

    fn faces(updates: &[FaceUpdate]) -> Vec<u32> {
        updates.iter().map(|update| update.face.0).collect()
    }

    #[test]
    fn advances_by_elapsed_ticks() {
        let mut state = AnimationState::new(animation(3), 0);
        state.attach(Location::new(0, 0, 0));
        state.set_tick_no(10);

        assert_eq!(faces(&state.advance(10)), vec![100]);
        assert_eq!(faces(&state.advance(12)), vec![102]);
        assert_eq!(faces(&state.advance(13)), vec![100]);
        assert!(state.advance(13).is_empty());
    }

    #[test]
    fn speed_divides_ticks() {
        let mut state = AnimationState::new(animation(4), 0);
        state.attach(Location::new(1, 1, 1));
        state.advance(0);
        state.set_speed(3);

        assert!(state.advance(2).is_empty());
        assert_eq!(faces(&state.advance(3)), vec![101]);
        assert_eq!(state.frame(), 1);
    }

    #[test]
    fn speed_change_clamps_partial_delay() {
        let mut state = AnimationState::new(animation(4), 0);
        state.set_speed(5);
        state.advance(4);
        assert_eq!(state.frame(), 0);

        state.set_speed(2);
        // The delay of 4 is clamped to 1, so one more tick moves on.
        state.advance(5);
        assert_eq!(state.frame(), 1);
    }

    #[test]
    fn zero_speed_freezes() {
        let mut state = AnimationState::new(animation(4), 2);
        state.set_speed(0);
        state.advance(50);
        assert_eq!(state.frame(), 2);
    }

    #[test]
    fn backwards_tick_is_ignored() {
        let mut state = AnimationState::new(animation(4), 0);
        state.set_tick_no(20);
        state.advance(10);
        assert_eq!(state.frame(), 0);
        assert_eq!(state.tick_no(), 10);
    }

    #[test]
    fn non_looping_stops_on_last_frame() {
        let anim = Animation::new(AnimationId(2), 0, vec![FaceNum(1), FaceNum(2)]).with_looping(false);
        let mut state = AnimationState::new(Arc::new(anim), 0);
        state.advance(9);
        assert_eq!(state.frame(), 1);
    }

    #[test]
    fn attach_hands_out_last_face() {
        let mut state = AnimationState::new(animation(2), 1);
        assert!(state.attach(Location::new(0, 0, 0)).is_none());
        state.advance(0);

        let update = state.attach(Location::new(3, 0, 0)).expect("face known");
        assert_eq!(update.face, FaceNum(101));
    }

    #[test]
    fn scroll_rebases_and_drops_locations() {
        let mut state = AnimationState::new(animation(2), 0);
        state.attach(Location::new(0, 0, 0));
        state.attach(Location::new(2, 1, 0));
        state.attach(Location::new(7, 1, 0));

        state.scroll(1, 0, 4, 4);
        let locations: Vec<_> = state.locations().iter().copied().collect();
        assert_eq!(locations, vec![Location::new(1, 1, 0)]);
    }
}
