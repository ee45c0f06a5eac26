use std::collections::BTreeSet;
use std::sync::MutexGuard;

use map_core::{
    AnimationId, AnimationKind, FaceNum, FaceUpdate, Location, MapConfig, MapError, MapGrid,
    Result, SquarePos,
};
use tracing::{debug, trace, warn};

use super::{MapUpdater, UpdaterState};
use crate::events::MapEvent;
use crate::messages::MapCommand;

/// An open batch: holds the batch lock until [`MapBatch::end`].
///
/// Every command validates its coordinates first and leaves the map untouched
/// on error. Dropping a batch without ending it is a bug; debug builds panic,
/// release builds leave the changes to be reported by the next batch.
pub struct MapBatch<'a> {
    updater: &'a MapUpdater,
    state: MutexGuard<'a, UpdaterState>,
    scrolls: Vec<(i32, i32)>,
    ended: bool,
}

impl<'a> MapBatch<'a> {
    pub(super) fn new(updater: &'a MapUpdater, state: MutexGuard<'a, UpdaterState>) -> Self {
        trace!("batch begin");
        Self {
            updater,
            state,
            scrolls: Vec::new(),
            ended: false,
        }
    }

    /// Applies a decoded command.
    pub fn apply(&mut self, command: &MapCommand) -> Result<()> {
        match command {
            MapCommand::Clear { x, y } => self.clear(*x, *y),
            MapCommand::Face { location, face } => self.face(*location, *face),
            MapCommand::Animation {
                location,
                animation,
                kind,
            } => self.animation(*location, *animation, *kind),
            MapCommand::AnimationSpeed { location, speed } => {
                self.animation_speed(*location, *speed)
            }
            MapCommand::Smooth { location, smooth } => self.smooth(*location, *smooth),
            MapCommand::Darkness { x, y, darkness } => self.darkness(*x, *y, *darkness),
            MapCommand::MagicMap { x, y, rows } => {
                self.magic_map(*x, *y, rows);
                Ok(())
            }
            MapCommand::Scroll { dx, dy } => {
                self.scroll(*dx, *dy);
                Ok(())
            }
        }
    }

    /// Turns a square into fog-of-war and stops its animations.
    pub fn clear(&mut self, x: i32, y: i32) -> Result<()> {
        self.check_square(x, y)?;
        let state = &mut *self.state;
        state.animations.remove_square(x, y);
        state
            .out_of_view
            .retain(|location| location.square() != SquarePos::new(x, y));
        self.updater.grid_mut().clear_square(x, y);
        Ok(())
    }

    /// Sets a face, stopping any animation on the layer.
    pub fn face(&mut self, location: Location, face: FaceNum) -> Result<()> {
        self.face_with(location, face, true)
    }

    /// Sets a face. Animation frames use `clear_animation = false` so the
    /// animation keeps running.
    pub fn face_with(&mut self, location: Location, face: FaceNum, clear_animation: bool) -> Result<()> {
        self.check_location(location)?;
        if clear_animation {
            self.state.animations.remove(location);
        }
        let updater = self.updater;
        let mut grid = updater.grid_mut();
        self.put_face(&mut grid, location, face);
        Ok(())
    }

    /// Starts an animation. Unknown animation ids are skipped.
    pub fn animation(&mut self, location: Location, animation: AnimationId, kind: AnimationKind) -> Result<()> {
        self.check_location(location)?;
        let Some(definition) = self.state.catalog.get(animation) else {
            warn!(%animation, %location, "unknown animation id, ignoring");
            return Ok(());
        };

        let updater = self.updater;
        let mut grid = updater.grid_mut();
        grid.set_face(location.x, location.y, location.layer_index(), None);
        let updates = self.state.animations.add(location, definition, kind);
        self.put_frames(&mut grid, updates);
        Ok(())
    }

    /// Changes the speed of a running animation. Locations without an
    /// animation are skipped.
    pub fn animation_speed(&mut self, location: Location, speed: u8) -> Result<()> {
        self.check_location(location)?;
        match self.state.animations.update_speed(location, speed) {
            Some(updates) => {
                let updater = self.updater;
                let mut grid = updater.grid_mut();
                self.put_frames(&mut grid, updates);
            }
            None => warn!(%location, speed, "no animation to update speed of, ignoring"),
        }
        Ok(())
    }

    pub fn smooth(&mut self, location: Location, smooth: u8) -> Result<()> {
        self.check_location(location)?;
        self.updater
            .grid_mut()
            .set_smooth(location.x, location.y, location.layer_index(), smooth);
        Ok(())
    }

    pub fn darkness(&mut self, x: i32, y: i32, darkness: u8) -> Result<()> {
        self.check_square(x, y)?;
        self.updater.grid_mut().set_darkness(x, y, darkness);
        Ok(())
    }

    /// Applies magic map colors. The overview may extend beyond the viewport
    /// margin, so the area is not validated.
    pub fn magic_map(&mut self, x: i32, y: i32, rows: &[Vec<u8>]) {
        self.updater.grid_mut().set_magic_map(x, y, rows);
    }

    /// Scrolls the viewport by `(dx, dy)`.
    pub fn scroll(&mut self, dx: i32, dy: i32) {
        let state = &mut *self.state;
        let mut grid = self.updater.grid_mut();

        for location in state.out_of_view.drain() {
            state.animations.remove(location);
            grid.set_face(location.x, location.y, location.layer_index(), None);
        }

        if grid.process_scroll(dx, dy) {
            debug!(dx, dy, "scroll exceeds viewport, map cleared");
            state.animations.clear();
        } else {
            state.animations.scroll(dx, dy);
        }
        self.scrolls.push((dx, dy));
    }

    /// Ends the batch and notifies observers.
    ///
    /// Observers and `Changed` subscribers are skipped if nothing changed,
    /// unless `always_notify` is set. Returns the redrawn squares.
    pub fn end(mut self, always_notify: bool) -> BTreeSet<SquarePos> {
        self.ended = true;
        let updater = self.updater;

        for (dx, dy) in std::mem::take(&mut self.scrolls) {
            updater.observers.each(|o| o.map_scrolled(dx, dy));
            updater.events.publish(MapEvent::Scrolled { dx, dy });
        }

        let squares = updater.grid_mut().take_dirty();
        if squares.is_empty() && !always_notify {
            trace!("batch end, nothing changed");
            return squares;
        }

        {
            let grid = updater.grid_read();
            updater.observers.each(|o| o.map_changed(&grid, &squares));
        }
        updater.events.publish(MapEvent::Changed {
            squares: squares.clone(),
        });
        trace!(squares = squares.len(), "batch end");
        squares
    }

    pub(super) fn advance_animations(&mut self, tick_no: u32) {
        let updates = self.state.animations.tick(tick_no);
        if !updates.is_empty() {
            let updater = self.updater;
            let mut grid = updater.grid_mut();
            self.put_frames(&mut grid, updates);
        }
    }

    fn put_frames(&mut self, grid: &mut MapGrid, updates: Vec<FaceUpdate>) {
        for update in updates {
            self.put_face(grid, update.location, update.face);
        }
    }

    /// Writes a face into the grid and tracks multi-tile faces outside the
    /// viewport.
    fn put_face(&mut self, grid: &mut MapGrid, location: Location, face: FaceNum) {
        let face = self.updater.resolve_face(face);
        let state = &mut *self.state;
        if !state.is_visible(location) {
            match &face {
                Some(face) if face.is_multi_tile() => {
                    state.out_of_view.insert(location);
                }
                _ => {
                    state.out_of_view.remove(&location);
                }
            }
        }
        grid.set_face(location.x, location.y, location.layer_index(), face);
    }

    fn check_square(&self, x: i32, y: i32) -> Result<()> {
        let margin = self.updater.config.coord_margin;
        let (width, height) = (self.state.width, self.state.height);
        let inside = |v: i32, size: u32| -margin <= v && i64::from(v) < i64::from(size) + i64::from(margin);
        if inside(x, width) && inside(y, height) {
            Ok(())
        } else {
            Err(MapError::OutOfBounds {
                x,
                y,
                width,
                height,
            })
        }
    }

    fn check_location(&self, location: Location) -> Result<()> {
        if !location.has_valid_layer() {
            return Err(MapError::InvalidLayer {
                layer: location.layer,
                max: MapConfig::NUM_LAYERS,
            });
        }
        self.check_square(location.x, location.y)
    }
}

impl Drop for MapBatch<'_> {
    fn drop(&mut self) {
        if !self.ended && !std::thread::panicking() {
            debug_assert!(self.ended, "map batch dropped without end()");
            warn!("map batch dropped without end(), changes deferred to the next batch");
        }
    }
}
