use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use crate::config::MapConfig;
use crate::env::Face;
use crate::state::{FaceNum, MapSquare, SquarePos, SquareUpdate};

/// Resolved multi-tile reference of a tail square.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeadRef {
    /// Head square in viewport coordinates.
    pub head: SquarePos,
    pub face: Arc<Face>,
    /// Offset of the tail relative to the head, selecting the sub-image.
    pub dx: i32,
    pub dy: i32,
}

/// Bounding rectangle of the squares touched since the last reset, in
/// absolute coordinates (inclusive).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Bounds {
    min: SquarePos,
    max: SquarePos,
}

impl Bounds {
    fn point(pos: SquarePos) -> Self {
        Self { min: pos, max: pos }
    }

    fn include(&mut self, pos: SquarePos) {
        self.min.x = self.min.x.min(pos.x);
        self.min.y = self.min.y.min(pos.y);
        self.max.x = self.max.x.max(pos.x);
        self.max.y = self.max.y.max(pos.y);
    }

    fn contains(&self, pos: SquarePos) -> bool {
        (self.min.x..=self.max.x).contains(&pos.x) && (self.min.y..=self.max.y).contains(&pos.y)
    }
}

#[derive(Clone, Debug)]
struct MapPatch {
    squares: Vec<MapSquare>,
}

impl MapPatch {
    const LEN: usize = (MapConfig::PATCH_SIZE * MapConfig::PATCH_SIZE) as usize;

    fn new() -> Self {
        Self {
            squares: vec![MapSquare::default(); Self::LEN],
        }
    }

    fn index(pos: SquarePos) -> usize {
        let x = pos.x.rem_euclid(MapConfig::PATCH_SIZE);
        let y = pos.y.rem_euclid(MapConfig::PATCH_SIZE);
        (y * MapConfig::PATCH_SIZE + x) as usize
    }

    fn key(pos: SquarePos) -> (i32, i32) {
        (
            pos.x.div_euclid(MapConfig::PATCH_SIZE),
            pos.y.div_euclid(MapConfig::PATCH_SIZE),
        )
    }
}

/// The map: a sparse, unbounded plane of [`MapSquare`]s seen through a
/// `width`x`height` viewport.
///
/// Squares are addressed in viewport coordinates. Internally they live at
/// absolute positions (`viewport + origin`), so scrolling only moves the
/// origin. The grid performs no bounds validation; callers restrict
/// coordinates to the addressable area.
#[derive(Clone, Debug, Default)]
pub struct MapGrid {
    width: u32,
    height: u32,
    origin: SquarePos,
    patches: HashMap<(i32, i32), MapPatch>,
    bounds: Option<Bounds>,
    dirty: HashSet<SquarePos>,
}

impl MapGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops all map data and sets the viewport size.
    ///
    /// The two corner squares are marked dirty so that the next batch always
    /// reports a change, even for an empty map.
    pub fn reset(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.origin = SquarePos::ORIGIN;
        self.patches.clear();
        self.bounds = None;
        self.dirty.clear();

        if width > 0 && height > 0 {
            let far = SquarePos::new(width as i32 - 1, height as i32 - 1);
            for corner in [SquarePos::ORIGIN, far] {
                self.square_mut(corner);
                self.dirty.insert(corner);
            }
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Absolute position of the top-left viewport square.
    pub fn offset(&self) -> SquarePos {
        self.origin
    }

    // ========================================================================
    // Read accessors (viewport coordinates)
    // ========================================================================

    pub fn square(&self, x: i32, y: i32) -> Option<&MapSquare> {
        self.square_at(self.absolute(x, y))
    }

    pub fn face(&self, x: i32, y: i32, layer: usize) -> Option<&Arc<Face>> {
        self.square(x, y)?.face(layer)
    }

    /// Resolves the multi-tile face covering `(x, y)` in `layer`.
    ///
    /// A layer holding a face of its own draws that face, so it never reports
    /// a head.
    pub fn head(&self, x: i32, y: i32, layer: usize) -> Option<HeadRef> {
        let pos = self.absolute(x, y);
        let square = self.square_at(pos)?;
        if square.face(layer).is_some() {
            return None;
        }
        let head = square.head(layer)?;
        let face = self.square_at(head)?.face(layer)?;
        Some(HeadRef {
            head: self.relative(head),
            face: Arc::clone(face),
            dx: head.x - pos.x,
            dy: head.y - pos.y,
        })
    }

    pub fn darkness(&self, x: i32, y: i32) -> u8 {
        self.square(x, y)
            .map_or(MapConfig::DEFAULT_DARKNESS, MapSquare::darkness)
    }

    pub fn smooth(&self, x: i32, y: i32, layer: usize) -> u8 {
        self.square(x, y).map_or(0, |square| square.smooth(layer))
    }

    pub fn color(&self, x: i32, y: i32) -> Option<u8> {
        self.square(x, y)?.color()
    }

    /// Returns true if the square is unknown: either never seen since the
    /// last reset, or cleared by the server.
    pub fn is_fog_of_war(&self, x: i32, y: i32) -> bool {
        let pos = self.absolute(x, y);
        if !self.bounds.is_some_and(|bounds| bounds.contains(pos)) {
            return true;
        }
        self.square_at(pos).is_some_and(MapSquare::is_fog_of_war)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Sets or removes the face of a layer, maintaining the tail links of
    /// multi-tile faces.
    pub fn set_face(&mut self, x: i32, y: i32, layer: usize, face: Option<Arc<Face>>) {
        let head = self.absolute(x, y);
        if self.square_mut(head).reset_fog_of_war() {
            self.dirty.insert(head);
        }

        let old = self.square_mut(head).face(layer).cloned();
        if same_extent(old.as_deref(), face.as_deref()) {
            return;
        }

        if let Some(old) = &old {
            self.unlink_tails(head, layer, old);
        }
        if self.square_mut(head).set_face(layer, face.clone()) {
            self.dirty.insert(head);
        }
        if let Some(face) = &face {
            self.link_tails(head, layer, face);
        }
    }

    /// Clears a square, turning it into fog-of-war if it held anything.
    ///
    /// Multi-tile faces anchored here lose their tails as well. Clearing a
    /// tail only drops the tail reference.
    pub fn clear_square(&mut self, x: i32, y: i32) {
        let pos = self.absolute(x, y);
        self.clear_absolute(pos);
    }

    pub fn set_darkness(&mut self, x: i32, y: i32, darkness: u8) {
        let pos = self.absolute(x, y);
        if self.square_mut(pos).set_darkness(darkness).needs_redraw() {
            self.dirty.insert(pos);
        }
    }

    /// Sets the smoothing level of a layer. Smoothing blends into the
    /// surrounding squares, so a changed value dirties the neighbours too.
    pub fn set_smooth(&mut self, x: i32, y: i32, layer: usize, smooth: u8) {
        let pos = self.absolute(x, y);
        let update = self.square_mut(pos).set_smooth(layer, smooth);
        if update.contains(SquareUpdate::CHANGED) {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    self.dirty.insert(pos.offset(dx, dy));
                }
            }
        } else if update.needs_redraw() {
            self.dirty.insert(pos);
        }
    }

    /// Applies a block of magic map bytes, row-major, starting at `(x0, y0)`.
    pub fn set_magic_map(&mut self, x0: i32, y0: i32, rows: &[Vec<u8>]) {
        for (dy, row) in rows.iter().enumerate() {
            for (dx, byte) in row.iter().enumerate() {
                let pos = self.absolute(x0 + dx as i32, y0 + dy as i32);
                let color = byte & MapConfig::FACE_COLOR_MASK;
                if self.square_mut(pos).set_color(color).needs_redraw() {
                    self.dirty.insert(pos);
                }
            }
        }
    }

    /// Marks a square for redraw without changing it.
    pub fn dirty(&mut self, x: i32, y: i32) {
        let pos = self.absolute(x, y);
        self.dirty.insert(pos);
    }

    pub fn has_dirty(&self) -> bool {
        let (width, height) = (self.width, self.height);
        self.dirty
            .iter()
            .any(|&pos| self.relative(pos).is_within(width, height))
    }

    /// Returns the dirty squares inside the viewport and resets the dirty set.
    pub fn take_dirty(&mut self) -> BTreeSet<SquarePos> {
        let (width, height) = (self.width, self.height);
        let origin = self.origin;
        self.dirty
            .drain()
            .map(|pos| pos.offset(-origin.x, -origin.y))
            .filter(|pos| pos.is_within(width, height))
            .collect()
    }

    /// Marks every viewport square showing `face` for redraw.
    pub fn update_face(&mut self, face: FaceNum) {
        let shows = |f: &Arc<Face>| f.num == face;
        let mut hits = Vec::new();
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let matches = (0..MapConfig::NUM_LAYERS).any(|layer| {
                    self.face(x, y, layer).is_some_and(shows)
                        || self.head(x, y, layer).is_some_and(|head| shows(&head.face))
                });
                if matches {
                    hits.push(self.absolute(x, y));
                }
            }
        }
        self.dirty.extend(hits);
    }

    /// Scrolls the viewport: afterwards `(x, y)` shows what was at
    /// `(x + dx, y + dy)`.
    ///
    /// Returns true if the scroll distance exceeds the viewport, in which case
    /// the whole viewport has been cleared.
    pub fn process_scroll(&mut self, dx: i32, dy: i32) -> bool {
        let width = self.width as i32;
        let height = self.height as i32;
        self.origin = self.origin.offset(dx, dy);

        if dx.abs() >= width || dy.abs() >= height {
            self.clear_view_rect(0..width, 0..height);
            return true;
        }

        // Exposed strip on the leading edge, departed strip on the trailing one.
        if dx > 0 {
            self.clear_view_rect(width - dx..width, 0..height);
            self.clear_view_rect(-dx..0, 0..height);
        } else if dx < 0 {
            self.clear_view_rect(0..-dx, 0..height);
            self.clear_view_rect(width..width - dx, 0..height);
        }
        if dy > 0 {
            self.clear_view_rect(0..width, height - dy..height);
            self.clear_view_rect(0..width, -dy..0);
        } else if dy < 0 {
            self.clear_view_rect(0..width, 0..-dy);
            self.clear_view_rect(0..width, height..height - dy);
        }
        false
    }

    // ========================================================================
    // Internals (absolute coordinates)
    // ========================================================================

    fn absolute(&self, x: i32, y: i32) -> SquarePos {
        SquarePos::new(x, y).offset(self.origin.x, self.origin.y)
    }

    fn relative(&self, pos: SquarePos) -> SquarePos {
        pos.offset(-self.origin.x, -self.origin.y)
    }

    fn square_at(&self, pos: SquarePos) -> Option<&MapSquare> {
        self.patches
            .get(&MapPatch::key(pos))
            .and_then(|patch| patch.squares.get(MapPatch::index(pos)))
    }

    /// Returns the square at `pos`, allocating its patch and extending the
    /// known bounds.
    fn square_mut(&mut self, pos: SquarePos) -> &mut MapSquare {
        match &mut self.bounds {
            Some(bounds) => bounds.include(pos),
            None => self.bounds = Some(Bounds::point(pos)),
        }
        let patch = self.patches.entry(MapPatch::key(pos)).or_insert_with(MapPatch::new);
        &mut patch.squares[MapPatch::index(pos)]
    }

    fn clear_view_rect(&mut self, xs: std::ops::Range<i32>, ys: std::ops::Range<i32>) {
        for y in ys {
            for x in xs.clone() {
                let pos = self.absolute(x, y);
                self.clear_absolute(pos);
            }
        }
    }

    fn clear_absolute(&mut self, pos: SquarePos) {
        // Never-seen squares stay unknown.
        let Some(square) = self.square_at(pos) else {
            return;
        };
        if square.is_fog_of_war() || square.is_empty() {
            return;
        }
        let anchored: Vec<(usize, Arc<Face>)> = square
            .faces()
            .filter(|(_, face)| face.is_multi_tile())
            .map(|(layer, face)| (layer, Arc::clone(face)))
            .collect();
        for (layer, face) in &anchored {
            self.unlink_tails(pos, *layer, face);
        }
        if self.square_mut(pos).clear() {
            self.dirty.insert(pos);
        }
    }

    fn link_tails(&mut self, head: SquarePos, layer: usize, face: &Face) {
        for (dx, dy) in face.tail_offsets() {
            let tail = head.offset(-dx, -dy);
            if self.square_mut(tail).set_head(layer, Some(head)) {
                self.dirty.insert(tail);
            }
        }
    }

    fn unlink_tails(&mut self, head: SquarePos, layer: usize, face: &Face) {
        for (dx, dy) in face.tail_offsets() {
            let tail = head.offset(-dx, -dy);
            let linked = self
                .square_at(tail)
                .is_some_and(|square| square.head(layer) == Some(head));
            if linked && self.square_mut(tail).set_head(layer, None) {
                self.dirty.insert(tail);
            }
        }
    }
}

/// Same face with the same tile extent: rewriting it changes nothing.
fn same_extent(a: Option<&Face>, b: Option<&Face>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b && a.tile_width == b.tile_width && a.tile_height == b.tile_height,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(num: u32, name: &str, size: u8) -> Option<Arc<Face>> {
        Some(Arc::new(Face::new(FaceNum(num), name, size, size)))
    }

    fn grid(width: u32, height: u32) -> MapGrid {
        let mut grid = MapGrid::new();
        grid.reset(width, height);
        grid.take_dirty();
        grid
    }

    #[test]
    fn reset_dirties_both_corners() {
        let mut grid = MapGrid::new();
        grid.reset(4, 3);
        let dirty = grid.take_dirty();
        assert!(dirty.contains(&SquarePos::new(0, 0)));
        assert!(dirty.contains(&SquarePos::new(3, 2)));
        assert!(grid.take_dirty().is_empty());
    }

    #[test]
    fn multi_tile_face_links_tails_towards_top_left() {
        let mut grid = grid(5, 5);
        grid.set_face(1, 1, 6, face(1, "M", 2));

        for (x, y) in [(0, 0), (1, 0), (0, 1)] {
            let head = grid.head(x, y, 6).expect("tail is linked");
            assert_eq!(head.head, SquarePos::new(1, 1));
            assert_eq!((head.dx, head.dy), (1 - x, 1 - y));
            assert_eq!(head.face.name, "M");
        }
        assert!(grid.head(1, 1, 6).is_none());
        assert_eq!(grid.take_dirty().len(), 4);
    }

    #[test]
    fn own_face_takes_precedence_over_head() {
        let mut grid = grid(5, 5);
        grid.set_face(1, 1, 6, face(1, "M", 2));
        grid.set_face(0, 0, 6, face(2, "_", 1));
        assert!(grid.head(0, 0, 6).is_none());
        assert!(grid.head(1, 0, 6).is_some());
    }

    #[test]
    fn replacing_head_unlinks_old_tails() {
        let mut grid = grid(5, 5);
        grid.set_face(2, 2, 3, face(1, "M", 3));
        grid.set_face(2, 2, 3, face(2, "_", 1));
        assert!(grid.head(0, 0, 3).is_none());
        assert!(grid.head(1, 2, 3).is_none());
    }

    #[test]
    fn clearing_head_unlinks_tails_but_clearing_tail_does_not_touch_head() {
        let mut grid = grid(5, 5);
        grid.set_face(1, 1, 6, face(1, "M", 2));

        grid.clear_square(1, 0);
        assert!(grid.is_fog_of_war(1, 0));
        assert!(grid.face(1, 1, 6).is_some());
        assert!(grid.head(0, 0, 6).is_some());

        grid.clear_square(1, 1);
        assert!(grid.face(1, 1, 6).is_none());
        assert!(grid.head(0, 0, 6).is_none());
        assert!(grid.head(0, 1, 6).is_none());
    }

    #[test]
    fn fog_covers_unknown_and_cleared_squares() {
        let mut grid = grid(3, 3);
        assert!(!grid.is_fog_of_war(1, 1));
        assert!(grid.is_fog_of_war(-5, 0));

        grid.clear_square(1, 1);
        assert!(!grid.is_fog_of_war(1, 1), "empty square stays clear");

        grid.set_darkness(1, 1, 80);
        grid.clear_square(1, 1);
        assert!(grid.is_fog_of_war(1, 1));

        grid.set_darkness(1, 1, 80);
        assert!(!grid.is_fog_of_war(1, 1));
    }

    #[test]
    fn smooth_change_dirties_neighbourhood() {
        let mut grid = grid(5, 5);
        grid.set_smooth(2, 2, 0, 3);
        assert_eq!(grid.take_dirty().len(), 9);
        grid.set_smooth(2, 2, 0, 3);
        assert!(grid.take_dirty().is_empty());
    }

    #[test]
    fn magic_map_masks_color() {
        let mut grid = grid(4, 4);
        grid.set_magic_map(1, 1, &[vec![0x3f, 0x02], vec![0x11]]);
        assert_eq!(grid.color(1, 1), Some(0x0f));
        assert_eq!(grid.color(2, 1), Some(0x02));
        assert_eq!(grid.color(1, 2), Some(0x01));
        assert_eq!(grid.color(0, 0), None);
    }

    #[test]
    fn scroll_shifts_content() {
        let mut grid = grid(4, 4);
        grid.set_face(2, 1, 0, face(7, "x", 1));

        assert!(!grid.process_scroll(1, 0));
        assert_eq!(grid.face(1, 1, 0).map(|f| f.num), Some(FaceNum(7)));
        assert!(grid.face(2, 1, 0).is_none());
        assert_eq!(grid.offset(), SquarePos::new(1, 0));
    }

    #[test]
    fn scroll_round_trip_restores_interior() {
        let mut grid = grid(4, 4);
        for x in 0..4 {
            grid.set_face(x, 0, 0, face(10 + x as u32, "c", 1));
        }

        grid.process_scroll(1, 0);
        grid.process_scroll(-1, 0);

        assert!(grid.face(0, 0, 0).is_none());
        for x in 1..4 {
            assert_eq!(grid.face(x, 0, 0).map(|f| f.num), Some(FaceNum(10 + x as u32)));
        }
    }

    #[test]
    fn large_scroll_clears_viewport() {
        let mut grid = grid(3, 3);
        grid.set_face(0, 0, 0, face(1, "a", 1));
        assert!(grid.process_scroll(0, -3));
        assert!(grid.face(0, 0, 0).is_none());
        assert!(grid.is_fog_of_war(0, 0));
    }

    #[test]
    fn head_leaving_view_unlinks_tails() {
        let mut grid = grid(4, 4);
        grid.set_face(0, 1, 2, face(1, "M", 2));
        assert!(grid.head(0, 0, 2).is_some());

        grid.process_scroll(0, -1);
        // The former head row moved to y=2 and stays; nothing departed.
        assert!(grid.head(0, 1, 2).is_some());

        grid.process_scroll(0, 3);
        // The head departed; its tail in column -1 lies outside every cleared
        // strip and must still be unlinked.
        assert!(grid.head(-1, -2, 2).is_none());
    }

    #[test]
    fn update_face_dirties_heads_and_tails() {
        let mut grid = grid(5, 5);
        grid.set_face(1, 1, 6, face(1, "M", 2));
        grid.set_face(4, 4, 0, face(2, "_", 1));
        grid.take_dirty();

        grid.update_face(FaceNum(1));
        let dirty = grid.take_dirty();
        assert_eq!(dirty.len(), 4);
        assert!(!dirty.contains(&SquarePos::new(4, 4)));
    }

    #[test]
    fn dirty_outside_viewport_is_filtered() {
        let mut grid = grid(3, 3);
        grid.dirty(5, 5);
        grid.dirty(-1, 0);
        assert!(!grid.has_dirty());
        grid.dirty(2, 2);
        assert!(grid.has_dirty());
        assert_eq!(grid.take_dirty().into_iter().collect::<Vec<_>>(), vec![SquarePos::new(2, 2)]);
    }
}
