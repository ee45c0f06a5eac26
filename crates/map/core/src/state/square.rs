use std::sync::Arc;

use bitflags::bitflags;

use crate::config::MapConfig;
use crate::env::Face;

use super::SquarePos;

bitflags! {
    /// Outcome of a setter on a [`MapSquare`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct SquareUpdate: u8 {
        /// The square was fog-of-war and now holds fresh data.
        const FOG_CLEARED = 1 << 0;
        /// The stored value differs from the previous one.
        const CHANGED     = 1 << 1;
    }
}

impl SquareUpdate {
    /// Returns true if the square has to be redrawn.
    pub fn needs_redraw(self) -> bool {
        !self.is_empty()
    }
}

const NO_FACE: Option<Arc<Face>> = None;

/// One square of the map: per-layer faces plus lighting information.
///
/// `heads` holds, per layer, the absolute position of the head square of a
/// multi-tile face covering this square. Head positions are absolute so that
/// they stay valid when the viewport scrolls.
#[derive(Clone, Debug)]
pub struct MapSquare {
    fog_of_war: bool,
    darkness: u8,
    color: Option<u8>,
    faces: [Option<Arc<Face>>; MapConfig::NUM_LAYERS],
    heads: [Option<SquarePos>; MapConfig::NUM_LAYERS],
    smooth: [u8; MapConfig::NUM_LAYERS],
}

impl Default for MapSquare {
    fn default() -> Self {
        Self {
            fog_of_war: false,
            darkness: MapConfig::DEFAULT_DARKNESS,
            color: None,
            faces: [NO_FACE; MapConfig::NUM_LAYERS],
            heads: [None; MapConfig::NUM_LAYERS],
            smooth: [0; MapConfig::NUM_LAYERS],
        }
    }
}

impl MapSquare {
    pub fn is_fog_of_war(&self) -> bool {
        self.fog_of_war
    }

    pub fn darkness(&self) -> u8 {
        self.darkness
    }

    pub fn color(&self) -> Option<u8> {
        self.color
    }

    pub fn face(&self, layer: usize) -> Option<&Arc<Face>> {
        self.faces.get(layer)?.as_ref()
    }

    pub fn smooth(&self, layer: usize) -> u8 {
        self.smooth.get(layer).copied().unwrap_or(0)
    }

    /// Absolute position of the head square covering this square in `layer`.
    pub fn head(&self, layer: usize) -> Option<SquarePos> {
        self.heads.get(layer).copied().flatten()
    }

    /// Returns the layers holding a face, together with the face.
    pub fn faces(&self) -> impl Iterator<Item = (usize, &Arc<Face>)> {
        self.faces
            .iter()
            .enumerate()
            .filter_map(|(layer, face)| face.as_ref().map(|face| (layer, face)))
    }

    /// Returns true if the square carries nothing but default values.
    ///
    /// The magic map color is overview information and does not count.
    pub fn is_empty(&self) -> bool {
        self.darkness == MapConfig::DEFAULT_DARKNESS
            && self.faces.iter().all(Option::is_none)
            && self.heads.iter().all(Option::is_none)
            && self.smooth.iter().all(|&smooth| smooth == 0)
    }

    /// Turns the square into fog-of-war, dropping faces, tail references,
    /// smoothing and darkness.
    ///
    /// Returns false if nothing changed: the server repeats clear commands for
    /// squares that are already clear, and those must not turn into fog.
    pub fn clear(&mut self) -> bool {
        if self.fog_of_war || self.is_empty() {
            return false;
        }

        self.faces = [NO_FACE; MapConfig::NUM_LAYERS];
        self.heads = [None; MapConfig::NUM_LAYERS];
        self.smooth = [0; MapConfig::NUM_LAYERS];
        self.darkness = MapConfig::DEFAULT_DARKNESS;
        self.fog_of_war = true;
        true
    }

    /// Resets the fog-of-war flag. Returns whether it was set.
    pub fn reset_fog_of_war(&mut self) -> bool {
        std::mem::replace(&mut self.fog_of_war, false)
    }

    pub fn set_darkness(&mut self, darkness: u8) -> SquareUpdate {
        let mut update = self.fog_update();
        if self.darkness != darkness {
            self.darkness = darkness;
            update |= SquareUpdate::CHANGED;
        }
        update
    }

    pub fn set_smooth(&mut self, layer: usize, smooth: u8) -> SquareUpdate {
        let mut update = self.fog_update();
        if let Some(slot) = self.smooth.get_mut(layer)
            && *slot != smooth
        {
            *slot = smooth;
            update |= SquareUpdate::CHANGED;
        }
        update
    }

    pub fn set_color(&mut self, color: u8) -> SquareUpdate {
        let mut update = self.fog_update();
        if self.color != Some(color) {
            self.color = Some(color);
            update |= SquareUpdate::CHANGED;
        }
        update
    }

    /// Sets the face of a layer. Returns whether the face changed.
    ///
    /// Does not touch the fog-of-war flag; the grid resets it first.
    pub fn set_face(&mut self, layer: usize, face: Option<Arc<Face>>) -> bool {
        let Some(slot) = self.faces.get_mut(layer) else {
            return false;
        };
        if *slot == face {
            return false;
        }
        *slot = face;
        true
    }

    /// Sets the head square of a layer. Returns whether it changed.
    pub fn set_head(&mut self, layer: usize, head: Option<SquarePos>) -> bool {
        let Some(slot) = self.heads.get_mut(layer) else {
            return false;
        };
        if *slot == head {
            return false;
        }
        *slot = head;
        true
    }

    fn fog_update(&mut self) -> SquareUpdate {
        if self.reset_fog_of_war() {
            SquareUpdate::FOG_CLEARED
        } else {
            SquareUpdate::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FaceNum;

    fn face(num: u32) -> Option<Arc<Face>> {
        Some(Arc::new(Face::new(FaceNum(num), format!("f{num}"), 1, 1)))
    }

    #[test]
    fn clearing_empty_square_keeps_it_clear() {
        let mut square = MapSquare::default();
        assert!(!square.clear());
        assert!(!square.is_fog_of_war());
    }

    #[test]
    fn clearing_drops_content_and_sets_fog() {
        let mut square = MapSquare::default();
        square.set_face(0, face(2));
        square.set_darkness(40);
        square.set_color(3);

        assert!(square.clear());
        assert!(square.is_fog_of_war());
        assert!(square.face(0).is_none());
        assert_eq!(square.darkness(), MapConfig::DEFAULT_DARKNESS);
        assert_eq!(square.color(), Some(3));

        // Clearing twice is a no-op.
        assert!(!square.clear());
    }

    #[test]
    fn setters_reset_fog() {
        let mut square = MapSquare::default();
        square.set_smooth(1, 4);
        square.clear();

        let update = square.set_darkness(MapConfig::DEFAULT_DARKNESS);
        assert_eq!(update, SquareUpdate::FOG_CLEARED);
        assert!(!square.is_fog_of_war());
    }

    #[test]
    fn unchanged_values_report_nothing() {
        let mut square = MapSquare::default();
        assert_eq!(square.set_smooth(2, 7), SquareUpdate::CHANGED);
        assert!(!square.set_smooth(2, 7).needs_redraw());
        assert!(square.set_face(5, face(9)));
        assert!(!square.set_face(5, face(9)));
    }

    #[test]
    fn out_of_range_layers_are_ignored() {
        let mut square = MapSquare::default();
        assert!(!square.set_face(MapConfig::NUM_LAYERS, face(1)));
        assert!(!square.set_head(MapConfig::NUM_LAYERS, Some(SquarePos::ORIGIN)));
        assert!(square.face(MapConfig::NUM_LAYERS).is_none());
    }
}
