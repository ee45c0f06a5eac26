use std::collections::HashMap;
use std::sync::Arc;

use crate::config::MapConfig;
use crate::state::FaceNum;

/// Face oracle resolving face numbers to face descriptors.
///
/// Implemented by the face manager of the client; the map model only needs the
/// identity and the tile extent of a face, never its image.
pub trait FaceOracle: Send + Sync {
    /// Returns the face for `num`, or `None` if the face is not known (yet).
    ///
    /// Never called with [`FaceNum::NONE`].
    fn face(&self, num: FaceNum) -> Option<Arc<Face>>;
}

/// Identity and tile extent of a face.
///
/// Faces larger than one tile are anchored at their bottom-right square (the
/// head); the other covered squares refer back to it.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Face {
    pub num: FaceNum,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default = "default_tiles"))]
    pub tile_width: u8,
    #[cfg_attr(feature = "serde", serde(default = "default_tiles"))]
    pub tile_height: u8,
}

#[cfg(feature = "serde")]
fn default_tiles() -> u8 {
    1
}

impl Face {
    /// Creates a face; tile extents are clamped to `1..=MAX_FACE_TILES`.
    pub fn new(num: FaceNum, name: impl Into<String>, tile_width: u8, tile_height: u8) -> Self {
        Self {
            num,
            name: name.into(),
            tile_width: tile_width.clamp(1, MapConfig::MAX_FACE_TILES),
            tile_height: tile_height.clamp(1, MapConfig::MAX_FACE_TILES),
        }
    }

    /// Stand-in for a face number whose definition has not arrived yet,
    /// named after the number (`face#N`).
    pub fn placeholder(num: FaceNum) -> Self {
        Self::new(num, num.to_string(), 1, 1)
    }

    pub fn is_multi_tile(&self) -> bool {
        self.tile_width > 1 || self.tile_height > 1
    }

    /// Returns the tail offsets `(dx, dy)` covered by this face, excluding the
    /// head itself.
    ///
    /// A tail at offset `(dx, dy)` lives at `(head.x - dx, head.y - dy)`.
    pub fn tail_offsets(&self) -> impl Iterator<Item = (i32, i32)> {
        let width = i32::from(self.tile_width.max(1));
        let height = i32::from(self.tile_height.max(1));
        (0..width)
            .flat_map(move |dx| (0..height).map(move |dy| (dx, dy)))
            .filter(|&(dx, dy)| dx > 0 || dy > 0)
    }
}

impl PartialEq for Face {
    fn eq(&self, other: &Self) -> bool {
        self.num == other.num
    }
}

impl Eq for Face {}

/// In-memory face table.
#[derive(Clone, Debug, Default)]
pub struct FaceCatalog {
    faces: HashMap<FaceNum, Arc<Face>>,
}

impl FaceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a face definition.
    pub fn insert(&mut self, face: Face) -> Arc<Face> {
        let face = Arc::new(face);
        self.faces.insert(face.num, Arc::clone(&face));
        face
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

impl FromIterator<Face> for FaceCatalog {
    fn from_iter<I: IntoIterator<Item = Face>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for face in iter {
            catalog.insert(face);
        }
        catalog
    }
}

impl FaceOracle for FaceCatalog {
    fn face(&self, num: FaceNum) -> Option<Arc<Face>> {
        self.faces.get(&num).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_tile_face_has_no_tails() {
        let face = Face::new(FaceNum(1), "floor", 1, 1);
        assert!(!face.is_multi_tile());
        assert_eq!(face.tail_offsets().count(), 0);
    }

    #[test]
    fn two_by_two_face_covers_three_tails() {
        let face = Face::new(FaceNum(1), "M", 2, 2);
        let mut tails: Vec<_> = face.tail_offsets().collect();
        tails.sort();
        assert_eq!(tails, vec![(0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn placeholder_is_named_after_its_number() {
        let face = Face::placeholder(FaceNum(77));
        assert_eq!(face.name, "face#77");
        assert!(!face.is_multi_tile());
    }

    #[test]
    fn extents_are_clamped() {
        let face = Face::new(FaceNum(3), "huge", 0, 200);
        assert_eq!(face.tile_width, 1);
        assert_eq!(face.tile_height, MapConfig::MAX_FACE_TILES);
    }

    #[test]
    fn catalog_resolves_by_number() {
        let catalog: FaceCatalog = [
            Face::new(FaceNum(1), "M", 2, 2),
            Face::new(FaceNum(2), "_", 1, 1),
        ]
        .into_iter()
        .collect();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.face(FaceNum(2)).map(|f| f.name.clone()).as_deref(), Some("_"));
        assert!(catalog.face(FaceNum(9)).is_none());
    }
}
