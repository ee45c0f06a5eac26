//! Face oracle that grows while the session runs.

use std::sync::{Arc, PoisonError, RwLock};

use map_core::{Face, FaceCatalog, FaceNum, FaceOracle};

/// Face catalog shared between the updater and the face loader.
///
/// The loader inserts definitions as they arrive and then reports the face
/// number to the updater so squares showing the placeholder get redrawn.
#[derive(Debug, Default)]
pub struct LiveFaces {
    catalog: RwLock<FaceCatalog>,
}

impl LiveFaces {
    pub fn new(catalog: FaceCatalog) -> Self {
        Self {
            catalog: RwLock::new(catalog),
        }
    }

    pub fn insert(&self, face: Face) -> FaceNum {
        let num = face.num;
        self.catalog
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(face);
        num
    }

    pub fn len(&self) -> usize {
        self.catalog.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FaceOracle for LiveFaces {
    fn face(&self, num: FaceNum) -> Option<Arc<Face>> {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .face(num)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_faces_become_visible() {
        let faces = LiveFaces::default();
        assert!(faces.face(FaceNum(5)).is_none());

        faces.insert(Face::new(FaceNum(5), "statue", 1, 2));
        let face = faces.face(FaceNum(5)).unwrap();
        assert_eq!(face.name, "statue");
        assert_eq!(face.tile_height, 2);
        assert_eq!(faces.len(), 1);
    }
}
