//! Content factory for building catalogs from a data directory.

use std::path::{Path, PathBuf};

use map_core::{AnimationCatalog, FaceCatalog};

use crate::loaders::{AnimationLoader, FaceLoader, LoadResult};

/// Loads all map content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── faces.ron
/// └── animations.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load the face catalog from `faces.ron`.
    pub fn load_faces(&self) -> LoadResult<FaceCatalog> {
        let path = self.data_dir.join("faces.ron");
        Ok(FaceLoader::load(&path)?.into_iter().collect())
    }

    /// Load the animation catalog from `animations.ron`, or an empty catalog
    /// if the file does not exist.
    pub fn load_animations(&self) -> LoadResult<AnimationCatalog> {
        let path = self.data_dir.join("animations.ron");
        if !path.exists() {
            return Ok(AnimationCatalog::new());
        }
        Ok(AnimationLoader::load(&path)?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use map_core::{FaceNum, FaceOracle};

    use super::*;

    #[test]
    fn builds_catalogs_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("faces.ron"),
            r#"(faces: [(num: 1, name: "M", width: 2, height: 2)])"#,
        )
        .unwrap();

        let factory = ContentFactory::new(dir.path());
        let faces = factory.load_faces().unwrap();
        assert!(faces.face(FaceNum(1)).is_some_and(|face| face.is_multi_tile()));

        let animations = factory.load_animations().unwrap();
        assert!(animations.is_empty());
    }
}
