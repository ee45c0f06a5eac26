//! Face catalog loader.

use std::path::Path;

use map_core::{Face, FaceNum};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// One face entry as written in RON files.
///
/// Tile extents default to a single square and are clamped on conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceSpec {
    pub num: u32,
    pub name: String,
    #[serde(default = "one")]
    pub width: u8,
    #[serde(default = "one")]
    pub height: u8,
}

fn one() -> u8 {
    1
}

impl From<FaceSpec> for Face {
    fn from(spec: FaceSpec) -> Self {
        Face::new(FaceNum(spec.num), spec.name, spec.width, spec.height)
    }
}

/// Face catalog structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceFile {
    pub faces: Vec<FaceSpec>,
}

/// Loader for face catalogs from RON files.
pub struct FaceLoader;

impl FaceLoader {
    /// Load face definitions from a RON file containing a [`FaceFile`].
    ///
    /// Entries using the reserved face number `0` are rejected.
    pub fn load(path: &Path) -> LoadResult<Vec<Face>> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<Vec<Face>> {
        let file: FaceFile = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse face catalog RON: {}", e))?;

        if let Some(spec) = file.faces.iter().find(|spec| spec.num == FaceNum::NONE.0) {
            anyhow::bail!("Face '{}' uses the reserved face number 0", spec.name);
        }

        Ok(file.faces.into_iter().map(Face::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_faces_with_default_extent() {
        let faces = FaceLoader::parse(
            r#"(faces: [
                (num: 1, name: "M", width: 2, height: 2),
                (num: 2, name: "_"),
            ])"#,
        )
        .unwrap();

        assert_eq!(faces.len(), 2);
        assert!(faces[0].is_multi_tile());
        assert_eq!((faces[1].tile_width, faces[1].tile_height), (1, 1));
    }

    #[test]
    fn rejects_reserved_face_number() {
        let err = FaceLoader::parse(r#"(faces: [(num: 0, name: "blank")])"#).unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faces.ron");
        std::fs::write(&path, r#"(faces: [(num: 7, name: "wall", width: 40)])"#).unwrap();

        let faces = FaceLoader::load(&path).unwrap();
        assert_eq!(faces[0].tile_width, map_core::MapConfig::MAX_FACE_TILES);
    }

    #[test]
    fn missing_file_names_path() {
        let err = FaceLoader::load(Path::new("/nonexistent/faces.ron")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/faces.ron"));
    }
}
