//! Animation catalog loader.

use std::path::Path;

use map_core::Animation;
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// Animation catalog structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationFile {
    pub animations: Vec<Animation>,
}

/// Loader for animation catalogs from RON files.
pub struct AnimationLoader;

impl AnimationLoader {
    /// Load animation definitions from a RON file containing an
    /// [`AnimationFile`].
    pub fn load(path: &Path) -> LoadResult<Vec<Animation>> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<Vec<Animation>> {
        let file: AnimationFile = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse animation catalog RON: {}", e))?;

        // Normalise through the constructor so empty face lists get a blank frame.
        Ok(file
            .animations
            .into_iter()
            .map(|anim| Animation::new(anim.id, anim.flags, anim.faces).with_looping(anim.looping))
            .collect())
    }
}
