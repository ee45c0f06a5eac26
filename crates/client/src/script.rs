//! Recorded session scripts.

use std::path::Path;

use anyhow::{Context, Result};
use map_content::FaceSpec;
use map_runtime::MapMessage;
use serde::{Deserialize, Serialize};

/// A recorded session: the decoded map messages in arrival order, plus face
/// definitions that only become available while the session runs.
///
/// ```ron
/// (
///     messages: [
///         NewMap(width: 5, height: 5),
///         Update(commands: [Face(location: (x: 0, y: 0, layer: 0), face: 2)]),
///     ],
///     late_faces: [(num: 2, name: "floor")],
/// )
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayScript {
    pub messages: Vec<MapMessage>,
    #[serde(default)]
    pub late_faces: Vec<FaceSpec>,
}

impl ReplayScript {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read replay script {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid replay script {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(ron::from_str(content)?)
    }
}
