use std::collections::HashMap;
use std::sync::Arc;

use crate::state::{AnimationId, FaceNum};

/// Playback mode requested by the server for an animated square.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::Display, strum::EnumIter, strum::IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum AnimationKind {
    /// Independent playback starting at the first frame.
    #[default]
    Normal,
    /// Independent playback starting at a random frame.
    Random,
    /// Shared playback: all squares showing the animation advance together.
    Sync,
}

impl AnimationKind {
    /// Decodes the wire value; unknown values fall back to [`AnimationKind::Normal`].
    pub const fn from_protocol(value: u8) -> Self {
        match value {
            1 => Self::Random,
            2 => Self::Sync,
            _ => Self::Normal,
        }
    }

    pub const fn to_protocol(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Random => 1,
            Self::Sync => 2,
        }
    }
}

/// Animation definition: an ordered list of faces.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Animation {
    pub id: AnimationId,
    /// Raw flags from the animation definition command.
    #[cfg_attr(feature = "serde", serde(default))]
    pub flags: u16,
    pub faces: Vec<FaceNum>,
    /// Whether playback wraps around after the last frame.
    #[cfg_attr(feature = "serde", serde(default = "default_looping"))]
    pub looping: bool,
}

#[cfg(feature = "serde")]
fn default_looping() -> bool {
    true
}

impl Animation {
    /// Creates a looping animation. An empty face list is replaced by a single
    /// empty frame so that frame arithmetic never divides by zero.
    pub fn new(id: AnimationId, flags: u16, faces: Vec<FaceNum>) -> Self {
        let faces = if faces.is_empty() {
            vec![FaceNum::NONE]
        } else {
            faces
        };
        Self {
            id,
            flags,
            faces,
            looping: true,
        }
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn frame_count(&self) -> u32 {
        self.faces.len().max(1) as u32
    }

    /// Returns the face of `frame`, wrapping out-of-range frames.
    pub fn face(&self, frame: u32) -> FaceNum {
        self.faces
            .get(frame as usize % self.faces.len().max(1))
            .copied()
            .unwrap_or(FaceNum::NONE)
    }
}

/// Animation definitions known to the client.
///
/// Filled from static content and from animation definition commands received
/// from the server.
#[derive(Clone, Debug, Default)]
pub struct AnimationCatalog {
    animations: HashMap<AnimationId, Arc<Animation>>,
}

impl AnimationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an animation definition.
    pub fn insert(&mut self, animation: Animation) {
        self.animations.insert(animation.id, Arc::new(animation));
    }

    pub fn get(&self, id: AnimationId) -> Option<Arc<Animation>> {
        self.animations.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }
}

impl FromIterator<Animation> for AnimationCatalog {
    fn from_iter<I: IntoIterator<Item = Animation>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for animation in iter {
            catalog.insert(animation);
        }
        catalog
    }
}
