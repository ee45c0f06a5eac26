//! Decoded protocol messages.
//!
//! The transport decoder turns map related server commands into these values;
//! [`crate::MapUpdater::dispatch`] applies them. They are also the format of
//! recorded sessions replayed by tools.

use map_core::{AnimationId, AnimationKind, FaceNum, Location};
use serde::{Deserialize, Serialize};

/// A command applied inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapCommand {
    /// Turn a square into fog-of-war.
    Clear { x: i32, y: i32 },
    /// Set the face of a layer; face `0` removes it.
    Face { location: Location, face: FaceNum },
    Animation {
        location: Location,
        animation: AnimationId,
        #[serde(default)]
        kind: AnimationKind,
    },
    AnimationSpeed { location: Location, speed: u8 },
    Smooth { location: Location, smooth: u8 },
    Darkness { x: i32, y: i32, darkness: u8 },
    /// Row-major color bytes starting at `(x, y)`.
    MagicMap { x: i32, y: i32, rows: Vec<Vec<u8>> },
    Scroll { dx: i32, dy: i32 },
}

/// A map related message from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapMessage {
    NewMap {
        width: u32,
        height: u32,
    },
    /// One map update command: a batch of commands.
    Update {
        commands: Vec<MapCommand>,
        #[serde(default = "notify_by_default")]
        always_notify: bool,
    },
    Tick {
        tick: u32,
    },
    /// A face image finished loading.
    FaceUpdated {
        face: FaceNum,
    },
    /// Animation definition sent by the server.
    AddAnimation {
        id: AnimationId,
        #[serde(default)]
        flags: u16,
        faces: Vec<FaceNum>,
    },
}

fn notify_by_default() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_recorded_update() {
        let message: MapMessage = ron::from_str(
            "Update(commands: [
                Face(location: (x: 1, y: 2, layer: 0), face: 7),
                Animation(location: (x: 0, y: 0, layer: 3), animation: 4, kind: Sync),
                Scroll(dx: 1, dy: 0),
            ])",
        )
        .unwrap();

        let MapMessage::Update {
            commands,
            always_notify,
        } = message
        else {
            panic!("expected update");
        };
        assert!(always_notify);
        assert_eq!(commands.len(), 3);
        assert_eq!(
            commands[1],
            MapCommand::Animation {
                location: Location::new(0, 0, 3),
                animation: AnimationId(4),
                kind: AnimationKind::Sync,
            }
        );
    }
}
