/// Protocol constants and tunable parameters of the map model.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapConfig {
    /// How far outside the viewport the server may address squares.
    ///
    /// Multi-tile objects are sent with their head beyond the right or bottom
    /// edge, so coordinates in `-margin..width + margin` are accepted.
    pub coord_margin: i32,
}

impl MapConfig {
    // ===== compile-time constants used as type parameters =====
    /// Number of layers per map square.
    pub const NUM_LAYERS: usize = 10;
    /// Side length of a storage patch in squares.
    pub const PATCH_SIZE: i32 = 32;
    /// Largest accepted viewport edge in squares.
    pub const MAX_MAP_SIZE: u32 = 1024;
    /// Largest multi-tile face extent per axis.
    pub const MAX_FACE_TILES: u8 = 16;

    // ===== protocol values =====
    /// Darkness value of a fully lit square.
    pub const DARKNESS_FULL_BRIGHT: u8 = 255;
    /// Darkness of squares the server has not sent a value for.
    pub const DEFAULT_DARKNESS: u8 = Self::DARKNESS_FULL_BRIGHT;
    /// Magic map bytes carry the color index in the low nibble.
    pub const FACE_COLOR_MASK: u8 = 0x0f;

    // ===== runtime-tunable defaults =====
    /// Matches the map2 coordinate offset of the wire protocol.
    pub const DEFAULT_COORD_MARGIN: i32 = 15;

    pub fn new() -> Self {
        Self {
            coord_margin: Self::DEFAULT_COORD_MARGIN,
        }
    }

    pub fn with_coord_margin(coord_margin: i32) -> Self {
        Self {
            coord_margin: coord_margin.max(0),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self::new()
    }
}
