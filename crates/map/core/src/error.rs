//! Error infrastructure for map-core.
//!
//! Protocol desyncs that the server is expected to repair on its own (unknown
//! animation ids, speed updates for squares without an animation) are not
//! errors: they are logged and skipped by the updater. [`MapError`] covers the
//! remaining cases, which are either invalid input from the decoder or a map
//! that cannot be allocated at all.

use thiserror::Error;

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Validation**: Invalid input that should be rejected without retry
/// - **Fatal**: The map cannot be (re)built; there is no local recovery
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Validation error - invalid input, should not retry without changes.
    ///
    /// Examples: square outside the addressable area, layer out of range
    Validation,

    /// Fatal error - no usable map state exists.
    ///
    /// Examples: zero-sized or oversized viewport
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if processing can continue with the next command.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Validation)
    }
}

/// Errors reported by map model operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("square ({x}, {y}) is outside the addressable map area {width}x{height}")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },

    #[error("layer {layer} is out of range (maximum {max})")]
    InvalidLayer { layer: u8, max: usize },

    #[error("invalid map size {width}x{height}")]
    InvalidMapSize { width: u32, height: u32 },
}

impl MapError {
    /// Returns the severity level of this error.
    pub const fn severity(&self) -> ErrorSeverity {
        match self {
            Self::OutOfBounds { .. } | Self::InvalidLayer { .. } => ErrorSeverity::Validation,
            Self::InvalidMapSize { .. } => ErrorSeverity::Fatal,
        }
    }

    /// Returns a static identifier for this error variant.
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::OutOfBounds { .. } => "MAP_OUT_OF_BOUNDS",
            Self::InvalidLayer { .. } => "MAP_INVALID_LAYER",
            Self::InvalidMapSize { .. } => "MAP_INVALID_SIZE",
        }
    }
}

pub type Result<T> = core::result::Result<T, MapError>;
