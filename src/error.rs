//! Error taxonomy
//!
//! - Data errors (`WorldError`): malformed world or puzzle, fail at load/import
//! - Geometry errors (`PerspectiveError`): launch rejected, state untouched
//! - I/O errors (`PersistenceError`): only surfaced when saving

use std::path::PathBuf;

/// Malformed or unreadable world/puzzle data
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("failed to read world: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse world: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("element '{element}' has unknown kind '{kind}'")]
    UnknownElementKind { element: String, kind: String },

    #[error("element '{element}' has no location")]
    MissingLocation { element: String },

    #[error("puzzle declares {count} portals; portals must come in pairs")]
    OddPortalCount { count: usize },

    #[error("puzzle {index} out of range (world has {count})")]
    PuzzleIndex { index: usize, count: usize },

    #[error("world size must be positive")]
    InvalidSize,
}

/// An action on the perspective that did not complete
#[derive(Debug, thiserror::Error)]
pub enum PerspectiveError {
    #[error("main rotation is not invertible")]
    SingularRotation,

    #[error("launch axis {0:?} is not a face normal")]
    InvalidLaunchAxis([f32; 3]),

    #[error("no puzzle imported")]
    NoPuzzle,

    #[error(transparent)]
    World(#[from] WorldError),
}

/// Solution store failures
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("solution store I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode solution: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("solution record {} failed integrity check", path.display())]
    Corrupt { path: PathBuf },

    #[error("unsupported solution record version {found}")]
    Version { found: u32 },

    #[error("'{key}' is not a valid solution store key")]
    InvalidKey { key: String },
}
