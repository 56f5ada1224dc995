//! Error types for the composition model and its codec.

use thiserror::Error;
use timeweave_core::TimeError;

/// Main error type for timeline operations.
#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("Time error: {0}")]
    Time(#[from] TimeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("{child} cannot be placed inside {parent}")]
    WrongKind { parent: String, child: String },

    #[error("Object is already a child of this composition")]
    AlreadyPresent,

    #[error("Object is not a child of this composition")]
    NotAChild,

    #[error("No child at index {index} (composition has {len} children)")]
    NoSuchChildAtIndex { index: usize, len: usize },

    #[error("Cannot compute duration of '{0}'")]
    CannotComputeDuration(String),

    #[error("Schema {schema} version {version} is newer than the supported version {max}")]
    UnsupportedSchema {
        schema: String,
        version: u32,
        max: u32,
    },

    #[error("Schema '{0}' is not supported here")]
    NotSupported(String),

    #[error("Node does not exist in this arena")]
    NoSuchNode,

    #[error("Inserting this object would make it its own ancestor")]
    WouldCreateCycle,

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Cannot trim through the middle of a transition")]
    CannotTrimTransition,

    #[error("Two transitions cannot be next to each other in a track")]
    TransitionFollowingTransition,

    #[error("Illegal index: {0}")]
    IllegalIndex(String),

    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("Malformed field '{field}': {reason}")]
    Malformed { field: String, reason: String },
}

/// Result type alias for timeline operations.
pub type Result<T> = std::result::Result<T, TimelineError>;
