//! Common error types for AccuRead.

use thiserror::Error;

/// Top-level error type for AccuRead operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A coordinate or radius failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The persistent queue store failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The upload collaborator rejected the batch.
    #[error("Upload error: {0}")]
    Upload(String),

    /// Transient transport failure while uploading.
    #[error("Network error: {0}")]
    Network(String),

    /// Capture attempted outside the geofence.
    #[error("Out of range: {distance_meters:.2} m from target (radius {radius_meters:.2} m)")]
    OutOfRange {
        distance_meters: f64,
        radius_meters: f64,
    },

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

impl Error {
    /// Whether this error may succeed if the same operation is attempted again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
