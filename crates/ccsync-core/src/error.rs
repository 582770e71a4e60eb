//! Error types for ccsync-core

use std::path::PathBuf;

/// Result type for ccsync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in ccsync-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The persisted snapshot could not be read even after retrying
    #[error("Snapshot at {path} unavailable after {attempts} attempts: {reason}")]
    SnapshotUnavailable {
        path: PathBuf,
        attempts: u32,
        reason: String,
    },

    /// Declarations could not be extracted from source text
    #[error("Failed to parse declarations: {message}")]
    Parse { message: String },

    /// A push was requested while another one is still running
    #[error("A sync is already in flight for this session")]
    SyncInFlight,

    /// The session is not in a state that allows the operation
    #[error("Session is {state}, cannot {operation}")]
    InvalidState { state: String, operation: String },

    /// The remote transport failed before producing a response
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Building the artifact bundle failed
    #[error("Bundle error: {message}")]
    Bundle { message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from ccsync-fs
    #[error(transparent)]
    Fs(#[from] ccsync_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Zip archive error
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

impl Error {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }
}
