//! Error types for the converter.
//!
//! Only fatal conditions live here. Recoverable conditions (unresolved
//! references, ragged tables, duplicate identifiers) are recorded as
//! [`Warning`](crate::diagnostics::Warning)s on the produced document.

/// Result type alias for converter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while converting or loading a document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or unbalanced markup tree. Aborts conversion of that document only.
    #[error("Structural error at {position}: {reason}")]
    Structural {
        /// Byte offset in the XML source, or token index for token streams
        position: usize,
        /// Reason the tree was rejected
        reason: String,
    },

    /// Persisted record carries a schema version newer than this build understands
    #[error("Unsupported schema version: {found} (newest supported: {supported})")]
    UnsupportedSchemaVersion {
        /// Version tag found in the record
        found: String,
        /// Newest version this build can load
        supported: u32,
    },

    /// Persisted record whose shape cannot be migrated
    #[error("Invalid document record: {0}")]
    InvalidRecord(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a [`Error::Structural`] at `position`.
    pub fn structural(position: usize, reason: impl Into<String>) -> Self {
        Error::Structural {
            position,
            reason: reason.into(),
        }
    }

    /// Whether this error came from a malformed input tree.
    pub fn is_structural(&self) -> bool {
        matches!(self, Error::Structural { .. })
    }
}
