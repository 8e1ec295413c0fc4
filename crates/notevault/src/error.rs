use crate::validation::ValidationReport;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Validation failed: {0}")]
    Validation(ValidationReport),

    #[error("Note not found: {0}")]
    NoteNotFound(Uuid),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Decompression error: {0}")]
    Decompression(String),

    #[error("Checksum mismatch: stored {expected}, computed {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Corrupted data: {0}")]
    CorruptedData(String),

    #[error("Storage quota exceeded: {usage} of {limit} bytes used")]
    QuotaExceeded { usage: u64, limit: u64 },

    #[error("Migration from version {from} failed: {reason}")]
    Migration { from: String, reason: String },

    #[error("Save failed: {0}")]
    Save(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),
}

impl VaultError {
    /// Whether this failure means the stored bytes cannot be trusted.
    ///
    /// Integrity failures are absorbed by the recovery chain on load; anything
    /// else is surfaced to the caller.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            VaultError::Decompression(_)
                | VaultError::ChecksumMismatch { .. }
                | VaultError::CorruptedData(_)
                | VaultError::Serialization(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
