//! Error types for the audit crate.

use thiserror::Error;

/// Errors that can occur while writing or reading the audit trail.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Failed to initialize the audit logger.
    #[error("failed to initialize audit logger: {0}")]
    InitializationFailed(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(String),
}
