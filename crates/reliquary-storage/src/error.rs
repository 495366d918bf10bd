//! Error types for reliquary-storage

use reliquary_core::RegistryError;
use thiserror::Error;

/// Errors that can occur in storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O or database error
    #[error("I/O error: {0}")]
    Io(String),

    /// Error during serialization
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error during deserialization
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Stored bytes have an unexpected shape
    #[error("Corrupt entry in {table}: {reason}")]
    Corrupt { table: &'static str, reason: String },
}

impl StorageError {
    /// Create a new I/O error
    pub fn io(message: impl ToString) -> Self {
        Self::Io(message.to_string())
    }

    /// Create a new Corrupt error
    pub fn corrupt(table: &'static str, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            table,
            reason: reason.into(),
        }
    }
}

impl From<postcard::Error> for StorageError {
    fn from(err: postcard::Error) -> Self {
        StorageError::Deserialization(err.to_string())
    }
}

impl From<StorageError> for RegistryError {
    fn from(err: StorageError) -> Self {
        RegistryError::Store(err.to_string())
    }
}
