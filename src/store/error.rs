//! Store errors.

use thiserror::Error;

/// Errors surfaced by the in-memory store.
///
/// Absent keys on plain reads are reported as `None`, not as an error;
/// `NotFound` is reserved for reads that require the record to exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A record required by the caller is absent.
    #[error("{table} record not found: {key}")]
    NotFound { table: &'static str, key: String },

    /// The transaction could not be applied (schema violation, unknown
    /// index). Nothing from the transaction was committed.
    #[error("transaction failed: {message}")]
    TransactionFailure { message: String },
}

impl StoreError {
    pub(crate) fn not_found(table: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            table,
            key: key.into(),
        }
    }

    pub(crate) fn transaction(message: impl Into<String>) -> Self {
        Self::TransactionFailure {
            message: message.into(),
        }
    }
}
