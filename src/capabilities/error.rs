//! Registry errors.

use thiserror::Error;

use crate::store::StoreError;

/// Errors from bundle and capability registration or resolution.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A bundle named in a resolution (directly or as a dependency) is
    /// not registered.
    #[error("Bundle not found: {0}")]
    BundleNotFound(String),

    /// A capability required by the caller is not registered.
    #[error("Capability not found: {0}")]
    CapabilityNotFound(String),

    /// The underlying store rejected the transaction.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Bundle manifest parsing failed.
    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_yaml::Error),

    /// File I/O error while loading manifests.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
