use fingerprint::{AssetFingerprint, FingerprintError};
use ingest::OriginalPath;
use thiserror::Error;

/// Errors raised by the asset store and its storage backends.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    /// The asset's bytes could not be read or fingerprinted. Fatal for that
    /// asset only.
    #[error("hash computation failed for {path}: {source}")]
    HashComputation {
        path: OriginalPath,
        source: FingerprintError,
    },

    /// Two different payloads produced the same fingerprint. Fatal for the
    /// whole run: merging them would destroy one of the two.
    #[error(
        "fingerprint collision on {fingerprint}: {existing} and {incoming} share a digest but differ in content"
    )]
    CollisionAnomaly {
        fingerprint: AssetFingerprint,
        existing: OriginalPath,
        incoming: OriginalPath,
    },

    #[error("storage backend failure: {0}")]
    Backend(String),

    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    pub(crate) fn backend(msg: impl Into<String>) -> Self {
        StoreError::Backend(msg.into())
    }
}
