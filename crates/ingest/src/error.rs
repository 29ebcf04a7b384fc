//! Error types produced by the ingest crate.
//!
//! | Error | Description |
//! |-------|-------------|
//! | [`InvalidDocumentId`](IngestError::InvalidDocumentId) | Document id empty after sanitization |
//! | [`InvalidPath`](IngestError::InvalidPath) | Asset path empty after normalization |
//! | [`EmptyAssetPayload`](IngestError::EmptyAssetPayload) | Inline asset has zero bytes |
//! | [`UnsupportedExtension`](IngestError::UnsupportedExtension) | Asset extension not in the configured allow-list |
//! | [`AssetTooLarge`](IngestError::AssetTooLarge) | Size limit exceeded |
//! | [`InvalidReferenceSpan`](IngestError::InvalidReferenceSpan) | Caller-supplied span does not fit the body |
use thiserror::Error;

/// Errors that can occur while building documents and assets.
///
/// Cloneable and comparable so tests can match on exact variants. Marked
/// `#[non_exhaustive]`; include a catch-all arm when matching.
///
/// ```rust
/// use ingest::IngestError;
///
/// let err = IngestError::UnsupportedExtension("exe".to_string());
/// assert_eq!(err.to_string(), "unsupported asset extension: exe");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IngestError {
    #[error("invalid document id: {0}")]
    InvalidDocumentId(String),

    #[error("invalid asset path: {0}")]
    InvalidPath(String),

    /// Zero-byte inline payloads are rejected up front; they cannot be
    /// fingerprinted meaningfully.
    #[error("asset payload is empty")]
    EmptyAssetPayload,

    #[error("unsupported asset extension: {0}")]
    UnsupportedExtension(String),

    #[error("asset too large: {0}")]
    AssetTooLarge(String),

    /// A reference span is out of bounds, splits a UTF-8 character, or
    /// overlaps another reference.
    #[error("invalid reference span: {0}")]
    InvalidReferenceSpan(String),
}
