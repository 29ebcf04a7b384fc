use thiserror::Error;

/// Errors raised while computing or parsing a fingerprint.
///
/// Every variant is a hash computation failure from the caller's point of
/// view: the asset in question cannot be given an identity and must be
/// skipped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FingerprintError {
    /// Zero-byte payloads are treated as corrupt.
    #[error("asset payload is empty")]
    EmptyPayload,
    #[error("failed to read asset bytes: {0}")]
    Io(String),
    #[error("invalid fingerprint hex: {0}")]
    InvalidHex(String),
}

impl From<std::io::Error> for FingerprintError {
    fn from(value: std::io::Error) -> Self {
        FingerprintError::Io(value.to_string())
    }
}
