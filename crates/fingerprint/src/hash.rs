//! Hashing entry points.
//!
//! # Algorithm
//!
//! ```text
//! SHA-256(asset_bytes) → 32 bytes
//! ```
//!
//! No domain prefix, no salt, no filename. The hex form of a fingerprint is
//! exactly what `sha256sum` prints for the same file, which makes stored
//! assets easy to verify by hand.

use std::io::Read;

use sha2::{Digest, Sha256};

use crate::digest::AssetFingerprint;
use crate::error::FingerprintError;

const READ_CHUNK: usize = 8 * 1024;

/// Compute the fingerprint of an in-memory payload.
///
/// Pure function of `bytes`. Empty input is accepted here; callers that must
/// reject empty assets go through a [`ContentHasher`].
///
/// ```rust
/// use fingerprint::fingerprint;
///
/// let a = fingerprint(b"same bytes");
/// let b = fingerprint(b"same bytes");
/// assert_eq!(a, b);
/// assert_ne!(a, fingerprint(b"other bytes"));
/// ```
pub fn fingerprint(bytes: &[u8]) -> AssetFingerprint {
    let digest: [u8; 32] = Sha256::digest(bytes).into();
    AssetFingerprint::from_bytes(digest)
}

/// Stream a reader through SHA-256 in fixed-size chunks.
pub fn fingerprint_reader<R: Read>(mut reader: R) -> Result<AssetFingerprint, FingerprintError> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; READ_CHUNK];
    let mut total = 0usize;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        total += n;
        hasher.update(&buf[..n]);
    }
    if total == 0 {
        return Err(FingerprintError::EmptyPayload);
    }
    let digest: [u8; 32] = hasher.finalize().into();
    Ok(AssetFingerprint::from_bytes(digest))
}

/// Pluggable content hasher.
///
/// The asset store receives its hasher explicitly rather than calling
/// [`fingerprint`] directly, so a run can be configured (or tested) with a
/// different digest without touching the store.
pub trait ContentHasher: Send + Sync {
    /// Short algorithm label, recorded in reports.
    fn algorithm(&self) -> &'static str;

    fn fingerprint(&self, bytes: &[u8]) -> Result<AssetFingerprint, FingerprintError>;
}

/// The default hasher: SHA-256, rejecting empty payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn algorithm(&self) -> &'static str {
        "sha256"
    }

    fn fingerprint(&self, bytes: &[u8]) -> Result<AssetFingerprint, FingerprintError> {
        if bytes.is_empty() {
            return Err(FingerprintError::EmptyPayload);
        }
        Ok(fingerprint(bytes))
    }
}
