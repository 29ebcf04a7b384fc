//! The fingerprint value type.
//!
//! An [`AssetFingerprint`] is the raw 32-byte SHA-256 digest of an asset's
//! bytes. It is `Copy`, totally ordered (so it can key `BTreeMap`s and sort
//! reports deterministically), and round-trips through its 64-character
//! lowercase hex form.
//!
//! ```rust
//! use fingerprint::{fingerprint, AssetFingerprint};
//!
//! let fp = fingerprint(b"hello world");
//! let hex = fp.to_hex();
//! assert_eq!(hex.len(), 64);
//! assert_eq!(hex.parse::<AssetFingerprint>().unwrap(), fp);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::FingerprintError;

/// Length of a fingerprint in bytes.
pub const FINGERPRINT_LEN: usize = 32;

/// Deterministic content digest used as the identity key for deduplication.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetFingerprint([u8; FINGERPRINT_LEN]);

impl AssetFingerprint {
    pub const fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Lowercase hex encoding, 64 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First `n` hex characters, for log lines and reports.
    pub fn short(&self, n: usize) -> String {
        let mut hex = self.to_hex();
        hex.truncate(n.min(FINGERPRINT_LEN * 2));
        hex
    }
}

impl fmt::Display for AssetFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for AssetFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetFingerprint({})", self.short(16))
    }
}

impl FromStr for AssetFingerprint {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; FINGERPRINT_LEN];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|err| FingerprintError::InvalidHex(format!("{s:?}: {err}")))?;
        Ok(Self(bytes))
    }
}

impl Serialize for AssetFingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AssetFingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        hex.parse().map_err(serde::de::Error::custom)
    }
}
