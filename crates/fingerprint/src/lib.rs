//! Content fingerprints for migrated note assets.
//!
//! Every attachment that flows through the migration is identified by the
//! SHA-256 digest of its bytes. Two attachments with the same fingerprint are
//! the same asset, whatever they were called in the source archive.
//!
//! ## Pure function guarantee
//!
//! The fingerprint depends on the payload bytes and nothing else: not the
//! filename, not the path, not the order in which assets were seen. Give us
//! the same bytes and you get the same fingerprint on any machine.
//!
//! ## Collision handling
//!
//! SHA-256 is used because an accidental collision would silently merge two
//! different attachments. The store still compares bytes on every dedupe hit
//! and treats a mismatch as fatal for the run.

mod digest;
mod error;
mod hash;

pub use crate::digest::{AssetFingerprint, FINGERPRINT_LEN};
pub use crate::error::FingerprintError;
pub use crate::hash::{fingerprint, fingerprint_reader, ContentHasher, Sha256Hasher};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_bytes_share_a_fingerprint() {
        let png_a = b"\x89PNG\r\n\x1a\nsame-pixels".to_vec();
        let png_b = png_a.clone();
        assert_eq!(fingerprint(&png_a), fingerprint(&png_b));
    }

    #[test]
    fn single_bit_flip_changes_fingerprint() {
        let original = vec![0u8; 64];
        let mut flipped = original.clone();
        flipped[63] ^= 1;
        assert_ne!(fingerprint(&original), fingerprint(&flipped));
    }

    #[test]
    fn fingerprint_determinism() {
        let payloads: [&[u8]; 3] = [b"a", b"\x00\x01\x02", "こんにちは".as_bytes()];
        for payload in payloads {
            assert_eq!(fingerprint(payload), fingerprint(payload));
        }
    }
}
