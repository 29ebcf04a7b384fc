//! Canonical assets and their storage paths.
use std::fmt;

use bytes::Bytes;
use fingerprint::AssetFingerprint;
use ingest::{DocumentId, OriginalPath};
use serde::Serialize;

use crate::policy::Candidate;

/// The single retained representative of a fingerprint.
#[derive(Clone, PartialEq, Eq)]
pub struct CanonicalAsset {
    pub fingerprint: AssetFingerprint,
    /// Storage path, see [`canonical_path`].
    pub path: String,
    /// Original path of the asset that was chosen.
    pub source: OriginalPath,
    pub document_id: DocumentId,
    pub bytes: Bytes,
}

impl CanonicalAsset {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn candidate(&self) -> Candidate<'_> {
        Candidate {
            document_id: &self.document_id,
            path: &self.source,
        }
    }
}

impl fmt::Debug for CanonicalAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanonicalAsset")
            .field("fingerprint", &self.fingerprint)
            .field("path", &self.path)
            .field("source", &self.source)
            .field("document_id", &self.document_id)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Build the storage path for a fingerprint.
///
/// ```text
/// <dir>/<64 lowercase hex chars>[.<lowercased extension>]
/// ```
///
/// Same bytes and same extension always yield the same path.
///
/// ```rust
/// use fingerprint::fingerprint;
/// use store::canonical_path;
///
/// let fp = fingerprint(b"pixels");
/// let path = canonical_path(&fp, Some("PNG"), "attachments/");
/// assert_eq!(path, format!("attachments/{}.png", fp.to_hex()));
/// ```
pub fn canonical_path(fingerprint: &AssetFingerprint, extension: Option<&str>, dir: &str) -> String {
    let dir = dir.trim_end_matches('/');
    let mut name = fingerprint.to_hex();
    if let Some(ext) = extension.map(|e| e.trim_start_matches('.')).filter(|e| !e.is_empty()) {
        name.push('.');
        name.push_str(&ext.to_ascii_lowercase());
    }
    if dir.is_empty() {
        name
    } else {
        format!("{dir}/{name}")
    }
}

/// A set of byte-identical assets and the copy that represents them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub fingerprint: AssetFingerprint,
    pub canonical_path: String,
    pub canonical_source: OriginalPath,
    /// Every other registered path with these bytes, sorted.
    pub duplicates: Vec<OriginalPath>,
    /// Size of one copy.
    pub size: u64,
    /// Bytes not stored thanks to this group.
    pub wasted_bytes: u64,
}
