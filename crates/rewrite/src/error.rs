use std::fmt;

use ingest::{Document, DocumentId, OriginalPath};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a reference could not be mapped to a canonical path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// No asset was ever supplied for the path.
    MissingAsset,
    /// The path has a fingerprint but the store holds no canonical asset for it.
    MissingCanonical,
    /// An asset was supplied but could not be hashed.
    AssetFailed,
    /// The reference span is out of bounds, splits a character or overlaps
    /// another reference.
    InvalidSpan,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            UnresolvedReason::MissingAsset => "asset was never ingested",
            UnresolvedReason::MissingCanonical => "no canonical asset for fingerprint",
            UnresolvedReason::AssetFailed => "asset failed to hash",
            UnresolvedReason::InvalidSpan => "reference span does not fit the document body",
        };
        f.write_str(text)
    }
}

/// A reference that was left pointing at its original path.
///
/// Ordered by document, then offset, so reports list them stably.
#[derive(Debug, Error, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[error("unresolved reference '{original_path}' in {document_id} at byte {offset}: {reason}")]
pub struct UnresolvedReferenceError {
    pub document_id: DocumentId,
    /// Byte offset of the reference in the body as it was before rewriting.
    pub offset: usize,
    pub original_path: OriginalPath,
    pub reason: UnresolvedReason,
}

/// Rewrite outcome when some references could not be resolved.
///
/// `document` has every resolvable reference rewritten; the rest keep their
/// original text and are listed in `unresolved`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{} unresolved reference(s) in document {}", .unresolved.len(), .document.id)]
pub struct PartialRewrite {
    pub document: Document,
    pub unresolved: Vec<UnresolvedReferenceError>,
}

impl PartialRewrite {
    pub fn into_parts(self) -> (Document, Vec<UnresolvedReferenceError>) {
        (self.document, self.unresolved)
    }
}
