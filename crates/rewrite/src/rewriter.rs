use std::collections::{HashMap, HashSet};
use std::time::Instant;

use fingerprint::AssetFingerprint;
use ingest::{AssetReference, Document, OriginalPath};
use store::CanonicalAsset;
use tracing::debug;

use crate::error::{PartialRewrite, UnresolvedReason, UnresolvedReferenceError};

/// Counts for one rewritten document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    pub references: usize,
    pub rewritten: usize,
    pub unresolved: usize,
}

/// Replaces asset reference spans with canonical paths.
///
/// Only the bytes inside each reference span change. Everything between
/// spans, including the `![[`, `](`, alias and quote syntax around a path,
/// is copied through untouched.
#[derive(Debug, Clone, Default)]
pub struct ReferenceRewriter {
    failed: HashSet<OriginalPath>,
}

impl ReferenceRewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths whose assets were supplied but failed to hash. References to
    /// them are reported as [`UnresolvedReason::AssetFailed`] instead of
    /// [`UnresolvedReason::MissingAsset`].
    pub fn with_failed_assets<I>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = OriginalPath>,
    {
        self.failed.extend(paths);
        self
    }

    /// Rewrite every reference in `document`.
    ///
    /// Returns the rewritten document when every reference resolved. When
    /// some did not, the error still carries the document with every other
    /// reference rewritten.
    pub fn rewrite(
        &self,
        document: Document,
        fingerprint_of: &HashMap<OriginalPath, AssetFingerprint>,
        canonical_of: &HashMap<AssetFingerprint, CanonicalAsset>,
    ) -> Result<Document, PartialRewrite> {
        let start = Instant::now();
        let (document, unresolved, stats) =
            self.rewrite_with_stats(document, fingerprint_of, canonical_of);
        debug!(
            document_id = %document.id,
            references = stats.references,
            rewritten = stats.rewritten,
            unresolved = stats.unresolved,
            elapsed_micros = start.elapsed().as_micros(),
            "rewrite_complete"
        );
        if unresolved.is_empty() {
            Ok(document)
        } else {
            Err(PartialRewrite {
                document,
                unresolved,
            })
        }
    }

    /// Same as [`rewrite`](Self::rewrite) but never fails: unresolved
    /// references are returned alongside the document.
    ///
    /// References are processed in span order. A span that falls outside
    /// the body, splits a UTF-8 character or overlaps an earlier reference
    /// is reported as [`UnresolvedReason::InvalidSpan`] and dropped from the
    /// output's reference list; the body text under it is copied unchanged.
    pub fn rewrite_with_stats(
        &self,
        document: Document,
        fingerprint_of: &HashMap<OriginalPath, AssetFingerprint>,
        canonical_of: &HashMap<AssetFingerprint, CanonicalAsset>,
    ) -> (Document, Vec<UnresolvedReferenceError>, RewriteStats) {
        let Document {
            id,
            body,
            mut references,
        } = document;
        references.sort_by_key(|r| (r.span.start, r.span.end));

        let mut stats = RewriteStats {
            references: references.len(),
            ..Default::default()
        };
        let mut unresolved = Vec::new();
        let mut out = String::with_capacity(body.len());
        let mut new_refs: Vec<AssetReference> = Vec::with_capacity(references.len());
        let mut cursor = 0usize;

        for reference in references {
            if !span_fits(&body, cursor, &reference) {
                unresolved.push(UnresolvedReferenceError {
                    document_id: id.clone(),
                    offset: reference.span.start,
                    original_path: reference.original_path,
                    reason: UnresolvedReason::InvalidSpan,
                });
                stats.unresolved += 1;
                continue;
            }
            out.push_str(&body[cursor..reference.span.start]);
            cursor = reference.span.end;
            let new_start = out.len();

            match self.resolve(&reference.original_path, fingerprint_of, canonical_of) {
                Ok(canonical) => {
                    out.push_str(&canonical.path);
                    new_refs.push(AssetReference {
                        original_path: OriginalPath::new(&canonical.path),
                        span: new_start..out.len(),
                        kind: reference.kind,
                    });
                    stats.rewritten += 1;
                }
                Err(reason) => {
                    out.push_str(&body[reference.span.clone()]);
                    unresolved.push(UnresolvedReferenceError {
                        document_id: id.clone(),
                        offset: reference.span.start,
                        original_path: reference.original_path.clone(),
                        reason,
                    });
                    new_refs.push(AssetReference {
                        span: new_start..out.len(),
                        ..reference
                    });
                    stats.unresolved += 1;
                }
            }
        }
        out.push_str(&body[cursor..]);

        let document = Document {
            id,
            body: out,
            references: new_refs,
        };
        (document, unresolved, stats)
    }

    fn resolve<'a>(
        &self,
        path: &OriginalPath,
        fingerprint_of: &HashMap<OriginalPath, AssetFingerprint>,
        canonical_of: &'a HashMap<AssetFingerprint, CanonicalAsset>,
    ) -> Result<&'a CanonicalAsset, UnresolvedReason> {
        let Some(fingerprint) = fingerprint_of.get(path) else {
            return Err(if self.failed.contains(path) {
                UnresolvedReason::AssetFailed
            } else {
                UnresolvedReason::MissingAsset
            });
        };
        canonical_of
            .get(fingerprint)
            .ok_or(UnresolvedReason::MissingCanonical)
    }
}

/// True if `reference` lies inside `body`, on character boundaries, and
/// starts at or after `cursor`.
fn span_fits(body: &str, cursor: usize, reference: &AssetReference) -> bool {
    let span = &reference.span;
    span.start >= cursor
        && span.start < span.end
        && span.end <= body.len()
        && body.is_char_boundary(span.start)
        && body.is_char_boundary(span.end)
}
