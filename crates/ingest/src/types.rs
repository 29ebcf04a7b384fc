//! Core data model types for the migration pipeline.
//!
//! # Type Hierarchy
//!
//! ```text
//! Document
//! ├── id: DocumentId
//! ├── body: String
//! └── references: Vec<AssetReference>
//!     ├── original_path: OriginalPath   (lookup key into the asset map)
//!     ├── span: Range<usize>            (byte range of the path text in body)
//!     └── kind: ReferenceKind           (Wikilink | Markdown | Html)
//!
//! Asset
//! ├── path: OriginalPath
//! ├── document_id: DocumentId           (originating document)
//! └── content: AssetContent
//!     ├── Inline(Bytes)
//!     └── File(PathBuf)                 (read lazily at registration)
//! ```
//!
//! Assets are immutable once built. Documents are only ever replaced
//! wholesale by the rewriter; nothing edits a body in place.
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::ops::Range;
use std::path::PathBuf;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::scan::scan_references;

/// Stable identifier of a document within one run.
///
/// Ordered lexicographically; the default canonical-selection policy ranks
/// assets by the id of the document that brought them in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Build an id, rejecting values that are empty after trimming.
    pub fn new(id: impl Into<String>) -> Result<Self, IngestError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(IngestError::InvalidDocumentId(format!("{id:?}")));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalized path under which a document refers to an asset.
///
/// Normalization is purely lexical: surrounding whitespace is trimmed,
/// backslashes become forward slashes and any leading `./` is dropped.
/// Nothing touches the filesystem.
///
/// ```rust
/// use ingest::OriginalPath;
///
/// let p = OriginalPath::new(" ./attachments\\Img 1.PNG ");
/// assert_eq!(p.as_str(), "attachments/Img 1.PNG");
/// assert_eq!(p.file_name(), "Img 1.PNG");
/// assert_eq!(p.extension().as_deref(), Some("png"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OriginalPath(String);

impl OriginalPath {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let mut path = raw.as_ref().trim().replace('\\', "/");
        while let Some(rest) = path.strip_prefix("./") {
            path = rest.to_string();
        }
        Self(path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Final path component.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Lowercased extension without the dot, if the file name has one.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(idx) if idx > 0 && idx + 1 < name.len() => {
                Some(name[idx + 1..].to_ascii_lowercase())
            }
            _ => None,
        }
    }
}

impl fmt::Display for OriginalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OriginalPath {
    fn from(value: &str) -> Self {
        OriginalPath::new(value)
    }
}

impl From<String> for OriginalPath {
    fn from(value: String) -> Self {
        OriginalPath::new(value)
    }
}

/// Where an asset's bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetContent {
    /// Bytes already in memory (extracted base64 images, tests).
    Inline(Bytes),
    /// Bytes on disk, read when the asset is registered.
    File(PathBuf),
}

impl AssetContent {
    /// Materialize the payload.
    ///
    /// Cheap for inline content (reference-counted clone). File content is
    /// read in full.
    pub fn read(&self) -> io::Result<Bytes> {
        match self {
            AssetContent::Inline(bytes) => Ok(bytes.clone()),
            AssetContent::File(path) => fs::read(path).map(Bytes::from),
        }
    }

    /// Payload size if it can be known without reading the bytes.
    pub fn len_hint(&self) -> Option<u64> {
        match self {
            AssetContent::Inline(bytes) => Some(bytes.len() as u64),
            AssetContent::File(path) => fs::metadata(path).ok().map(|m| m.len()),
        }
    }
}

/// A binary attachment referenced from at least one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub path: OriginalPath,
    pub document_id: DocumentId,
    pub content: AssetContent,
}

impl Asset {
    pub fn new(path: impl Into<OriginalPath>, document_id: DocumentId, bytes: impl Into<Bytes>) -> Self {
        Self {
            path: path.into(),
            document_id,
            content: AssetContent::Inline(bytes.into()),
        }
    }

    pub fn from_file(path: impl Into<OriginalPath>, document_id: DocumentId, file: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            document_id,
            content: AssetContent::File(file.into()),
        }
    }

    pub fn file_name(&self) -> &str {
        self.path.file_name()
    }

    pub fn extension(&self) -> Option<String> {
        self.path.extension()
    }
}

/// Syntax a reference was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// `![[target]]`
    Wikilink,
    /// `![alt](target)`
    Markdown,
    /// `<img src="target">`
    Html,
}

/// One occurrence of an asset path inside a document body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetReference {
    /// Key used to look the asset up. Usually the normalized written text,
    /// but a loader may re-key it (e.g. resolve a bare file name to the
    /// attachment's vault-relative path).
    pub original_path: OriginalPath,
    /// Byte range of the path text within the body. Never includes the
    /// surrounding `![[`, `](` or quote characters.
    pub span: Range<usize>,
    pub kind: ReferenceKind,
}

impl AssetReference {
    /// The reference text exactly as it appears in `body`.
    pub fn written<'a>(&self, body: &'a str) -> &'a str {
        &body[self.span.clone()]
    }
}

/// A note body plus the asset references found in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub body: String,
    /// Sorted by span start, non-overlapping.
    pub references: Vec<AssetReference>,
}

impl Document {
    /// Build a document and scan its body for asset references.
    pub fn parse(id: DocumentId, body: impl Into<String>) -> Self {
        let body = body.into();
        let references = scan_references(&body);
        Self {
            id,
            body,
            references,
        }
    }

    /// Build a document from references located by an upstream stage.
    ///
    /// Spans are validated against the body and sorted.
    pub fn with_references(
        id: DocumentId,
        body: impl Into<String>,
        mut references: Vec<AssetReference>,
    ) -> Result<Self, IngestError> {
        let body = body.into();
        references.sort_by_key(|r| (r.span.start, r.span.end));

        let mut prev_end = 0usize;
        for reference in &references {
            let Range { start, end } = reference.span;
            if start >= end || end > body.len() {
                return Err(IngestError::InvalidReferenceSpan(format!(
                    "{start}..{end} outside body of {} bytes",
                    body.len()
                )));
            }
            if !body.is_char_boundary(start) || !body.is_char_boundary(end) {
                return Err(IngestError::InvalidReferenceSpan(format!(
                    "{start}..{end} splits a UTF-8 character"
                )));
            }
            if start < prev_end {
                return Err(IngestError::InvalidReferenceSpan(format!(
                    "{start}..{end} overlaps previous reference ending at {prev_end}"
                )));
            }
            prev_end = end;
        }

        Ok(Self {
            id,
            body,
            references,
        })
    }

    /// Distinct lookup keys referenced by this document.
    pub fn referenced_paths(&self) -> BTreeSet<&OriginalPath> {
        self.references.iter().map(|r| &r.original_path).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_id(s: &str) -> DocumentId {
        DocumentId::new(s).expect("valid id")
    }

    #[test]
    fn document_id_rejects_blank() {
        assert!(matches!(
            DocumentId::new("   "),
            Err(IngestError::InvalidDocumentId(_))
        ));
        assert_eq!(doc_id(" note-1 ").as_str(), "note-1");
    }

    #[test]
    fn original_path_normalization() {
        assert_eq!(OriginalPath::new("././img.png").as_str(), "img.png");
        assert_eq!(OriginalPath::new("a\\b\\c.gif").file_name(), "c.gif");
        assert_eq!(OriginalPath::new(".hidden").extension(), None);
        assert_eq!(OriginalPath::new("noext").extension(), None);
        assert_eq!(OriginalPath::new("photo.JPeG").extension().as_deref(), Some("jpeg"));
    }

    #[test]
    fn parse_collects_references_in_order() {
        let doc = Document::parse(
            doc_id("n1"),
            "start ![](b.png) middle ![[a.png]] end",
        );
        let written: Vec<&str> = doc.references.iter().map(|r| r.written(&doc.body)).collect();
        assert_eq!(written, vec!["b.png", "a.png"]);
        assert_eq!(doc.referenced_paths().len(), 2);
    }

    #[test]
    fn with_references_rejects_bad_spans() {
        let body = "é ![[x.png]]";
        let reference = |span: Range<usize>| AssetReference {
            original_path: OriginalPath::new("x.png"),
            span,
            kind: ReferenceKind::Wikilink,
        };

        let out_of_bounds = Document::with_references(doc_id("d"), body, vec![reference(5..99)]);
        assert!(matches!(out_of_bounds, Err(IngestError::InvalidReferenceSpan(_))));

        let split_char = Document::with_references(doc_id("d"), body, vec![reference(1..4)]);
        assert!(matches!(split_char, Err(IngestError::InvalidReferenceSpan(_))));

        let overlapping = Document::with_references(
            doc_id("d"),
            body,
            vec![reference(6..11), reference(7..9)],
        );
        assert!(matches!(overlapping, Err(IngestError::InvalidReferenceSpan(_))));

        let ok = Document::with_references(doc_id("d"), body, vec![reference(6..11)])
            .expect("valid span");
        assert_eq!(ok.references[0].written(&ok.body), "x.png");
    }

    #[test]
    fn inline_content_reads_without_copy() {
        let content = AssetContent::Inline(Bytes::from_static(b"abc"));
        assert_eq!(content.len_hint(), Some(3));
        assert_eq!(content.read().expect("inline read").as_ref(), b"abc");
    }

    #[test]
    fn missing_file_content_fails_to_read() {
        let content = AssetContent::File(PathBuf::from("/definitely/not/here.png"));
        assert!(content.read().is_err());
        assert_eq!(content.len_hint(), None);
    }
}
