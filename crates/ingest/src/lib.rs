//! Omni-Parser ingest layer
//!
//! Converted notes and their attachments enter the deduplication pipeline
//! here. Upstream stages (audit, conversion, sanitization, frontmatter) hand
//! us a note body and a set of attachment payloads; we turn them into the
//! typed [`Document`] and [`Asset`] values the rest of the pipeline works on.
//!
//! ## What we do here
//!
//! - **Validate ids** - document ids are sanitized and must be non-empty
//! - **Find references** - every `![[...]]`, `![](...)` and `<img src>` in a
//!   body is located by byte span, so later rewriting touches nothing else
//! - **Filter assets** - only allowed extensions, within the size limit
//! - **Log everything** - structured logs via tracing
//!
//! ## Example
//!
//! ```
//! use ingest::{ingest_asset, ingest_document, AssetContent, IngestConfig};
//!
//! let cfg = IngestConfig::default();
//! let doc = ingest_document("note-1", "Diagram: ![[img1.png]]", &cfg).unwrap();
//! assert_eq!(doc.references.len(), 1);
//!
//! let asset = ingest_asset(
//!     "img1.png",
//!     &doc.id,
//!     AssetContent::Inline(vec![1u8, 2, 3].into()),
//!     &cfg,
//! )
//! .unwrap();
//! assert_eq!(asset.file_name(), "img1.png");
//! ```
use std::time::Instant;

use tracing::{debug, warn, Level};

mod config;
mod error;
mod scan;
mod types;

pub use crate::config::{ConfigError, IngestConfig, DEFAULT_ASSET_EXTENSIONS};
pub use crate::error::IngestError;
pub use crate::scan::{is_external_target, scan_references};
pub use crate::types::{
    Asset, AssetContent, AssetReference, Document, DocumentId, OriginalPath, ReferenceKind,
};

/// Build a [`Document`] from a converted note body.
pub fn ingest_document(
    id: &str,
    body: impl Into<String>,
    cfg: &IngestConfig,
) -> Result<Document, IngestError> {
    let start = Instant::now();
    let id = match DocumentId::new(sanitize(id, cfg.strip_control_chars)) {
        Ok(id) => id,
        Err(err) => {
            let elapsed_micros = start.elapsed().as_micros();
            warn!(error = %err, elapsed_micros, "ingest_failure");
            return Err(err);
        }
    };

    let span = tracing::span!(Level::DEBUG, "ingest.document", document_id = %id);
    let _guard = span.enter();

    let doc = Document::parse(id, body);
    debug!(
        body_len = doc.body.len(),
        references = doc.references.len(),
        elapsed_micros = start.elapsed().as_micros(),
        "ingest_success"
    );
    Ok(doc)
}

/// Build an [`Asset`], enforcing the extension allow-list and size limit.
pub fn ingest_asset(
    path: &str,
    document_id: &DocumentId,
    content: AssetContent,
    cfg: &IngestConfig,
) -> Result<Asset, IngestError> {
    match ingest_asset_inner(path, document_id, content, cfg) {
        Ok(asset) => Ok(asset),
        Err(err) => {
            warn!(path, document_id = %document_id, error = %err, "ingest_failure");
            Err(err)
        }
    }
}

fn ingest_asset_inner(
    path: &str,
    document_id: &DocumentId,
    content: AssetContent,
    cfg: &IngestConfig,
) -> Result<Asset, IngestError> {
    let path = OriginalPath::new(path);
    if path.is_empty() {
        return Err(IngestError::InvalidPath("empty asset path".into()));
    }

    let ext = path.extension().unwrap_or_default();
    if !cfg.allows_extension(&ext) {
        return Err(IngestError::UnsupportedExtension(if ext.is_empty() {
            format!("{path} has no extension")
        } else {
            ext
        }));
    }

    if let AssetContent::Inline(bytes) = &content {
        if bytes.is_empty() {
            return Err(IngestError::EmptyAssetPayload);
        }
    }

    if let Some(limit) = cfg.max_asset_bytes {
        if let Some(len) = content.len_hint() {
            if len > limit {
                return Err(IngestError::AssetTooLarge(format!(
                    "{path}: {len} bytes exceeds limit of {limit}"
                )));
            }
        }
    }

    Ok(Asset {
        path,
        document_id: document_id.clone(),
        content,
    })
}

fn sanitize(raw: &str, strip_control: bool) -> String {
    if strip_control {
        raw.chars().filter(|c| !c.is_control()).collect()
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn doc_id() -> DocumentId {
        DocumentId::new("doc-1").expect("valid id")
    }

    #[test]
    fn ingest_document_strips_control_chars() {
        let doc = ingest_document("\u{0007}note\n", "no refs", &IngestConfig::default())
            .expect("ingest should succeed");
        assert_eq!(doc.id.as_str(), "note");
        assert!(doc.references.is_empty());
    }

    #[test]
    fn ingest_document_rejects_blank_id() {
        let res = ingest_document(" \u{0000} ", "body", &IngestConfig::default());
        assert!(matches!(res, Err(IngestError::InvalidDocumentId(_))));
    }

    #[test]
    fn ingest_asset_enforces_extension() {
        let cfg = IngestConfig::default();
        let res = ingest_asset(
            "payload.exe",
            &doc_id(),
            AssetContent::Inline(vec![1u8].into()),
            &cfg,
        );
        assert_eq!(res, Err(IngestError::UnsupportedExtension("exe".into())));

        let res = ingest_asset("README", &doc_id(), AssetContent::Inline(vec![1u8].into()), &cfg);
        assert!(matches!(res, Err(IngestError::UnsupportedExtension(_))));
    }

    #[test]
    fn ingest_asset_rejects_empty_inline_payload() {
        let res = ingest_asset(
            "a.png",
            &doc_id(),
            AssetContent::Inline(Vec::<u8>::new().into()),
            &IngestConfig::default(),
        );
        assert_eq!(res, Err(IngestError::EmptyAssetPayload));
    }

    #[test]
    fn ingest_asset_enforces_size_limit_for_files() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(&[7u8; 32]).expect("write");
        let cfg = IngestConfig {
            max_asset_bytes: Some(16),
            ..Default::default()
        };
        let res = ingest_asset(
            "big.png",
            &doc_id(),
            AssetContent::File(file.path().to_path_buf()),
            &cfg,
        );
        assert!(matches!(res, Err(IngestError::AssetTooLarge(_))));
    }

    #[test]
    fn ingest_asset_normalizes_path() {
        let asset = ingest_asset(
            " ./attachments\\x.PNG",
            &doc_id(),
            AssetContent::Inline(vec![1u8, 2].into()),
            &IngestConfig::default(),
        )
        .expect("ingest should succeed");
        assert_eq!(asset.path.as_str(), "attachments/x.PNG");
        assert_eq!(asset.extension().as_deref(), Some("png"));
        assert_eq!(asset.document_id, doc_id());
    }
}
