//! Reference rewriting for deduplicated assets.
//!
//! After the asset store has settled on one canonical copy per fingerprint,
//! every note still points at the attachment under whatever name it had in
//! the source archive. [`ReferenceRewriter`] swaps each of those paths for
//! the canonical storage path:
//!
//! ```text
//! Diagram: ![[img2.png|300]]
//!             ^^^^^^^^           original_path → fingerprint → canonical
//! Diagram: ![[attachments/9f86d0…0a08.png|300]]
//! ```
//!
//! Two lookups drive the rewrite, both built by the collection pass:
//! original path → fingerprint and fingerprint → canonical asset.
//!
//! A reference that cannot be resolved is left exactly as written and
//! reported as an [`UnresolvedReferenceError`]; it is never dropped.
//!
//! ```
//! use std::collections::HashMap;
//! use ingest::{Asset, Document, DocumentId, OriginalPath};
//! use rewrite::ReferenceRewriter;
//! use store::{AssetStore, StoreConfig};
//!
//! let store = AssetStore::new(StoreConfig::default()).unwrap();
//! let id = DocumentId::new("note").unwrap();
//! let canonical = store.register(Asset::new("a.png", id.clone(), b"px".to_vec())).unwrap();
//!
//! let fingerprint_of = HashMap::from([(OriginalPath::new("a.png"), canonical.fingerprint)]);
//! let doc = Document::parse(id, "see ![[a.png]]");
//! let out = ReferenceRewriter::new()
//!     .rewrite(doc, &fingerprint_of, &store.snapshot())
//!     .unwrap();
//! assert_eq!(out.body, format!("see ![[{}]]", canonical.path));
//! ```

mod error;
mod rewriter;

pub use crate::error::{PartialRewrite, UnresolvedReason, UnresolvedReferenceError};
pub use crate::rewriter::{ReferenceRewriter, RewriteStats};

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use fingerprint::AssetFingerprint;
    use ingest::{Asset, AssetReference, Document, DocumentId, OriginalPath, ReferenceKind};
    use store::{AssetStore, CanonicalAsset, StoreConfig};

    use super::*;

    struct Fixture {
        fingerprint_of: HashMap<OriginalPath, AssetFingerprint>,
        canonical_of: HashMap<AssetFingerprint, CanonicalAsset>,
    }

    fn id(s: &str) -> DocumentId {
        DocumentId::new(s).expect("valid id")
    }

    fn fixture(assets: &[(&str, &[u8])]) -> Fixture {
        let store = AssetStore::new(StoreConfig::default()).expect("store");
        let mut fingerprint_of = HashMap::new();
        for (path, bytes) in assets {
            let canonical = store
                .register(Asset::new(*path, id("owner"), bytes.to_vec()))
                .expect("register");
            fingerprint_of.insert(OriginalPath::new(path), canonical.fingerprint);
        }
        Fixture {
            fingerprint_of,
            canonical_of: store.snapshot(),
        }
    }

    fn canonical_for(fx: &Fixture, path: &str) -> String {
        let fp = fx.fingerprint_of[&OriginalPath::new(path)];
        fx.canonical_of[&fp].path.clone()
    }

    #[test]
    fn duplicates_converge_on_one_canonical_path() {
        let fx = fixture(&[("img1.png", b"same"), ("img2.png", b"same"), ("img3.png", b"other")]);
        let rewriter = ReferenceRewriter::new();

        let a = rewriter
            .rewrite(Document::parse(id("a"), "![[img1.png]]"), &fx.fingerprint_of, &fx.canonical_of)
            .expect("doc a");
        let b = rewriter
            .rewrite(Document::parse(id("b"), "![](img2.png)"), &fx.fingerprint_of, &fx.canonical_of)
            .expect("doc b");
        let c = rewriter
            .rewrite(Document::parse(id("c"), "<img src=\"img3.png\">"), &fx.fingerprint_of, &fx.canonical_of)
            .expect("doc c");

        let shared = canonical_for(&fx, "img1.png");
        assert_eq!(a.body, format!("![[{shared}]]"));
        assert_eq!(b.body, format!("![]({shared})"));
        assert_eq!(c.body, format!("<img src=\"{}\">", canonical_for(&fx, "img3.png")));
        assert_ne!(shared, canonical_for(&fx, "img3.png"));
    }

    #[test]
    fn surrounding_text_is_byte_identical() {
        let fx = fixture(&[("pic.png", b"pixels")]);
        let body = "héllo ![[pic.png|320]]\n\n  ünïcode ✓ ![cap](pic.png \"t\") tail\r\n";
        let out = ReferenceRewriter::new()
            .rewrite(Document::parse(id("n"), body), &fx.fingerprint_of, &fx.canonical_of)
            .expect("rewrite");

        let canonical = canonical_for(&fx, "pic.png");
        let restored = out.body.replace(&canonical, "pic.png");
        assert_eq!(restored, body);
        assert_eq!(out.body.matches(&canonical).count(), 2);
    }

    #[test]
    fn repeated_reference_rewritten_identically() {
        let fx = fixture(&[("x.gif", b"gif")]);
        let out = ReferenceRewriter::new()
            .rewrite(
                Document::parse(id("n"), "![[x.gif]] and again ![[x.gif]] and ![](x.gif)"),
                &fx.fingerprint_of,
                &fx.canonical_of,
            )
            .expect("rewrite");

        let canonical = canonical_for(&fx, "x.gif");
        assert_eq!(out.references.len(), 3);
        for reference in &out.references {
            assert_eq!(reference.written(&out.body), canonical);
            assert_eq!(reference.original_path.as_str(), canonical);
        }
    }

    #[test]
    fn missing_asset_reported_and_others_rewritten() {
        let fx = fixture(&[("ok.png", b"ok")]);
        let body = "![[missing.png]] then ![[ok.png]]";
        let err = ReferenceRewriter::new()
            .rewrite(Document::parse(id("n"), body), &fx.fingerprint_of, &fx.canonical_of)
            .expect_err("missing.png is unresolved");

        assert_eq!(err.unresolved.len(), 1);
        let unresolved = &err.unresolved[0];
        assert_eq!(unresolved.original_path.as_str(), "missing.png");
        assert_eq!(unresolved.offset, 3);
        assert_eq!(unresolved.reason, UnresolvedReason::MissingAsset);

        let (document, _) = err.into_parts();
        assert_eq!(
            document.body,
            format!("![[missing.png]] then ![[{}]]", canonical_for(&fx, "ok.png"))
        );
        assert_eq!(document.references[0].written(&document.body), "missing.png");
    }

    #[test]
    fn failed_assets_have_their_own_reason() {
        let fx = fixture(&[]);
        let err = ReferenceRewriter::new()
            .with_failed_assets([OriginalPath::new("corrupt.png")])
            .rewrite(
                Document::parse(id("n"), "![[corrupt.png]]"),
                &fx.fingerprint_of,
                &fx.canonical_of,
            )
            .expect_err("unresolved");
        assert_eq!(err.unresolved[0].reason, UnresolvedReason::AssetFailed);
    }

    #[test]
    fn fingerprint_without_canonical_is_reported() {
        let mut fx = fixture(&[("a.png", b"a")]);
        fx.canonical_of.clear();
        let err = ReferenceRewriter::new()
            .rewrite(Document::parse(id("n"), "![[a.png]]"), &fx.fingerprint_of, &fx.canonical_of)
            .expect_err("unresolved");
        assert_eq!(err.unresolved[0].reason, UnresolvedReason::MissingCanonical);
    }

    #[test]
    fn rekeyed_reference_uses_lookup_key_not_written_text() {
        let fx = fixture(&[("attachments/deep/photo.jpg", b"jpeg")]);
        let body = "![[photo.jpg]]";
        let doc = Document::with_references(
            id("n"),
            body,
            vec![AssetReference {
                original_path: OriginalPath::new("attachments/deep/photo.jpg"),
                span: 3..12,
                kind: ReferenceKind::Wikilink,
            }],
        )
        .expect("valid span");

        let out = ReferenceRewriter::new()
            .rewrite(doc, &fx.fingerprint_of, &fx.canonical_of)
            .expect("rewrite");
        assert_eq!(
            out.body,
            format!("![[{}]]", canonical_for(&fx, "attachments/deep/photo.jpg"))
        );
    }

    #[test]
    fn document_without_references_is_unchanged() {
        let fx = fixture(&[]);
        let body = "plain text, [a link](page.md) and ![](https://example.com/x.png)";
        let (out, unresolved, stats) = ReferenceRewriter::new().rewrite_with_stats(
            Document::parse(id("n"), body),
            &fx.fingerprint_of,
            &fx.canonical_of,
        );
        assert_eq!(out.body, body);
        assert!(unresolved.is_empty());
        assert_eq!(stats, RewriteStats::default());
    }
}
