//! Asset reference scanning.
//!
//! Finds the three embed syntaxes a converted note can contain and records
//! the byte span of the path text in each:
//!
//! ```text
//! ![[attachments/a.png|300]]        Wikilink   span = "attachments/a.png"
//! ![diagram](img/b.png "title")     Markdown   span = "img/b.png"
//! ![x](<my file.png>)               Markdown   span = "my file.png"
//! ![x](my file.png)                 Markdown   span = "my file.png"
//! <img src="c.gif" width="10">      Html       span = "c.gif"
//! ```
//!
//! External targets (URLs, data URIs) are not assets and are skipped.
use once_cell::sync::Lazy;
use regex::{Match, Regex};

use crate::types::{AssetReference, OriginalPath, ReferenceKind};

static WIKILINK_EMBED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!\[\[([^\]|#\n]+)(?:[|#][^\]\n]*)?\]\]").expect("wikilink embed pattern")
});

static MARKDOWN_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"!\[[^\]\n]*\]\(\s*(?:<([^>\n]+)>|([^)\n]+?))(?:\s+(?:"[^"\n]*"|'[^'\n]*'))?\s*\)"#,
    )
    .expect("markdown image pattern")
});

static HTML_IMG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*?\bsrc\s*=\s*["']([^"'\n>]+)["']"#).expect("html img pattern")
});

const EXTERNAL_PREFIXES: [&str; 4] = ["http:", "https:", "data:", "mailto:"];

/// Scan a body for asset references, sorted by position.
///
/// ```rust
/// use ingest::{scan_references, ReferenceKind};
///
/// let body = "See ![[a.png]] and ![chart](b.png) but not ![](https://x.io/c.png)";
/// let refs = scan_references(body);
/// assert_eq!(refs.len(), 2);
/// assert_eq!(refs[0].kind, ReferenceKind::Wikilink);
/// assert_eq!(refs[1].written(body), "b.png");
/// ```
pub fn scan_references(body: &str) -> Vec<AssetReference> {
    let mut found = Vec::new();

    for caps in WIKILINK_EMBED.captures_iter(body) {
        if let Some(m) = caps.get(1) {
            push_reference(&mut found, body, m, ReferenceKind::Wikilink);
        }
    }
    for caps in MARKDOWN_IMAGE.captures_iter(body) {
        if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
            push_reference(&mut found, body, m, ReferenceKind::Markdown);
        }
    }
    for caps in HTML_IMG.captures_iter(body) {
        if let Some(m) = caps.get(1) {
            push_reference(&mut found, body, m, ReferenceKind::Html);
        }
    }

    found.sort_by_key(|r| (r.span.start, r.span.end));

    // Patterns are disjoint in practice; keep the first of any overlap.
    let mut result: Vec<AssetReference> = Vec::with_capacity(found.len());
    for reference in found {
        match result.last() {
            Some(prev) if reference.span.start < prev.span.end => {}
            _ => result.push(reference),
        }
    }
    result
}

/// True for targets that point outside the vault.
pub fn is_external_target(target: &str) -> bool {
    let lower = target.trim_start().to_ascii_lowercase();
    EXTERNAL_PREFIXES.iter().any(|p| lower.starts_with(p)) || lower.contains("://")
}

fn push_reference(found: &mut Vec<AssetReference>, body: &str, m: Match<'_>, kind: ReferenceKind) {
    let raw = m.as_str();
    let leading = raw.len() - raw.trim_start().len();
    let trailing = raw.len() - raw.trim_end().len();
    let start = m.start() + leading;
    let end = m.end() - trailing;
    if start >= end {
        return;
    }
    let written = &body[start..end];
    if is_external_target(written) {
        return;
    }
    found.push(AssetReference {
        original_path: OriginalPath::new(written),
        span: start..end,
        kind,
    });
}
