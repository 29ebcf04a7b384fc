//! Canonical selection policies.
//!
//! When several byte-identical assets are registered, exactly one becomes
//! the canonical copy. Which one is a policy decision, made explicit here as
//! a total order over [`Candidate`]s: the smallest candidate wins. Because
//! the store re-evaluates the order on every registration, the winner does
//! not depend on the order (or the thread) in which candidates arrive.
//!
//! | Policy | Order |
//! |--------|-------|
//! | [`FirstSeenPolicy`] (default) | document id, then path |
//! | [`ShortestNamePolicy`] | file name length, file name, path, document id |
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use ingest::{DocumentId, OriginalPath};
use serde::{Deserialize, Serialize};

/// The identity of one registration, as seen by a policy.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub document_id: &'a DocumentId,
    pub path: &'a OriginalPath,
}

/// Comparator deciding which duplicate is canonical.
///
/// Implementations must be a total order: two distinct candidates must
/// never compare `Equal`, or the choice would fall back to arrival order.
pub trait CanonicalPolicy: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// `Ordering::Less` means `a` is preferred over `b`.
    fn rank(&self, a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering;
}

/// First seen in sorted document order: lowest document id, then lowest path.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstSeenPolicy;

impl CanonicalPolicy for FirstSeenPolicy {
    fn name(&self) -> &'static str {
        "first_seen"
    }

    fn rank(&self, a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
        a.document_id
            .cmp(b.document_id)
            .then_with(|| a.path.cmp(b.path))
    }
}

/// Shortest file name wins, ties broken alphabetically.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortestNamePolicy;

impl CanonicalPolicy for ShortestNamePolicy {
    fn name(&self) -> &'static str {
        "shortest_name"
    }

    fn rank(&self, a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
        let (name_a, name_b) = (a.path.file_name(), b.path.file_name());
        name_a
            .len()
            .cmp(&name_b.len())
            .then_with(|| name_a.cmp(name_b))
            .then_with(|| a.path.cmp(b.path))
            .then_with(|| a.document_id.cmp(b.document_id))
    }
}

/// Serializable selector for the built-in policies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    FirstSeen,
    ShortestName,
}

impl PolicyKind {
    pub fn build(self) -> Arc<dyn CanonicalPolicy> {
        match self {
            PolicyKind::FirstSeen => Arc::new(FirstSeenPolicy),
            PolicyKind::ShortestName => Arc::new(ShortestNamePolicy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> DocumentId {
        DocumentId::new(s).expect("valid id")
    }

    #[test]
    fn first_seen_orders_by_document_then_path() {
        let (doc_a, doc_b) = (id("a"), id("b"));
        let (p1, p2) = (OriginalPath::new("z.png"), OriginalPath::new("a.png"));

        let earlier_doc = Candidate { document_id: &doc_a, path: &p1 };
        let later_doc = Candidate { document_id: &doc_b, path: &p2 };
        assert_eq!(FirstSeenPolicy.rank(&earlier_doc, &later_doc), Ordering::Less);

        let same_doc = Candidate { document_id: &doc_a, path: &p2 };
        assert_eq!(FirstSeenPolicy.rank(&same_doc, &earlier_doc), Ordering::Less);
    }

    #[test]
    fn shortest_name_matches_legacy_rule() {
        let doc = id("d");
        let short = OriginalPath::new("deep/nested/a.png");
        let long = OriginalPath::new("img_copy_1.png");
        let a = Candidate { document_id: &doc, path: &short };
        let b = Candidate { document_id: &doc, path: &long };
        assert_eq!(ShortestNamePolicy.rank(&a, &b), Ordering::Less);
        assert_eq!(ShortestNamePolicy.rank(&b, &a), Ordering::Greater);
    }

    #[test]
    fn policy_kind_round_trips_through_serde() {
        let kind: PolicyKind = serde_json::from_str("\"shortest_name\"").expect("parse");
        assert_eq!(kind, PolicyKind::ShortestName);
        assert_eq!(kind.build().name(), "shortest_name");
        assert_eq!(PolicyKind::default().build().name(), "first_seen");
    }
}
