//! Run report and its text renderings.
use std::fmt::Write as _;

use ingest::{DocumentId, OriginalPath};
use rewrite::UnresolvedReferenceError;
use serde::Serialize;
use store::DuplicateGroup;

/// Category of a per-asset failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetErrorKind {
    /// Bytes unreadable or empty. The asset is skipped.
    HashComputation,
    /// Same digest, different bytes. Aborts the run.
    CollisionAnomaly,
}

/// One asset that could not be registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AssetError {
    pub path: OriginalPath,
    pub document_id: DocumentId,
    pub kind: AssetErrorKind,
    pub message: String,
}

/// Outcome of one optimizer run.
///
/// Contains no timestamps or durations and every list is sorted, so the
/// same input always produces an identical report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DedupReport {
    pub hash_algorithm: String,
    pub canonical_policy: String,
    pub documents: usize,
    /// Documents in which at least one reference was rewritten.
    pub documents_rewritten: usize,
    /// Distinct referenced paths with a supplied asset, including those
    /// that failed to register.
    pub assets_seen: usize,
    /// Distinct fingerprints retained.
    pub canonical_assets: usize,
    pub duplicates_discarded: usize,
    /// Sum of the sizes of discarded assets.
    pub bytes_saved: u64,
    pub references_total: usize,
    pub references_rewritten: usize,
    pub unresolved: Vec<UnresolvedReferenceError>,
    pub asset_errors: Vec<AssetError>,
    pub duplicate_groups: Vec<DuplicateGroup>,
}

impl DedupReport {
    pub fn has_collisions(&self) -> bool {
        self.asset_errors
            .iter()
            .any(|e| e.kind == AssetErrorKind::CollisionAnomaly)
    }

    /// Short command-line summary.
    pub fn render_summary(&self) -> String {
        let rule = "=".repeat(50);
        let mut out = String::new();
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "ASSET DEDUPLICATION SUMMARY");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(
            out,
            "Documents:          {} ({} rewritten)",
            self.documents, self.documents_rewritten
        );
        let _ = writeln!(out, "Assets seen:        {}", self.assets_seen);
        let _ = writeln!(out, "Canonical assets:   {}", self.canonical_assets);
        let _ = writeln!(out, "Duplicates removed: {}", self.duplicates_discarded);
        let _ = writeln!(out, "Space saved:        {}", format_mb(self.bytes_saved));
        let _ = writeln!(
            out,
            "References:         {} rewritten / {} total",
            self.references_rewritten, self.references_total
        );
        let _ = writeln!(out, "Unresolved:         {}", self.unresolved.len());
        let _ = writeln!(out, "Asset errors:       {}", self.asset_errors.len());
        let _ = write!(out, "{rule}");
        out
    }

    /// Every accumulated error, one per line.
    pub fn render_errors(&self) -> String {
        let mut out = String::new();
        for err in &self.asset_errors {
            let _ = writeln!(out, "  asset {} ({}): {}", err.path, err.document_id, err.message);
        }
        for err in &self.unresolved {
            let _ = writeln!(out, "  {err}");
        }
        out
    }
}

/// Human-readable duplicate report, as produced by a dry run.
///
/// ```
/// use dedup::render_duplicate_report;
///
/// let text = render_duplicate_report(&[]);
/// assert!(text.contains("Duplicate groups found: 0"));
/// ```
pub fn render_duplicate_report(groups: &[DuplicateGroup]) -> String {
    let rule = "=".repeat(60);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "DUPLICATE ASSETS REPORT");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Duplicate groups found: {}", groups.len());
    let _ = writeln!(out);

    let mut total_wasted = 0u64;
    for (i, group) in groups.iter().enumerate() {
        total_wasted += group.wasted_bytes;
        let _ = writeln!(out, "Group {}:", i + 1);
        let _ = writeln!(out, "  Canonical: {} -> {}", group.canonical_source, group.canonical_path);
        let _ = writeln!(out, "  Duplicates ({}):", group.duplicates.len());
        for dup in &group.duplicates {
            let _ = writeln!(out, "    - {} ({})", dup, format_kb(group.size));
        }
        let _ = writeln!(out, "  Wasted space: {}", format_kb(group.wasted_bytes));
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Total wasted space: {}", format_mb(total_wasted));
    let _ = write!(out, "{rule}");
    out
}

fn format_kb(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

fn format_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}
