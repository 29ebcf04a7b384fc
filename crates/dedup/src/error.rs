use thiserror::Error;

use crate::report::DedupReport;

/// Whole-run failures of the optimizer.
///
/// Per-asset and per-reference problems never show up here on their own;
/// they are accumulated in the [`DedupReport`]. The fatal variants carry
/// that report, and their message lists every accumulated error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DedupError {
    #[error(
        "{} unresolved reference(s) exceed tolerance of {tolerance}\n{}",
        .report.unresolved.len(),
        .report.render_errors()
    )]
    ToleranceExceeded {
        tolerance: usize,
        report: Box<DedupReport>,
    },

    #[error("fingerprint collision detected, run aborted\n{}", .report.render_errors())]
    CollisionAnomaly { report: Box<DedupReport> },

    #[error("invalid dedup configuration: {0}")]
    InvalidConfig(String),
}

impl DedupError {
    /// The accumulated report, for the variants that carry one.
    pub fn report(&self) -> Option<&DedupReport> {
        match self {
            DedupError::ToleranceExceeded { report, .. }
            | DedupError::CollisionAnomaly { report } => Some(report),
            DedupError::InvalidConfig(_) => None,
        }
    }
}
