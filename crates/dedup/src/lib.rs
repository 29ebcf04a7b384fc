//! # Asset deduplication optimizer
//!
//! Orchestrates the content-addressed store and the reference rewriter over
//! a whole batch of migrated notes.
//!
//! ```text
//! documents + assets_by_path
//!        │
//!        ▼
//!  collection pass   (rayon over distinct paths)
//!   AssetStore::register → path → fingerprint
//!        │
//!   ─────┼───── barrier: every registration finished
//!        ▼
//!  rewrite pass      (rayon over documents)
//!   ReferenceRewriter::rewrite → canonical paths
//!        │
//!        ▼
//! (rewritten documents, DedupReport)
//! ```
//!
//! ## Failure policy
//!
//! | Problem | Effect |
//! |---------|--------|
//! | Asset cannot be hashed | Recorded in the report, its references become unresolved |
//! | Reference to an unknown path | Recorded, the rest of the document is still rewritten |
//! | More unresolved references than `unresolved_tolerance` | [`DedupError::ToleranceExceeded`] |
//! | Same digest, different bytes | [`DedupError::CollisionAnomaly`] |
//!
//! ## Example
//!
//! ```
//! use std::collections::HashMap;
//! use dedup::{DedupConfig, DeduplicationOptimizer};
//! use ingest::{Asset, Document, DocumentId, OriginalPath};
//! use store::{AssetStore, StoreConfig};
//!
//! let a = DocumentId::new("a").unwrap();
//! let b = DocumentId::new("b").unwrap();
//! let docs = vec![
//!     Document::parse(a.clone(), "![[img1.png]]"),
//!     Document::parse(b.clone(), "![[img2.png]]"),
//! ];
//! let assets = HashMap::from([
//!     (OriginalPath::new("img1.png"), Asset::new("img1.png", a, b"px".to_vec())),
//!     (OriginalPath::new("img2.png"), Asset::new("img2.png", b, b"px".to_vec())),
//! ]);
//!
//! let store = AssetStore::new(StoreConfig::default()).unwrap();
//! let optimizer = DeduplicationOptimizer::new(DedupConfig::default()).unwrap();
//! let (docs, report) = optimizer.optimize(&store, docs, &assets).unwrap();
//!
//! assert_eq!(report.canonical_assets, 1);
//! assert_eq!(docs[0].body, docs[1].body);
//! ```

mod config;
mod error;
mod metrics;
mod optimizer;
mod report;

pub use crate::config::DedupConfig;
pub use crate::error::DedupError;
pub use crate::metrics::DedupMetrics;
pub use crate::optimizer::DeduplicationOptimizer;
pub use crate::report::{render_duplicate_report, AssetError, AssetErrorKind, DedupReport};
