use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use fingerprint::AssetFingerprint;
use ingest::{Asset, Document, OriginalPath};
use rayon::prelude::*;
use rewrite::{ReferenceRewriter, RewriteStats, UnresolvedReferenceError};
use store::{AssetStore, CanonicalAsset, DuplicateGroup, StoreError};
use tracing::{debug, info, warn, Level};

use crate::config::DedupConfig;
use crate::error::DedupError;
use crate::metrics::{DedupMetrics, MetricsSpan};
use crate::report::{AssetError, AssetErrorKind, DedupReport};


/// Result of the collection pass.
#[derive(Debug, Default)]
struct Collection {
    fingerprint_of: HashMap<OriginalPath, AssetFingerprint>,
    failed: Vec<OriginalPath>,
    asset_errors: Vec<AssetError>,
    registered: usize,
}

/// Two-pass deduplication over a batch of documents.
///
/// 1. **Collection**: every distinct referenced path is registered with the
///    [`AssetStore`], producing `path → fingerprint`.
/// 2. **Rewrite**: once every registration has finished, each document is
///    rewritten against `path → fingerprint` and the store's final
///    `fingerprint → canonical` snapshot.
///
/// The barrier between the passes matters: a document rewritten before the
/// last registration could point at a canonical asset that a later,
/// earlier-ranking duplicate then supersedes.
#[derive(Clone, Default)]
pub struct DeduplicationOptimizer {
    config: DedupConfig,
    metrics: Option<Arc<dyn DedupMetrics>>,
}

impl DeduplicationOptimizer {
    pub fn new(config: DedupConfig) -> Result<Self, DedupError> {
        config.validate()?;
        Ok(Self {
            config,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn DedupMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Deduplicate the assets referenced by `documents` and rewrite every
    /// reference to its canonical path.
    ///
    /// Documents come back in input order. Fails only on a fingerprint
    /// collision or when more references stay unresolved than the
    /// configured tolerance allows.
    pub fn optimize(
        &self,
        store: &AssetStore,
        documents: Vec<Document>,
        assets_by_path: &HashMap<OriginalPath, Asset>,
    ) -> Result<(Vec<Document>, DedupReport), DedupError> {
        let span = tracing::span!(
            Level::INFO,
            "dedup.optimize",
            documents = documents.len(),
            parallel = self.config.parallel
        );
        let _guard = span.enter();

        let collection = self.collect(store, &documents, assets_by_path);
        let mut report = DedupReport {
            hash_algorithm: store.hash_algorithm().to_string(),
            canonical_policy: store.policy_name().to_string(),
            documents: documents.len(),
            assets_seen: collection.registered + collection.failed.len(),
            canonical_assets: store.len(),
            duplicates_discarded: collection.registered.saturating_sub(store.len()),
            bytes_saved: store.bytes_saved(),
            asset_errors: collection.asset_errors.clone(),
            duplicate_groups: store.duplicate_groups(),
            ..Default::default()
        };

        if report.has_collisions() {
            warn!(
                collisions = report
                    .asset_errors
                    .iter()
                    .filter(|e| e.kind == AssetErrorKind::CollisionAnomaly)
                    .count(),
                "dedup_aborted_collision"
            );
            return Err(DedupError::CollisionAnomaly {
                report: Box::new(report),
            });
        }

        // Barrier: the snapshot is taken only after every registration.
        let canonical_of = store.snapshot();
        let rewritten = self.rewrite_all(documents, &collection, &canonical_of);

        let mut output = Vec::with_capacity(rewritten.len());
        for (document, unresolved, stats) in rewritten {
            report.references_total += stats.references;
            report.references_rewritten += stats.rewritten;
            if stats.rewritten > 0 {
                report.documents_rewritten += 1;
            }
            report.unresolved.extend(unresolved);
            output.push(document);
        }
        report.unresolved.sort();

        if report.unresolved.len() > self.config.unresolved_tolerance {
            warn!(
                unresolved = report.unresolved.len(),
                tolerance = self.config.unresolved_tolerance,
                "dedup_aborted_unresolved"
            );
            return Err(DedupError::ToleranceExceeded {
                tolerance: self.config.unresolved_tolerance,
                report: Box::new(report),
            });
        }

        info!(
            documents = report.documents,
            assets_seen = report.assets_seen,
            canonical_assets = report.canonical_assets,
            bytes_saved = report.bytes_saved,
            unresolved = report.unresolved.len(),
            "dedup_complete"
        );
        Ok((output, report))
    }

    /// Dry run: register the referenced assets and report duplicate groups
    /// without rewriting anything.
    pub fn analyze(
        &self,
        store: &AssetStore,
        documents: &[Document],
        assets_by_path: &HashMap<OriginalPath, Asset>,
    ) -> Result<Vec<DuplicateGroup>, DedupError> {
        let collection = self.collect(store, documents, assets_by_path);
        let groups = store.duplicate_groups();
        if collection
            .asset_errors
            .iter()
            .any(|e| e.kind == AssetErrorKind::CollisionAnomaly)
        {
            let report = DedupReport {
                hash_algorithm: store.hash_algorithm().to_string(),
                canonical_policy: store.policy_name().to_string(),
                documents: documents.len(),
                assets_seen: collection.registered + collection.failed.len(),
                asset_errors: collection.asset_errors,
                duplicate_groups: groups,
                ..Default::default()
            };
            return Err(DedupError::CollisionAnomaly {
                report: Box::new(report),
            });
        }
        Ok(groups)
    }

    fn collect(
        &self,
        store: &AssetStore,
        documents: &[Document],
        assets_by_path: &HashMap<OriginalPath, Asset>,
    ) -> Collection {
        let metrics = MetricsSpan::start(self.metrics.as_ref());
        let start = Instant::now();

        let work = registration_order(documents, assets_by_path);
        let results: Vec<(&OriginalPath, &Asset, Result<CanonicalAsset, StoreError>)> =
            if self.config.parallel {
                work.par_iter()
                    .map(|&(key, asset)| (key, asset, store.register(asset.clone())))
                    .collect()
            } else {
                work.iter()
                    .map(|&(key, asset)| (key, asset, store.register(asset.clone())))
                    .collect()
            };

        let mut collection = Collection::default();
        for (key, asset, result) in results {
            match result {
                Ok(canonical) => {
                    collection
                        .fingerprint_of
                        .insert(key.clone(), canonical.fingerprint);
                    collection.registered += 1;
                }
                Err(err) => {
                    let kind = match err {
                        StoreError::CollisionAnomaly { .. } => AssetErrorKind::CollisionAnomaly,
                        _ => AssetErrorKind::HashComputation,
                    };
                    warn!(path = %key, error = %err, "asset_registration_failed");
                    collection.failed.push(key.clone());
                    collection.asset_errors.push(AssetError {
                        path: key.clone(),
                        document_id: asset.document_id.clone(),
                        kind,
                        message: err.to_string(),
                    });
                }
            }
        }
        collection.asset_errors.sort();

        debug!(
            paths = work.len(),
            registered = collection.registered,
            failed = collection.failed.len(),
            canonical_assets = store.len(),
            elapsed_micros = start.elapsed().as_micros(),
            "collection_pass_complete"
        );
        if let Some(span) = metrics {
            span.record_collection(collection.registered, collection.failed.len());
        }
        collection
    }

    fn rewrite_all(
        &self,
        documents: Vec<Document>,
        collection: &Collection,
        canonical_of: &HashMap<AssetFingerprint, CanonicalAsset>,
    ) -> Vec<(Document, Vec<UnresolvedReferenceError>, RewriteStats)> {
        let metrics = MetricsSpan::start(self.metrics.as_ref());
        let start = Instant::now();
        let rewriter = ReferenceRewriter::new().with_failed_assets(collection.failed.iter().cloned());
        let document_count = documents.len();

        let rewrite_one = |document: Document| {
            rewriter.rewrite_with_stats(document, &collection.fingerprint_of, canonical_of)
        };
        let results: Vec<_> = if self.config.parallel {
            documents.into_par_iter().map(rewrite_one).collect()
        } else {
            documents.into_iter().map(rewrite_one).collect()
        };

        let unresolved: usize = results.iter().map(|(_, u, _)| u.len()).sum();
        debug!(
            documents = document_count,
            unresolved,
            elapsed_micros = start.elapsed().as_micros(),
            "rewrite_pass_complete"
        );
        if let Some(span) = metrics {
            span.record_rewrite(document_count, unresolved);
        }
        results
    }
}

impl std::fmt::Debug for DeduplicationOptimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeduplicationOptimizer")
            .field("config", &self.config)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

/// Distinct referenced paths with a supplied asset, ordered by the smallest
/// referencing document id and then by path.
///
/// Paths with no supplied asset are left out; the rewrite pass reports them.
fn registration_order<'a>(
    documents: &[Document],
    assets_by_path: &'a HashMap<OriginalPath, Asset>,
) -> Vec<(&'a OriginalPath, &'a Asset)> {
    let mut first_seen: BTreeMap<&OriginalPath, &Document> = BTreeMap::new();
    for document in documents {
        for path in document.referenced_paths() {
            first_seen
                .entry(path)
                .and_modify(|doc| {
                    if document.id < doc.id {
                        *doc = document;
                    }
                })
                .or_insert(document);
        }
    }

    let mut ordered: Vec<(&Document, &'a OriginalPath, &'a Asset)> = first_seen
        .into_iter()
        .filter_map(|(path, doc)| {
            assets_by_path
                .get_key_value(path)
                .map(|(key, asset)| (doc, key, asset))
        })
        .collect();
    ordered.sort_by(|(da, ka, _), (db, kb, _)| da.id.cmp(&db.id).then_with(|| ka.cmp(kb)));
    ordered
        .into_iter()
        .map(|(_, key, asset)| (key, asset))
        .collect()
}
