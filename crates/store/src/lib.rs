//! Content-addressed asset store.
//!
//! [`AssetStore::register`] is the single insert-or-dedupe operation of the
//! migration:
//!
//! - an unseen fingerprint makes the asset canonical and retains its bytes
//! - a known fingerprint discards the incoming bytes and returns the
//!   existing canonical asset
//!
//! ## Concurrency
//!
//! State lives in a [`DashMap`] keyed by fingerprint. Hashing happens before
//! any lock is taken; the first-sight decision then runs under the entry's
//! shard lock, so two workers registering the same bytes can never both
//! create a canonical asset, while registrations for unrelated fingerprints
//! proceed in parallel.
//!
//! ## Determinism
//!
//! The canonical copy is whichever registered candidate ranks first under
//! the configured [`CanonicalPolicy`]. A later registration that ranks
//! earlier supersedes the current representative, so once every asset has
//! been registered the choice is independent of arrival order. Read the
//! final mapping only after registration is complete.
//!
//! ## Persistence
//!
//! Canonical bytes are held in memory until [`AssetStore::commit`] writes
//! each of them once to a [`StoreBackend`].
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fingerprint::{AssetFingerprint, ContentHasher, FingerprintError, Sha256Hasher};
use ingest::{Asset, DocumentId, OriginalPath};
use tracing::{debug, info, trace};

mod backend;
mod canonical;
mod config;
mod error;
mod policy;

pub use crate::backend::{BackendConfig, FsBackend, InMemoryBackend, StoreBackend};
pub use crate::canonical::{canonical_path, CanonicalAsset, DuplicateGroup};
pub use crate::config::StoreConfig;
pub use crate::error::StoreError;
pub use crate::policy::{
    CanonicalPolicy, Candidate, FirstSeenPolicy, PolicyKind, ShortestNamePolicy,
};

#[derive(Debug, Clone)]
struct Member {
    document_id: DocumentId,
    size: u64,
}

struct Slot {
    canonical: CanonicalAsset,
    /// Every registered path with these bytes, the canonical one included.
    members: BTreeMap<OriginalPath, Member>,
}

/// Totals returned by [`AssetStore::commit`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitStats {
    pub written: usize,
    pub already_present: usize,
    pub bytes_written: u64,
}

/// Fingerprint → canonical asset map with insert-or-dedupe registration.
pub struct AssetStore {
    slots: DashMap<AssetFingerprint, Slot>,
    hasher: Arc<dyn ContentHasher>,
    policy: Arc<dyn CanonicalPolicy>,
    config: StoreConfig,
}

impl AssetStore {
    /// Build a store with the default SHA-256 hasher.
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        Self::with_hasher(config, Arc::new(Sha256Hasher))
    }

    pub fn with_hasher(
        config: StoreConfig,
        hasher: Arc<dyn ContentHasher>,
    ) -> Result<Self, StoreError> {
        config.validate()?;
        let policy = config.policy.build();
        Ok(Self {
            slots: DashMap::new(),
            hasher,
            policy,
            config,
        })
    }

    /// Replace the canonical policy with a custom comparator.
    pub fn with_policy(mut self, policy: Arc<dyn CanonicalPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    pub fn hash_algorithm(&self) -> &'static str {
        self.hasher.algorithm()
    }

    /// Register an asset and return the canonical asset for its bytes.
    ///
    /// Idempotent: registering the same path again (or the same bytes under
    /// any path) never adds a second stored copy.
    pub fn register(&self, asset: Asset) -> Result<CanonicalAsset, StoreError> {
        let bytes = asset
            .content
            .read()
            .map_err(|e| StoreError::HashComputation {
                path: asset.path.clone(),
                source: FingerprintError::from(e),
            })?;
        let fingerprint =
            self.hasher
                .fingerprint(&bytes)
                .map_err(|source| StoreError::HashComputation {
                    path: asset.path.clone(),
                    source,
                })?;

        let member = Member {
            document_id: asset.document_id.clone(),
            size: bytes.len() as u64,
        };

        match self.slots.entry(fingerprint) {
            Entry::Vacant(vacant) => {
                let canonical = self.make_canonical(fingerprint, &asset, bytes);
                trace!(
                    fingerprint = %fingerprint.short(12),
                    path = %asset.path,
                    canonical_path = %canonical.path,
                    "asset_retained"
                );
                let mut members = BTreeMap::new();
                members.insert(asset.path.clone(), member);
                vacant.insert(Slot {
                    canonical: canonical.clone(),
                    members,
                });
                Ok(canonical)
            }
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                if self.config.verify_bytes && slot.canonical.bytes != bytes {
                    return Err(StoreError::CollisionAnomaly {
                        fingerprint,
                        existing: slot.canonical.source.clone(),
                        incoming: asset.path.clone(),
                    });
                }
                slot.members.insert(asset.path.clone(), member);

                let incoming = Candidate {
                    document_id: &asset.document_id,
                    path: &asset.path,
                };
                if self.policy.rank(&incoming, &slot.canonical.candidate()) == Ordering::Less {
                    debug!(
                        fingerprint = %fingerprint.short(12),
                        previous = %slot.canonical.source,
                        path = %asset.path,
                        "canonical_superseded"
                    );
                    slot.canonical = self.make_canonical(fingerprint, &asset, bytes);
                } else {
                    trace!(
                        fingerprint = %fingerprint.short(12),
                        path = %asset.path,
                        canonical = %slot.canonical.source,
                        "asset_discarded"
                    );
                }
                Ok(slot.canonical.clone())
            }
        }
    }

    fn make_canonical(
        &self,
        fingerprint: AssetFingerprint,
        asset: &Asset,
        bytes: Bytes,
    ) -> CanonicalAsset {
        let ext = asset.extension();
        CanonicalAsset {
            fingerprint,
            path: canonical_path(&fingerprint, ext.as_deref(), &self.config.canonical_dir),
            source: asset.path.clone(),
            document_id: asset.document_id.clone(),
            bytes,
        }
    }

    pub fn canonical(&self, fingerprint: &AssetFingerprint) -> Option<CanonicalAsset> {
        self.slots.get(fingerprint).map(|slot| slot.canonical.clone())
    }

    /// Copy of the full fingerprint → canonical mapping.
    pub fn snapshot(&self) -> HashMap<AssetFingerprint, CanonicalAsset> {
        self.slots
            .iter()
            .map(|entry| (*entry.key(), entry.value().canonical.clone()))
            .collect()
    }

    /// Canonical assets sorted by storage path.
    pub fn canonical_assets(&self) -> Vec<CanonicalAsset> {
        let mut assets: Vec<CanonicalAsset> =
            self.slots.iter().map(|e| e.value().canonical.clone()).collect();
        assets.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.fingerprint.cmp(&b.fingerprint)));
        assets
    }

    /// Number of distinct fingerprints (= retained copies).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of distinct registered paths across all fingerprints.
    pub fn member_count(&self) -> usize {
        self.slots.iter().map(|e| e.value().members.len()).sum()
    }

    /// Sum of the sizes of every registered asset that was not retained.
    pub fn bytes_saved(&self) -> u64 {
        self.slots
            .iter()
            .map(|e| {
                let slot = e.value();
                let total: u64 = slot.members.values().map(|m| m.size).sum();
                total.saturating_sub(slot.canonical.size())
            })
            .sum()
    }

    /// Fingerprints registered under more than one path, sorted by
    /// fingerprint.
    pub fn duplicate_groups(&self) -> Vec<DuplicateGroup> {
        let mut groups: Vec<DuplicateGroup> = self
            .slots
            .iter()
            .filter(|e| e.value().members.len() > 1)
            .map(|e| {
                let slot = e.value();
                let duplicates: Vec<OriginalPath> = slot
                    .members
                    .keys()
                    .filter(|p| **p != slot.canonical.source)
                    .cloned()
                    .collect();
                let wasted_bytes = slot
                    .members
                    .iter()
                    .filter(|(p, _)| **p != slot.canonical.source)
                    .map(|(_, m)| m.size)
                    .sum();
                DuplicateGroup {
                    fingerprint: *e.key(),
                    canonical_path: slot.canonical.path.clone(),
                    canonical_source: slot.canonical.source.clone(),
                    duplicates,
                    size: slot.canonical.size(),
                    wasted_bytes,
                }
            })
            .collect();
        groups.sort_by(|a, b| a.fingerprint.cmp(&b.fingerprint));
        groups
    }

    /// Document ids that registered a given fingerprint, sorted.
    pub fn contributors(&self, fingerprint: &AssetFingerprint) -> Vec<DocumentId> {
        let mut ids: Vec<DocumentId> = self
            .slots
            .get(fingerprint)
            .map(|slot| slot.members.values().map(|m| m.document_id.clone()).collect())
            .unwrap_or_default();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Persist every canonical asset once, in canonical path order.
    pub fn commit(&self, backend: &dyn StoreBackend) -> Result<CommitStats, StoreError> {
        let mut stats = CommitStats::default();
        for canonical in self.canonical_assets() {
            if backend.contains(&canonical.path)? {
                stats.already_present += 1;
                continue;
            }
            backend.put(&canonical.path, &canonical.bytes)?;
            stats.written += 1;
            stats.bytes_written += canonical.size();
        }
        backend.flush()?;
        info!(
            written = stats.written,
            already_present = stats.already_present,
            bytes_written = stats.bytes_written,
            "store_commit_complete"
        );
        Ok(stats)
    }
}

impl fmt::Debug for AssetStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetStore")
            .field("canonical_assets", &self.slots.len())
            .field("hasher", &self.hasher.algorithm())
            .field("policy", &self.policy.name())
            .field("config", &self.config)
            .finish()
    }
}
