//! Workspace umbrella crate for the Omni-Parser note migration.
//!
//! Converted notes reference their attachments under whatever names the
//! source archive used, and the same image is frequently exported many
//! times. This crate stitches the workspace together so one call migrates a
//! directory of converted notes into a vault where every distinct attachment
//! is stored once, under a content-addressed path, and every note links to
//! that copy.
//!
//! ```text
//! load_vault ─► DeduplicationOptimizer::optimize ─► AssetStore::commit ─► write_vault
//! ```

pub mod config;
pub mod vault;

pub use dedup::{
    render_duplicate_report, AssetError, AssetErrorKind, DedupConfig, DedupError, DedupMetrics,
    DedupReport, DeduplicationOptimizer,
};
pub use fingerprint::{
    fingerprint, fingerprint_reader, AssetFingerprint, ContentHasher, FingerprintError,
    Sha256Hasher,
};
pub use ingest::{
    ingest_asset, ingest_document, scan_references, Asset, AssetContent, AssetReference,
    Document, DocumentId, IngestConfig, IngestError, OriginalPath, ReferenceKind,
};
pub use rewrite::{PartialRewrite, ReferenceRewriter, UnresolvedReason, UnresolvedReferenceError};
pub use store::{
    canonical_path, AssetStore, BackendConfig, CanonicalAsset, CanonicalPolicy, CommitStats,
    DuplicateGroup, FirstSeenPolicy, FsBackend, InMemoryBackend, PolicyKind, ShortestNamePolicy,
    StoreBackend, StoreConfig, StoreError,
};

pub use crate::config::{ConfigLoadError, LogFormat, OmniConfig};
pub use crate::vault::{load_vault, write_vault, LoadedVault, RejectedAsset, VaultError};

use std::error::Error;
use std::fmt;
use std::time::Instant;

use tracing::info;

/// Errors that can abort a migration run.
#[derive(Debug)]
pub enum MigrationError {
    Config(ConfigLoadError),
    Vault(VaultError),
    Store(StoreError),
    Dedup(DedupError),
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationError::Config(err) => write!(f, "configuration failure: {err}"),
            MigrationError::Vault(err) => write!(f, "vault i/o failure: {err}"),
            MigrationError::Store(err) => write!(f, "asset store failure: {err}"),
            MigrationError::Dedup(err) => write!(f, "deduplication failure: {err}"),
        }
    }
}

impl Error for MigrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MigrationError::Config(err) => Some(err),
            MigrationError::Vault(err) => Some(err),
            MigrationError::Store(err) => Some(err),
            MigrationError::Dedup(err) => Some(err),
        }
    }
}

impl From<ConfigLoadError> for MigrationError {
    fn from(value: ConfigLoadError) -> Self {
        MigrationError::Config(value)
    }
}

impl From<VaultError> for MigrationError {
    fn from(value: VaultError) -> Self {
        MigrationError::Vault(value)
    }
}

impl From<StoreError> for MigrationError {
    fn from(value: StoreError) -> Self {
        MigrationError::Store(value)
    }
}

impl From<DedupError> for MigrationError {
    fn from(value: DedupError) -> Self {
        MigrationError::Dedup(value)
    }
}

/// What a completed migration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSummary {
    pub report: DedupReport,
    pub commit: CommitStats,
    pub notes_written: usize,
    pub unreferenced_attachments: usize,
    pub rejected_assets: Vec<RejectedAsset>,
}

impl MigrationSummary {
    pub fn render(&self) -> String {
        let mut out = self.report.render_summary();
        out.push_str(&format!(
            "\nNotes written:      {}\nAssets written:     {} ({} already present)\nUnreferenced files: {}\nRejected assets:    {}",
            self.notes_written,
            self.commit.written,
            self.commit.already_present,
            self.unreferenced_attachments,
            self.rejected_assets.len(),
        ));
        for rejected in &self.rejected_assets {
            out.push_str(&format!("\n  - {}: {}", rejected.path, rejected.error));
        }
        out
    }
}

/// Migrate `paths.notes_dir` + `paths.attachments_dir` into `paths.output_dir`.
///
/// Nothing is written unless deduplication succeeds: canonical assets and
/// notes are persisted only after the optimizer has accepted the batch.
pub fn run_migration(config: &OmniConfig) -> Result<MigrationSummary, MigrationError> {
    let start = Instant::now();
    config.validate()?;

    let ingest_cfg = config.ingest.to_ingest_config();
    let vault = load_vault(
        &config.paths.notes_dir,
        &config.paths.attachments_dir,
        &ingest_cfg,
    )?;

    let store = AssetStore::new(config.store.to_store_config())?;
    let optimizer = DeduplicationOptimizer::new(config.dedup.to_dedup_config())?;
    let (documents, report) = optimizer.optimize(&store, vault.documents, &vault.assets)?;

    let backend = config
        .store
        .backend_config(&config.paths.output_dir)
        .build()?;
    let commit = store.commit(backend.as_ref())?;
    let notes_written = write_vault(&config.paths.output_dir, &documents)?;

    info!(
        notes_written,
        assets_written = commit.written,
        bytes_saved = report.bytes_saved,
        elapsed_micros = start.elapsed().as_micros(),
        "migration_complete"
    );
    Ok(MigrationSummary {
        report,
        commit,
        notes_written,
        unreferenced_attachments: vault.unreferenced_attachments,
        rejected_assets: vault.rejected,
    })
}

/// Dry run: load the vault and report duplicate attachments without
/// writing anything.
pub fn analyze_vault(config: &OmniConfig) -> Result<Vec<DuplicateGroup>, MigrationError> {
    config.validate()?;
    let vault = load_vault(
        &config.paths.notes_dir,
        &config.paths.attachments_dir,
        &config.ingest.to_ingest_config(),
    )?;
    let store = AssetStore::new(config.store.to_store_config())?;
    let optimizer = DeduplicationOptimizer::new(config.dedup.to_dedup_config())?;
    Ok(optimizer.analyze(&store, &vault.documents, &vault.assets)?)
}
