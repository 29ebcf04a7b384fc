//! Loading converted notes and attachments from disk, and writing the
//! rewritten notes back out.
//!
//! Notes are `*.md` files under the notes directory; a note's id is its path
//! relative to that directory without the `.md` suffix. Attachments are keyed
//! by their path relative to the attachments directory.
//!
//! A reference is percent-decoded and then matched to an attachment by
//! trying, in order:
//!
//! 1. the written path as an attachment key (`img1.png`, `sub/img1.png`)
//! 2. the same with the attachments directory name stripped
//!    (`attachments/img1.png`)
//! 3. the path resolved against the note's own directory
//!    (`../attachments/img1.png`)
//! 4. the bare file name, if exactly one attachment has it
//!
//! Embeds whose target does not have an asset extension (note transclusions
//! such as `![[Other note]]`) are not asset references and are left alone.
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Component, Path, PathBuf};

use ingest::{
    ingest_asset, ingest_document, Asset, AssetContent, AssetReference, Document, DocumentId,
    IngestConfig, IngestError, OriginalPath,
};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Errors raised while reading or writing a vault.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VaultError {
    #[error("{path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("notes directory not found: {0}")]
    MissingNotesDir(PathBuf),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("document id {0:?} cannot be written inside the output directory")]
    InvalidDocumentPath(String),
}

impl VaultError {
    fn io(path: &Path, err: impl std::fmt::Display) -> Self {
        VaultError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// An attachment that was referenced but refused by ingest validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedAsset {
    pub path: OriginalPath,
    pub error: IngestError,
}

/// Everything the optimizer needs, read from disk.
#[derive(Debug, Default)]
pub struct LoadedVault {
    /// Sorted by document id.
    pub documents: Vec<Document>,
    pub assets: HashMap<OriginalPath, Asset>,
    /// Attachments no note refers to. They are not migrated.
    pub unreferenced_attachments: usize,
    pub rejected: Vec<RejectedAsset>,
}

struct AttachmentIndex {
    files: BTreeMap<OriginalPath, PathBuf>,
    by_name: HashMap<String, Vec<OriginalPath>>,
    dir_name: Option<String>,
}

impl AttachmentIndex {
    fn build(dir: &Path, cfg: &IngestConfig) -> Result<Self, VaultError> {
        let mut files = BTreeMap::new();
        let mut by_name: HashMap<String, Vec<OriginalPath>> = HashMap::new();

        if dir.is_dir() {
            for entry in WalkDir::new(dir)
                .follow_links(false)
                .sort_by(|a, b| a.file_name().cmp(b.file_name()))
            {
                let entry = entry.map_err(|e| VaultError::io(dir, e))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let Some(key) = relative_key(dir, entry.path()) else {
                    continue;
                };
                let ext = key.extension().unwrap_or_default();
                if !cfg.allows_extension(&ext) {
                    continue;
                }
                by_name
                    .entry(key.file_name().to_string())
                    .or_default()
                    .push(key.clone());
                files.insert(key, entry.path().to_path_buf());
            }
        } else {
            warn!(dir = %dir.display(), "attachments_dir_missing");
        }

        let dir_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty());
        Ok(Self {
            files,
            by_name,
            dir_name,
        })
    }

    fn resolve(&self, written: &OriginalPath, note_dir: &str) -> Option<OriginalPath> {
        let written = percent_decode(written.as_str()).unwrap_or_else(|| written.as_str().to_string());
        let mut candidates = vec![written.clone()];
        if !note_dir.is_empty() {
            candidates.extend(normalize_lexically(&format!("{note_dir}/{written}")));
        }

        for candidate in &candidates {
            let key = OriginalPath::new(candidate);
            if self.files.contains_key(&key) {
                return Some(key);
            }
            if let Some(stripped) = self.strip_dir_name(candidate) {
                let key = OriginalPath::new(stripped);
                if self.files.contains_key(&key) {
                    return Some(key);
                }
            }
        }

        match self
            .by_name
            .get(OriginalPath::new(&written).file_name())
            .map(Vec::as_slice)
        {
            Some([only]) => Some(only.clone()),
            _ => None,
        }
    }

    fn strip_dir_name<'a>(&self, candidate: &'a str) -> Option<&'a str> {
        let dir_name = self.dir_name.as_deref()?;
        candidate
            .strip_prefix(dir_name)
            .and_then(|rest| rest.strip_prefix('/'))
    }
}

/// Read every note and every referenced attachment.
pub fn load_vault(
    notes_dir: &Path,
    attachments_dir: &Path,
    cfg: &IngestConfig,
) -> Result<LoadedVault, VaultError> {
    if !notes_dir.is_dir() {
        return Err(VaultError::MissingNotesDir(notes_dir.to_path_buf()));
    }
    let index = AttachmentIndex::build(attachments_dir, cfg)?;

    let mut documents = Vec::new();
    // attachment key → smallest referencing document id
    let mut owners: BTreeMap<OriginalPath, DocumentId> = BTreeMap::new();

    for entry in WalkDir::new(notes_dir)
        .follow_links(false)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = entry.map_err(|e| VaultError::io(notes_dir, e))?;
        if !entry.file_type().is_file() || !is_markdown(entry.path()) {
            continue;
        }
        let Some(relative) = relative_key(notes_dir, entry.path()) else {
            continue;
        };
        // is_markdown guarantees a three-byte ".md" suffix in some casing
        let id = relative.as_str()[..relative.as_str().len() - 3].to_string();
        let note_dir = relative
            .as_str()
            .rsplit_once('/')
            .map(|(dir, _)| dir.to_string())
            .unwrap_or_default();

        let body = fs::read_to_string(entry.path()).map_err(|e| VaultError::io(entry.path(), e))?;
        let parsed = ingest_document(&id, body, cfg)?;
        let document = rekey_references(parsed, &note_dir, &index, cfg)?;

        for path in document.referenced_paths() {
            if index.files.contains_key(path) {
                owners
                    .entry(path.clone())
                    .and_modify(|owner| {
                        if document.id < *owner {
                            *owner = document.id.clone();
                        }
                    })
                    .or_insert_with(|| document.id.clone());
            }
        }
        documents.push(document);
    }
    documents.sort_by(|a, b| a.id.cmp(&b.id));

    let mut assets = HashMap::with_capacity(owners.len());
    let mut rejected = Vec::new();
    for (key, owner) in &owners {
        let Some(file) = index.files.get(key) else {
            continue;
        };
        match ingest_asset(key.as_str(), owner, AssetContent::File(file.clone()), cfg) {
            Ok(asset) => {
                assets.insert(key.clone(), asset);
            }
            Err(error) => rejected.push(RejectedAsset {
                path: key.clone(),
                error,
            }),
        }
    }

    let unreferenced_attachments = index.files.len() - owners.len();
    info!(
        documents = documents.len(),
        assets = assets.len(),
        rejected = rejected.len(),
        unreferenced_attachments,
        "vault_loaded"
    );
    Ok(LoadedVault {
        documents,
        assets,
        unreferenced_attachments,
        rejected,
    })
}

/// Write each document to `<output_dir>/<id>.md`. Returns the number written.
pub fn write_vault(output_dir: &Path, documents: &[Document]) -> Result<usize, VaultError> {
    fs::create_dir_all(output_dir).map_err(|e| VaultError::io(output_dir, e))?;
    for document in documents {
        let id = document.id.as_str();
        let relative = Path::new(id);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(VaultError::InvalidDocumentPath(id.to_string()));
        }
        let target = output_dir.join(format!("{id}.md"));
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| VaultError::io(parent, e))?;
        }
        fs::write(&target, &document.body).map_err(|e| VaultError::io(&target, e))?;
        debug!(document_id = id, path = %target.display(), "note_written");
    }
    Ok(documents.len())
}

/// Drop non-asset embeds and replace each remaining reference's lookup key
/// with the attachment key it resolves to. Spans are untouched.
fn rekey_references(
    document: Document,
    note_dir: &str,
    index: &AttachmentIndex,
    cfg: &IngestConfig,
) -> Result<Document, VaultError> {
    let Document {
        id,
        body,
        references,
    } = document;

    let references: Vec<AssetReference> = references
        .into_iter()
        .filter(|r| {
            r.original_path
                .extension()
                .is_some_and(|ext| cfg.allows_extension(&ext))
        })
        .map(|r| match index.resolve(&r.original_path, note_dir) {
            Some(key) => AssetReference {
                original_path: key,
                ..r
            },
            None => r,
        })
        .collect();

    Ok(Document::with_references(id, body, references)?)
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md"))
}

fn relative_key(root: &Path, path: &Path) -> Option<OriginalPath> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let key = OriginalPath::new(parts.join("/"));
    (!key.is_empty()).then_some(key)
}

/// Resolve `.` and `..` segments without touching the filesystem. `None` if
/// the path climbs above its root.
fn normalize_lexically(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// Decode `%XX` escapes (Markdown links often encode spaces as `%20`).
/// `None` if there is nothing to decode or the result is not UTF-8.
fn percent_decode(raw: &str) -> Option<String> {
    if !raw.contains('%') {
        return None;
    }
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            out.push((hex_value(bytes[i + 1]) << 4) | hex_value(bytes[i + 2]));
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).ok()
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit.to_ascii_lowercase() - b'a' + 10,
    }
}
