use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Where canonical asset bytes are persisted.
///
/// Keys are canonical paths (relative, `/`-separated). Because paths are
/// content-addressed, writing the same key twice always writes the same
/// bytes.
pub trait StoreBackend: Send + Sync {
    /// Insert or overwrite the bytes stored at `path`.
    fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StoreError>;
    /// Retrieve the bytes stored at `path`.
    fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn contains(&self, path: &str) -> Result<bool, StoreError>;
    /// Flush any buffered writes.
    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Configuration for selecting and building a backend.
///
/// ```
/// use store::BackendConfig;
///
/// let config = BackendConfig::in_memory();
/// let backend = config.build().unwrap();
/// backend.put("attachments/x.png", b"x").unwrap();
/// assert!(backend.contains("attachments/x.png").unwrap());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Keep canonical assets in a `HashMap`. Useful for tests and dry runs.
    #[default]
    InMemory,
    /// Write canonical assets under `root`.
    Filesystem { root: PathBuf },
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn filesystem<P: Into<PathBuf>>(root: P) -> Self {
        BackendConfig::Filesystem { root: root.into() }
    }

    pub fn build(&self) -> Result<Box<dyn StoreBackend>, StoreError> {
        match self {
            BackendConfig::InMemory => Ok(Box::new(InMemoryBackend::new())),
            BackendConfig::Filesystem { root } => Ok(Box::new(FsBackend::open(root)?)),
        }
    }
}

/// An in-memory backend using a `RwLock` around a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StoreBackend for InMemoryBackend {
    fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.objects
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?
            .insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let guard = self
            .objects
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        Ok(guard.get(path).cloned())
    }

    fn contains(&self, path: &str) -> Result<bool, StoreError> {
        let guard = self
            .objects
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        Ok(guard.contains_key(path))
    }
}

/// Filesystem backend rooted at a directory.
///
/// Writes go to a hidden temporary file next to the target and are renamed
/// into place, so a crash never leaves a truncated asset under its final
/// name.
#[derive(Debug, Clone)]
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .map_err(|e| StoreError::backend(format!("create {}: {e}", root.display())))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || escapes {
            return Err(StoreError::backend(format!(
                "refusing to store outside the backend root: {path:?}"
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl StoreBackend for FsBackend {
    fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let target = self.resolve(path)?;
        let parent = target.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent)
            .map_err(|e| StoreError::backend(format!("create {}: {e}", parent.display())))?;

        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = parent.join(format!(".{file_name}.tmp"));
        fs::write(&tmp, bytes)
            .map_err(|e| StoreError::backend(format!("write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &target)
            .map_err(|e| StoreError::backend(format!("rename to {}: {e}", target.display())))
    }

    fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let target = self.resolve(path)?;
        match fs::read(&target) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::backend(format!("read {}: {e}", target.display()))),
        }
    }

    fn contains(&self, path: &str) -> Result<bool, StoreError> {
        Ok(self.resolve(path)?.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_put_get() {
        let backend = InMemoryBackend::new();
        assert!(backend.is_empty());
        backend.put("a/b.png", b"bytes").expect("put");
        assert_eq!(backend.get("a/b.png").expect("get"), Some(b"bytes".to_vec()));
        assert_eq!(backend.get("missing").expect("get"), None);
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn filesystem_put_creates_directories() {
        let dir = tempfile::tempdir().expect("temp dir");
        let backend = FsBackend::open(dir.path()).expect("open");
        backend.put("attachments/abc.png", b"png").expect("put");

        assert!(backend.contains("attachments/abc.png").expect("contains"));
        assert_eq!(
            fs::read(dir.path().join("attachments/abc.png")).expect("read back"),
            b"png"
        );
        assert!(!dir.path().join("attachments/.abc.png.tmp").exists());
        assert_eq!(backend.get("attachments/none.png").expect("get"), None);
    }

    #[test]
    fn filesystem_rejects_escaping_paths() {
        let dir = tempfile::tempdir().expect("temp dir");
        let backend = FsBackend::open(dir.path()).expect("open");
        assert!(matches!(
            backend.put("../evil.png", b"x"),
            Err(StoreError::Backend(_))
        ));
        assert!(matches!(
            backend.put("/etc/evil.png", b"x"),
            Err(StoreError::Backend(_))
        ));
    }

    #[test]
    fn backend_config_builds_filesystem() {
        let dir = tempfile::tempdir().expect("temp dir");
        let backend = BackendConfig::filesystem(dir.path().join("vault"))
            .build()
            .expect("build");
        backend.put("x.gif", b"gif").expect("put");
        assert!(dir.path().join("vault/x.gif").is_file());
    }
}
