//! YAML configuration for a migration run.
//!
//! Every stage of the run reads its settings from one file. Every field has
//! a default, so an almost empty file is a valid configuration.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "evernote import"
//!
//! paths:
//!   notes_dir: "export/notes"
//!   attachments_dir: "export/attachments"
//!   output_dir: "vault"
//!
//! ingest:
//!   asset_extensions: ["png", "jpg", "jpeg", "gif", "webp", "svg", "bmp"]
//!   max_asset_bytes: 52428800
//!   strip_control_chars: true
//!
//! store:
//!   canonical_dir: "attachments"
//!   verify_bytes: true
//!   policy: "first_seen"        # or "shortest_name"
//!   backend:                     # defaults to a filesystem backend at output_dir
//!     kind: "filesystem"
//!     root: "vault"
//!
//! dedup:
//!   unresolved_tolerance: 0
//!   parallel: true
//!
//! logging:
//!   level: "info"
//!   format: "text"              # or "json"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use dedup::DedupConfig;
use ingest::{IngestConfig, DEFAULT_ASSET_EXTENSIONS};
use serde::{Deserialize, Serialize};
use store::{BackendConfig, PolicyKind, StoreConfig};
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level configuration of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OmniConfig {
    /// Configuration format version
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub paths: PathsYamlConfig,

    #[serde(default)]
    pub ingest: IngestYamlConfig,

    #[serde(default)]
    pub store: StoreYamlConfig,

    #[serde(default)]
    pub dedup: DedupYamlConfig,

    #[serde(default)]
    pub logging: LoggingYamlConfig,
}

impl OmniConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: OmniConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.paths.validate()?;
        self.ingest.validate()?;
        self.store.validate()?;
        self.dedup.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

impl Default for OmniConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            paths: PathsYamlConfig::default(),
            ingest: IngestYamlConfig::default(),
            store: StoreYamlConfig::default(),
            dedup: DedupYamlConfig::default(),
            logging: LoggingYamlConfig::default(),
        }
    }
}

/// Input and output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsYamlConfig {
    /// Converted Markdown notes.
    #[serde(default = "default_notes_dir")]
    pub notes_dir: PathBuf,

    /// Attachments extracted from the source archive.
    #[serde(default = "default_attachments_dir")]
    pub attachments_dir: PathBuf,

    /// Target vault. Rewritten notes land here.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl PathsYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        for (field, value) in [
            ("notes_dir", &self.notes_dir),
            ("attachments_dir", &self.attachments_dir),
            ("output_dir", &self.output_dir),
        ] {
            if value.as_os_str().is_empty() {
                return Err(ConfigLoadError::Validation(format!(
                    "paths.{field} must not be empty"
                )));
            }
        }
        if self.output_dir == self.notes_dir {
            return Err(ConfigLoadError::Validation(
                "paths.output_dir must differ from paths.notes_dir".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PathsYamlConfig {
    fn default() -> Self {
        Self {
            notes_dir: default_notes_dir(),
            attachments_dir: default_attachments_dir(),
            output_dir: default_output_dir(),
        }
    }
}

/// Ingest stage YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestYamlConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_asset_extensions")]
    pub asset_extensions: Vec<String>,

    #[serde(default)]
    pub max_asset_bytes: Option<u64>,

    #[serde(default = "true_value")]
    pub strip_control_chars: bool,
}

impl IngestYamlConfig {
    pub fn to_ingest_config(&self) -> IngestConfig {
        IngestConfig {
            version: self.version,
            asset_extensions: self.asset_extensions.clone(),
            max_asset_bytes: self.max_asset_bytes,
            strip_control_chars: self.strip_control_chars,
        }
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        self.to_ingest_config()
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("ingest: {e}")))
    }
}

impl Default for IngestYamlConfig {
    fn default() -> Self {
        Self {
            version: 1,
            asset_extensions: default_asset_extensions(),
            max_asset_bytes: None,
            strip_control_chars: true,
        }
    }
}

/// Asset store YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreYamlConfig {
    #[serde(default = "default_canonical_dir")]
    pub canonical_dir: String,

    #[serde(default = "true_value")]
    pub verify_bytes: bool,

    #[serde(default)]
    pub policy: PolicyKind,

    /// Where canonical assets are written. `None` means a filesystem
    /// backend rooted at `paths.output_dir`.
    #[serde(default)]
    pub backend: Option<BackendConfig>,
}

impl StoreYamlConfig {
    pub fn to_store_config(&self) -> StoreConfig {
        StoreConfig {
            canonical_dir: self.canonical_dir.clone(),
            verify_bytes: self.verify_bytes,
            policy: self.policy,
        }
    }

    pub fn backend_config(&self, output_dir: &Path) -> BackendConfig {
        self.backend
            .clone()
            .unwrap_or_else(|| BackendConfig::filesystem(output_dir))
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        self.to_store_config()
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("store: {e}")))?;
        if let Some(BackendConfig::Filesystem { root }) = &self.backend {
            if root.as_os_str().is_empty() {
                return Err(ConfigLoadError::Validation(
                    "store.backend.root must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for StoreYamlConfig {
    fn default() -> Self {
        Self {
            canonical_dir: default_canonical_dir(),
            verify_bytes: true,
            policy: PolicyKind::default(),
            backend: None,
        }
    }
}

/// Optimizer YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupYamlConfig {
    #[serde(default)]
    pub unresolved_tolerance: usize,

    #[serde(default = "true_value")]
    pub parallel: bool,
}

impl DedupYamlConfig {
    pub fn to_dedup_config(&self) -> DedupConfig {
        DedupConfig {
            unresolved_tolerance: self.unresolved_tolerance,
            parallel: self.parallel,
        }
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        self.to_dedup_config()
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("dedup: {e}")))
    }
}

impl Default for DedupYamlConfig {
    fn default() -> Self {
        Self {
            unresolved_tolerance: 0,
            parallel: true,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging YAML configuration. `RUST_LOG` overrides `level` when set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingYamlConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.level.to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" | "off" => Ok(()),
            other => Err(ConfigLoadError::Validation(format!(
                "logging.level must be one of trace, debug, info, warn, error, off (got {other:?})"
            ))),
        }
    }
}

impl Default for LoggingYamlConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

fn default_version() -> u32 {
    1
}
fn true_value() -> bool {
    true
}
fn default_notes_dir() -> PathBuf {
    PathBuf::from("export/notes")
}
fn default_attachments_dir() -> PathBuf {
    PathBuf::from("export/attachments")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("vault")
}
fn default_asset_extensions() -> Vec<String> {
    DEFAULT_ASSET_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}
fn default_canonical_dir() -> String {
    "attachments".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
