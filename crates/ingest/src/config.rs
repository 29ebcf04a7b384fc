//! Configuration types for document and asset ingest.
//!
//! [`IngestConfig`] decides which attachments are considered assets at all
//! (by extension) and how large a single asset may be.
//!
//! ```rust
//! use ingest::IngestConfig;
//!
//! let config = IngestConfig::default();
//! config.validate().expect("defaults are valid");
//! assert!(config.allows_extension("PNG"));
//! assert!(!config.allows_extension("exe"));
//! ```
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Extensions accepted by default: the raster and vector image formats a
/// note export typically embeds.
pub const DEFAULT_ASSET_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "gif", "webp", "svg", "bmp"];

/// Runtime configuration for ingest behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestConfig {
    /// Must be >= 1.
    pub version: u32,

    /// Allowed asset extensions, compared case-insensitively. A leading dot
    /// is tolerated.
    pub asset_extensions: Vec<String>,

    /// Upper bound on a single asset's size in bytes. `None` disables the
    /// check.
    pub max_asset_bytes: Option<u64>,

    /// Strip control characters from document ids.
    pub strip_control_chars: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            version: 1,
            asset_extensions: DEFAULT_ASSET_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            max_asset_bytes: None,
            strip_control_chars: true,
        }
    }
}

/// Errors surfaced by [`IngestConfig::validate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("ingest config version must be >= 1")]
    InvalidVersion,
    #[error("asset_extensions must not be empty")]
    NoExtensions,
    #[error("asset extension entries must not be blank")]
    BlankExtension,
    #[error("max_asset_bytes must be > 0 when set")]
    ZeroSizeLimit,
}

impl IngestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 {
            return Err(ConfigError::InvalidVersion);
        }
        if self.asset_extensions.is_empty() {
            return Err(ConfigError::NoExtensions);
        }
        if self
            .asset_extensions
            .iter()
            .any(|e| e.trim().trim_start_matches('.').is_empty())
        {
            return Err(ConfigError::BlankExtension);
        }
        if self.max_asset_bytes == Some(0) {
            return Err(ConfigError::ZeroSizeLimit);
        }
        Ok(())
    }

    pub fn allows_extension(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.');
        self.asset_extensions
            .iter()
            .any(|allowed| allowed.trim().trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}
