use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::policy::PolicyKind;

/// Runtime configuration for an [`AssetStore`](crate::AssetStore).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory prefix of every canonical path. Relative, no `..`.
    pub canonical_dir: String,

    /// Compare bytes on every dedupe hit and fail on mismatch. Turning this
    /// off trusts the digest alone.
    pub verify_bytes: bool,

    /// Canonical selection rule.
    pub policy: PolicyKind,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            canonical_dir: "attachments".to_string(),
            verify_bytes: true,
            policy: PolicyKind::FirstSeen,
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), StoreError> {
        let dir = Path::new(&self.canonical_dir);
        if dir.is_absolute() || self.canonical_dir.starts_with('/') {
            return Err(StoreError::InvalidConfig(format!(
                "canonical_dir must be relative, got {:?}",
                self.canonical_dir
            )));
        }
        if dir.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(StoreError::InvalidConfig(format!(
                "canonical_dir must not contain '..', got {:?}",
                self.canonical_dir
            )));
        }
        Ok(())
    }
}
