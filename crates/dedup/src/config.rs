use serde::{Deserialize, Serialize};

use crate::error::DedupError;

/// Knobs for [`DeduplicationOptimizer`](crate::DeduplicationOptimizer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Maximum number of unresolved references a run may finish with.
    /// `0` aborts on the first one.
    pub unresolved_tolerance: usize,

    /// Run both passes on the rayon thread pool.
    pub parallel: bool,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            unresolved_tolerance: 0,
            parallel: true,
        }
    }
}

impl DedupConfig {
    pub fn with_tolerance(mut self, tolerance: usize) -> Self {
        self.unresolved_tolerance = tolerance;
        self
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub fn validate(&self) -> Result<(), DedupError> {
        if self.unresolved_tolerance == usize::MAX {
            return Err(DedupError::InvalidConfig(
                "unresolved_tolerance must be finite".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_zero_tolerance_parallel() {
        let cfg = DedupConfig::default();
        assert_eq!(cfg.unresolved_tolerance, 0);
        assert!(cfg.parallel);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_yaml_style_input_fills_defaults() {
        let cfg: DedupConfig =
            serde_json::from_str(r#"{"unresolved_tolerance": 3}"#).expect("parse");
        assert_eq!(cfg, DedupConfig::default().with_tolerance(3));
    }

    #[test]
    fn unbounded_tolerance_rejected() {
        let cfg = DedupConfig::default().with_tolerance(usize::MAX);
        assert!(matches!(cfg.validate(), Err(DedupError::InvalidConfig(_))));
    }
}
