//! Validator configuration.

use serde::{Deserialize, Serialize};

/// Default limit on nested record levels below the root.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Tunables for a [`Validator`](crate::Validator).
///
/// Missing fields take their defaults, so the struct can be embedded in a
/// host application's config file:
///
/// ```yaml
/// validator:
///   max_depth: 64
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Nested record levels traversal may enter below the root before
    /// failing with `DepthExceeded`.
    pub max_depth: usize,
}

impl ValidatorConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_depth() {
        assert_eq!(ValidatorConfig::default().max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(ValidatorConfig::default().with_max_depth(4).max_depth, 4);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let cfg: ValidatorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, ValidatorConfig::default());

        let cfg: ValidatorConfig = serde_yaml::from_str("max_depth: 8").unwrap();
        assert_eq!(cfg.max_depth, 8);
    }
}
