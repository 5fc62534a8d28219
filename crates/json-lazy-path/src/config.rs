use serde::{Deserialize, Serialize};

/// Evaluation options threaded through parsing and resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Allow `index[array]` and `key[object]` in addition to the usual order.
    pub symmetric_indexing: bool,
    /// Count negative array indices from the end.
    pub negative_indexing: bool,
    /// Maximum nesting of values and expressions accepted by the parser, and
    /// of references followed while resolving.
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symmetric_indexing: false,
            negative_indexing: false,
            max_depth: 128,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symmetric_indexing(mut self, enabled: bool) -> Self {
        self.symmetric_indexing = enabled;
        self
    }

    pub fn with_negative_indexing(mut self, enabled: bool) -> Self {
        self.negative_indexing = enabled;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(!config.symmetric_indexing);
        assert!(!config.negative_indexing);
        assert_eq!(config.max_depth, 128);
    }

    #[test]
    fn test_builder() {
        let config = Config::new()
            .with_symmetric_indexing(true)
            .with_negative_indexing(true)
            .with_max_depth(8);
        assert!(config.symmetric_indexing);
        assert!(config.negative_indexing);
        assert_eq!(config.max_depth, 8);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: Config = serde_json::from_str(r#"{"negative-indexing": true}"#).unwrap();
        assert!(config.negative_indexing);
        assert!(!config.symmetric_indexing);
        assert_eq!(config.max_depth, 128);
    }
}
