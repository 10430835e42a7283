//! Store configuration
//!
//! Settings for in-memory containers, loadable from TOML.
//!
//! ```toml
//! default_mode = "lazy"
//! lazy_chunk_size = 8192
//! tree_cache_capacity = 64
//! name_prefix = "doc_"
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::container::EvaluationMode;
use crate::error::{DocumentError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Mode used by fetches that do not name one
    pub default_mode: EvaluationMode,

    /// Bytes handed to the parser per cursor pull for lazy fetches
    pub lazy_chunk_size: usize,

    /// Parsed trees kept for eager fetches; 0 disables the cache
    pub tree_cache_capacity: usize,

    /// Prefix of generated document names
    pub name_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            default_mode: EvaluationMode::Eager,
            lazy_chunk_size: 4096,
            tree_cache_capacity: 32,
            name_prefix: "dbxml_".to_string(),
        }
    }
}

impl StoreConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: StoreConfig =
            toml::from_str(contents).map_err(|e| DocumentError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// # Errors
    ///
    /// Returns `DocumentError::Config` if any value is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.lazy_chunk_size == 0 {
            return Err(DocumentError::Config(
                "lazy_chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.name_prefix.chars().any(char::is_whitespace) {
            return Err(DocumentError::Config(format!(
                "name_prefix '{}' must not contain whitespace",
                self.name_prefix
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::from_toml_str("").unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.lazy_chunk_size, 4096);
        assert_eq!(config.name_prefix, "dbxml_");
    }

    #[test]
    fn test_parse() {
        let config = StoreConfig::from_toml_str(
            "default_mode = \"lazy\"\nlazy_chunk_size = 16\ntree_cache_capacity = 0\n",
        )
        .unwrap();
        assert_eq!(config.default_mode, EvaluationMode::Lazy);
        assert_eq!(config.lazy_chunk_size, 16);
        assert_eq!(config.tree_cache_capacity, 0);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            StoreConfig::from_toml_str("lazy_chunk_size = 0"),
            Err(DocumentError::Config(_))
        ));
        assert!(matches!(
            StoreConfig::from_toml_str("unknown_key = 1"),
            Err(DocumentError::Config(_))
        ));
        assert!(matches!(
            StoreConfig::from_toml_str("default_mode = \"sometimes\""),
            Err(DocumentError::Config(_))
        ));
    }
}
