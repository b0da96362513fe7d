//! Stream configuration
//!
//! `Config` deserializes from camelCase keys so it can sit inside a host
//! application's own config file. The short legacy keys `icase`, `pojo` and
//! `chunk` are accepted as aliases.

use crate::error::{Error, Result};
use serde::Deserialize;

pub const DEFAULT_CHUNK_SIZE: usize = 8192;
pub const DEFAULT_PATTERN_CACHE_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Strict tokenizer mode: report more classes of malformed markup
    pub strict: bool,
    /// Case-insensitive pattern matching; when unset, follows `!strict`
    #[serde(alias = "icase")]
    pub case_insensitive: Option<bool>,
    /// Render results as collapsed values instead of structural elements
    #[serde(alias = "pojo")]
    pub collapsed: bool,
    /// Maximum bytes handed to the tokenizer per step
    #[serde(alias = "chunk")]
    pub chunk_size: usize,
    /// Discard text of elements outside every matched subtree
    pub free_unmatched_nodes: bool,
    /// Trim leading and trailing whitespace of rendered text
    pub trim: bool,
    /// Collapse internal whitespace runs of rendered text to one space
    pub normalize: bool,
    pub pattern_cache_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            strict: true,
            case_insensitive: None,
            collapsed: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            free_unmatched_nodes: false,
            trim: false,
            normalize: false,
            pattern_cache_size: DEFAULT_PATTERN_CACHE_SIZE,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = Some(case_insensitive);
        self
    }

    pub fn with_collapsed(mut self, collapsed: bool) -> Self {
        self.collapsed = collapsed;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_free_unmatched_nodes(mut self, free: bool) -> Self {
        self.free_unmatched_nodes = free;
        self
    }

    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_pattern_cache_size(mut self, size: usize) -> Self {
        self.pattern_cache_size = size;
        self
    }

    /// Effective case folding for pattern matching
    pub fn case_insensitive(&self) -> bool {
        self.case_insensitive.unwrap_or(!self.strict)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunkSize must be at least 1".to_string()));
        }
        if self.pattern_cache_size == 0 {
            return Err(Error::InvalidConfig("patternCacheSize must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.strict);
        assert!(!config.case_insensitive());
        assert!(Config::default().with_strict(false).case_insensitive());
        assert!(!Config::default()
            .with_strict(false)
            .with_case_insensitive(false)
            .case_insensitive());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        assert!(matches!(
            Config::default().with_chunk_size(0).validate(),
            Err(Error::InvalidConfig(_))
        ));
        assert!(Config::default().with_pattern_cache_size(0).validate().is_err());
    }

    #[test]
    fn test_deserialize_camel_case_and_aliases() {
        let config: Config =
            serde_json::from_str(r#"{"chunkSize": 32, "freeUnmatchedNodes": true, "caseInsensitive": true}"#)
                .unwrap();
        assert_eq!(config.chunk_size, 32);
        assert!(config.free_unmatched_nodes);
        assert!(config.case_insensitive());
        assert!(config.strict);

        let legacy: Config = serde_json::from_str(r#"{"icase": true, "pojo": true, "chunk": 16}"#).unwrap();
        assert_eq!(legacy.case_insensitive, Some(true));
        assert!(legacy.collapsed);
        assert_eq!(legacy.chunk_size, 16);
    }
}
