//! Engine-wide configuration for the indexer.
//!
//! The defaults match the storage layout the index was designed for: words
//! are resolved against the dictionary in chunks of 500 distinct texts, link
//! rows are written in batches of 1000, and a word is at most 150 characters.
//! Chunk and batch sizes only tune the number of storage round-trips; the
//! final index state does not depend on them.
//!
//! # Example
//!
//! ```
//! use wordlink::config::IndexerConfig;
//!
//! let config = IndexerConfig::from_json_str(r#"{ "word_chunk_size": 100 }"#).unwrap();
//! assert_eq!(config.word_chunk_size, 100);
//! assert_eq!(config.link_batch_size, 1000);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WordlinkError};

/// Default number of distinct words resolved per dictionary round-trip.
pub const DEFAULT_WORD_CHUNK_SIZE: usize = 500;

/// Default number of link rows written per storage round-trip.
pub const DEFAULT_LINK_BATCH_SIZE: usize = 1000;

/// Maximum word length, in characters.
pub const DEFAULT_MAX_WORD_LENGTH: usize = 150;

/// Configuration for [`SearchIndexer`](crate::index::indexer::SearchIndexer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Maximum number of distinct words sent to the dictionary at once.
    pub word_chunk_size: usize,

    /// Maximum number of link rows written at once.
    pub link_batch_size: usize,

    /// Words longer than this (in characters) are truncated.
    pub max_word_length: usize,

    /// Transformation commands applied to a field value when the value does
    /// not carry its own rules.
    pub default_transformation_rules: Vec<String>,

    /// Transformation group applied to every token after splitting.
    pub lowercase_group: String,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        IndexerConfig {
            word_chunk_size: DEFAULT_WORD_CHUNK_SIZE,
            link_batch_size: DEFAULT_LINK_BATCH_SIZE,
            max_word_length: DEFAULT_MAX_WORD_LENGTH,
            default_transformation_rules: vec![
                "normalize".to_string(),
                "search_cleanup".to_string(),
            ],
            lowercase_group: "lowercase".to_string(),
        }
    }
}

impl IndexerConfig {
    /// Parse a configuration from JSON. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: IndexerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    /// Set the dictionary chunk size.
    pub fn with_word_chunk_size(mut self, size: usize) -> Self {
        self.word_chunk_size = size;
        self
    }

    /// Set the link batch size.
    pub fn with_link_batch_size(mut self, size: usize) -> Self {
        self.link_batch_size = size;
        self
    }

    /// Check that every size is usable.
    pub fn validate(&self) -> Result<()> {
        if self.word_chunk_size == 0 {
            return Err(WordlinkError::invalid_config(
                "word_chunk_size must be greater than 0",
            ));
        }
        if self.link_batch_size == 0 {
            return Err(WordlinkError::invalid_config(
                "link_batch_size must be greater than 0",
            ));
        }
        if self.max_word_length == 0 {
            return Err(WordlinkError::invalid_config(
                "max_word_length must be greater than 0",
            ));
        }
        if self.max_word_length > DEFAULT_MAX_WORD_LENGTH {
            return Err(WordlinkError::invalid_config(format!(
                "max_word_length must not exceed {DEFAULT_MAX_WORD_LENGTH}, the longest word the store accepts"
            )));
        }
        if self.lowercase_group.trim().is_empty() {
            return Err(WordlinkError::invalid_config(
                "lowercase_group must not be empty",
            ));
        }
        Ok(())
    }
}
