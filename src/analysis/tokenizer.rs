//! Field tokenizer.
//!
//! [`FieldTokenizer`] turns one [`FullTextValue`] into a lazy sequence of
//! [`Token`]s:
//!
//! 1. The integer value is computed from the raw text.
//! 2. The value's transformation rules (or the engine default) are applied,
//!    followed by the lowercase group.
//! 3. Splittable values are cut on Unicode word boundaries (UAX #29); segments
//!    without any alphanumeric character are dropped. Unsplit values are one
//!    fragment.
//! 4. Each fragment is trimmed, skipped if blank and truncated to the maximum
//!    word length in characters.
//! 5. A word starting with `www.` is followed by a second token holding the
//!    rest of the word, so a host name matches with and without the prefix.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use wordlink::analysis::tokenizer::FieldTokenizer;
//! use wordlink::analysis::transform::StandardTransformationProcessor;
//! use wordlink::config::IndexerConfig;
//! use wordlink::document::FullTextValue;
//!
//! let tokenizer = FieldTokenizer::new(
//!     Arc::new(StandardTransformationProcessor::new()),
//!     &IndexerConfig::default(),
//! );
//! let value = FullTextValue::new("Visit www.Example.com", 1, "body", "eng-GB");
//! let words: Vec<String> = tokenizer.tokenize(&value).unwrap().map(|t| t.text).collect();
//! assert_eq!(words, vec!["visit", "www.example.com", "example.com"]);
//! ```

use std::ops::Range;
use std::sync::Arc;

use unicode_segmentation::UnicodeSegmentation;

use crate::analysis::token::{Token, integer_value};
use crate::analysis::transform::TransformationProcessor;
use crate::config::IndexerConfig;
use crate::document::FullTextValue;
use crate::error::Result;

const WWW_PREFIX: &str = "www.";

/// Splits field values into normalized tokens.
#[derive(Debug, Clone)]
pub struct FieldTokenizer {
    processor: Arc<dyn TransformationProcessor>,
    default_rules: Vec<String>,
    lowercase_group: String,
    max_word_length: usize,
}

impl FieldTokenizer {
    /// Create a tokenizer using the transformation settings of `config`.
    pub fn new(processor: Arc<dyn TransformationProcessor>, config: &IndexerConfig) -> Self {
        FieldTokenizer {
            processor,
            default_rules: config.default_transformation_rules.clone(),
            lowercase_group: config.lowercase_group.clone(),
            max_word_length: config.max_word_length,
        }
    }

    /// The transformation processor in use.
    pub fn processor(&self) -> &Arc<dyn TransformationProcessor> {
        &self.processor
    }

    /// Tokenize one field value.
    ///
    /// Transformation runs eagerly; splitting happens as the returned
    /// iterator is consumed. Errors come only from the transformation
    /// processor.
    pub fn tokenize(&self, value: &FullTextValue) -> Result<FieldTokens> {
        let integer_value = integer_value(&value.value);
        let rules = value
            .transformation_rules
            .as_deref()
            .unwrap_or(&self.default_rules);

        let transformed = self.processor.transform(&value.value, rules)?;
        let normalized = self
            .processor
            .transform_by_group(&transformed, &self.lowercase_group)?;

        Ok(FieldTokens {
            text: normalized,
            cursor: 0,
            split: value.split,
            integer_value,
            max_word_length: self.max_word_length,
            pending: None,
        })
    }
}

/// Lazy token sequence of one field value.
#[derive(Debug, Clone)]
pub struct FieldTokens {
    text: String,
    cursor: usize,
    split: bool,
    integer_value: i32,
    max_word_length: usize,
    pending: Option<Token>,
}

impl FieldTokens {
    /// Byte range of the next candidate fragment.
    fn next_fragment(&mut self) -> Option<Range<usize>> {
        if !self.split {
            if self.cursor >= self.text.len() {
                return None;
            }
            self.cursor = self.text.len();
            return Some(0..self.text.len());
        }

        while self.cursor < self.text.len() {
            let segment = self.text[self.cursor..].split_word_bounds().next()?;
            let start = self.cursor;
            self.cursor += segment.len();
            if segment.chars().any(char::is_alphanumeric) {
                return Some(start..self.cursor);
            }
        }
        None
    }

    fn make_word(&self, fragment: &str) -> Option<String> {
        let trimmed = fragment.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(truncate_chars(trimmed, self.max_word_length))
    }
}

impl Iterator for FieldTokens {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if let Some(token) = self.pending.take() {
            return Some(token);
        }

        loop {
            let range = self.next_fragment()?;
            let Some(word) = self.make_word(&self.text[range]) else {
                continue;
            };

            if let Some(rest) = strip_www_prefix(&word) {
                if !rest.trim().is_empty() {
                    self.pending = Some(Token::new(rest, self.integer_value));
                }
            }
            return Some(Token::new(word, self.integer_value));
        }
    }
}

/// Keep the first `max_chars` characters.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

/// The part after a case-insensitive `www.` prefix.
fn strip_www_prefix(word: &str) -> Option<&str> {
    let prefix = word.get(..WWW_PREFIX.len())?;
    if prefix.eq_ignore_ascii_case(WWW_PREFIX) {
        Some(&word[WWW_PREFIX.len()..])
    } else {
        None
    }
}
