//! Word dictionary resolution.
//!
//! The dictionary is shared by every content object. A word's object count
//! is the number of content objects linking to it, so indexing a content
//! object adds one to the count of each of its *distinct* words, and removing
//! it subtracts one again. Words whose count reaches zero are deleted by
//! [`WordDictionary::sweep`]. Re-indexing releases the old words and sweeps
//! only after the new words are resolved, so a word the content object keeps
//! using keeps its id.
//!
//! Resolution goes through [`IndexTransaction::upsert_words`], which inserts
//! or increments atomically, so two transactions introducing the same new
//! word cannot create duplicate rows or lose an increment.

use ahash::AHashMap;

use crate::error::{Result, WordlinkError};
use crate::storage::{IndexTransaction, WordId, distinct};

/// Outcome of resolving a set of token texts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Word id of every resolved text.
    pub word_ids: AHashMap<String, WordId>,

    /// Number of words no other content object references.
    pub new_words: usize,

    /// Number of dictionary round-trips.
    pub chunks: usize,
}

impl Resolution {
    /// Word id of a text.
    pub fn word_id(&self, text: &str) -> Option<WordId> {
        self.word_ids.get(text).copied()
    }
}

/// Resolves token texts to word ids in bounded chunks.
#[derive(Debug, Clone)]
pub struct WordDictionary {
    chunk_size: usize,
}

impl WordDictionary {
    /// Create a resolver sending at most `chunk_size` texts per round-trip.
    pub fn new(chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(WordlinkError::invalid_config(
                "dictionary chunk size must be greater than 0",
            ));
        }
        Ok(WordDictionary { chunk_size })
    }

    /// The chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Map each distinct text to its word id, counting one new reference.
    ///
    /// Repeated texts are counted once. Texts are sent in first-occurrence
    /// order, so new words get the same ids whatever the chunk size.
    pub fn resolve(&self, tx: &mut dyn IndexTransaction, texts: &[String]) -> Result<Resolution> {
        let texts = distinct(texts);
        let mut resolution = Resolution {
            word_ids: AHashMap::with_capacity(texts.len()),
            ..Resolution::default()
        };

        for chunk in texts.chunks(self.chunk_size) {
            let entries = tx.upsert_words(chunk)?;
            if entries.len() != chunk.len() {
                return Err(WordlinkError::storage(format!(
                    "dictionary returned {} rows for {} words",
                    entries.len(),
                    chunk.len()
                )));
            }

            for entry in entries {
                if entry.object_count == 1 {
                    resolution.new_words += 1;
                }
                resolution.word_ids.insert(entry.text, entry.id);
            }
            resolution.chunks += 1;
        }

        tracing::debug!(
            target: "wordlink::dictionary",
            words = texts.len(),
            new_words = resolution.new_words,
            chunks = resolution.chunks,
            "words resolved"
        );
        Ok(resolution)
    }

    /// Drop one reference from each word.
    ///
    /// Words left without references stay in the dictionary until
    /// [`sweep`](Self::sweep).
    pub fn release(&self, tx: &mut dyn IndexTransaction, word_ids: &[WordId]) -> Result<usize> {
        for chunk in word_ids.chunks(self.chunk_size) {
            tx.decrement_word_object_count(chunk)?;
        }
        Ok(word_ids.len())
    }

    /// Delete every word without references.
    ///
    /// # Returns
    ///
    /// The number of deleted words.
    pub fn sweep(&self, tx: &mut dyn IndexTransaction) -> Result<u64> {
        let deleted = tx.delete_words_without_objects()?;
        if deleted > 0 {
            tracing::debug!(target: "wordlink::dictionary", deleted, "unreferenced words deleted");
        }
        Ok(deleted)
    }
}
