//! Storage abstraction for the word index.
//!
//! The index lives in two logical tables:
//!
//! - **words**: one [`WordEntry`] per distinct normalized text, keyed by id,
//!   with a unique index on the text and an object count (the number of
//!   content objects linking to the word).
//! - **object word links**: one [`ObjectWordLink`] per token occurrence, with
//!   indexes on the content id (for removal) and on the word id (for query
//!   execution).
//!
//! All mutation goes through an [`IndexTransaction`] obtained from
//! [`SearchIndexStore::begin`]. A transaction that is dropped without
//! [`commit`](IndexTransaction::commit) leaves no trace, so an error raised
//! half-way through an operation never leaves partial state behind.
//!
//! # Storage Types
//!
//! ## MemoryIndexStore
//! - In-process tables, for tests and embedded use
//!
//! ## FileIndexStore
//! - The same tables, persisted to a single snapshot file on every commit
//!
//! # Example
//!
//! ```
//! use wordlink::storage::memory::MemoryIndexStore;
//! use wordlink::storage::SearchIndexStore;
//!
//! # fn main() -> wordlink::error::Result<()> {
//! let store = MemoryIndexStore::new();
//!
//! let mut tx = store.begin()?;
//! let words = tx.upsert_words(&["hello".to_string(), "world".to_string()])?;
//! tx.commit()?;
//!
//! assert_eq!(words[0].object_count, 1);
//! assert_eq!(store.word("hello")?.map(|w| w.id), Some(words[0].id));
//! # Ok(())
//! # }
//! ```

use std::fmt::Debug;

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::document::{ContentId, ContentTypeId, FieldDefinitionId, SectionId};
use crate::error::Result;
use crate::language::mask::LanguageSet;

pub mod file;
pub mod memory;

/// Identifier of a dictionary word. Ids start at 1.
pub type WordId = u64;

/// Neighbor id used at both ends of an adjacency chain.
pub const NO_WORD: WordId = 0;

/// A dictionary row.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordEntry {
    /// Surrogate id.
    pub id: WordId,

    /// Normalized text, unique across the dictionary.
    pub text: String,

    /// Number of content objects linking to this word.
    pub object_count: u64,
}

/// One occurrence of a word in a content object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectWordLink {
    /// The word.
    pub word_id: WordId,

    /// The content object.
    pub content_id: ContentId,

    /// Occurrences of this word in the content object.
    pub frequency: u32,

    /// Position among all tokens of the content object, starting at 0.
    pub placement: u32,

    /// Word id of the next token, [`NO_WORD`] for the last token.
    pub next_word_id: WordId,

    /// Word id of the previous token, [`NO_WORD`] for the first token.
    pub prev_word_id: WordId,

    /// Content type of the content object.
    pub content_type_id: ContentTypeId,

    /// Field the token came from.
    pub field_definition_id: FieldDefinitionId,

    /// Identifier of the field the token came from.
    pub field_definition_identifier: String,

    /// Whether the content object is published.
    pub published: bool,

    /// Section of the content object.
    pub section_id: SectionId,

    /// Numeric interpretation of the field value.
    pub integer_value: i32,

    /// Bit-packed language mask, see [`crate::language::mask`].
    pub language_mask: u64,
}

impl ObjectWordLink {
    /// Structured form of the language mask.
    pub fn languages(&self) -> LanguageSet {
        LanguageSet::decode(self.language_mask)
    }
}

/// A backend holding the word and link tables.
///
/// Read methods see committed state only.
pub trait SearchIndexStore: Send + Sync + Debug {
    /// Start a transaction.
    ///
    /// Implementations must isolate concurrent transactions well enough that
    /// [`IndexTransaction::upsert_words`] is atomic: two transactions adding
    /// the same new word must end up with one row counted twice. The bundled
    /// stores run writer transactions one at a time.
    ///
    /// # Returns
    ///
    /// * `Ok(Box<dyn IndexTransaction>)` - A transaction; dropping it rolls back
    /// * `Err(WordlinkError)` - If the backend cannot start a transaction
    fn begin(&self) -> Result<Box<dyn IndexTransaction + '_>>;

    /// Look up a word by its normalized text.
    fn word(&self, text: &str) -> Result<Option<WordEntry>>;

    /// All words, ordered by id.
    fn words(&self) -> Result<Vec<WordEntry>>;

    /// All links of a content object, ordered by placement.
    fn links_for_content(&self, content_id: ContentId) -> Result<Vec<ObjectWordLink>>;

    /// Content objects linking to a word, in ascending id order.
    fn contents_for_word(&self, word_id: WordId) -> Result<Vec<ContentId>>;

    /// Number of words in the dictionary.
    fn word_count(&self) -> Result<usize>;

    /// Number of link rows.
    fn link_count(&self) -> Result<usize>;
}

/// A unit of work against a [`SearchIndexStore`].
///
/// Every method sees the transaction's own uncommitted writes.
pub trait IndexTransaction {
    /// Fetch the dictionary rows of the given texts.
    ///
    /// Texts without a row are left out; the rest come back in input order.
    fn get_words(&mut self, texts: &[String]) -> Result<Vec<WordEntry>>;

    /// Insert the texts that have no row yet, each with an object count of 1.
    ///
    /// Texts that already exist are left untouched.
    fn add_words(&mut self, texts: &[String]) -> Result<()>;

    /// Add one to the object count of each word.
    fn increment_word_object_count(&mut self, word_ids: &[WordId]) -> Result<()>;

    /// Subtract one from the object count of each word, stopping at zero.
    fn decrement_word_object_count(&mut self, word_ids: &[WordId]) -> Result<()>;

    /// Delete every word whose object count is zero.
    ///
    /// # Returns
    ///
    /// The number of deleted words.
    fn delete_words_without_objects(&mut self) -> Result<u64>;

    /// Distinct word ids linked to a content object.
    fn get_content_object_words(&mut self, content_id: ContentId) -> Result<Vec<WordId>>;

    /// Delete every link row of a content object.
    ///
    /// # Returns
    ///
    /// The number of deleted rows.
    fn delete_object_word_links(&mut self, content_id: ContentId) -> Result<u64>;

    /// Insert link rows.
    ///
    /// Rows referencing a word id that does not exist are a constraint
    /// violation; in that case no row of the call is inserted.
    fn add_object_word_links(&mut self, links: &[ObjectWordLink]) -> Result<()>;

    /// Delete every word and every link, and restart word ids at 1.
    fn purge(&mut self) -> Result<()>;

    /// Get-or-insert-and-increment.
    ///
    /// For each distinct text: insert it with an object count of 1 if it has
    /// no row, otherwise add one to its count. Returns the resulting rows in
    /// input order, one per distinct text.
    ///
    /// The default implementation composes the primitive operations and is
    /// only atomic when the transaction is serializable. Backends with
    /// weaker isolation must override it with a native upsert.
    fn upsert_words(&mut self, texts: &[String]) -> Result<Vec<WordEntry>> {
        let texts = distinct(texts);

        let existing = self.get_words(&texts)?;
        let existing_ids: Vec<WordId> = existing.iter().map(|word| word.id).collect();
        self.increment_word_object_count(&existing_ids)?;

        let known: AHashSet<&str> = existing.iter().map(|word| word.text.as_str()).collect();
        let missing: Vec<String> = texts
            .iter()
            .filter(|text| !known.contains(text.as_str()))
            .cloned()
            .collect();
        self.add_words(&missing)?;

        let mut by_text: AHashMap<String, WordEntry> = self
            .get_words(&texts)?
            .into_iter()
            .map(|word| (word.text.clone(), word))
            .collect();
        Ok(texts
            .iter()
            .filter_map(|text| by_text.remove(text))
            .collect())
    }

    /// Make the transaction's writes visible and durable.
    fn commit(self: Box<Self>) -> Result<()>;
}

/// Drop repeated texts, keeping first occurrences in order.
pub(crate) fn distinct(texts: &[String]) -> Vec<String> {
    let mut seen = AHashSet::with_capacity(texts.len());
    texts
        .iter()
        .filter(|text| seen.insert(text.as_str()))
        .cloned()
        .collect()
}
