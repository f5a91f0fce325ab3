//! Index orchestration.
//!
//! [`SearchIndexer`] is the entry point of the crate. Each operation runs in
//! one store transaction:
//!
//! - [`index`](SearchIndexer::index) replaces everything stored for a content
//!   object: unlink the previous version, resolve the new words, write the
//!   new links, delete words nobody references any more.
//! - [`remove`](SearchIndexer::remove) unlinks a content object.
//! - [`purge_index`](SearchIndexer::purge_index) empties the index.
//!
//! If any step fails the transaction is dropped and the index is unchanged.
//! Field values are tokenized before the transaction starts, so the writer
//! lock is not held while text is analyzed.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use wordlink::prelude::*;
//!
//! # fn main() -> wordlink::error::Result<()> {
//! let store = Arc::new(MemoryIndexStore::new());
//! let languages = Arc::new(StaticLanguageRegistry::with_languages(["eng-GB"])?);
//! let indexer = SearchIndexer::new(store.clone(), languages, IndexerConfig::default())?;
//!
//! let data = FullTextData::builder(10)
//!     .add_value(FullTextValue::new("Hello World", 1, "title", "eng-GB").always_available())
//!     .build();
//! let stats = indexer.index(&data)?;
//! assert_eq!(stats.tokens, 2);
//!
//! let links = store.links_for_content(10)?;
//! assert_eq!(links[0].next_word_id, links[1].word_id);
//!
//! indexer.remove(10, None)?;
//! assert_eq!(store.word_count()?, 0);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::instrument;

use crate::analysis::tokenizer::FieldTokenizer;
use crate::analysis::transform::{StandardTransformationProcessor, TransformationProcessor};
use crate::config::IndexerConfig;
use crate::document::{ContentId, FullTextData};
use crate::error::{Result, WordlinkError};
use crate::index::dictionary::WordDictionary;
use crate::index::links::{DocumentToken, LinkBuilder};
use crate::language::registry::LanguageRegistry;
use crate::storage::{IndexTransaction, SearchIndexStore};

/// What [`SearchIndexer::remove`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveStats {
    /// The content object.
    pub content_id: ContentId,

    /// Link rows deleted.
    pub links_deleted: u64,

    /// Distinct words that lost a reference.
    pub words_released: usize,

    /// Words deleted because nothing references them any more.
    pub words_deleted: u64,
}

/// What [`SearchIndexer::index`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// The content object.
    pub content_id: ContentId,

    /// Tokens produced by all field values.
    pub tokens: usize,

    /// Distinct token texts.
    pub distinct_words: usize,

    /// Words no other content object references.
    pub new_words: usize,

    /// Dictionary round-trips.
    pub word_chunks: usize,

    /// Link write batches.
    pub link_batches: usize,

    /// Cleanup of the previously indexed version.
    pub removed: RemoveStats,
}

/// A content object [`SearchIndexer::bulk_index`] could not index.
#[derive(Debug)]
pub struct BulkIndexFailure {
    /// The content object.
    pub content_id: ContentId,

    /// Why indexing failed.
    pub error: WordlinkError,
}

/// Per-item outcome of [`SearchIndexer::bulk_index`].
#[derive(Debug, Default)]
pub struct BulkIndexReport {
    /// Items that were indexed and committed.
    pub indexed: Vec<IndexStats>,

    /// Items that were left untouched because indexing failed.
    pub failed: Vec<BulkIndexFailure>,
}

impl BulkIndexReport {
    /// Whether every item was indexed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Ids of the indexed content objects, in input order.
    pub fn indexed_ids(&self) -> Vec<ContentId> {
        self.indexed.iter().map(|stats| stats.content_id).collect()
    }
}

/// Indexes content objects into a [`SearchIndexStore`].
#[derive(Debug)]
pub struct SearchIndexer {
    store: Arc<dyn SearchIndexStore>,
    languages: Arc<dyn LanguageRegistry>,
    tokenizer: FieldTokenizer,
    dictionary: WordDictionary,
    links: LinkBuilder,
    config: IndexerConfig,
}

impl SearchIndexer {
    /// Create an indexer using the standard transformation processor.
    pub fn new(
        store: Arc<dyn SearchIndexStore>,
        languages: Arc<dyn LanguageRegistry>,
        config: IndexerConfig,
    ) -> Result<Self> {
        Self::with_processor(
            store,
            languages,
            Arc::new(StandardTransformationProcessor::new()),
            config,
        )
    }

    /// Create an indexer with a custom transformation processor.
    pub fn with_processor(
        store: Arc<dyn SearchIndexStore>,
        languages: Arc<dyn LanguageRegistry>,
        processor: Arc<dyn TransformationProcessor>,
        config: IndexerConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(SearchIndexer {
            store,
            languages,
            tokenizer: FieldTokenizer::new(processor, &config),
            dictionary: WordDictionary::new(config.word_chunk_size)?,
            links: LinkBuilder::new(config.link_batch_size)?,
            config,
        })
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn SearchIndexStore> {
        &self.store
    }

    /// The configuration in use.
    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Index a content object, replacing whatever was indexed for it before.
    ///
    /// Indexing the same data twice leaves the index as one call would.
    #[instrument(target = "wordlink::index", skip_all, fields(content_id = data.content_id))]
    pub fn index(&self, data: &FullTextData) -> Result<IndexStats> {
        let tokens = self.tokenize(data)?;

        let mut tx = self.store.begin()?;
        let stats = self.index_in(tx.as_mut(), data, &tokens)?;
        tx.commit()?;

        tracing::info!(
            target: "wordlink::index",
            content_id = data.content_id,
            tokens = stats.tokens,
            words = stats.distinct_words,
            new_words = stats.new_words,
            "content indexed"
        );
        Ok(stats)
    }

    /// Index content objects one transaction at a time.
    ///
    /// A failed item is reported and skipped; items before and after it are
    /// still committed.
    #[instrument(target = "wordlink::index", skip_all)]
    pub fn bulk_index<'a, I>(&self, items: I) -> BulkIndexReport
    where
        I: IntoIterator<Item = &'a FullTextData>,
    {
        let mut report = BulkIndexReport::default();
        for data in items {
            match self.index(data) {
                Ok(stats) => report.indexed.push(stats),
                Err(error) => {
                    tracing::warn!(
                        target: "wordlink::index",
                        content_id = data.content_id,
                        %error,
                        "bulk item failed"
                    );
                    report.failed.push(BulkIndexFailure {
                        content_id: data.content_id,
                        error,
                    });
                }
            }
        }

        tracing::info!(
            target: "wordlink::index",
            indexed = report.indexed.len(),
            failed = report.failed.len(),
            "bulk indexing finished"
        );
        report
    }

    /// Index content objects in a single transaction.
    ///
    /// Either every item is committed or, on the first error, none is.
    #[instrument(target = "wordlink::index", skip_all)]
    pub fn bulk_index_atomic<'a, I>(&self, items: I) -> Result<Vec<IndexStats>>
    where
        I: IntoIterator<Item = &'a FullTextData>,
    {
        let prepared = items
            .into_iter()
            .map(|data| -> Result<_> { Ok((data, self.tokenize(data)?)) })
            .collect::<Result<Vec<_>>>()?;

        let mut tx = self.store.begin()?;
        let mut all_stats = Vec::with_capacity(prepared.len());
        for (data, tokens) in &prepared {
            all_stats.push(self.index_in(tx.as_mut(), data, tokens)?);
        }
        tx.commit()?;

        tracing::info!(
            target: "wordlink::index",
            indexed = all_stats.len(),
            "bulk indexing committed"
        );
        Ok(all_stats)
    }

    /// Remove a content object from the index.
    ///
    /// `version_id` is accepted for callers that track versions; the whole
    /// content object is removed either way.
    #[instrument(target = "wordlink::index", skip_all, fields(content_id = content_id))]
    pub fn remove(&self, content_id: ContentId, version_id: Option<u64>) -> Result<RemoveStats> {
        if let Some(version_id) = version_id {
            tracing::debug!(
                target: "wordlink::index",
                content_id,
                version_id,
                "version id ignored, removing every version"
            );
        }

        let mut tx = self.store.begin()?;
        let mut stats = self.unlink(tx.as_mut(), content_id)?;
        stats.words_deleted = self.dictionary.sweep(tx.as_mut())?;
        tx.commit()?;

        tracing::debug!(
            target: "wordlink::index",
            content_id,
            links_deleted = stats.links_deleted,
            words_deleted = stats.words_deleted,
            "content removed"
        );
        Ok(stats)
    }

    /// Delete every word and every link.
    #[instrument(target = "wordlink::index", skip_all)]
    pub fn purge_index(&self) -> Result<()> {
        let mut tx = self.store.begin()?;
        tx.purge()?;
        tx.commit()?;

        tracing::info!(target: "wordlink::index", "index purged");
        Ok(())
    }

    /// Tokens of every field value, in field order.
    fn tokenize(&self, data: &FullTextData) -> Result<Vec<DocumentToken>> {
        let mut tokens = Vec::new();
        for (value_index, value) in data.values.iter().enumerate() {
            tokens.extend(
                self.tokenizer
                    .tokenize(value)?
                    .map(|token| DocumentToken { token, value_index }),
            );
        }
        Ok(tokens)
    }

    fn index_in(
        &self,
        tx: &mut dyn IndexTransaction,
        data: &FullTextData,
        tokens: &[DocumentToken],
    ) -> Result<IndexStats> {
        let mut removed = self.unlink(tx, data.content_id)?;

        let texts: Vec<String> = tokens
            .iter()
            .map(|document_token| document_token.token.text.clone())
            .collect();
        let resolution = self.dictionary.resolve(tx, &texts)?;

        let links = self
            .links
            .build(data, tokens, &resolution.word_ids, self.languages.as_ref())?;
        let link_batches = self.links.persist(tx, &links)?;
        tracing::debug!(
            target: "wordlink::index",
            links = links.len(),
            batches = link_batches,
            "links written"
        );

        removed.words_deleted = self.dictionary.sweep(tx)?;

        Ok(IndexStats {
            content_id: data.content_id,
            tokens: tokens.len(),
            distinct_words: resolution.word_ids.len(),
            new_words: resolution.new_words,
            word_chunks: resolution.chunks,
            link_batches,
            removed,
        })
    }

    /// Delete the links of a content object and release its words.
    fn unlink(&self, tx: &mut dyn IndexTransaction, content_id: ContentId) -> Result<RemoveStats> {
        let word_ids = tx.get_content_object_words(content_id)?;
        let words_released = self.dictionary.release(tx, &word_ids)?;
        let links_deleted = tx.delete_object_word_links(content_id)?;

        Ok(RemoveStats {
            content_id,
            links_deleted,
            words_released,
            words_deleted: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::FullTextValue;
    use crate::language::registry::StaticLanguageRegistry;
    use crate::storage::memory::MemoryIndexStore;

    fn indexer() -> (Arc<MemoryIndexStore>, SearchIndexer) {
        let store = Arc::new(MemoryIndexStore::new());
        let languages =
            Arc::new(StaticLanguageRegistry::with_languages(["eng-GB", "ger-DE"]).unwrap());
        let indexer = SearchIndexer::new(store.clone(), languages, IndexerConfig::default()).unwrap();
        (store, indexer)
    }

    fn text(content_id: ContentId, value: &str) -> FullTextData {
        FullTextData::builder(content_id)
            .add_text(1, "body", value, "eng-GB")
            .build()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let store = Arc::new(MemoryIndexStore::new());
        let languages = Arc::new(StaticLanguageRegistry::new());
        let config = IndexerConfig::default().with_word_chunk_size(0);
        assert!(SearchIndexer::new(store, languages, config).is_err());
    }

    #[test]
    fn test_index_stats() {
        let (_, indexer) = indexer();
        let stats = indexer.index(&text(1, "one two one three")).unwrap();

        assert_eq!(stats.content_id, 1);
        assert_eq!(stats.tokens, 4);
        assert_eq!(stats.distinct_words, 3);
        assert_eq!(stats.new_words, 3);
        assert_eq!(stats.word_chunks, 1);
        assert_eq!(stats.link_batches, 1);
        assert_eq!(stats.removed, RemoveStats { content_id: 1, ..RemoveStats::default() });
    }

    #[test]
    fn test_reindex_reports_cleanup() {
        let (store, indexer) = indexer();
        indexer.index(&text(1, "hello world")).unwrap();
        let stats = indexer.index(&text(1, "hello mars")).unwrap();

        assert_eq!(stats.removed.links_deleted, 2);
        assert_eq!(stats.removed.words_released, 2);
        assert_eq!(stats.removed.words_deleted, 1);
        assert!(store.word("world").unwrap().is_none());
    }

    #[test]
    fn test_empty_content_has_no_links() {
        let (store, indexer) = indexer();
        let stats = indexer
            .index(&FullTextData::builder(3).add_text(1, "body", "  ", "eng-GB").build())
            .unwrap();

        assert_eq!(stats.tokens, 0);
        assert_eq!(stats.word_chunks, 0);
        assert_eq!(stats.link_batches, 0);
        assert_eq!(store.link_count().unwrap(), 0);
    }

    #[test]
    fn test_remove_unknown_content_is_noop() {
        let (store, indexer) = indexer();
        indexer.index(&text(1, "kept")).unwrap();
        let stats = indexer.remove(99, Some(4)).unwrap();

        assert_eq!(stats.links_deleted, 0);
        assert_eq!(stats.words_deleted, 0);
        assert_eq!(store.word_count().unwrap(), 1);
    }

    #[test]
    fn test_unknown_language_leaves_index_untouched() {
        let (store, indexer) = indexer();
        indexer.index(&text(1, "original")).unwrap();

        let bad = FullTextData::builder(1)
            .add_text(1, "body", "replacement", "fre-FR")
            .build();
        assert!(matches!(indexer.index(&bad), Err(WordlinkError::Language(_))));

        assert!(store.word("original").unwrap().is_some());
        assert!(store.word("replacement").unwrap().is_none());
        assert_eq!(store.links_for_content(1).unwrap().len(), 1);
    }

    #[test]
    fn test_purge_index() {
        let (store, indexer) = indexer();
        indexer.index(&text(1, "alpha beta")).unwrap();
        indexer.purge_index().unwrap();

        assert_eq!(store.word_count().unwrap(), 0);
        assert_eq!(store.link_count().unwrap(), 0);
    }

    #[test]
    fn test_bulk_report() {
        let (_, indexer) = indexer();
        let bad = FullTextData::builder(2)
            .add_value(FullTextValue::new("oops", 1, "body", "xx-XX"))
            .build();
        let items = vec![text(1, "first"), bad, text(3, "third")];

        let report = indexer.bulk_index(&items);
        assert!(!report.is_complete());
        assert_eq!(report.indexed_ids(), vec![1, 3]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].content_id, 2);
    }
}
