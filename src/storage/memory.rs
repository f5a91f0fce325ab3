//! In-memory index store.
//!
//! The tables live behind a [`parking_lot::RwLock`]. A writer transaction
//! holds the write lock from `begin` until it is committed or dropped, so
//! writers run one at a time and readers only ever see committed state.
//! Reading the store from a thread that holds an open transaction blocks.
//!
//! A transaction changes the tables in place. The first time it touches a
//! word or a content object's links it saves the previous row in an undo
//! log, and dropping the transaction without a commit replays that log
//! backwards. Both costs follow the size of the transaction, not the size of
//! the index. The set of touched keys doubles as the delta the file store
//! appends to its journal.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_MAX_WORD_LENGTH;
use crate::document::ContentId;
use crate::error::{Result, WordlinkError};
use crate::storage::file::Journal;
use crate::storage::{
    IndexTransaction, NO_WORD, ObjectWordLink, SearchIndexStore, WordEntry, WordId, distinct,
};

/// The word and link tables with their indexes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct IndexTables {
    /// Last assigned word id, 0 when none was assigned.
    last_word_id: WordId,

    /// Words by id.
    words: BTreeMap<WordId, WordEntry>,

    /// Unique index on word text.
    word_ids: BTreeMap<String, WordId>,

    /// Links by content id, in insertion order.
    links: BTreeMap<ContentId, Vec<ObjectWordLink>>,

    /// Content ids by word id.
    postings: BTreeMap<WordId, BTreeSet<ContentId>>,

    /// Ids of words with an object count of zero.
    unreferenced: BTreeSet<WordId>,
}

impl IndexTables {
    fn check_word_text(text: &str) -> Result<()> {
        let length = text.chars().count();
        if length > DEFAULT_MAX_WORD_LENGTH {
            return Err(WordlinkError::constraint(format!(
                "word text of {length} characters exceeds {DEFAULT_MAX_WORD_LENGTH}"
            )));
        }
        Ok(())
    }

    /// Insert or replace a word row.
    fn put_word(&mut self, entry: WordEntry) {
        if entry.object_count == 0 {
            self.unreferenced.insert(entry.id);
        } else {
            self.unreferenced.remove(&entry.id);
        }
        self.last_word_id = self.last_word_id.max(entry.id);
        self.word_ids.insert(entry.text.clone(), entry.id);
        self.words.insert(entry.id, entry);
    }

    fn remove_word(&mut self, word_id: WordId) -> Option<WordEntry> {
        let entry = self.words.remove(&word_id)?;
        self.word_ids.remove(&entry.text);
        self.unreferenced.remove(&word_id);
        Some(entry)
    }

    /// Replace the links of a content object and return the previous ones.
    fn set_links(
        &mut self,
        content_id: ContentId,
        links: Option<Vec<ObjectWordLink>>,
    ) -> Option<Vec<ObjectWordLink>> {
        let previous = self.links.remove(&content_id);
        for link in previous.iter().flatten() {
            if let Some(contents) = self.postings.get_mut(&link.word_id) {
                contents.remove(&content_id);
                if contents.is_empty() {
                    self.postings.remove(&link.word_id);
                }
            }
        }

        if let Some(links) = links.filter(|links| !links.is_empty()) {
            for link in &links {
                self.postings
                    .entry(link.word_id)
                    .or_default()
                    .insert(content_id);
            }
            self.links.insert(content_id, links);
        }
        previous
    }

    fn append_link(&mut self, link: ObjectWordLink) {
        self.postings
            .entry(link.word_id)
            .or_default()
            .insert(link.content_id);
        self.links.entry(link.content_id).or_default().push(link);
    }

    /// Replay a committed delta.
    ///
    /// Applying the same sequence of deltas over a newer copy of the tables
    /// gives the same result, so a journal may be replayed over a snapshot
    /// that already contains part of it.
    pub(crate) fn apply(&mut self, delta: TableDelta) {
        if delta.purged {
            *self = IndexTables::default();
        }
        for (word_id, word) in delta.words {
            match word {
                Some(entry) => self.put_word(entry),
                None => {
                    self.remove_word(word_id);
                }
            }
        }
        for (content_id, links) in delta.links {
            self.set_links(content_id, Some(links));
        }
        self.last_word_id = delta.last_word_id;
    }

    fn get_words(&self, texts: &[String]) -> Vec<WordEntry> {
        texts
            .iter()
            .filter_map(|text| self.word_ids.get(text))
            .filter_map(|id| self.words.get(id))
            .cloned()
            .collect()
    }

    fn get_content_object_words(&self, content_id: ContentId) -> Vec<WordId> {
        let mut seen = BTreeSet::new();
        self.links
            .get(&content_id)
            .map(|links| {
                links
                    .iter()
                    .map(|link| link.word_id)
                    .filter(|id| seen.insert(*id))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn word(&self, text: &str) -> Option<WordEntry> {
        self.word_ids
            .get(text)
            .and_then(|id| self.words.get(id))
            .cloned()
    }

    pub(crate) fn words(&self) -> Vec<WordEntry> {
        self.words.values().cloned().collect()
    }

    pub(crate) fn links_for_content(&self, content_id: ContentId) -> Vec<ObjectWordLink> {
        let mut links = self.links.get(&content_id).cloned().unwrap_or_default();
        links.sort_by_key(|link| link.placement);
        links
    }

    pub(crate) fn contents_for_word(&self, word_id: WordId) -> Vec<ContentId> {
        self.postings
            .get(&word_id)
            .map(|contents| contents.iter().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn word_count(&self) -> usize {
        self.words.len()
    }

    pub(crate) fn link_count(&self) -> usize {
        self.links.values().map(Vec::len).sum()
    }
}

/// The rows a committed transaction changed, in their final state.
///
/// A word mapped to `None` was deleted; a content object mapped to an empty
/// list has no links any more.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TableDelta {
    purged: bool,
    last_word_id: WordId,
    words: Vec<(WordId, Option<WordEntry>)>,
    links: Vec<(ContentId, Vec<ObjectWordLink>)>,
}

impl TableDelta {
    pub(crate) fn is_empty(&self) -> bool {
        !self.purged && self.words.is_empty() && self.links.is_empty()
    }
}

/// How to restore a row a transaction changed.
#[derive(Debug)]
enum Undo {
    Word {
        word_id: WordId,
        before: Option<WordEntry>,
    },
    Links {
        content_id: ContentId,
        before: Option<Vec<ObjectWordLink>>,
    },
    Purge(Box<IndexTables>),
}

/// Tables plus the optional journal, shared by the memory and file stores.
#[derive(Debug, Default)]
pub(crate) struct StoreCore {
    tables: RwLock<IndexTables>,
    journal: Option<Mutex<Journal>>,
}

impl StoreCore {
    pub(crate) fn new(tables: IndexTables, journal: Option<Journal>) -> Self {
        StoreCore {
            tables: RwLock::new(tables),
            journal: journal.map(Mutex::new),
        }
    }

    /// Start a writer transaction; blocks while another one is open.
    pub(crate) fn begin(&self) -> MemoryTransaction<'_> {
        let tables = self.tables.write();
        MemoryTransaction {
            last_word_id: tables.last_word_id,
            tables,
            journal: self.journal.as_ref(),
            undo: Vec::new(),
            touched_words: BTreeSet::new(),
            touched_contents: BTreeSet::new(),
            purged: false,
            saved_rows: 0,
            committed: false,
        }
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&IndexTables) -> R) -> R {
        f(&*self.tables.read())
    }

    /// Fold the journal into a fresh snapshot.
    pub(crate) fn compact(&self) -> Result<()> {
        let tables = self.tables.read();
        if let Some(journal) = &self.journal {
            journal.lock().compact(&tables)?;
        }
        Ok(())
    }
}

/// A transaction on a [`StoreCore`].
#[derive(Debug)]
pub struct MemoryTransaction<'a> {
    tables: RwLockWriteGuard<'a, IndexTables>,
    journal: Option<&'a Mutex<Journal>>,
    undo: Vec<Undo>,
    last_word_id: WordId,
    touched_words: BTreeSet<WordId>,
    touched_contents: BTreeSet<ContentId>,
    purged: bool,
    /// Rows copied into the undo log.
    saved_rows: usize,
    committed: bool,
}

impl MemoryTransaction<'_> {
    fn touch_word(&mut self, word_id: WordId) {
        if self.touched_words.insert(word_id) {
            let before = self.tables.words.get(&word_id).cloned();
            self.saved_rows += usize::from(before.is_some());
            self.undo.push(Undo::Word { word_id, before });
        }
    }

    fn touch_links(&mut self, content_id: ContentId) {
        if self.touched_contents.insert(content_id) {
            let before = self.tables.links.get(&content_id).cloned();
            self.saved_rows += before.as_ref().map_or(0, Vec::len);
            self.undo.push(Undo::Links { content_id, before });
        }
    }

    fn insert_word(&mut self, text: &str) -> WordEntry {
        let entry = WordEntry {
            id: self.tables.last_word_id + 1,
            text: text.to_string(),
            object_count: 1,
        };
        self.touch_word(entry.id);
        self.tables.put_word(entry.clone());
        entry
    }

    fn set_object_count(&mut self, mut entry: WordEntry, object_count: u64) -> WordEntry {
        self.touch_word(entry.id);
        entry.object_count = object_count;
        self.tables.put_word(entry.clone());
        entry
    }

    fn delta(&self) -> TableDelta {
        TableDelta {
            purged: self.purged,
            last_word_id: self.tables.last_word_id,
            words: self
                .touched_words
                .iter()
                .map(|id| (*id, self.tables.words.get(id).cloned()))
                .collect(),
            links: self
                .touched_contents
                .iter()
                .map(|id| (*id, self.tables.links.get(id).cloned().unwrap_or_default()))
                .collect(),
        }
    }

    fn rollback(&mut self) {
        while let Some(undo) = self.undo.pop() {
            match undo {
                Undo::Word { word_id, before } => match before {
                    Some(entry) => self.tables.put_word(entry),
                    None => {
                        self.tables.remove_word(word_id);
                    }
                },
                Undo::Links { content_id, before } => {
                    self.tables.set_links(content_id, before);
                }
                Undo::Purge(tables) => *self.tables = *tables,
            }
        }
        self.tables.last_word_id = self.last_word_id;
    }
}

impl IndexTransaction for MemoryTransaction<'_> {
    fn get_words(&mut self, texts: &[String]) -> Result<Vec<WordEntry>> {
        Ok(self.tables.get_words(texts))
    }

    fn add_words(&mut self, texts: &[String]) -> Result<()> {
        for text in texts {
            IndexTables::check_word_text(text)?;
        }
        for text in texts {
            if !self.tables.word_ids.contains_key(text) {
                self.insert_word(text);
            }
        }
        Ok(())
    }

    fn increment_word_object_count(&mut self, word_ids: &[WordId]) -> Result<()> {
        for id in word_ids {
            if let Some(word) = self.tables.words.get(id).cloned() {
                let count = word.object_count + 1;
                self.set_object_count(word, count);
            }
        }
        Ok(())
    }

    fn decrement_word_object_count(&mut self, word_ids: &[WordId]) -> Result<()> {
        for id in word_ids {
            let Some(word) = self.tables.words.get(id).cloned() else {
                continue;
            };
            if word.object_count == 0 {
                tracing::warn!(
                    target: "wordlink::storage",
                    word_id = word.id,
                    text = %word.text,
                    "object count already zero, reference counts are inconsistent"
                );
                continue;
            }
            let count = word.object_count - 1;
            self.set_object_count(word, count);
        }
        Ok(())
    }

    fn delete_words_without_objects(&mut self) -> Result<u64> {
        let orphans: Vec<WordId> = self.tables.unreferenced.iter().copied().collect();
        for id in &orphans {
            self.touch_word(*id);
            self.tables.remove_word(*id);
        }
        Ok(orphans.len() as u64)
    }

    fn get_content_object_words(&mut self, content_id: ContentId) -> Result<Vec<WordId>> {
        Ok(self.tables.get_content_object_words(content_id))
    }

    fn delete_object_word_links(&mut self, content_id: ContentId) -> Result<u64> {
        if !self.tables.links.contains_key(&content_id) {
            return Ok(0);
        }
        self.touch_links(content_id);
        let removed = self.tables.set_links(content_id, None);
        Ok(removed.map_or(0, |links| links.len() as u64))
    }

    fn add_object_word_links(&mut self, links: &[ObjectWordLink]) -> Result<()> {
        for link in links {
            let neighbors = [link.next_word_id, link.prev_word_id]
                .into_iter()
                .filter(|id| *id != NO_WORD);
            for id in std::iter::once(link.word_id).chain(neighbors) {
                if !self.tables.words.contains_key(&id) {
                    return Err(WordlinkError::constraint(format!(
                        "link of content {} at placement {} references unknown word id {id}",
                        link.content_id, link.placement
                    )));
                }
            }
        }

        for link in links {
            self.touch_links(link.content_id);
            self.tables.append_link(link.clone());
        }
        Ok(())
    }

    fn purge(&mut self) -> Result<()> {
        let previous = std::mem::take(&mut *self.tables);
        self.undo.push(Undo::Purge(Box::new(previous)));
        self.purged = true;
        Ok(())
    }

    fn upsert_words(&mut self, texts: &[String]) -> Result<Vec<WordEntry>> {
        let texts = distinct(texts);
        for text in &texts {
            IndexTables::check_word_text(text)?;
        }

        let mut entries = Vec::with_capacity(texts.len());
        for text in &texts {
            let existing = self.tables.word(text);
            let entry = match existing {
                Some(word) => {
                    let count = word.object_count + 1;
                    self.set_object_count(word, count)
                }
                None => self.insert_word(text),
            };
            entries.push(entry);
        }
        Ok(entries)
    }

    fn commit(mut self: Box<Self>) -> Result<()> {
        if let Some(journal) = self.journal {
            let delta = self.delta();
            if !delta.is_empty() {
                journal.lock().append(&delta, &self.tables)?;
            }
        }
        self.committed = true;
        tracing::trace!(
            target: "wordlink::storage",
            words = self.touched_words.len(),
            contents = self.touched_contents.len(),
            saved_rows = self.saved_rows,
            "transaction committed"
        );
        Ok(())
    }
}

impl Drop for MemoryTransaction<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.rollback();
            tracing::debug!(
                target: "wordlink::storage",
                undone = self.touched_words.len() + self.touched_contents.len(),
                "transaction rolled back"
            );
        }
    }
}

/// An in-memory [`SearchIndexStore`].
///
/// # Example
///
/// ```
/// use wordlink::storage::memory::MemoryIndexStore;
/// use wordlink::storage::SearchIndexStore;
///
/// let store = MemoryIndexStore::new();
/// {
///     let mut tx = store.begin().unwrap();
///     tx.add_words(&["draft".to_string()]).unwrap();
///     // dropped without commit
/// }
/// assert_eq!(store.word_count().unwrap(), 0);
/// ```
#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    core: StoreCore,
}

impl MemoryIndexStore {
    /// Create an empty store.
    pub fn new() -> Self {
        MemoryIndexStore::default()
    }
}

impl SearchIndexStore for MemoryIndexStore {
    fn begin(&self) -> Result<Box<dyn IndexTransaction + '_>> {
        Ok(Box::new(self.core.begin()))
    }

    fn word(&self, text: &str) -> Result<Option<WordEntry>> {
        Ok(self.core.read(|tables| tables.word(text)))
    }

    fn words(&self) -> Result<Vec<WordEntry>> {
        Ok(self.core.read(IndexTables::words))
    }

    fn links_for_content(&self, content_id: ContentId) -> Result<Vec<ObjectWordLink>> {
        Ok(self.core.read(|tables| tables.links_for_content(content_id)))
    }

    fn contents_for_word(&self, word_id: WordId) -> Result<Vec<ContentId>> {
        Ok(self.core.read(|tables| tables.contents_for_word(word_id)))
    }

    fn word_count(&self) -> Result<usize> {
        Ok(self.core.read(IndexTables::word_count))
    }

    fn link_count(&self) -> Result<usize> {
        Ok(self.core.read(IndexTables::link_count))
    }
}
