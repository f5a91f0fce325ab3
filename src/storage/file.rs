//! Durable index store backed by a snapshot and a journal.
//!
//! [`FileIndexStore`] keeps the same tables as the memory store. Each commit
//! appends the rows it changed to a journal file next to the snapshot, so the
//! cost of a commit follows the size of the transaction. Once the journal
//! outgrows the snapshot it is folded into a new snapshot.
//!
//! Files, for an index at `index.wdl`:
//!
//! - `index.wdl`: bincode snapshot with a magic number and format version,
//!   replaced atomically (temporary file, `sync_all`, rename)
//! - `index.wdl.journal`: committed deltas, each framed as
//!   `[length: u32][crc32: u32][bincode delta]`
//!
//! Opening the store loads the snapshot and replays the journal. A torn
//! record at the end of the journal (a commit that never returned) is cut
//! off.
//!
//! # Example
//!
//! ```
//! use wordlink::storage::file::FileIndexStore;
//! use wordlink::storage::SearchIndexStore;
//!
//! # fn main() -> wordlink::error::Result<()> {
//! let dir = tempfile::tempdir()?;
//! let path = dir.path().join("index.wdl");
//!
//! let store = FileIndexStore::open(&path)?;
//! let mut tx = store.begin()?;
//! tx.upsert_words(&["persisted".to_string()])?;
//! tx.commit()?;
//! drop(store);
//!
//! let reopened = FileIndexStore::open(&path)?;
//! assert!(reopened.word("persisted")?.is_some());
//! # Ok(())
//! # }
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::document::ContentId;
use crate::error::{Result, WordlinkError};
use crate::storage::memory::{IndexTables, StoreCore, TableDelta};
use crate::storage::{IndexTransaction, ObjectWordLink, SearchIndexStore, WordEntry, WordId};

/// Snapshot file magic number ("WDLK").
const SNAPSHOT_MAGIC: u32 = 0x5744_4C4B;

/// Snapshot format version.
const SNAPSHOT_VERSION: u32 = 2;

/// The journal is never compacted below this size.
const JOURNAL_COMPACTION_MIN_BYTES: u64 = 4 * 1024 * 1024;

/// Journal record header: payload length and checksum.
const RECORD_HEADER_LEN: usize = 8;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    magic: u32,
    version: u32,
    tables: &'a IndexTables,
}

#[derive(Deserialize)]
struct Snapshot {
    magic: u32,
    version: u32,
    tables: IndexTables,
}

/// Write `tables` to `path` atomically.
///
/// # Returns
///
/// The size of the snapshot in bytes.
pub(crate) fn write_snapshot(path: &Path, tables: &IndexTables) -> Result<u64> {
    let snapshot = SnapshotRef {
        magic: SNAPSHOT_MAGIC,
        version: SNAPSHOT_VERSION,
        tables,
    };
    let bytes = bincode::serde::encode_to_vec(&snapshot, bincode::config::standard())?;

    let temp_path = temp_path(path);
    let written = write_file(&temp_path, &bytes).and_then(|()| {
        fs::rename(&temp_path, path).map_err(|e| {
            WordlinkError::storage(format!(
                "failed to move snapshot into place at {}: {e}",
                path.display()
            ))
        })
    });
    if let Err(error) = written {
        if let Err(e) = fs::remove_file(&temp_path) {
            tracing::debug!(
                target: "wordlink::storage",
                path = %temp_path.display(),
                error = %e,
                "temporary snapshot not removed"
            );
        }
        return Err(error);
    }

    tracing::debug!(
        target: "wordlink::storage",
        path = %path.display(),
        bytes = bytes.len(),
        "snapshot written"
    );
    Ok(bytes.len() as u64)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

/// Read the tables stored at `path`.
pub(crate) fn read_snapshot(path: &Path) -> Result<IndexTables> {
    let bytes = fs::read(path)?;
    let (snapshot, _): (Snapshot, usize) =
        bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;

    if snapshot.magic != SNAPSHOT_MAGIC {
        return Err(WordlinkError::storage(format!(
            "{} is not an index snapshot",
            path.display()
        )));
    }
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(WordlinkError::storage(format!(
            "unsupported snapshot version: {}",
            snapshot.version
        )));
    }
    Ok(snapshot.tables)
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

fn temp_path(path: &Path) -> PathBuf {
    sibling_path(path, ".tmp")
}

fn journal_path(path: &Path) -> PathBuf {
    sibling_path(path, ".journal")
}

fn encode_record(delta: &TableDelta) -> Result<Vec<u8>> {
    let payload = bincode::serde::encode_to_vec(delta, bincode::config::standard())?;
    let length = u32::try_from(payload.len()).map_err(|_| {
        WordlinkError::resource_exhausted(format!(
            "journal record of {} bytes is too large",
            payload.len()
        ))
    })?;

    let mut record = Vec::with_capacity(RECORD_HEADER_LEN + payload.len());
    record.extend_from_slice(&length.to_le_bytes());
    record.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    record.extend_from_slice(&payload);
    Ok(record)
}

/// Decode the journal records in `bytes`.
///
/// Returns the deltas and the length of the intact prefix.
fn decode_records(bytes: &[u8]) -> Result<(Vec<TableDelta>, usize)> {
    let mut deltas = Vec::new();
    let mut position = 0;

    while bytes.len() - position >= RECORD_HEADER_LEN {
        let header = &bytes[position..position + RECORD_HEADER_LEN];
        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let checksum = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        let start = position + RECORD_HEADER_LEN;
        let Some(payload) = bytes.get(start..start + length) else {
            break;
        };
        if crc32fast::hash(payload) != checksum {
            break;
        }

        let (delta, _): (TableDelta, usize) =
            bincode::serde::decode_from_slice(payload, bincode::config::standard())?;
        deltas.push(delta);
        position = start + length;
    }
    Ok((deltas, position))
}

/// The journal of a [`FileIndexStore`].
#[derive(Debug)]
pub(crate) struct Journal {
    snapshot_path: PathBuf,
    journal_path: PathBuf,
    file: Option<File>,
    journal_bytes: u64,
    snapshot_bytes: u64,
}

impl Journal {
    /// Append a committed delta, compacting when the journal has grown.
    pub(crate) fn append(&mut self, delta: &TableDelta, tables: &IndexTables) -> Result<()> {
        let record = encode_record(delta)?;
        self.write_record(&record)?;
        self.journal_bytes += record.len() as u64;

        if self.journal_bytes > self.snapshot_bytes.max(JOURNAL_COMPACTION_MIN_BYTES) {
            self.compact(tables)?;
        }
        Ok(())
    }

    fn write_record(&mut self, record: &[u8]) -> Result<()> {
        let mut file = match self.file.take() {
            Some(file) => file,
            None => OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.journal_path)?,
        };

        match file.write_all(record).and_then(|()| file.sync_data()) {
            Ok(()) => {
                self.file = Some(file);
                Ok(())
            }
            Err(error) => {
                // Cut off whatever part of the record reached the file.
                if let Err(e) = file.set_len(self.journal_bytes) {
                    tracing::warn!(
                        target: "wordlink::storage",
                        path = %self.journal_path.display(),
                        error = %e,
                        "failed to truncate journal after a failed append"
                    );
                }
                Err(error.into())
            }
        }
    }

    /// Write `tables` as the new snapshot and empty the journal.
    ///
    /// The snapshot is in place before the journal is emptied; replaying an
    /// old journal over a newer snapshot is harmless.
    pub(crate) fn compact(&mut self, tables: &IndexTables) -> Result<()> {
        self.snapshot_bytes = write_snapshot(&self.snapshot_path, tables)?;

        self.file = None;
        File::create(&self.journal_path)?.sync_all()?;
        self.journal_bytes = 0;

        tracing::info!(
            target: "wordlink::storage",
            path = %self.snapshot_path.display(),
            snapshot_bytes = self.snapshot_bytes,
            "journal compacted"
        );
        Ok(())
    }
}

/// A [`SearchIndexStore`] persisted to a snapshot file and its journal.
#[derive(Debug)]
pub struct FileIndexStore {
    path: PathBuf,
    core: StoreCore,
}

impl FileIndexStore {
    /// Open the index at `path`, starting empty if nothing exists there yet.
    ///
    /// Nothing is written until the first commit.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (mut tables, snapshot_bytes) = if path.exists() {
            (read_snapshot(&path)?, fs::metadata(&path)?.len())
        } else {
            (IndexTables::default(), 0)
        };

        let journal_path = journal_path(&path);
        let mut journal_bytes = 0;
        if journal_path.exists() {
            let bytes = fs::read(&journal_path)?;
            let (deltas, intact) = decode_records(&bytes)?;
            let replayed = deltas.len();
            for delta in deltas {
                tables.apply(delta);
            }

            if intact < bytes.len() {
                tracing::warn!(
                    target: "wordlink::storage",
                    path = %journal_path.display(),
                    discarded = bytes.len() - intact,
                    "incomplete journal record discarded"
                );
                OpenOptions::new()
                    .write(true)
                    .open(&journal_path)?
                    .set_len(intact as u64)?;
            }
            journal_bytes = intact as u64;
            tracing::debug!(
                target: "wordlink::storage",
                records = replayed,
                "journal replayed"
            );
        }

        tracing::info!(
            target: "wordlink::storage",
            path = %path.display(),
            words = tables.word_count(),
            links = tables.link_count(),
            "index opened"
        );

        let journal = Journal {
            snapshot_path: path.clone(),
            journal_path,
            file: None,
            journal_bytes,
            snapshot_bytes,
        };
        Ok(FileIndexStore {
            path,
            core: StoreCore::new(tables, Some(journal)),
        })
    }

    /// Location of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fold the journal into a new snapshot now.
    ///
    /// Waits for an open writer transaction to finish.
    pub fn compact(&self) -> Result<()> {
        self.core.compact()
    }
}

impl SearchIndexStore for FileIndexStore {
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

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::storage::NO_WORD;

    fn link(word_id: WordId, content_id: ContentId) -> ObjectWordLink {
        ObjectWordLink {
            word_id,
            content_id,
            frequency: 1,
            placement: 0,
            next_word_id: NO_WORD,
            prev_word_id: NO_WORD,
            content_type_id: 2,
            field_definition_id: 7,
            field_definition_identifier: "body".to_string(),
            published: false,
            section_id: 3,
            integer_value: 12,
            language_mask: 2,
        }
    }

    fn add_content(store: &FileIndexStore, content_id: ContentId) {
        let mut tx = store.begin().unwrap();
        let words = tx
            .upsert_words(&[format!("word{content_id}"), "shared".to_string()])
            .unwrap();
        let mut second = link(words[1].id, content_id);
        second.placement = 1;
        tx.add_object_word_links(&[link(words[0].id, content_id), second])
            .unwrap();
        tx.commit().unwrap();
    }

    fn file_len(path: &Path) -> u64 {
        fs::metadata(path).map(|m| m.len()).unwrap_or(0)
    }

    #[test]
    fn test_open_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.wdl");
        let store = FileIndexStore::open(&path).unwrap();

        assert_eq!(store.word_count().unwrap(), 0);
        assert!(!path.exists());
        assert!(!journal_path(&path).exists());
        assert_eq!(store.path(), path.as_path());
    }

    #[test]
    fn test_commit_persists_tables() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.wdl");

        {
            let store = FileIndexStore::open(&path).unwrap();
            let mut tx = store.begin().unwrap();
            let words = tx.upsert_words(&["twelve".to_string()]).unwrap();
            tx.add_object_word_links(&[link(words[0].id, 5)]).unwrap();
            tx.commit().unwrap();
        }

        let store = FileIndexStore::open(&path).unwrap();
        let word = store.word("twelve").unwrap().unwrap();
        assert_eq!(word.object_count, 1);
        assert_eq!(store.links_for_content(5).unwrap(), vec![link(word.id, 5)]);
        assert_eq!(store.contents_for_word(word.id).unwrap(), vec![5]);
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_rolled_back_transaction_not_persisted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.wdl");

        {
            let store = FileIndexStore::open(&path).unwrap();
            let mut tx = store.begin().unwrap();
            tx.upsert_words(&["kept".to_string()]).unwrap();
            tx.commit().unwrap();

            let mut tx = store.begin().unwrap();
            tx.upsert_words(&["lost".to_string()]).unwrap();
        }

        let store = FileIndexStore::open(&path).unwrap();
        assert!(store.word("kept").unwrap().is_some());
        assert!(store.word("lost").unwrap().is_none());
    }

    #[test]
    fn test_commit_appends_only_its_own_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.wdl");
        let journal = journal_path(&path);
        let store = FileIndexStore::open(&path).unwrap();

        let appended = |content_id: ContentId| {
            let before = file_len(&journal);
            add_content(&store, content_id);
            file_len(&journal) - before
        };

        let early = appended(1);
        for content_id in 2..500 {
            add_content(&store, content_id);
        }
        let late = appended(500);

        assert!(late <= early + 16, "early {early} bytes, late {late} bytes");
        assert!(!path.exists(), "snapshot rewritten before compaction");

        drop(store);
        let store = FileIndexStore::open(&path).unwrap();
        assert_eq!(store.link_count().unwrap(), 1000);
        assert_eq!(store.word("shared").unwrap().unwrap().object_count, 500);
    }

    #[test]
    fn test_compact_folds_journal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.wdl");

        {
            let store = FileIndexStore::open(&path).unwrap();
            for content_id in 1..=10 {
                add_content(&store, content_id);
            }
            store.compact().unwrap();
            assert!(path.exists());
            assert_eq!(file_len(&journal_path(&path)), 0);

            let mut tx = store.begin().unwrap();
            tx.delete_object_word_links(3).unwrap();
            tx.commit().unwrap();
        }

        let store = FileIndexStore::open(&path).unwrap();
        assert_eq!(store.link_count().unwrap(), 18);
        assert_eq!(store.words().unwrap().len(), 11);
    }

    #[test]
    fn test_replaying_journal_over_newer_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.wdl");

        {
            let store = FileIndexStore::open(&path).unwrap();
            add_content(&store, 1);
            add_content(&store, 2);
        }
        let journal = fs::read(journal_path(&path)).unwrap();

        {
            let store = FileIndexStore::open(&path).unwrap();
            store.compact().unwrap();
        }
        // A crash between writing the snapshot and emptying the journal.
        fs::write(journal_path(&path), &journal).unwrap();

        let store = FileIndexStore::open(&path).unwrap();
        assert_eq!(store.word("shared").unwrap().unwrap().object_count, 2);
        assert_eq!(store.link_count().unwrap(), 4);
    }

    #[test]
    fn test_torn_journal_tail_discarded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.wdl");

        {
            let store = FileIndexStore::open(&path).unwrap();
            add_content(&store, 1);
        }
        let intact = file_len(&journal_path(&path));
        let mut file = OpenOptions::new()
            .append(true)
            .open(journal_path(&path))
            .unwrap();
        file.write_all(&[200, 0, 0, 0, 1, 2, 3, 4, 5]).unwrap();
        drop(file);

        {
            let store = FileIndexStore::open(&path).unwrap();
            assert_eq!(store.link_count().unwrap(), 2);
            assert_eq!(file_len(&journal_path(&path)), intact);
            add_content(&store, 2);
        }

        let store = FileIndexStore::open(&path).unwrap();
        assert_eq!(store.link_count().unwrap(), 4);
    }

    #[test]
    fn test_corrupt_snapshot_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.wdl");
        fs::write(&path, b"definitely not a snapshot").unwrap();

        assert!(FileIndexStore::open(&path).is_err());
    }

    #[test]
    fn test_failed_snapshot_leaves_no_temporary_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.wdl");
        // A non-empty directory cannot be replaced by a file.
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), b"x").unwrap();

        assert!(write_snapshot(&path, &IndexTables::default()).is_err());
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_sibling_paths() {
        assert_eq!(
            temp_path(Path::new("/data/index.wdl")),
            PathBuf::from("/data/index.wdl.tmp")
        );
        assert_eq!(
            journal_path(Path::new("/data/index.wdl")),
            PathBuf::from("/data/index.wdl.journal")
        );
    }
}
