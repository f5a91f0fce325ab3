//! # Wordlink
//!
//! A word-level full-text indexing engine for content repositories.
//!
//! Content objects are split into normalized words. Each distinct word is
//! stored once in a shared, reference-counted dictionary, and each token
//! occurrence becomes a link row recording its position, its neighbors and
//! the metadata query execution filters on.
//!
//! ## Features
//!
//! - Configurable transformation pipeline and Unicode word splitting
//! - Atomic get-or-insert-and-increment dictionary resolution
//! - Doubly linked occurrence chains for phrase and proximity queries
//! - Scoped transactions that roll back when dropped
//! - In-memory and single-file stores

pub mod analysis;
pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod language;
pub mod storage;

pub mod prelude {
    pub use crate::analysis::token::Token;
    pub use crate::analysis::tokenizer::FieldTokenizer;
    pub use crate::analysis::transform::{
        StandardTransformationProcessor, TransformationCommand, TransformationProcessor,
    };
    pub use crate::config::IndexerConfig;
    pub use crate::document::{ContentId, FullTextData, FullTextValue};
    pub use crate::error::{Result, WordlinkError};
    pub use crate::index::indexer::{BulkIndexReport, IndexStats, RemoveStats, SearchIndexer};
    pub use crate::language::mask::{LanguageId, LanguageSet};
    pub use crate::language::registry::{LanguageRegistry, StaticLanguageRegistry};
    pub use crate::storage::file::FileIndexStore;
    pub use crate::storage::memory::MemoryIndexStore;
    pub use crate::storage::{IndexTransaction, ObjectWordLink, SearchIndexStore, WordEntry, WordId};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
