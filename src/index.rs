//! Index building.
//!
//! - [`dictionary`] resolves token texts to word ids and maintains the
//!   words' object counts.
//! - [`links`] turns a content object's token sequence into link rows with
//!   placements and adjacency pointers.
//! - [`indexer`] composes both behind the public `index`, `bulk_index`,
//!   `remove` and `purge_index` operations.

pub mod dictionary;
pub mod indexer;
pub mod links;
