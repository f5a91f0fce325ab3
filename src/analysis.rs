//! Text analysis for the word index.
//!
//! This module turns one field value into the normalized words stored in the
//! dictionary. A value first goes through the transformation pipeline
//! ([`transform`]), is then split into words ([`tokenizer`]), and each word is
//! lowercased, trimmed and truncated before it becomes a [`token::Token`].

pub mod token;
pub mod tokenizer;
pub mod transform;
