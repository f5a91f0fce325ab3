//! Object-word link construction.
//!
//! Every token of a content object becomes one link row. Tokens are numbered
//! across all fields in field order (the placement), and each row points to
//! the word ids of its neighbors, which forms a doubly linked occurrence
//! chain used by phrase and proximity queries:
//!
//! ```text
//! tokens:     hello      big        world
//! placement:  0          1          2
//! prev:       0          hello      big
//! next:       big        world      0
//! ```
//!
//! The chain is computed over the whole token sequence before the rows are
//! split into write batches, so batch boundaries never break it.

use ahash::AHashMap;

use crate::analysis::token::Token;
use crate::document::FullTextData;
use crate::error::{Result, WordlinkError};
use crate::language::mask::LanguageSet;
use crate::language::registry::LanguageRegistry;
use crate::storage::{IndexTransaction, NO_WORD, ObjectWordLink, WordId};

/// A token together with the index of the field value it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentToken {
    /// The token.
    pub token: Token,

    /// Index into [`FullTextData::values`].
    pub value_index: usize,
}

/// Builds and writes link rows.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    batch_size: usize,
}

impl LinkBuilder {
    /// Create a builder writing at most `batch_size` rows per round-trip.
    pub fn new(batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(WordlinkError::invalid_config(
                "link batch size must be greater than 0",
            ));
        }
        Ok(LinkBuilder { batch_size })
    }

    /// The batch size.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Build the link rows of a content object.
    ///
    /// `word_ids` must hold every token text. The language mask of each row
    /// combines the language of its field value with the value's
    /// always-available flag.
    pub fn build(
        &self,
        data: &FullTextData,
        tokens: &[DocumentToken],
        word_ids: &AHashMap<String, WordId>,
        languages: &dyn LanguageRegistry,
    ) -> Result<Vec<ObjectWordLink>> {
        let ids = tokens
            .iter()
            .map(|document_token| {
                word_ids
                    .get(&document_token.token.text)
                    .copied()
                    .ok_or_else(|| {
                        WordlinkError::other(format!(
                            "token '{}' of content {} was not resolved",
                            document_token.token.text, data.content_id
                        ))
                    })
            })
            .collect::<Result<Vec<WordId>>>()?;

        let mut frequencies: AHashMap<WordId, u32> = AHashMap::with_capacity(ids.len());
        for id in &ids {
            *frequencies.entry(*id).or_insert(0) += 1;
        }

        let mut masks: Vec<Option<u64>> = vec![None; data.values.len()];
        let mut links = Vec::with_capacity(tokens.len());

        for (i, document_token) in tokens.iter().enumerate() {
            let value = data.values.get(document_token.value_index).ok_or_else(|| {
                WordlinkError::other(format!(
                    "token refers to missing field value {} of content {}",
                    document_token.value_index, data.content_id
                ))
            })?;

            let language_mask = match masks[document_token.value_index] {
                Some(mask) => mask,
                None => {
                    let language_id = languages.language_id(&value.language_code)?;
                    let mask =
                        LanguageSet::single(language_id, value.is_main_and_always_available)
                            .encode();
                    masks[document_token.value_index] = Some(mask);
                    mask
                }
            };

            let placement = u32::try_from(i).map_err(|_| {
                WordlinkError::resource_exhausted(format!(
                    "content {} has more tokens than a placement can number",
                    data.content_id
                ))
            })?;
            let word_id = ids[i];

            links.push(ObjectWordLink {
                word_id,
                content_id: data.content_id,
                frequency: frequencies[&word_id],
                placement,
                next_word_id: ids.get(i + 1).copied().unwrap_or(NO_WORD),
                prev_word_id: if i == 0 { NO_WORD } else { ids[i - 1] },
                content_type_id: data.content_type_id,
                field_definition_id: value.field_definition_id,
                field_definition_identifier: value.field_definition_identifier.clone(),
                published: data.published,
                section_id: data.section_id,
                integer_value: document_token.token.integer_value,
                language_mask,
            });
        }

        Ok(links)
    }

    /// Write link rows in batches.
    ///
    /// # Returns
    ///
    /// The number of batches written.
    pub fn persist(&self, tx: &mut dyn IndexTransaction, links: &[ObjectWordLink]) -> Result<usize> {
        let mut batches = 0;
        for batch in links.chunks(self.batch_size) {
            tx.add_object_word_links(batch)?;
            batches += 1;
        }
        Ok(batches)
    }
}
