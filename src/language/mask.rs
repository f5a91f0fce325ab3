//! Language mask codec.
//!
//! The stored mask is a `u64`. Bit 0 is the "always available" flag and every
//! other bit is one language slot, so the format holds at most
//! [`MAX_LANGUAGES`] languages. Code works with [`LanguageSet`] and only
//! converts to the bit-packed form when writing rows.
//!
//! # Examples
//!
//! ```
//! use wordlink::language::mask::{self, LanguageSet};
//!
//! let set = LanguageSet::new().with_language(2).with_always_available(true);
//! assert_eq!(set.encode(), 3);
//!
//! let (ids, always_available) = mask::decode(6);
//! assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![2, 4]);
//! assert!(!always_available);
//! assert!(mask::is_always_available(5));
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A language identifier: a single bit, never bit 0.
pub type LanguageId = u64;

/// Bit reserved for the "always available" flag.
pub const ALWAYS_AVAILABLE_BIT: u64 = 1;

/// Number of language slots the mask format can hold.
pub const MAX_LANGUAGES: usize = u64::BITS as usize - 1;

/// Structured form of a language mask.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguageSet {
    language_ids: BTreeSet<LanguageId>,
    always_available: bool,
}

impl LanguageSet {
    /// Create an empty set without the always-available flag.
    pub fn new() -> Self {
        LanguageSet::default()
    }

    /// Create a set holding one language.
    pub fn single(language_id: LanguageId, always_available: bool) -> Self {
        LanguageSet::new()
            .with_language(language_id)
            .with_always_available(always_available)
    }

    /// Add a language.
    pub fn with_language(mut self, language_id: LanguageId) -> Self {
        self.language_ids.insert(language_id);
        self
    }

    /// Set the always-available flag.
    pub fn with_always_available(mut self, always_available: bool) -> Self {
        self.always_available = always_available;
        self
    }

    /// The languages in this set.
    pub fn language_ids(&self) -> &BTreeSet<LanguageId> {
        &self.language_ids
    }

    /// Check whether a language is in the set.
    pub fn contains(&self, language_id: LanguageId) -> bool {
        self.language_ids.contains(&language_id)
    }

    /// Whether the always-available flag is set.
    pub fn is_always_available(&self) -> bool {
        self.always_available
    }

    /// Convert to the stored bit-packed form.
    pub fn encode(&self) -> u64 {
        encode(self.language_ids.iter().copied(), self.always_available)
    }

    /// Convert from the stored bit-packed form.
    pub fn decode(mask: u64) -> Self {
        let (language_ids, always_available) = decode(mask);
        LanguageSet {
            language_ids,
            always_available,
        }
    }
}

/// OR every language id together, then set bit 0 if `always_available`.
pub fn encode<I>(language_ids: I, always_available: bool) -> u64
where
    I: IntoIterator<Item = LanguageId>,
{
    let mask = language_ids.into_iter().fold(0u64, |mask, id| mask | id);
    if always_available {
        mask | ALWAYS_AVAILABLE_BIT
    } else {
        mask
    }
}

/// Split a mask into its single-bit language ids and the always-available flag.
pub fn decode(mask: u64) -> (BTreeSet<LanguageId>, bool) {
    let language_ids = (1..u64::BITS)
        .map(|bit| 1u64 << bit)
        .filter(|id| mask & id != 0)
        .collect();
    (language_ids, is_always_available(mask))
}

/// Test bit 0.
pub fn is_always_available(mask: u64) -> bool {
    mask & ALWAYS_AVAILABLE_BIT != 0
}
