//! Language code to language id lookup.
//!
//! The indexer only consumes [`LanguageRegistry`]; the content repository
//! normally supplies its own implementation. [`StaticLanguageRegistry`] is an
//! in-process registry that hands out language bits in registration order.

use std::fmt::Debug;

use ahash::AHashMap;

use crate::error::{Result, WordlinkError};
use crate::language::mask::{LanguageId, MAX_LANGUAGES};

/// Maps language codes to single-bit language ids.
pub trait LanguageRegistry: Send + Sync + Debug {
    /// Look up the id of a language code.
    ///
    /// Unknown codes are an error.
    fn language_id(&self, language_code: &str) -> Result<LanguageId>;
}

/// A registry holding a fixed table of languages.
///
/// # Examples
///
/// ```
/// use wordlink::language::registry::{LanguageRegistry, StaticLanguageRegistry};
///
/// let registry = StaticLanguageRegistry::with_languages(["eng-GB", "ger-DE"]).unwrap();
/// assert_eq!(registry.language_id("eng-GB").unwrap(), 2);
/// assert_eq!(registry.language_id("ger-DE").unwrap(), 4);
/// assert!(registry.language_id("fre-FR").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticLanguageRegistry {
    ids: AHashMap<String, LanguageId>,
}

impl StaticLanguageRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        StaticLanguageRegistry::default()
    }

    /// Create a registry and register each code in order.
    pub fn with_languages<I, S>(codes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = StaticLanguageRegistry::new();
        for code in codes {
            registry.register(code.as_ref())?;
        }
        Ok(registry)
    }

    /// Register a language code and return its id.
    ///
    /// Registering a known code returns the existing id. The first code gets
    /// bit 1 (id 2), the next bit 2 (id 4), and so on.
    pub fn register(&mut self, language_code: &str) -> Result<LanguageId> {
        if let Some(id) = self.ids.get(language_code) {
            return Ok(*id);
        }
        if self.ids.len() >= MAX_LANGUAGES {
            return Err(WordlinkError::resource_exhausted(format!(
                "cannot register '{language_code}': the language mask holds at most {MAX_LANGUAGES} languages"
            )));
        }

        let id = 1u64 << (self.ids.len() + 1);
        self.ids.insert(language_code.to_string(), id);
        Ok(id)
    }

    /// Reverse lookup.
    pub fn language_code(&self, language_id: LanguageId) -> Option<&str> {
        self.ids
            .iter()
            .find(|(_, id)| **id == language_id)
            .map(|(code, _)| code.as_str())
    }

    /// Number of registered languages.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if no language is registered.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl LanguageRegistry for StaticLanguageRegistry {
    fn language_id(&self, language_code: &str) -> Result<LanguageId> {
        self.ids.get(language_code).copied().ok_or_else(|| {
            WordlinkError::language(format!("unknown language code '{language_code}'"))
        })
    }
}
