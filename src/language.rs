//! Language handling for index links.
//!
//! Every link row carries a language mask: the bit of the language its text
//! was written in, plus bit 0 when the value is main-language and always
//! available. The [`mask`] module converts between that storage format and
//! the structured [`LanguageSet`](mask::LanguageSet) used in code, and the
//! [`registry`] module maps language codes to their bits.

pub mod mask;
pub mod registry;
