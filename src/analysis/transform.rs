//! Text transformation pipeline.
//!
//! Transformation is an external concern of the indexer: the content
//! repository decides how text is folded before it becomes a word. The
//! indexer talks to it through [`TransformationProcessor`], which applies
//! either an explicit list of commands or a named group of commands.
//!
//! [`StandardTransformationProcessor`] implements a small command set that is
//! enough for most Latin-script content:
//!
//! | Command          | Effect                                                  |
//! |------------------|---------------------------------------------------------|
//! | `normalize`      | Unicode NFC                                             |
//! | `decompose`      | Unicode NFKC (compatibility characters folded)          |
//! | `diacritical`    | strip combining marks (`é` → `e`)                       |
//! | `lowercase`      | Unicode lowercase                                       |
//! | `search_cleanup` | control characters, quotes and brackets become spaces   |
//! | `trim`           | strip surrounding whitespace                            |
//!
//! # Examples
//!
//! ```
//! use wordlink::analysis::transform::{StandardTransformationProcessor, TransformationProcessor};
//!
//! let processor = StandardTransformationProcessor::new();
//! let rules = vec!["diacritical".to_string(), "lowercase".to_string()];
//! assert_eq!(processor.transform("Café Crème", &rules).unwrap(), "cafe creme");
//! assert_eq!(processor.transform_by_group("HELLO", "lowercase").unwrap(), "hello");
//! ```

use std::fmt::Debug;
use std::str::FromStr;

use ahash::AHashMap;
use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::error::{Result, WordlinkError};

lazy_static! {
    static ref CLEANUP: Regex = Regex::new(r#"[\p{Cc}"“”„«»()\[\]{}<>]"#)
        .expect("cleanup pattern is valid");
}

/// Applies text transformations on behalf of the indexer.
pub trait TransformationProcessor: Send + Sync + Debug {
    /// Apply `rules` to `text`, in order.
    fn transform(&self, text: &str, rules: &[String]) -> Result<String>;

    /// Apply the commands of a named group to `text`.
    fn transform_by_group(&self, text: &str, group: &str) -> Result<String>;
}

/// A single transformation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformationCommand {
    /// Unicode NFC.
    Normalize,
    /// Unicode NFKC.
    Decompose,
    /// Remove combining marks.
    Diacritical,
    /// Unicode lowercase.
    Lowercase,
    /// Replace control characters, quotes and brackets with spaces.
    SearchCleanup,
    /// Trim surrounding whitespace.
    Trim,
}

impl TransformationCommand {
    /// The command's configuration name.
    pub fn name(&self) -> &'static str {
        match self {
            TransformationCommand::Normalize => "normalize",
            TransformationCommand::Decompose => "decompose",
            TransformationCommand::Diacritical => "diacritical",
            TransformationCommand::Lowercase => "lowercase",
            TransformationCommand::SearchCleanup => "search_cleanup",
            TransformationCommand::Trim => "trim",
        }
    }

    /// Apply this command.
    pub fn apply(&self, text: &str) -> String {
        match self {
            TransformationCommand::Normalize => text.nfc().collect(),
            TransformationCommand::Decompose => text.nfkc().collect(),
            TransformationCommand::Diacritical => text
                .nfd()
                .filter(|c| !is_combining_mark(*c))
                .nfc()
                .collect(),
            TransformationCommand::Lowercase => text.to_lowercase(),
            TransformationCommand::SearchCleanup => CLEANUP.replace_all(text, " ").into_owned(),
            TransformationCommand::Trim => text.trim().to_string(),
        }
    }
}

impl FromStr for TransformationCommand {
    type Err = WordlinkError;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "normalize" => Ok(TransformationCommand::Normalize),
            "decompose" => Ok(TransformationCommand::Decompose),
            "diacritical" => Ok(TransformationCommand::Diacritical),
            "lowercase" => Ok(TransformationCommand::Lowercase),
            "search_cleanup" => Ok(TransformationCommand::SearchCleanup),
            "trim" => Ok(TransformationCommand::Trim),
            _ => Err(WordlinkError::analysis(format!(
                "unknown transformation command '{name}'"
            ))),
        }
    }
}

/// The bundled command-based processor.
///
/// Groups are named command lists. The processor starts with the `lowercase`,
/// `diacritical` and `normalize` groups; more can be added with
/// [`with_group`](Self::with_group).
#[derive(Debug, Clone)]
pub struct StandardTransformationProcessor {
    groups: AHashMap<String, Vec<TransformationCommand>>,
}

impl StandardTransformationProcessor {
    /// Create a processor with the standard groups.
    pub fn new() -> Self {
        let mut groups = AHashMap::new();
        groups.insert(
            "lowercase".to_string(),
            vec![TransformationCommand::Lowercase],
        );
        groups.insert(
            "diacritical".to_string(),
            vec![TransformationCommand::Diacritical],
        );
        groups.insert(
            "normalize".to_string(),
            vec![TransformationCommand::Normalize],
        );
        StandardTransformationProcessor { groups }
    }

    /// Add or replace a group.
    pub fn with_group<S: Into<String>>(
        mut self,
        name: S,
        commands: Vec<TransformationCommand>,
    ) -> Self {
        self.groups.insert(name.into(), commands);
        self
    }

    fn apply_all<'a, I>(text: &str, commands: I) -> String
    where
        I: IntoIterator<Item = &'a TransformationCommand>,
    {
        commands
            .into_iter()
            .fold(text.to_string(), |current, command| command.apply(&current))
    }
}

impl Default for StandardTransformationProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformationProcessor for StandardTransformationProcessor {
    fn transform(&self, text: &str, rules: &[String]) -> Result<String> {
        let commands = rules
            .iter()
            .map(|rule| rule.parse::<TransformationCommand>())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::apply_all(text, &commands))
    }

    fn transform_by_group(&self, text: &str, group: &str) -> Result<String> {
        let commands = self.groups.get(group).ok_or_else(|| {
            WordlinkError::analysis(format!("unknown transformation group '{group}'"))
        })?;
        Ok(Self::apply_all(text, commands))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_commands() {
        assert_eq!(TransformationCommand::Lowercase.apply("ÀBC"), "àbc");
        assert_eq!(TransformationCommand::Diacritical.apply("naïve résumé"), "naive resume");
        assert_eq!(TransformationCommand::Decompose.apply("ﬁle"), "file");
        assert_eq!(TransformationCommand::Trim.apply("  x  "), "x");
        assert_eq!(
            TransformationCommand::SearchCleanup.apply("say \"hi\" (now)"),
            "say  hi   now "
        );
        // Composed and decomposed forms normalize to the same text.
        assert_eq!(
            TransformationCommand::Normalize.apply("e\u{301}"),
            TransformationCommand::Normalize.apply("\u{e9}")
        );
    }

    #[test]
    fn test_cleanup_keeps_url_punctuation() {
        assert_eq!(
            TransformationCommand::SearchCleanup.apply("www.example.com/a-b_c"),
            "www.example.com/a-b_c"
        );
    }

    #[test]
    fn test_transform_in_order() {
        let processor = StandardTransformationProcessor::new();
        let result = processor
            .transform("  Ünïcode  ", &rules(&["trim", "diacritical", "lowercase"]))
            .unwrap();
        assert_eq!(result, "unicode");
    }

    #[test]
    fn test_unknown_command() {
        let processor = StandardTransformationProcessor::new();
        let error = processor.transform("x", &rules(&["stem"])).unwrap_err();
        assert!(matches!(error, WordlinkError::Analysis(_)));
    }

    #[test]
    fn test_groups() {
        let processor = StandardTransformationProcessor::new().with_group(
            "search",
            vec![
                TransformationCommand::Diacritical,
                TransformationCommand::Lowercase,
            ],
        );
        assert_eq!(processor.transform_by_group("Évian", "search").unwrap(), "evian");
        assert!(processor.transform_by_group("x", "missing").is_err());
    }

    #[test]
    fn test_command_names_roundtrip() {
        for command in [
            TransformationCommand::Normalize,
            TransformationCommand::Decompose,
            TransformationCommand::Diacritical,
            TransformationCommand::Lowercase,
            TransformationCommand::SearchCleanup,
            TransformationCommand::Trim,
        ] {
            assert_eq!(command.name().parse::<TransformationCommand>().unwrap(), command);
        }
    }
}
