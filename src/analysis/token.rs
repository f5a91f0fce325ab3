//! Token type and numeric detection.
//!
//! A [`Token`] is one normalized word of a field value together with the
//! numeric interpretation of that value. The numeric value is computed once
//! per field value from its raw text and shared by every token it produces.
//!
//! # Examples
//!
//! ```
//! use wordlink::analysis::token::{integer_value, Token};
//!
//! assert_eq!(integer_value(" 42 "), 42);
//! assert_eq!(integer_value("abc"), 0);
//! assert_eq!(integer_value("9999999999"), 0);
//!
//! let token = Token::new("hello", 0);
//! assert_eq!(token.char_len(), 5);
//! ```

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref NUMERIC: Regex =
        Regex::new(r"^([+-]?[0-9]+)(?:\.[0-9]+)?$").expect("numeric pattern is valid");
}

/// One normalized word of a field value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    /// The normalized text, as stored in the dictionary.
    pub text: String,

    /// Numeric interpretation of the field value, 0 if not numeric.
    pub integer_value: i32,
}

impl Token {
    /// Create a new token.
    pub fn new<S: Into<String>>(text: S, integer_value: i32) -> Self {
        Token {
            text: text.into(),
            integer_value,
        }
    }

    /// Length of the token text in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Numeric interpretation of a raw field value.
///
/// The trimmed value must be an optionally signed decimal number; its integer
/// part is returned. Anything else, and any integer outside the `i32` range,
/// gives 0.
pub fn integer_value(raw: &str) -> i32 {
    NUMERIC
        .captures(raw.trim())
        .and_then(|captures| captures.get(1))
        .and_then(|integer_part| integer_part.as_str().parse::<i32>().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_value() {
        assert_eq!(integer_value("42"), 42);
        assert_eq!(integer_value("  7\n"), 7);
        assert_eq!(integer_value("-15"), -15);
        assert_eq!(integer_value("+3"), 3);
        assert_eq!(integer_value("12.75"), 12);
    }

    #[test]
    fn test_non_numeric_values() {
        assert_eq!(integer_value("abc"), 0);
        assert_eq!(integer_value("42abc"), 0);
        assert_eq!(integer_value("4 2"), 0);
        assert_eq!(integer_value(""), 0);
        assert_eq!(integer_value("1e5"), 0);
    }

    #[test]
    fn test_out_of_range_values() {
        assert_eq!(integer_value("2147483647"), i32::MAX);
        assert_eq!(integer_value("2147483648"), 0);
        assert_eq!(integer_value("-2147483648"), i32::MIN);
        assert_eq!(integer_value("-2147483649"), 0);
        assert_eq!(integer_value("99999999999999999999999"), 0);
    }

    #[test]
    fn test_token_char_len() {
        let token = Token::new("café", 0);
        assert_eq!(token.char_len(), 4);
        assert_eq!(token.to_string(), "café");
    }
}
