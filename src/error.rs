//! Error types for the wordlink library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`WordlinkError`] enum. Data-shape problems in indexed text (blank values,
//! non-numeric text) are never reported as errors; they are skipped by the
//! tokenizer. Everything that reaches this enum is either an infrastructure
//! failure or a misconfiguration.
//!
//! # Examples
//!
//! ```
//! use wordlink::error::{Result, WordlinkError};
//!
//! fn lookup() -> Result<()> {
//!     Err(WordlinkError::language("unknown language code 'xxx-XX'"))
//! }
//!
//! match lookup() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for wordlink operations.
#[derive(Error, Debug)]
pub enum WordlinkError {
    /// I/O errors (snapshot files, config files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Storage-related errors, including constraint violations
    #[error("Storage error: {0}")]
    Storage(String),

    /// Transaction lifecycle errors
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Analysis-related errors (unknown transformation commands, etc.)
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Language registry errors
    #[error("Language error: {0}")]
    Language(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Resource exhausted
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot encoding errors
    #[error("Snapshot encode error: {0}")]
    BincodeEncode(#[from] bincode::error::EncodeError),

    /// Snapshot decoding errors
    #[error("Snapshot decode error: {0}")]
    BincodeDecode(#[from] bincode::error::DecodeError),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Errors raised by collaborator implementations written with anyhow
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with WordlinkError.
pub type Result<T> = std::result::Result<T, WordlinkError>;

impl WordlinkError {
    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        WordlinkError::Storage(msg.into())
    }

    /// Create a new transaction error.
    pub fn transaction<S: Into<String>>(msg: S) -> Self {
        WordlinkError::Transaction(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        WordlinkError::Analysis(msg.into())
    }

    /// Create a new language error.
    pub fn language<S: Into<String>>(msg: S) -> Self {
        WordlinkError::Language(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        WordlinkError::Config(msg.into())
    }

    /// Create a new resource exhausted error.
    pub fn resource_exhausted<S: Into<String>>(msg: S) -> Self {
        WordlinkError::ResourceExhausted(msg.into())
    }

    /// Create a new constraint violation error.
    ///
    /// Constraint violations are storage errors; they abort the surrounding
    /// transaction like any other infrastructure failure.
    pub fn constraint<S: Into<String>>(msg: S) -> Self {
        WordlinkError::Storage(format!("Constraint violation: {}", msg.into()))
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        WordlinkError::Other(msg.into())
    }
}
