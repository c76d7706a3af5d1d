//! Error types for dyad.

use thiserror::Error;

/// Result type for dyad operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for dyad operations.
///
/// Per-sentence failures (`UnbalancedTree`, `MissingDate`) are recoverable:
/// the batch pipeline logs them and moves to the next sentence. Dictionary
/// failures are fatal at load time, since no meaningful coding is possible
/// with incomplete lexicons.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Bracket nesting in a parse string is inconsistent.
    #[error("Unbalanced parse tree: {0}")]
    UnbalancedTree(String),

    /// A sentence is missing its required date attribute.
    #[error("Missing date on sentence {0}")]
    MissingDate(String),

    /// A dictionary or markup entry is malformed.
    #[error("Missing attribute in {file}:{line}: {message}")]
    MissingAttribute {
        /// Source file of the offending entry.
        file: String,
        /// Line number of the offending entry.
        line: usize,
        /// What was malformed.
        message: String,
    },

    /// A pattern references a synonym set that was never defined.
    #[error("Unknown synset &{0}")]
    UnknownSynset(String),

    /// A dictionary file could not be loaded into a usable structure.
    #[error("Dictionary error: {0}")]
    Dictionary(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an unbalanced-tree error.
    pub fn unbalanced(msg: impl Into<String>) -> Self {
        Error::UnbalancedTree(msg.into())
    }

    /// Create a missing-date error for the given sentence id.
    pub fn missing_date(sentence_id: impl Into<String>) -> Self {
        Error::MissingDate(sentence_id.into())
    }

    /// Create a missing-attribute error with file/line context.
    pub fn missing_attribute(
        file: impl Into<String>,
        line: usize,
        message: impl Into<String>,
    ) -> Self {
        Error::MissingAttribute {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    /// Create a dictionary-load error.
    pub fn dictionary(msg: impl Into<String>) -> Self {
        Error::Dictionary(msg.into())
    }

    /// True if this failure is local to one sentence and the batch may
    /// continue.
    #[must_use]
    pub fn is_sentence_local(&self) -> bool {
        matches!(self, Error::UnbalancedTree(_) | Error::MissingDate(_))
    }
}
