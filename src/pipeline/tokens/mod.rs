//! Recognized words → classified token sequences.

pub mod vocabulary;
pub mod classify;
pub mod scanner;

pub use classify::*;
pub use scanner::*;
pub use vocabulary::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VocabularyError {
    #[error("Invalid {field} pattern: {source}")]
    InvalidPattern {
        field: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("No labels configured for {0}")]
    EmptyLabels(&'static str),

    #[error("Label '{0}' is configured more than once")]
    DuplicateLabel(String),

    #[error("Label '{label}' also matches the {pattern} pattern")]
    LabelMatchesPattern { label: String, pattern: &'static str },
}
