//! Error types for the helpdesk assistant.
//!
//! One unified enum covers configuration, I/O, encoder, data-integrity and
//! query errors. Frontends never print these variants verbatim; they go
//! through [`AppError::user_message`].

use thiserror::Error;

/// Unified error type for the helpdesk workspace.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Empty or malformed user question
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Encoder unavailable, timed out, or returned a vector of the wrong size
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Search against an index holding zero vectors
    #[error("Index is empty")]
    EmptyIndex,

    /// Persisted corpus, metadata or index failed an integrity check
    #[error("Corrupt data: {0}")]
    CorruptData(String),

    /// Identifier outside the corpus store
    #[error("Identifier {id} out of range (corpus holds {len} pairs)")]
    OutOfRange { id: usize, len: usize },

    /// Knowledge base management errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Friendly text for the frontends.
    ///
    /// Knowledge base and configuration errors are already phrased for the
    /// operator ("run `helpdesk build` first") and are passed through as is.
    pub fn user_message(&self) -> String {
        let message = match self {
            AppError::InvalidQuery(_) => {
                "Please type a question, for example: `wifi not working after update`."
            }
            AppError::Encoding(_) => {
                "Sorry, something went wrong while processing your question. Please try again."
            }
            AppError::EmptyIndex | AppError::CorruptData(_) | AppError::OutOfRange { .. } => {
                "The answer database is unavailable right now. Please contact the maintainer."
            }
            AppError::Knowledge(message) | AppError::Config(message) => return message.clone(),
            _ => "Sorry, something went wrong. Please try again.",
        };
        message.to_string()
    }

    /// Whether the error makes a loaded knowledge base unusable.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            AppError::EmptyIndex | AppError::CorruptData(_) | AppError::OutOfRange { .. }
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
