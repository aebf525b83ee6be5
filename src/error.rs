//! Error types for deck building
//!
//! Everything that can stop a build is a [`DeckError`]. A reference entry
//! without a URL is *not* an error: it is logged and the build continues.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, assembling or writing a deck
#[derive(Error, Debug)]
pub enum DeckError {
    /// Reading or writing a file failed
    #[error("{}: {source}", path.display())]
    Io {
        /// File that was being read or written
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A deck, plot or data file is not valid JSON for its type
    #[error("{}: invalid JSON: {source}", path.display())]
    Json {
        /// File that failed to parse
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A CSV data file could not be read or parsed
    #[error("{}: invalid CSV: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Markdown referenced a `{{name}}` template variable the deck does not define
    #[error("unknown template variable '{{{{{0}}}}}'")]
    UnknownVar(String),

    /// Histogram bins or values are unusable
    #[error("histogram: {0}")]
    Histogram(String),

    /// The deck has no sections to render
    #[error("deck '{0}' has no sections")]
    EmptyDeck(String),

    /// The preview server could not start or respond
    #[error("server error: {0}")]
    Server(String),
}

impl DeckError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DeckError::Io { path: path.into(), source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        DeckError::Json { path: path.into(), source }
    }
}

impl DeckError {
    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        DeckError::Csv { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, DeckError>;
