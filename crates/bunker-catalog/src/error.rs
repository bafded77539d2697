//! Error types for catalog loading.

use std::path::PathBuf;

/// Errors that can occur while loading decks or ability definitions.
///
/// None of these are fatal to a server: a broken ability file falls back
/// to the built-in table, and a missing deck directory leaves the catalog
/// empty so dealing produces placeholder cards.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// A file or directory could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The deck root exists but is not a directory.
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    /// The ability file is not valid JSON or not an array of entries.
    #[error("failed to parse ability definitions: {0}")]
    Parse(#[from] serde_json::Error),

    /// The ability file parsed but contains no implemented entries.
    #[error("ability definitions contain no implemented entries")]
    NoImplementedDefinitions,
}
