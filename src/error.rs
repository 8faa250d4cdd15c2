//! Error types for suttapub operations.

use thiserror::Error;

/// Errors that can occur while locating, fetching or packaging suttas.
///
/// Per-page failures during fetching and extraction are logged and turned
/// into empty results at the stage boundary; only configuration and
/// packaging failures surface as an `Error`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("configuration parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error for {url}: {message}")]
    Http { url: String, message: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("no chapters to assemble")]
    NoChapters,
}

pub type Result<T> = std::result::Result<T, Error>;
