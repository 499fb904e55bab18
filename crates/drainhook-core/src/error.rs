//! Error types shared by every drainhook crate.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Fatal errors raised while building or validating parameters.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0} environment variable not defined")]
    MissingEnv(&'static str),

    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("malformed deadline {value:?}: {source}")]
    Deadline {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    TomlRender(#[from] toml::ser::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
