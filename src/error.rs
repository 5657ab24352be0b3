//! Error types for rendering, content lookup and configuration loading.

use std::path::PathBuf;

/// Errors that abort a render.
///
/// Resolution misses (absent pages, unknown magic words, unbound parameters)
/// are not errors; they degrade to fallback text.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("invalid template text: {0}")]
    InvalidTemplate(String),

    #[error("empty topic name")]
    EmptyTopic,

    #[error("invalid protocol in link: {0}")]
    InvalidProtocol(String),

    #[error("recursion limit of {limit} exceeded while rendering {page}")]
    RecursionLimit { limit: usize, page: String },

    #[error("content store failure")]
    Store(#[from] StoreError),
}

/// Failures reported by a content store or media inspector.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store root not found: {0}")]
    MissingRoot(PathBuf),
}

/// Failures while loading a [`crate::config::RenderConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T, E = RenderError> = std::result::Result<T, E>;
