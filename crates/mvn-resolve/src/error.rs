//! Resolution errors.

use std::path::PathBuf;

/// Errors produced while turning matched files into deployable batches.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Bad or contradictory input.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The source glob matched nothing.
    #[error("no sources found for '{glob}'")]
    NoMatch { glob: String },

    /// A matched file's relative path does not satisfy the extraction pattern.
    #[error("regexp '{pattern}' does not match '{path}'")]
    PatternMismatch { pattern: String, path: String },

    /// Resolution produced zero artifacts or batches.
    #[error("no artifacts resolved")]
    NotFound,

    #[error("invalid glob: {0}")]
    InvalidGlob(#[from] globset::Error),

    #[error("invalid regexp: {0}")]
    InvalidPattern(#[from] regex_lite::Error),

    #[error("cannot access workspace {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Result alias for resolution operations.
pub type ResolveResult<T> = Result<T, ResolveError>;
