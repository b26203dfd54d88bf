//! Error taxonomy for the pipeline.
//!
//! Each variant corresponds to one observable failure kind, so callers can
//! map them to distinct response codes instead of collapsing everything
//! into a single generic failure.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("repository URL has no usable path segment: {url}")]
    InvalidRepoUrl { url: String },

    #[error("failed to fetch repository {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("test synthesis failed for `{function}`: {message}")]
    Synthesis { function: String, message: String },

    #[error("failed to create archive {path}: {message}")]
    Archive { path: String, message: String },

    #[error("missing configuration: {0}")]
    Config(String),

    #[error("grammar incompatible with linked tree-sitter: {0}")]
    Grammar(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
