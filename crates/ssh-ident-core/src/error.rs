use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the ssh-ident core.
///
/// Everything here is fatal at the process boundary. Bad identity names
/// given to `--identity`, `--shell` or `--activate` never reach this type;
/// the resolver turns those into output text instead.
#[derive(Debug, Error)]
pub enum IdentError {
    #[error("failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("invalid value for {key}: {value:?}")]
    ConfigValue { key: &'static str, value: String },

    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid identity name {0:?}")]
    InvalidIdentityName(String),

    #[error("identity already exists: {}", .0.display())]
    IdentityExists(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type IdentResult<T> = Result<T, IdentError>;
