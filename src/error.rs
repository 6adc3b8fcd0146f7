//! Error types for configuration, extraction, and builds
//!
//! Configuration errors are fatal and surface before any file is scanned.
//! Extraction errors are scoped to a single source file; the selector logs
//! them and keeps walking.

use std::path::PathBuf;
use thiserror::Error;

/// Invalid configuration detected while compiling rules or globs
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid regex for `{field}`: {pattern:?}: {source}")]
    InvalidRegex {
        field: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid template for `{field}`: {template:?}: {reason}")]
    InvalidTemplate {
        field: &'static str,
        template: String,
        reason: String,
    },

    #[error("invalid glob {pattern:?}: {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("build_dir is not set")]
    MissingBuildDir,
}

/// Failure while extracting a single source file
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The source is not valid UTF-8 text
    #[error("{} is not valid UTF-8 text", path.display())]
    Decode { path: PathBuf },

    /// Reading the source or writing a destination failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExtractError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::InvalidData {
            return ExtractError::Decode { path: path.into() };
        }
        ExtractError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Top-level error returned by a build pass
#[derive(Debug, Error)]
pub enum SimpleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to merge {}: {source}", path.display())]
    Merge {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
