//! Error types for bundler operations.
//!
//! Every pipeline step wraps its underlying failure with the operation and
//! the path, URL or environment it was working on, then returns immediately.
//! There is no retry or local recovery anywhere in the pipeline.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for bundler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for all bundler operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration or validation errors, reported before any I/O
    #[error("configuration error: {0}")]
    Config(String),

    /// Target OS is not part of the supported set
    #[error("OS {0} is not yet implemented")]
    UnsupportedOs(String),

    /// Filesystem errors, qualified with the operation and the offending path
    #[error("{operation} {path:?} failed: {source}")]
    Fs {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Vendor download errors
    #[error("downloading {url} into {path:?} failed: {source}")]
    Download {
        url: String,
        path: PathBuf,
        #[source]
        source: reqwest::Error,
    },

    /// Archiving the framework override directory failed
    #[error("zipping {path:?} failed: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// An external tool (compiler, embedder, icon embedder) exited non-zero;
    /// the captured combined output is surfaced verbatim
    #[error("{tool} failed: {output}")]
    Tool { tool: &'static str, output: String },

    /// The shared cancellation token fired; a terminal condition, not a bug
    #[error("bundling cancelled")]
    Cancelled,

    /// Environment filter pattern errors
    #[error("environment matching failed: {0}")]
    Filter(#[from] regex::Error),

    /// JSON configuration decoding errors
    #[error("unmarshaling configuration failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Failure wrapped with the environment it occurred in
    #[error("bundling for environment {os}/{arch} failed: {source}")]
    Environment {
        os: String,
        arch: String,
        #[source]
        source: Box<Error>,
    },

    /// Failure wrapped with a plain operation description
    #[error("{operation} failed: {source}")]
    Context {
        operation: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps this error with the environment it occurred in.
    pub fn for_environment(self, os: &str, arch: &str) -> Self {
        Error::Environment {
            os: os.to_string(),
            arch: arch.to_string(),
            source: Box::new(self),
        }
    }

    /// True when the error chain bottoms out in cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::Cancelled => true,
            Error::Environment { source, .. } | Error::Context { source, .. } => {
                source.is_cancelled()
            }
            _ => false,
        }
    }
}

/// Extension trait attaching filesystem context to `io::Result`s.
pub trait FsResultExt<T> {
    fn fs_context(self, operation: &'static str, path: &Path) -> Result<T>;
}

impl<T> FsResultExt<T> for std::io::Result<T> {
    fn fs_context(self, operation: &'static str, path: &Path) -> Result<T> {
        self.map_err(|source| Error::Fs {
            operation,
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Extension trait wrapping any bundler error with an operation description.
pub trait ResultExt<T> {
    fn context(self, operation: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, operation: impl Into<String>) -> Result<T> {
        self.map_err(|source| Error::Context {
            operation: operation.into(),
            source: Box::new(source),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_detected_through_wrapping() {
        let err = Error::Cancelled
            .for_environment("linux", "amd64");
        assert!(err.is_cancelled());

        let err = Error::Config("bad".into()).for_environment("linux", "amd64");
        assert!(!err.is_cancelled());
    }

    #[test]
    fn environment_wrapping_names_the_environment() {
        let err = Error::Config("bad".into()).for_environment("windows", "amd64");
        let msg = err.to_string();
        assert!(msg.contains("windows/amd64"));
    }
}
