//! Centralized error types for maildirshell.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the maildirshell library.
#[derive(Error, Debug)]
pub enum MailError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The maildir root does not exist.
    #[error("Maildir not found: {0}")]
    MaildirNotFound(PathBuf),

    /// A maildir is missing its `cur/` or `new/` subdirectory.
    #[error("Maildir subdirectory missing: {0}")]
    MissingSubdir(PathBuf),

    /// The header block of a message could not be read.
    #[error("Malformed message header: {0}")]
    Header(String),

    /// A part body could not be decoded with its transfer encoding.
    #[error("Cannot decode {encoding} body: {reason}")]
    Decode {
        encoding: &'static str,
        reason: String,
    },

    /// The part stream handed to the tree builder does not describe a tree.
    #[error("Malformed MIME structure: {0}")]
    MalformedTree(String),

    /// Renaming a message file failed; its on-disk state is unchanged.
    #[error("Cannot rename '{from}' to '{to}': {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    /// Removing a trashed message failed.
    #[error("Cannot remove '{path}': {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The outbound transport reported a failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The background monitor could not be started.
    #[error("Monitor error: {0}")]
    Monitor(String),
}

/// Convenience alias for `Result<T, MailError>`.
pub type Result<T> = std::result::Result<T, MailError>;

impl MailError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available.
impl From<std::io::Error> for MailError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}

/// Body readers implement `std::io::Read`, so parse failures surface as I/O errors.
impl From<MailError> for std::io::Error {
    fn from(err: MailError) -> Self {
        match err {
            MailError::Io { source, .. } => source,
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}
