//! Error taxonomy for the notes engine.
//!
//! Failures from the two collaborator layers ([`VaultError`], [`PdfError`])
//! are translated into [`NotesError`] at the component boundary; raw storage
//! or renderer errors never reach callers.

use std::path::PathBuf;

use thiserror::Error;

use crate::pdf::PdfError;
use crate::store::VaultError;

#[derive(Debug, Error)]
pub enum NotesError {
    /// Pages are numbered from 1; rejected before any I/O.
    #[error("invalid page number {0}; pages are numbered from 1")]
    InvalidPageNumber(u32),

    /// The caller required a document that does not exist.
    #[error("not found: {0}")]
    NotFound(PathBuf),

    #[error("permission denied: {0}")]
    Permission(PathBuf),

    #[error("i/o failure on {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// Highlight blob could not be decoded. Recovered locally by substituting
    /// an empty mapping; only surfaced when serialization itself fails.
    #[error("malformed highlight data: {0}")]
    MalformedBlob(String),

    #[error("corrupt document: {0}")]
    CorruptDocument(String),

    #[error("unsupported document format")]
    UnsupportedFormat,
}

impl From<VaultError> for NotesError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::NotFound(path) => NotesError::NotFound(path),
            VaultError::Permission(path) => NotesError::Permission(path),
            VaultError::AlreadyExists(path) => NotesError::Io {
                path,
                message: "file already exists".to_owned(),
            },
            VaultError::Io { path, message } => NotesError::Io { path, message },
        }
    }
}

impl From<PdfError> for NotesError {
    fn from(err: PdfError) -> Self {
        match err {
            PdfError::CorruptDocument(message) => NotesError::CorruptDocument(message),
            PdfError::UnsupportedFormat => NotesError::UnsupportedFormat,
            PdfError::PageOutOfRange { page, .. } => NotesError::InvalidPageNumber(page),
        }
    }
}
