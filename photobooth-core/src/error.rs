//! Error Taxonomy - Closed Set of Failure Kinds
//!
//! Every failure that leaves the core is one of these kinds.
//! Raw subsystem text only travels as a diagnostic payload.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The closed vocabulary of failures surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidIdentifier,
    DirectoryMissing,
    FileNotFound,
    UnsupportedExtension,
    UnsupportedMimeType,
    FileTooLarge,
    PathTraversalDetected,
    /// Host I/O failed after every policy check passed
    StorageFailure,
    PrintingDisabled,
    InvalidCopyCount,
    PrinterUnavailable,
    PrinterNotAccepting,
    OutOfPaper,
    LowConsumable,
    PrinterOffline,
    PrintFailedUnknown,
    CancelFailed,
}

impl ErrorKind {
    /// Canonical message shown to the booth user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier => "The photo identifier is not valid",
            Self::DirectoryMissing => "The photo storage is not available",
            Self::FileNotFound => "The photo could not be found",
            Self::UnsupportedExtension => "This file type is not supported",
            Self::UnsupportedMimeType => "This image type is not supported",
            Self::FileTooLarge => "The photo exceeds the maximum allowed size",
            Self::PathTraversalDetected => "Access denied",
            Self::StorageFailure => "The photo could not be stored or read",
            Self::PrintingDisabled => "Printing is disabled",
            Self::InvalidCopyCount => "Invalid number of copies",
            Self::PrinterUnavailable => "The printer is not available",
            Self::PrinterNotAccepting => "The printer is currently not accepting jobs",
            Self::OutOfPaper => "The printer is out of paper",
            Self::LowConsumable => "Ink or toner is empty or low",
            Self::PrinterOffline => "The printer is offline",
            Self::PrintFailedUnknown => "An error occurred while printing",
            Self::CancelFailed => "The print job could not be cancelled",
        }
    }

    /// Stable machine code, identical to the serialized form.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier => "INVALID_IDENTIFIER",
            Self::DirectoryMissing => "DIRECTORY_MISSING",
            Self::FileNotFound => "FILE_NOT_FOUND",
            Self::UnsupportedExtension => "UNSUPPORTED_EXTENSION",
            Self::UnsupportedMimeType => "UNSUPPORTED_MIME_TYPE",
            Self::FileTooLarge => "FILE_TOO_LARGE",
            Self::PathTraversalDetected => "PATH_TRAVERSAL_DETECTED",
            Self::StorageFailure => "STORAGE_FAILURE",
            Self::PrintingDisabled => "PRINTING_DISABLED",
            Self::InvalidCopyCount => "INVALID_COPY_COUNT",
            Self::PrinterUnavailable => "PRINTER_UNAVAILABLE",
            Self::PrinterNotAccepting => "PRINTER_NOT_ACCEPTING",
            Self::OutOfPaper => "OUT_OF_PAPER",
            Self::LowConsumable => "LOW_CONSUMABLE",
            Self::PrinterOffline => "PRINTER_OFFLINE",
            Self::PrintFailedUnknown => "PRINT_FAILED_UNKNOWN",
            Self::CancelFailed => "CANCEL_FAILED",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid identifier {value:?}: {reason}")]
    InvalidIdentifier { value: String, reason: &'static str },

    #[error("Storage directory does not exist: {0}")]
    DirectoryMissing(PathBuf),

    #[error("Image with ID {0} not found")]
    FileNotFound(String),

    #[error("Unsupported file extension: {0}")]
    UnsupportedExtension(String),

    #[error("Unsupported image type: {0}")]
    UnsupportedMimeType(String),

    #[error("File size {size} exceeds maximum allowed size {max}")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Access denied: path traversal detected for {0}")]
    PathTraversalDetected(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidIdentifier { .. } => ErrorKind::InvalidIdentifier,
            Self::DirectoryMissing(_) => ErrorKind::DirectoryMissing,
            Self::FileNotFound(_) => ErrorKind::FileNotFound,
            Self::UnsupportedExtension(_) => ErrorKind::UnsupportedExtension,
            Self::UnsupportedMimeType(_) => ErrorKind::UnsupportedMimeType,
            Self::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            Self::PathTraversalDetected(_) => ErrorKind::PathTraversalDetected,
            Self::Io { .. } => ErrorKind::StorageFailure,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// A failed external invocation. `message` is the raw diagnostic text
/// (stderr, or the spawn error) and is only meant for classification.
#[derive(Debug, Clone, Error)]
#[error("{program} failed: {message}")]
pub struct CommandFailure {
    pub program: String,
    pub message: String,
}

impl CommandFailure {
    pub fn new(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            message: message.into(),
        }
    }
}
