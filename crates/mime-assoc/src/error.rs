//! Error types for mime-assoc

use std::path::PathBuf;

/// Errors surfaced to callers.
///
/// Everything else (unreadable descriptors, unknown type tokens, a missing
/// mimeapps.list) is logged and skipped during the scan.
#[derive(Debug, thiserror::Error)]
pub enum AssocError {
    #[error("Unknown application: {0}")]
    UnknownApplication(String),

    #[error("Failed to write {path}: {source}")]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AssocError>;
