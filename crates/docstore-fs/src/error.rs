use docstore_remote::DocumentId;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by filesystem operations.
#[derive(Debug, Error)]
pub enum Error {
    /// No document exists at the path.
    #[error("object not found: {0}")]
    NotFound(String),

    /// A path segment did not match any cached folder.
    #[error("directory not found: {0}")]
    DirectoryNotFound(String),

    /// The path names a folder where a document was expected.
    #[error("{0} is a directory")]
    IsDirectory(String),

    /// The folder still holds documents.
    #[error("directory not empty: {0}")]
    NotEmpty(String),

    /// The entry kind is not valid for the operation.
    #[error("unsupported entry: {0}")]
    UnsupportedEntry(String),

    /// The store cannot perform the operation at all.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// Several documents share the name that should be replaced.
    #[error("found {count} documents named {path}")]
    DuplicateDocuments { path: String, count: usize },

    /// The remote answered, but not with what the operation requires.
    #[error("{op}: unexpected response: {detail}")]
    UnexpectedResponse { op: &'static str, detail: String },

    /// A remote call failed.
    #[error("{op} {context}: {source}")]
    Remote {
        op: &'static str,
        context: String,
        #[source]
        source: docstore_remote::Error,
    },

    /// A document was created but the document it replaces could not be
    /// deleted.
    #[error("replace {path}: created {created} but {source}")]
    Replace {
        path: String,
        created: DocumentId,
        #[source]
        source: Box<Error>,
    },

    /// A remote call did not finish in time.
    #[error("{op}: timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },
}

impl Error {
    /// Whether the error means the path does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::DirectoryNotFound(_))
    }
}

/// Result type for docstore-fs operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A best-effort cache patch that could not be applied after the remote
/// mutation succeeded.
///
/// The primary operation is still reported successful; the affected node
/// stays stale until the next [`DocFs::flush_cache`](crate::DocFs::flush_cache).
#[derive(Debug, Error)]
#[error("failed to update cache for {path:?}: {source}")]
pub struct CacheSyncWarning {
    pub path: String,
    #[source]
    pub source: Error,
}

/// The value of a successful mutation together with the cache patches that
/// could not be applied.
#[derive(Debug)]
#[must_use]
pub struct Applied<T> {
    pub value: T,
    pub warnings: Vec<CacheSyncWarning>,
}

impl<T> Applied<T> {
    pub(crate) fn new(value: T, warnings: Vec<CacheSyncWarning>) -> Self {
        Self { value, warnings }
    }

    /// Drop the warnings and keep the value.
    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
