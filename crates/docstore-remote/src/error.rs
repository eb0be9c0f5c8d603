use thiserror::Error;

/// Errors returned by a remote document store.
#[derive(Debug, Error)]
pub enum Error {
    /// The referenced folder or document does not exist on the remote.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entry kind ("folder" or "document").
        kind: &'static str,
        /// Remote identifier that was looked up.
        id: String,
    },

    /// The remote rejected the request as malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The remote could not be reached or failed to answer.
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn folder_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: "folder",
            id: id.into(),
        }
    }

    pub(crate) fn document_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: "document",
            id: id.into(),
        }
    }
}

/// Result type for remote store operations.
pub type Result<T> = std::result::Result<T, Error>;
