//! # docstore-remote
//!
//! Boundary to a remote document store.
//!
//! The store keeps two kinds of entries, folders and documents, addressed
//! by opaque identifiers. It has no notion of paths; `docstore-fs` builds
//! one on top of it.
//!
//! This crate provides:
//! - The wire model: [`Folder`], [`Document`], [`Location`], [`Profile`]
//! - The [`RemoteStore`] client trait
//! - [`MemoryStore`], an in-process store with a call journal and fault
//!   injection
//!
//! ## Example
//!
//! ```ignore
//! use docstore_remote::{FolderId, MemoryStore, RemoteStore};
//!
//! let store = MemoryStore::new();
//! let folder = store.create_folder(&FolderId::root(), "invoices").await?;
//! store
//!     .create_document(&folder.id, "march.pdf", bytes::Bytes::from_static(b"%PDF"))
//!     .await?;
//! ```

mod error;
mod memory;
mod model;
mod store;

pub use error::{Error, Result};
pub use memory::{MemoryStore, StoreCall, DEFAULT_SPACE_MAX};
pub use model::{guess_mime_type, Document, DocumentId, Folder, FolderId, Location, Profile};
pub use store::{RemoteStore, StoreFuture};
