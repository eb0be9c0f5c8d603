//! # docstore-fs
//!
//! A remote document store seen as a hierarchical filesystem.
//!
//! The store only knows folders and documents by identifier. This crate
//! provides:
//! - path segments that survive `/` in remote names
//! - a lazily built cache of the folder graph, resolved by path
//! - folder and document entries with directory/file-like metadata
//! - list, put, mkdir, rmdir, purge, move, copy, dirmove and merge, each
//!   patching the cache instead of fetching it again
//! - **WebDAV server support** (with the `webdav` feature)
//!
//! ## Example
//!
//! ```ignore
//! use bytes::Bytes;
//! use docstore_fs::DocFs;
//! use docstore_remote::MemoryStore;
//! use std::sync::Arc;
//!
//! let fs = DocFs::new(Arc::new(MemoryStore::new()));
//! fs.mkdir("docs").await?;
//! fs.mkdir("docs/2024").await?;
//! fs.put("docs/2024/report.pdf", Bytes::from_static(b"%PDF")).await?;
//!
//! for entry in fs.list("docs/2024").await? {
//!     println!("{} (dir: {})", entry.path(), entry.is_dir());
//! }
//! ```
//!
//! ## WebDAV Support
//!
//! Enable the `webdav` feature to serve a [`DocFs`] to Finder, Explorer or
//! any WebDAV client:
//!
//! ```ignore
//! use docstore_fs::webdav::serve;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let fs = docstore_fs::DocFs::new(std::sync::Arc::new(docstore_remote::MemoryStore::new()));
//!     serve(fs, 4918).await
//! }
//! ```

mod config;
mod entry;
mod error;
mod fs;
mod mutate;
pub mod path;
mod tree;

#[cfg(feature = "webdav")]
pub mod webdav;

pub use config::{ConfigError, DocFsConfig, MountConfig, DEFAULT_PORT};
pub use entry::{Capabilities, DocumentEntry, Entry, FolderEntry, TRASH_PREFIX};
pub use error::{Applied, CacheSyncWarning, Error, Result};
pub use fs::DocFs;
pub use tree::{FolderNode, Tree};

// Re-export the store boundary for convenience
pub use docstore_remote::{MemoryStore, RemoteStore};
