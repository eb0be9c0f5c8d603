//! WebDAV server adapter for a [`DocFs`](crate::DocFs).
//!
//! Exposes the document store as a network-mountable filesystem, usable from
//! Finder, Windows Explorer, or any WebDAV client.
//!
//! | WebDAV | `DocFs` |
//! |---|---|
//! | PROPFIND (collection) | `list` |
//! | PROPFIND (resource) | `stat` |
//! | GET | `new_object` + `open` |
//! | PUT | buffered, then `put` |
//! | MKCOL | `mkdir` |
//! | DELETE | `rmdir` / document `remove` |
//! | MOVE | `dir_move` / `move_object` |
//! | COPY | `copy_object` |
//!
//! # Example
//!
//! ```ignore
//! use docstore_fs::webdav::serve_background;
//!
//! let server = serve_background(fs, 0).await?;
//! println!("mount {}", server.mount_url());
//! server.shutdown();
//! ```

mod file;
mod filesystem;
mod server;

pub use filesystem::DocDavFs;
pub use server::{serve, serve_background, DocWebDavServer};
