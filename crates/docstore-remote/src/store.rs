//! The remote store client boundary.
//!
//! Every call returns a boxed `Send` future so implementations can be used
//! behind `Arc<dyn RemoteStore>`. Dropping a future cancels the call.

use crate::error::Result;
use crate::model::{Document, DocumentId, Folder, FolderId, Location, Profile};
use bytes::Bytes;
use futures::future::BoxFuture;

/// Future returned by [`RemoteStore`] calls.
pub type StoreFuture<'a, T> = BoxFuture<'a, Result<T>>;

/// ID-keyed operations offered by a remote document store.
///
/// The store has no notion of paths: folders contain folders and documents
/// by identifier only. Each call is individually atomic; successive calls
/// are only eventually consistent.
pub trait RemoteStore: Send + Sync {
    /// All folders reachable from the root, nested.
    fn list_folders(&self) -> StoreFuture<'_, Vec<Folder>>;

    /// Documents stored directly in the root.
    fn list_documents(&self) -> StoreFuture<'_, Vec<Document>>;

    /// Documents stored directly in `parent`.
    ///
    /// Without a location filter only documents outside the trash are
    /// returned.
    fn search_documents<'a>(
        &'a self,
        parent: &'a FolderId,
        locations: Option<&'a [Location]>,
    ) -> StoreFuture<'a, Vec<Document>>;

    fn get_profile(&self) -> StoreFuture<'_, Profile>;

    fn create_folder<'a>(&'a self, parent: &'a FolderId, name: &'a str)
        -> StoreFuture<'a, Folder>;

    fn rename_folder<'a>(&'a self, id: &'a FolderId, name: &'a str) -> StoreFuture<'a, Folder>;

    fn create_document<'a>(
        &'a self,
        parent: &'a FolderId,
        name: &'a str,
        content: Bytes,
    ) -> StoreFuture<'a, Document>;

    fn rename_document<'a>(&'a self, id: &'a DocumentId, name: &'a str)
        -> StoreFuture<'a, Document>;

    /// Move documents and folders into `dest`.
    fn move_entries<'a>(
        &'a self,
        dest: &'a FolderId,
        documents: &'a [DocumentId],
        folders: &'a [FolderId],
    ) -> StoreFuture<'a, ()>;

    /// Copy documents; each copy lands next to its original.
    fn copy_documents<'a>(&'a self, ids: &'a [DocumentId]) -> StoreFuture<'a, Vec<Document>>;

    /// Permanently delete documents and folders (folders recursively).
    fn delete<'a>(
        &'a self,
        documents: &'a [DocumentId],
        folders: &'a [FolderId],
    ) -> StoreFuture<'a, ()>;

    /// Move documents and folders to the trash.
    fn trash<'a>(
        &'a self,
        documents: &'a [DocumentId],
        folders: &'a [FolderId],
    ) -> StoreFuture<'a, ()>;

    /// Document bytes and the content type announced by the remote.
    fn document_content<'a>(&'a self, id: &'a DocumentId) -> StoreFuture<'a, (Bytes, String)>;

    fn trashed_documents(&self) -> StoreFuture<'_, Vec<Document>>;

    fn trashed_folders(&self) -> StoreFuture<'_, Vec<Folder>>;
}
