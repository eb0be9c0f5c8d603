//! The filesystem handle and its read-side operations.

use crate::config::DocFsConfig;
use crate::entry::{DocumentEntry, Entry, FolderEntry};
use crate::error::{Error, Result};
use crate::path::{decode_name, encode_name, join_remote, split_remote, trim_remote};
use crate::tree::{FolderNode, Tree};
use docstore_remote::{Document, DocumentId, FolderId, Location, RemoteStore, StoreFuture};
use log::debug;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, RwLockMappedWriteGuard, RwLockReadGuard, RwLockWriteGuard};

/// A remote document store seen as a hierarchical filesystem.
///
/// The folder graph is fetched on first use and patched by every mutation
/// made through this handle. Changes made by other clients are not seen
/// until [`DocFs::flush_cache`]. Clones share the same cache.
#[derive(Clone)]
pub struct DocFs {
    inner: Arc<DocFsInner>,
}

struct DocFsInner {
    store: Arc<dyn RemoteStore>,
    tree: RwLock<Option<Tree>>,
    call_timeout: Option<Duration>,
}

impl fmt::Debug for DocFs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocFs")
            .field("call_timeout", &self.inner.call_timeout)
            .finish_non_exhaustive()
    }
}

impl DocFs {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self::with_config(store, &DocFsConfig::default())
    }

    pub fn with_config(store: Arc<dyn RemoteStore>, config: &DocFsConfig) -> Self {
        Self {
            inner: Arc::new(DocFsInner {
                store,
                tree: RwLock::new(None),
                call_timeout: config.call_timeout(),
            }),
        }
    }

    pub fn store(&self) -> &dyn RemoteStore {
        self.inner.store.as_ref()
    }

    /// Whether `other` is a handle on the same filesystem.
    pub fn same_fs(&self, other: &DocFs) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether the folder graph is currently cached.
    pub async fn is_cached(&self) -> bool {
        self.inner.tree.read().await.is_some()
    }

    /// Forget the cached folder graph. The next operation fetches it again.
    pub async fn flush_cache(&self) {
        debug!("flushing folder cache");
        *self.inner.tree.write().await = None;
    }

    /// Run one remote call under the configured deadline.
    pub(crate) async fn call<T>(
        &self,
        op: &'static str,
        context: &str,
        fut: StoreFuture<'_, T>,
    ) -> Result<T> {
        debug!("{} {}", op, context);
        let result = match self.inner.call_timeout {
            Some(after) => tokio::time::timeout(after, fut)
                .await
                .map_err(|_| Error::Timeout { op, after })?,
            None => fut.await,
        };
        result.map_err(|source| Error::Remote {
            op,
            context: context.to_string(),
            source,
        })
    }

    async fn build_tree(&self) -> Result<Tree> {
        let store = self.store();
        let (folders, documents, profile) = tokio::try_join!(
            self.call("list folders", "", store.list_folders()),
            self.call("list documents", "", store.list_documents()),
            self.call("get profile", "", store.get_profile())
        )?;
        debug!(
            "built folder cache: {} top-level folders, {} top-level documents",
            folders.len(),
            documents.len()
        );
        Ok(Tree::from_remote(&profile, folders, documents.len()))
    }

    /// Exclusive access to the tree, building it first if needed.
    ///
    /// A failed build leaves the slot empty so the next call retries.
    pub(crate) async fn write_tree(&self) -> Result<RwLockMappedWriteGuard<'_, Tree>> {
        let mut slot = self.inner.tree.write().await;
        let tree = match slot.take() {
            Some(tree) => tree,
            None => self.build_tree().await?,
        };
        Ok(RwLockWriteGuard::map(slot, move |slot| slot.insert(tree)))
    }

    /// Shared access to the tree. An empty slot is filled under the
    /// exclusive lock, which is then downgraded.
    pub(crate) async fn read_tree(&self) -> Result<RwLockReadGuard<'_, Tree>> {
        loop {
            match RwLockReadGuard::try_map(self.inner.tree.read().await, Option::as_ref) {
                Ok(tree) => return Ok(tree),
                Err(empty) => drop(empty),
            }

            let mut slot = self.inner.tree.write().await;
            self.fill_slot(&mut slot).await?;
            match RwLockReadGuard::try_map(slot.downgrade(), Option::as_ref) {
                Ok(tree) => return Ok(tree),
                Err(empty) => drop(empty),
            }
        }
    }

    /// Build the tree into `slot` unless another caller already did.
    async fn fill_slot(&self, slot: &mut Option<Tree>) -> Result<()> {
        if slot.is_none() {
            *slot = Some(self.build_tree().await?);
        }
        Ok(())
    }

    /// Documents directly in `folder`, outside the trash.
    async fn documents_in(&self, folder: &FolderNode, path: &str) -> Result<Vec<Document>> {
        let documents = if folder.id.is_root() {
            self.call("list documents", path, self.store().list_documents())
                .await?
        } else {
            self.call(
                "search documents",
                path,
                self.store().search_documents(&folder.id, None),
            )
            .await?
        };
        debug!("{:?}: {} documents", path, documents.len());
        Ok(documents)
    }

    pub(crate) async fn search(
        &self,
        folder: &FolderId,
        locations: Option<&[Location]>,
        path: &str,
    ) -> Result<Vec<Document>> {
        self.call(
            "search documents",
            path,
            self.store().search_documents(folder, locations),
        )
        .await
    }

    /// The root folder.
    pub async fn root(&self) -> Result<FolderEntry> {
        let tree = self.read_tree().await?;
        Ok(FolderEntry::new(
            self.clone(),
            Arc::clone(tree.root()),
            String::new(),
        ))
    }

    /// Folders and documents directly in `dir`. Folders come first.
    pub async fn list(&self, dir: &str) -> Result<Vec<Entry>> {
        let tree = self.read_tree().await?;
        let dir = trim_remote(dir);
        let folder = Arc::clone(tree.resolve(dir)?);

        let mut entries: Vec<Entry> = folder
            .folders
            .iter()
            .map(|child| {
                Entry::Folder(FolderEntry::new(
                    self.clone(),
                    Arc::clone(child),
                    join_remote(dir, &encode_name(&child.name)),
                ))
            })
            .collect();

        for document in self.documents_in(&folder, dir).await? {
            let path = join_remote(dir, &encode_name(&document.name));
            entries.push(Entry::Document(DocumentEntry::new(
                self.clone(),
                document,
                path,
            )));
        }
        Ok(entries)
    }

    /// The document at `path`.
    ///
    /// Fails with [`Error::IsDirectory`] when only a folder has that name.
    pub async fn new_object(&self, path: &str) -> Result<DocumentEntry> {
        let tree = self.read_tree().await?;
        self.find_document(&tree, path).await
    }

    /// The folder or document at `path`. Folders win over documents of the
    /// same name.
    pub async fn stat(&self, path: &str) -> Result<Entry> {
        let tree = self.read_tree().await?;
        let path = trim_remote(path);
        if let Ok(node) = tree.resolve(path) {
            return Ok(Entry::Folder(FolderEntry::new(
                self.clone(),
                Arc::clone(node),
                path.to_string(),
            )));
        }
        self.find_document(&tree, path).await.map(Entry::Document)
    }

    pub(crate) async fn find_document(&self, tree: &Tree, path: &str) -> Result<DocumentEntry> {
        let path = trim_remote(path);
        let (parent_path, segment) = split_remote(path);
        let parent = match tree.resolve(parent_path) {
            Ok(parent) => parent,
            Err(Error::DirectoryNotFound(_)) => return Err(Error::NotFound(path.to_string())),
            Err(err) => return Err(err),
        };
        let name = decode_name(segment);

        let documents = self.search(&parent.id, None, path).await?;
        if let Some(document) = documents.into_iter().find(|d| d.name == name) {
            return Ok(DocumentEntry::new(self.clone(), document, path.to_string()));
        }
        if parent.child(&name).is_some() {
            return Err(Error::IsDirectory(path.to_string()));
        }
        Err(Error::NotFound(path.to_string()))
    }

    /// Permanently delete everything in the trash.
    pub async fn clean_up(&self) -> Result<()> {
        let documents = self
            .call("trashed documents", "", self.store().trashed_documents())
            .await?;
        let folders = self
            .call("trashed folders", "", self.store().trashed_folders())
            .await?;
        if documents.is_empty() && folders.is_empty() {
            debug!("trash is already empty");
            return Ok(());
        }

        let document_ids: Vec<DocumentId> = documents.into_iter().map(|d| d.id).collect();
        let folder_ids: Vec<FolderId> = folders.into_iter().map(|f| f.id).collect();
        let context = format!(
            "{} documents, {} folders",
            document_ids.len(),
            folder_ids.len()
        );
        self.call(
            "delete",
            &context,
            self.store().delete(&document_ids, &folder_ids),
        )
        .await
    }
}
