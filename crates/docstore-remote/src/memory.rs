//! In-process implementation of [`RemoteStore`].
//!
//! Behaves like the hosted service where it matters to the filesystem
//! layer: names are not unique per parent, trashed documents disappear from
//! normal searches, folder deletion is recursive, and copies land next to
//! their original. Every call is journaled and any call can be made to fail
//! once with [`MemoryStore::fail_next`].

use crate::error::{Error, Result};
use crate::model::{guess_mime_type, Document, DocumentId, Folder, FolderId, Location, Profile};
use crate::store::{RemoteStore, StoreFuture};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use log::debug;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Default quota reported by [`MemoryStore::new`] (5 GiB).
pub const DEFAULT_SPACE_MAX: u64 = 5 * 1024 * 1024 * 1024;

/// Identifies a [`RemoteStore`] call in the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreCall {
    ListFolders,
    ListDocuments,
    SearchDocuments,
    GetProfile,
    CreateFolder,
    RenameFolder,
    CreateDocument,
    RenameDocument,
    Move,
    CopyDocuments,
    Delete,
    Trash,
    DocumentContent,
    TrashedDocuments,
    TrashedFolders,
}

#[derive(Debug)]
struct StoredFolder {
    id: FolderId,
    name: String,
    parent: FolderId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    trashed: bool,
}

#[derive(Debug)]
struct StoredDocument {
    document: Document,
    parent: FolderId,
    content: Bytes,
}

#[derive(Debug)]
struct State {
    folders: Vec<StoredFolder>,
    documents: Vec<StoredDocument>,
    next_id: u64,
    space_max: u64,
    subscription_date: DateTime<Utc>,
    calls: Vec<StoreCall>,
    failures: Vec<StoreCall>,
}

/// A [`RemoteStore`] kept entirely in memory.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Create an empty store with the default quota, subscribed now.
    pub fn new() -> Self {
        Self::with_profile(DEFAULT_SPACE_MAX, Utc::now())
    }

    /// Create an empty store with the given quota and subscription date.
    pub fn with_profile(space_max: u64, subscription_date: DateTime<Utc>) -> Self {
        Self {
            state: Mutex::new(State {
                folders: Vec::new(),
                documents: Vec::new(),
                next_id: 1,
                space_max,
                subscription_date,
                calls: Vec::new(),
                failures: Vec::new(),
            }),
        }
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// How many times `call` was received.
    pub fn call_count(&self, call: StoreCall) -> usize {
        self.lock().calls.iter().filter(|c| **c == call).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Make the next `call` fail with [`Error::Unavailable`].
    pub fn fail_next(&self, call: StoreCall) {
        self.lock().failures.push(call);
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    fn record(&mut self, call: StoreCall) -> Result<()> {
        debug!("memory store: {:?}", call);
        self.calls.push(call);
        if let Some(pos) = self.failures.iter().position(|c| *c == call) {
            self.failures.remove(pos);
            return Err(Error::Unavailable(format!("injected failure for {:?}", call)));
        }
        Ok(())
    }

    fn next_id(&mut self, prefix: &str) -> String {
        let id = format!("{}-{}", prefix, self.next_id);
        self.next_id += 1;
        id
    }

    fn folder_index(&self, id: &FolderId) -> Option<usize> {
        self.folders.iter().position(|f| &f.id == id)
    }

    fn document_index(&self, id: &DocumentId) -> Option<usize> {
        self.documents.iter().position(|d| &d.document.id == id)
    }

    fn ensure_folder(&self, id: &FolderId) -> Result<()> {
        if id.is_root() || self.folder_index(id).is_some() {
            Ok(())
        } else {
            Err(Error::folder_not_found(id.as_str()))
        }
    }

    fn document_count(&self, parent: &FolderId) -> i64 {
        self.documents
            .iter()
            .filter(|d| &d.parent == parent && !d.document.location.is_trashed())
            .count() as i64
    }

    fn folder_view(&self, folder: &StoredFolder) -> Folder {
        Folder {
            id: folder.id.clone(),
            name: folder.name.clone(),
            created_at: folder.created_at,
            updated_at: folder.updated_at,
            document_count: self.document_count(&folder.id),
            folders: self.children_of(&folder.id),
        }
    }

    fn children_of(&self, parent: &FolderId) -> Vec<Folder> {
        self.folders
            .iter()
            .filter(|f| &f.parent == parent && !f.trashed)
            .map(|f| self.folder_view(f))
            .collect()
    }

    /// `id` and every folder below it.
    fn subtree(&self, id: &FolderId) -> HashSet<FolderId> {
        let mut found = HashSet::new();
        let mut pending = vec![id.clone()];
        while let Some(current) = pending.pop() {
            for child in self.folders.iter().filter(|f| f.parent == current) {
                pending.push(child.id.clone());
            }
            found.insert(current);
        }
        found
    }

    fn documents_in(&self, parent: &FolderId, locations: &[Location]) -> Vec<Document> {
        self.documents
            .iter()
            .filter(|d| &d.parent == parent && locations.contains(&d.document.location))
            .map(|d| d.document.clone())
            .collect()
    }
}

impl RemoteStore for MemoryStore {
    fn list_folders(&self) -> StoreFuture<'_, Vec<Folder>> {
        let result = (|| -> Result<Vec<Folder>> {
            let mut state = self.lock();
            state.record(StoreCall::ListFolders)?;
            Ok(state.children_of(&FolderId::root()))
        })();

        Box::pin(async move { result })
    }

    fn list_documents(&self) -> StoreFuture<'_, Vec<Document>> {
        let result = (|| -> Result<Vec<Document>> {
            let mut state = self.lock();
            state.record(StoreCall::ListDocuments)?;
            Ok(state.documents_in(&FolderId::root(), &Location::NORMAL))
        })();

        Box::pin(async move { result })
    }

    fn search_documents<'a>(
        &'a self,
        parent: &'a FolderId,
        locations: Option<&'a [Location]>,
    ) -> StoreFuture<'a, Vec<Document>> {
        let result = (|| -> Result<Vec<Document>> {
            let mut state = self.lock();
            state.record(StoreCall::SearchDocuments)?;
            state.ensure_folder(parent)?;
            Ok(state.documents_in(parent, locations.unwrap_or(&Location::NORMAL)))
        })();

        Box::pin(async move { result })
    }

    fn get_profile(&self) -> StoreFuture<'_, Profile> {
        let result = (|| -> Result<Profile> {
            let mut state = self.lock();
            state.record(StoreCall::GetProfile)?;
            let space_used: u64 = state.documents.iter().map(|d| d.document.size).sum();
            Ok(Profile {
                space_max: state.space_max,
                space_used,
                space_free: state.space_max.saturating_sub(space_used),
                subscription_date: state.subscription_date,
            })
        })();

        Box::pin(async move { result })
    }

    fn create_folder<'a>(
        &'a self,
        parent: &'a FolderId,
        name: &'a str,
    ) -> StoreFuture<'a, Folder> {
        let result = (|| -> Result<Folder> {
            let mut state = self.lock();
            state.record(StoreCall::CreateFolder)?;
            state.ensure_folder(parent)?;
            if name.is_empty() {
                return Err(Error::InvalidRequest("folder name is empty".to_string()));
            }

            let now = Utc::now();
            let folder = StoredFolder {
                id: FolderId(state.next_id("folder")),
                name: name.to_string(),
                parent: parent.clone(),
                created_at: now,
                updated_at: now,
                trashed: false,
            };
            let view = state.folder_view(&folder);
            state.folders.push(folder);
            Ok(view)
        })();

        Box::pin(async move { result })
    }

    fn rename_folder<'a>(&'a self, id: &'a FolderId, name: &'a str) -> StoreFuture<'a, Folder> {
        let result = (|| -> Result<Folder> {
            let mut state = self.lock();
            state.record(StoreCall::RenameFolder)?;
            let index = state
                .folder_index(id)
                .ok_or_else(|| Error::folder_not_found(id.as_str()))?;
            if name.is_empty() {
                return Err(Error::InvalidRequest("folder name is empty".to_string()));
            }

            let folder = &mut state.folders[index];
            folder.name = name.to_string();
            folder.updated_at = Utc::now();
            Ok(state.folder_view(&state.folders[index]))
        })();

        Box::pin(async move { result })
    }

    fn create_document<'a>(
        &'a self,
        parent: &'a FolderId,
        name: &'a str,
        content: Bytes,
    ) -> StoreFuture<'a, Document> {
        let result = (|| -> Result<Document> {
            let mut state = self.lock();
            state.record(StoreCall::CreateDocument)?;
            state.ensure_folder(parent)?;
            if name.is_empty() {
                return Err(Error::InvalidRequest("document name is empty".to_string()));
            }

            let document = Document {
                id: DocumentId(state.next_id("document")),
                name: name.to_string(),
                size: content.len() as u64,
                mime_type: guess_mime_type(name).to_string(),
                created_at: Utc::now(),
                location: Location::Safe,
                user_tags: Vec::new(),
            };
            state.documents.push(StoredDocument {
                document: document.clone(),
                parent: parent.clone(),
                content,
            });
            Ok(document)
        })();

        Box::pin(async move { result })
    }

    fn rename_document<'a>(
        &'a self,
        id: &'a DocumentId,
        name: &'a str,
    ) -> StoreFuture<'a, Document> {
        let result = (|| -> Result<Document> {
            let mut state = self.lock();
            state.record(StoreCall::RenameDocument)?;
            let index = state
                .document_index(id)
                .ok_or_else(|| Error::document_not_found(id.as_str()))?;
            if name.is_empty() {
                return Err(Error::InvalidRequest("document name is empty".to_string()));
            }

            let stored = &mut state.documents[index];
            stored.document.name = name.to_string();
            Ok(stored.document.clone())
        })();

        Box::pin(async move { result })
    }

    fn move_entries<'a>(
        &'a self,
        dest: &'a FolderId,
        documents: &'a [DocumentId],
        folders: &'a [FolderId],
    ) -> StoreFuture<'a, ()> {
        let result = (|| -> Result<()> {
            let mut state = self.lock();
            state.record(StoreCall::Move)?;
            state.ensure_folder(dest)?;

            let mut document_indexes = Vec::with_capacity(documents.len());
            for id in documents {
                let index = state
                    .document_index(id)
                    .ok_or_else(|| Error::document_not_found(id.as_str()))?;
                document_indexes.push(index);
            }

            let mut folder_indexes = Vec::with_capacity(folders.len());
            for id in folders {
                let index = state
                    .folder_index(id)
                    .ok_or_else(|| Error::folder_not_found(id.as_str()))?;
                if state.subtree(id).contains(dest) {
                    return Err(Error::InvalidRequest(format!(
                        "cannot move folder {} into itself",
                        id
                    )));
                }
                folder_indexes.push(index);
            }

            let now = Utc::now();
            for index in document_indexes {
                state.documents[index].parent = dest.clone();
            }
            for index in folder_indexes {
                let folder = &mut state.folders[index];
                folder.parent = dest.clone();
                folder.updated_at = now;
            }
            Ok(())
        })();

        Box::pin(async move { result })
    }

    fn copy_documents<'a>(&'a self, ids: &'a [DocumentId]) -> StoreFuture<'a, Vec<Document>> {
        let result = (|| -> Result<Vec<Document>> {
            let mut state = self.lock();
            state.record(StoreCall::CopyDocuments)?;

            let mut copies = Vec::with_capacity(ids.len());
            for id in ids {
                let index = state
                    .document_index(id)
                    .ok_or_else(|| Error::document_not_found(id.as_str()))?;
                let new_id = DocumentId(state.next_id("document"));
                let original = &state.documents[index];
                let mut document = original.document.clone();
                document.id = new_id;
                document.created_at = Utc::now();
                copies.push(StoredDocument {
                    document,
                    parent: original.parent.clone(),
                    content: original.content.clone(),
                });
            }

            let documents = copies.iter().map(|c| c.document.clone()).collect();
            state.documents.extend(copies);
            Ok(documents)
        })();

        Box::pin(async move { result })
    }

    fn delete<'a>(
        &'a self,
        documents: &'a [DocumentId],
        folders: &'a [FolderId],
    ) -> StoreFuture<'a, ()> {
        let result = (|| -> Result<()> {
            let mut state = self.lock();
            state.record(StoreCall::Delete)?;

            for id in documents {
                state
                    .document_index(id)
                    .ok_or_else(|| Error::document_not_found(id.as_str()))?;
            }
            let mut doomed = HashSet::new();
            for id in folders {
                state
                    .folder_index(id)
                    .ok_or_else(|| Error::folder_not_found(id.as_str()))?;
                doomed.extend(state.subtree(id));
            }

            state
                .documents
                .retain(|d| !documents.contains(&d.document.id) && !doomed.contains(&d.parent));
            state.folders.retain(|f| !doomed.contains(&f.id));
            Ok(())
        })();

        Box::pin(async move { result })
    }

    fn trash<'a>(
        &'a self,
        documents: &'a [DocumentId],
        folders: &'a [FolderId],
    ) -> StoreFuture<'a, ()> {
        let result = (|| -> Result<()> {
            let mut state = self.lock();
            state.record(StoreCall::Trash)?;

            let mut document_indexes = Vec::with_capacity(documents.len());
            for id in documents {
                let index = state
                    .document_index(id)
                    .ok_or_else(|| Error::document_not_found(id.as_str()))?;
                document_indexes.push(index);
            }
            let mut trashed_folders = HashSet::new();
            let mut contents = HashSet::new();
            for id in folders {
                state
                    .folder_index(id)
                    .ok_or_else(|| Error::folder_not_found(id.as_str()))?;
                trashed_folders.insert(id.clone());
                contents.extend(state.subtree(id));
            }

            for index in document_indexes {
                let location = &mut state.documents[index].document.location;
                *location = location.trashed();
            }
            for stored in state.documents.iter_mut() {
                if contents.contains(&stored.parent) {
                    stored.document.location = stored.document.location.trashed();
                }
            }
            for folder in state.folders.iter_mut() {
                if trashed_folders.contains(&folder.id) {
                    folder.trashed = true;
                }
            }
            Ok(())
        })();

        Box::pin(async move { result })
    }

    fn document_content<'a>(&'a self, id: &'a DocumentId) -> StoreFuture<'a, (Bytes, String)> {
        let result = (|| -> Result<(Bytes, String)> {
            let mut state = self.lock();
            state.record(StoreCall::DocumentContent)?;
            let index = state
                .document_index(id)
                .ok_or_else(|| Error::document_not_found(id.as_str()))?;
            let stored = &state.documents[index];
            Ok((stored.content.clone(), stored.document.mime_type.clone()))
        })();

        Box::pin(async move { result })
    }

    fn trashed_documents(&self) -> StoreFuture<'_, Vec<Document>> {
        let result = (|| -> Result<Vec<Document>> {
            let mut state = self.lock();
            state.record(StoreCall::TrashedDocuments)?;
            Ok(state
                .documents
                .iter()
                .filter(|d| d.document.location.is_trashed())
                .map(|d| d.document.clone())
                .collect())
        })();

        Box::pin(async move { result })
    }

    fn trashed_folders(&self) -> StoreFuture<'_, Vec<Folder>> {
        let result = (|| -> Result<Vec<Folder>> {
            let mut state = self.lock();
            state.record(StoreCall::TrashedFolders)?;
            Ok(state
                .folders
                .iter()
                .filter(|f| f.trashed)
                .map(|f| state.folder_view(f))
                .collect())
        })();

        Box::pin(async move { result })
    }
}
