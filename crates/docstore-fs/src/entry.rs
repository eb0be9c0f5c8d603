//! Folder and document views handed out by [`DocFs`].
//!
//! An entry is a snapshot: it keeps the state it was resolved from and is
//! not updated by later mutations.

use crate::error::{Applied, Error, Result};
use crate::fs::DocFs;
use crate::path::{encode_name, join_remote};
use crate::tree::FolderNode;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use docstore_remote::{Document, DocumentId, FolderId, Location};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Folder paths under this prefix hold trashed content.
pub const TRASH_PREFIX: &str = ".trash/";

/// What an entry supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// The entry carries a remote identifier.
    pub has_id: bool,
    pub is_directory: bool,
}

/// A listed filesystem entry.
#[derive(Debug, Clone)]
pub enum Entry {
    Folder(FolderEntry),
    Document(DocumentEntry),
}

impl Entry {
    pub fn path(&self) -> &str {
        match self {
            Entry::Folder(folder) => folder.path(),
            Entry::Document(document) => document.path(),
        }
    }

    /// Remote name, not escaped.
    pub fn name(&self) -> &str {
        match self {
            Entry::Folder(folder) => folder.name(),
            Entry::Document(document) => document.name(),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            Entry::Folder(folder) => folder.capabilities(),
            Entry::Document(document) => document.capabilities(),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.capabilities().is_directory
    }

    pub fn modified(&self) -> DateTime<Utc> {
        match self {
            Entry::Folder(folder) => folder.modified(),
            Entry::Document(document) => document.modified(),
        }
    }

    pub fn as_folder(&self) -> Option<&FolderEntry> {
        match self {
            Entry::Folder(folder) => Some(folder),
            Entry::Document(_) => None,
        }
    }

    pub fn as_document(&self) -> Option<&DocumentEntry> {
        match self {
            Entry::Document(document) => Some(document),
            Entry::Folder(_) => None,
        }
    }
}

/// A cached folder and its path.
#[derive(Debug, Clone)]
pub struct FolderEntry {
    fs: DocFs,
    node: Arc<FolderNode>,
    path: String,
}

impl FolderEntry {
    pub(crate) fn new(fs: DocFs, node: Arc<FolderNode>, path: String) -> Self {
        Self { fs, node, path }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn fs(&self) -> &DocFs {
        &self.fs
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }

    pub fn id(&self) -> &FolderId {
        &self.node.id
    }

    /// The cached node this entry was resolved to.
    pub fn node(&self) -> &Arc<FolderNode> {
        &self.node
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.node.created_at
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.node.updated_at
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            has_id: !self.node.id.is_root(),
            is_directory: true,
        }
    }

    /// Documents in this folder and below, from the cached counts.
    pub fn items(&self) -> i64 {
        self.node.total_documents()
    }

    pub fn is_in_trash(&self) -> bool {
        self.path.starts_with(TRASH_PREFIX)
    }

    /// Total size of the documents in this folder and below.
    ///
    /// Queries the remote for every folder of the subtree on each call.
    pub async fn size(&self) -> Result<u64> {
        let locations: &[Location] = if self.is_in_trash() {
            &Location::TRASHED
        } else {
            &Location::NORMAL
        };

        let mut total = 0;
        let mut pending = vec![(Arc::clone(&self.node), self.path.clone())];
        while let Some((node, path)) = pending.pop() {
            let documents = self.fs.search(&node.id, Some(locations), &path).await?;
            total += documents.iter().map(|d| d.size).sum::<u64>();
            pending.extend(node.folders.iter().map(|child| {
                let child_path = join_remote(&path, &encode_name(&child.name));
                (Arc::clone(child), child_path)
            }));
        }
        Ok(total)
    }
}

/// A remote document and its path.
#[derive(Debug, Clone)]
pub struct DocumentEntry {
    fs: DocFs,
    document: Document,
    path: String,
}

impl DocumentEntry {
    pub(crate) fn new(fs: DocFs, document: Document, path: String) -> Self {
        Self { fs, document, path }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.document.name
    }

    pub fn id(&self) -> &DocumentId {
        &self.document.id
    }

    pub fn size(&self) -> u64 {
        self.document.size
    }

    pub fn mime_type(&self) -> &str {
        &self.document.mime_type
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.document.created_at
    }

    /// Documents are never modified in place, so this is the creation time.
    pub fn modified(&self) -> DateTime<Utc> {
        self.document.created_at
    }

    /// Storage tier.
    pub fn location(&self) -> Location {
        self.document.location
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub(crate) fn fs(&self) -> &DocFs {
        &self.fs
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            has_id: true,
            is_directory: false,
        }
    }

    /// User tags as key/value pairs, split on the first `=`.
    pub fn metadata(&self) -> BTreeMap<String, String> {
        self.document
            .user_tags
            .iter()
            .map(|tag| match tag.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (tag.clone(), String::new()),
            })
            .collect()
    }

    /// Replacing content in place is not supported; use
    /// [`DocFs::put`](crate::DocFs::put).
    pub fn update(&self, _content: Bytes) -> Result<()> {
        Err(Error::NotImplemented("update"))
    }

    pub fn set_mod_time(&self, _modified: DateTime<Utc>) -> Result<()> {
        Err(Error::NotImplemented("set modification time"))
    }

    /// Download the document content.
    pub async fn open(&self) -> Result<Bytes> {
        let (content, content_type) = self
            .fs
            .call(
                "document content",
                &self.path,
                self.fs.store().document_content(&self.document.id),
            )
            .await?;

        match media_type(&content_type) {
            None => debug!("{}: cannot check content type {:?}", self.path, content_type),
            Some(media) if media != self.document.mime_type => warn!(
                "{}: content type mismatch: {:?} != {:?}",
                self.path, media, self.document.mime_type
            ),
            Some(_) => {}
        }
        Ok(content)
    }

    /// Move the document to the trash.
    pub async fn remove(&self) -> Result<Applied<()>> {
        self.fs.remove_document(self).await
    }
}

/// Media type of a `Content-Type` value, without parameters.
fn media_type(content_type: &str) -> Option<String> {
    let media = content_type.split(';').next()?.trim();
    let (kind, subtype) = media.split_once('/')?;
    if kind.is_empty() || subtype.is_empty() {
        return None;
    }
    Some(media.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type() {
        assert_eq!(
            media_type("text/plain; charset=utf-8").as_deref(),
            Some("text/plain")
        );
        assert_eq!(
            media_type("Application/PDF").as_deref(),
            Some("application/pdf")
        );
        assert_eq!(media_type("garbage"), None);
        assert_eq!(media_type("/x"), None);
    }

    #[test]
    fn test_metadata_splits_on_first_equals() {
        let document = Document {
            id: DocumentId("doc-1".to_string()),
            name: "scan.pdf".to_string(),
            size: 4,
            mime_type: "application/pdf".to_string(),
            created_at: Utc::now(),
            location: Location::Safe,
            user_tags: vec!["a=b=c".to_string(), "flag".to_string(), "k=".to_string()],
        };
        let fs = DocFs::new(Arc::new(docstore_remote::MemoryStore::new()));
        let entry = DocumentEntry::new(fs, document, "scan.pdf".to_string());

        let metadata = entry.metadata();
        assert_eq!(metadata.len(), 3);
        assert_eq!(metadata["a"], "b=c");
        assert_eq!(metadata["flag"], "");
        assert_eq!(metadata["k"], "");
    }
}
