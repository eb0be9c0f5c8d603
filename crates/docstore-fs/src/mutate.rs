//! Mutating operations.
//!
//! Each operation holds the exclusive lock for its whole duration, issues
//! its remote calls, then patches the cached tree instead of fetching it
//! again. Nothing is patched when the remote call fails. Patches made after
//! the remote succeeded are best-effort: a patch that cannot be applied is
//! returned as a [`CacheSyncWarning`] next to the result.

use crate::entry::{DocumentEntry, Entry, FolderEntry};
use crate::error::{Applied, CacheSyncWarning, Error, Result};
use crate::fs::DocFs;
use crate::path::{decode_name, normalize_remote, split_remote, trim_remote};
use crate::tree::{FolderNode, Tree};
use bytes::Bytes;
use docstore_remote::{Document, DocumentId, FolderId};
use log::{debug, info, warn};
use std::slice;
use std::sync::Arc;

fn cache_warning(path: &str, source: Error) -> CacheSyncWarning {
    let warning = CacheSyncWarning {
        path: path.to_string(),
        source,
    };
    warn!("{}", warning);
    warning
}

fn adjust_count(tree: &mut Tree, path: &str, delta: i64, warnings: &mut Vec<CacheSyncWarning>) {
    match tree.resolve_mut(path) {
        Ok(folder) => folder.document_count += delta,
        Err(source) => warnings.push(cache_warning(path, source)),
    }
}

/// A folder taken apart by `merge_dirs`.
struct MergeSource {
    path: String,
    id: FolderId,
    folders: Vec<Arc<FolderNode>>,
    documents: Vec<DocumentId>,
}

impl DocFs {
    fn check_same_fs(&self, other: &DocFs, what: &str) -> Result<()> {
        if self.same_fs(other) {
            Ok(())
        } else {
            Err(Error::UnsupportedEntry(format!(
                "{} belongs to another filesystem",
                what
            )))
        }
    }

    /// Upload `content` as the document at `path`.
    ///
    /// An existing document of the same name is replaced: the new one is
    /// created first, then the old one is deleted. Count patches that cannot
    /// be applied are only logged.
    pub async fn put(&self, path: &str, content: Bytes) -> Result<DocumentEntry> {
        let mut tree = self.write_tree().await?;
        let path = trim_remote(path);
        let (parent_path, segment) = split_remote(path);
        let name = decode_name(segment);
        if name.is_empty() {
            return Err(Error::UnsupportedEntry("cannot write to the root".to_string()));
        }

        let parent = Arc::clone(tree.resolve(parent_path)?);
        if parent.child(&name).is_some() {
            info!("{}: found folder with the same name, ignoring it", path);
        }

        let existing: Vec<DocumentId> = self
            .search(&parent.id, None, path)
            .await?
            .into_iter()
            .filter(|d| d.name == name)
            .map(|d| d.id)
            .collect();
        if existing.len() > 1 {
            return Err(Error::DuplicateDocuments {
                path: path.to_string(),
                count: existing.len(),
            });
        }

        let document = self
            .call(
                "create document",
                path,
                self.store().create_document(&parent.id, &name, content),
            )
            .await?;
        let mut warnings = Vec::new();
        adjust_count(&mut tree, parent_path, 1, &mut warnings);
        let created = document.id.clone();
        let entry = DocumentEntry::new(self.clone(), document, path.to_string());

        if existing.is_empty() {
            return Ok(entry);
        }
        if let Err(err) = self
            .call("delete", path, self.store().delete(&existing, &[]))
            .await
        {
            return Err(Error::Replace {
                path: path.to_string(),
                created,
                source: Box::new(err),
            });
        }
        adjust_count(&mut tree, parent_path, -(existing.len() as i64), &mut warnings);
        debug!("{}: replaced {}", path, existing[0]);
        Ok(entry)
    }

    /// Create the folder at `dir`. Creating an existing folder is a no-op.
    pub async fn mkdir(&self, dir: &str) -> Result<()> {
        let mut tree = self.write_tree().await?;
        let dir = trim_remote(dir);
        if dir.is_empty() {
            return Ok(());
        }
        let (parent_path, segment) = split_remote(dir);
        let name = decode_name(segment);

        let parent = tree.resolve(parent_path)?;
        if parent.child(&name).is_some() {
            debug!("{}: already exists", dir);
            return Ok(());
        }
        let parent_id = parent.id.clone();

        let folder = self
            .call(
                "create folder",
                dir,
                self.store().create_folder(&parent_id, &name),
            )
            .await?;
        tree.resolve_mut(parent_path)?
            .folders
            .push(Arc::new(FolderNode::from(folder)));
        Ok(())
    }

    /// Delete the folder at `dir` if it holds no documents, even in its
    /// subfolders.
    ///
    /// Every sibling with that name is deleted.
    pub async fn rmdir(&self, dir: &str) -> Result<()> {
        self.delete_folders(dir, true).await
    }

    /// Delete the folder at `dir` and everything in it.
    pub async fn purge(&self, dir: &str) -> Result<()> {
        self.delete_folders(dir, false).await
    }

    async fn delete_folders(&self, dir: &str, only_empty: bool) -> Result<()> {
        let mut tree = self.write_tree().await?;
        let dir = trim_remote(dir);
        if dir.is_empty() {
            return Err(Error::UnsupportedEntry(
                "cannot remove the root folder".to_string(),
            ));
        }
        let (parent_path, segment) = split_remote(dir);
        let name = decode_name(segment);

        let parent = tree.resolve(parent_path)?;
        let matches: Vec<&Arc<FolderNode>> = parent.children_named(&name).collect();
        if matches.is_empty() {
            return Err(Error::NotFound(dir.to_string()));
        }
        if matches.len() > 1 {
            info!(
                "{}: found {} folders with the same name, deleting all",
                dir,
                matches.len()
            );
        }
        if only_empty && matches.iter().any(|f| f.total_documents() > 0) {
            return Err(Error::NotEmpty(dir.to_string()));
        }
        let ids: Vec<FolderId> = matches.iter().map(|f| f.id.clone()).collect();

        self.call("delete", dir, self.store().delete(&[], &ids))
            .await?;
        let removed = tree.resolve_mut(parent_path)?.remove_children(&ids);
        debug!("{}: removed {} cached folders", dir, removed);
        Ok(())
    }

    /// Move a document to `dst`, renaming it if the last segment differs.
    pub async fn move_object(&self, src: &Entry, dst: &str) -> Result<Applied<DocumentEntry>> {
        let src = self.document_source(src)?;
        let mut tree = self.write_tree().await?;
        let src_path = normalize_remote(src.path());
        let dst = normalize_remote(dst);
        let dst = dst.as_str();
        let (src_parent, src_base) = split_remote(&src_path);
        let (dst_parent, dst_base) = split_remote(dst);
        let dest_id = tree.resolve(dst_parent)?.id.clone();

        let mut warnings = Vec::new();
        let mut document = src.document().clone();
        if src_parent != dst_parent {
            let context = format!("{} -> {}", src.path(), dst);
            self.call(
                "move",
                &context,
                self.store()
                    .move_entries(&dest_id, slice::from_ref(&document.id), &[]),
            )
            .await?;
            adjust_count(&mut tree, src_parent, -1, &mut warnings);
            adjust_count(&mut tree, dst_parent, 1, &mut warnings);
        }

        if src_base != dst_base {
            document = self.rename_document(&document.id, dst).await?;
        }
        Ok(Applied::new(
            DocumentEntry::new(self.clone(), document, dst.to_string()),
            warnings,
        ))
    }

    /// Copy a document to `dst`.
    ///
    /// The copy is made next to the original, then moved and renamed as
    /// needed. Only the destination count grows.
    pub async fn copy_object(&self, src: &Entry, dst: &str) -> Result<Applied<DocumentEntry>> {
        let src = self.document_source(src)?;
        let mut tree = self.write_tree().await?;
        let src_path = normalize_remote(src.path());
        let dst = normalize_remote(dst);
        let dst = dst.as_str();
        let (src_parent, src_base) = split_remote(&src_path);
        let (dst_parent, dst_base) = split_remote(dst);
        let dest_id = tree.resolve(dst_parent)?.id.clone();

        let copies = self
            .call(
                "copy documents",
                src.path(),
                self.store().copy_documents(slice::from_ref(src.id())),
            )
            .await?;
        let mut copy = match <[Document; 1]>::try_from(copies) {
            Ok([copy]) => copy,
            Err(copies) => {
                return Err(Error::UnexpectedResponse {
                    op: "copy documents",
                    detail: format!("expected 1 document, got {}", copies.len()),
                })
            }
        };

        let mut warnings = Vec::new();
        if src_parent != dst_parent {
            let context = format!("{} -> {}", copy.id, dst);
            let moved = self
                .call(
                    "move",
                    &context,
                    self.store()
                        .move_entries(&dest_id, slice::from_ref(&copy.id), &[]),
                )
                .await;
            if let Err(err) = moved {
                // The copy stays next to the original.
                adjust_count(&mut tree, src_parent, 1, &mut warnings);
                return Err(err);
            }
        }
        adjust_count(&mut tree, dst_parent, 1, &mut warnings);

        if src_base != dst_base {
            copy = self.rename_document(&copy.id, dst).await?;
        }
        Ok(Applied::new(
            DocumentEntry::new(self.clone(), copy, dst.to_string()),
            warnings,
        ))
    }

    fn document_source<'a>(&self, src: &'a Entry) -> Result<&'a DocumentEntry> {
        match src {
            Entry::Document(document) => {
                self.check_same_fs(document.fs(), "document")?;
                Ok(document)
            }
            Entry::Folder(folder) => Err(Error::UnsupportedEntry(format!(
                "{:?} is a folder",
                folder.path()
            ))),
        }
    }

    async fn rename_document(&self, id: &DocumentId, dst: &str) -> Result<Document> {
        let (_, dst_base) = split_remote(dst);
        let name = decode_name(dst_base);
        self.call(
            "rename document",
            dst,
            self.store().rename_document(id, &name),
        )
        .await
    }

    /// Move the folder at `src_path` of `src` to `dst_path` of this
    /// filesystem.
    ///
    /// Both must be the same filesystem.
    pub async fn dir_move(
        &self,
        src: &DocFs,
        src_path: &str,
        dst_path: &str,
    ) -> Result<Applied<()>> {
        self.check_same_fs(src, "source folder")?;
        let mut tree = self.write_tree().await?;
        let src_path = normalize_remote(src_path);
        let dst_path = normalize_remote(dst_path);
        let (src_path, dst_path) = (src_path.as_str(), dst_path.as_str());
        if src_path.is_empty() || dst_path.is_empty() {
            return Err(Error::UnsupportedEntry(
                "cannot move the root folder".to_string(),
            ));
        }
        let (src_parent, src_base) = split_remote(src_path);
        let (dst_parent, dst_base) = split_remote(dst_path);
        let folder_id = tree.resolve(src_path)?.id.clone();
        let dest_id = tree.resolve(dst_parent)?.id.clone();

        let mut warnings = Vec::new();
        if src_parent != dst_parent {
            let context = format!("{} -> {}", src_path, dst_path);
            self.call(
                "move",
                &context,
                self.store()
                    .move_entries(&dest_id, &[], slice::from_ref(&folder_id)),
            )
            .await?;

            let mut moved = None;
            match tree.resolve_mut(src_parent) {
                Ok(parent) => moved = parent.take_child(&folder_id),
                Err(source) => warnings.push(cache_warning(src_parent, source)),
            }
            match tree.resolve_mut(dst_parent) {
                Ok(parent) => {
                    parent.remove_children(slice::from_ref(&folder_id));
                    parent.folders.extend(moved);
                }
                Err(source) => warnings.push(cache_warning(dst_parent, source)),
            }
        }

        if src_base != dst_base {
            let name = decode_name(dst_base);
            let folder = self
                .call(
                    "rename folder",
                    dst_path,
                    self.store().rename_folder(&folder_id, &name),
                )
                .await?;
            match tree.resolve_mut(dst_parent) {
                Ok(parent) => match parent.folders.iter_mut().find(|f| f.id == folder_id) {
                    Some(node) => {
                        let node = Arc::make_mut(node);
                        node.name = folder.name;
                        node.updated_at = folder.updated_at;
                    }
                    None => warnings.push(cache_warning(
                        dst_path,
                        Error::DirectoryNotFound(dst_path.to_string()),
                    )),
                },
                Err(source) => warnings.push(cache_warning(dst_parent, source)),
            }
        }
        Ok(Applied::new((), warnings))
    }

    /// Move the contents of `dirs[1..]` into `dirs[0]`, then delete
    /// `dirs[1..]`. Fewer than two folders is a no-op.
    ///
    /// Folders are told apart by id, so same-named siblings can be merged.
    pub async fn merge_dirs(&self, dirs: &[FolderEntry]) -> Result<Applied<()>> {
        let mut tree = self.write_tree().await?;
        let Some((dest, sources)) = dirs.split_first() else {
            return Ok(Applied::new((), Vec::new()));
        };
        if sources.is_empty() {
            return Ok(Applied::new((), Vec::new()));
        }
        for dir in dirs {
            self.check_same_fs(dir.fs(), "folder")?;
        }
        for (i, dir) in sources.iter().enumerate() {
            if dir.id().is_root() {
                return Err(Error::UnsupportedEntry(
                    "cannot merge the root folder into another".to_string(),
                ));
            }
            if dir.id() == dest.id() || sources[..i].iter().any(|d| d.id() == dir.id()) {
                return Err(Error::UnsupportedEntry(format!(
                    "{:?} is listed more than once",
                    dir.path()
                )));
            }
        }
        let dest_id = tree.locate(dest.path(), dest.id())?.id.clone();

        let mut merged = Vec::with_capacity(sources.len());
        for dir in sources {
            let node = Arc::clone(tree.locate(dir.path(), dir.id())?);
            let documents = self
                .search(&node.id, None, dir.path())
                .await?
                .into_iter()
                .map(|d| d.id)
                .collect();
            merged.push(MergeSource {
                path: dir.path().to_string(),
                id: node.id.clone(),
                folders: node.folders.clone(),
                documents,
            });
        }

        let document_ids: Vec<DocumentId> = merged
            .iter()
            .flat_map(|s| s.documents.iter().cloned())
            .collect();
        let folder_ids: Vec<FolderId> = merged
            .iter()
            .flat_map(|s| s.folders.iter().map(|f| f.id.clone()))
            .collect();
        let source_ids: Vec<FolderId> = merged.iter().map(|s| s.id.clone()).collect();

        self.call(
            "move",
            dest.path(),
            self.store()
                .move_entries(&dest_id, &document_ids, &folder_ids),
        )
        .await?;
        self.call("delete", dest.path(), self.store().delete(&[], &source_ids))
            .await?;

        let mut warnings = Vec::new();
        for source in merged {
            let (parent_path, _) = split_remote(&source.path);
            match tree.resolve_mut(parent_path) {
                Ok(parent) => {
                    parent.take_child(&source.id);
                }
                Err(err) => warnings.push(cache_warning(parent_path, err)),
            }
            match tree.locate_mut(dest.path(), &dest_id) {
                Ok(folder) => {
                    folder.document_count += source.documents.len() as i64;
                    folder.folders.extend(source.folders);
                }
                Err(err) => warnings.push(cache_warning(dest.path(), err)),
            }
        }
        Ok(Applied::new((), warnings))
    }

    /// Trash a document and update its parent's count.
    pub(crate) async fn remove_document(&self, entry: &DocumentEntry) -> Result<Applied<()>> {
        let mut tree = self.write_tree().await?;
        self.call(
            "trash",
            entry.path(),
            self.store().trash(slice::from_ref(entry.id()), &[]),
        )
        .await?;

        let mut warnings = Vec::new();
        let (parent_path, _) = split_remote(entry.path());
        adjust_count(&mut tree, parent_path, -1, &mut warnings);
        Ok(Applied::new((), warnings))
    }
}
