//! In-memory mirror of the remote folder graph.
//!
//! Nodes are shared behind `Arc` so that entries handed out to callers keep
//! the state they were resolved from. Mutations go through
//! [`Arc::make_mut`], which clones a node only while someone else still
//! holds it.

use crate::error::{Error, Result};
use crate::path::{decode_name, segments, split_remote, trim_remote};
use chrono::{DateTime, Utc};
use docstore_remote::{Folder, FolderId, Profile};
use std::sync::Arc;

/// A cached folder.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderNode {
    pub id: FolderId,
    /// Remote name, not escaped.
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Documents believed to reside directly in this folder.
    pub document_count: i64,
    pub folders: Vec<Arc<FolderNode>>,
}

impl FolderNode {
    /// First child folder named `name`.
    pub fn child(&self, name: &str) -> Option<&Arc<FolderNode>> {
        self.folders.iter().find(|f| f.name == name)
    }

    /// Every child folder named `name`, in order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Arc<FolderNode>> {
        self.folders.iter().filter(move |f| f.name == name)
    }

    /// Documents in this folder and all folders below it.
    pub fn total_documents(&self) -> i64 {
        self.document_count
            + self
                .folders
                .iter()
                .map(|f| f.total_documents())
                .sum::<i64>()
    }

    /// Drop the children whose id is in `ids`. Returns how many were removed.
    pub fn remove_children(&mut self, ids: &[FolderId]) -> usize {
        let before = self.folders.len();
        self.folders.retain(|f| !ids.contains(&f.id));
        before - self.folders.len()
    }

    pub fn child_by_id(&self, id: &FolderId) -> Option<&Arc<FolderNode>> {
        self.folders.iter().find(|f| &f.id == id)
    }

    /// Writable child with the given id, unshared from any snapshot.
    pub fn child_by_id_mut(&mut self, id: &FolderId) -> Option<&mut FolderNode> {
        self.folders
            .iter_mut()
            .find(|f| &f.id == id)
            .map(Arc::make_mut)
    }

    /// Take the first child with the given id out of this folder.
    pub fn take_child(&mut self, id: &FolderId) -> Option<Arc<FolderNode>> {
        let pos = self.folders.iter().position(|f| &f.id == id)?;
        Some(self.folders.remove(pos))
    }
}

impl From<Folder> for FolderNode {
    fn from(folder: Folder) -> Self {
        Self {
            id: folder.id,
            name: folder.name,
            created_at: folder.created_at,
            updated_at: folder.updated_at,
            document_count: folder.document_count,
            folders: folder
                .folders
                .into_iter()
                .map(|f| Arc::new(FolderNode::from(f)))
                .collect(),
        }
    }
}

/// The cached folder graph, rooted at a synthetic folder with an empty id
/// and name.
#[derive(Debug, Clone)]
pub struct Tree {
    root: Arc<FolderNode>,
}

impl Tree {
    /// Build the tree from the three startup reads.
    pub fn from_remote(profile: &Profile, folders: Vec<Folder>, root_documents: usize) -> Self {
        let root = FolderNode {
            id: FolderId::root(),
            name: String::new(),
            created_at: profile.subscription_date,
            updated_at: profile.subscription_date,
            document_count: root_documents as i64,
            folders: folders
                .into_iter()
                .map(|f| Arc::new(FolderNode::from(f)))
                .collect(),
        };
        Self {
            root: Arc::new(root),
        }
    }

    pub fn root(&self) -> &Arc<FolderNode> {
        &self.root
    }

    /// Find the folder at `path`. The empty path is the root.
    pub fn resolve(&self, path: &str) -> Result<&Arc<FolderNode>> {
        let mut node = &self.root;
        for segment in segments(path) {
            let name = decode_name(segment);
            node = node
                .child(&name)
                .ok_or_else(|| Error::DirectoryNotFound(trim_remote(path).to_string()))?;
        }
        Ok(node)
    }

    /// Find the folder `id` whose path is `path`.
    ///
    /// The last segment is matched by id instead of name, which tells
    /// same-named siblings apart.
    pub fn locate(&self, path: &str, id: &FolderId) -> Result<&Arc<FolderNode>> {
        if id.is_root() {
            return Ok(&self.root);
        }
        let (parent, _) = split_remote(path);
        self.resolve(parent)?
            .child_by_id(id)
            .ok_or_else(|| Error::DirectoryNotFound(trim_remote(path).to_string()))
    }

    /// Like [`Tree::locate`], but for patching the folder in place.
    pub fn locate_mut(&mut self, path: &str, id: &FolderId) -> Result<&mut FolderNode> {
        if id.is_root() {
            return Ok(Arc::make_mut(&mut self.root));
        }
        let (parent, _) = split_remote(path);
        self.resolve_mut(parent)?
            .child_by_id_mut(id)
            .ok_or_else(|| Error::DirectoryNotFound(trim_remote(path).to_string()))
    }

    /// Like [`Tree::resolve`], but for patching the folder in place.
    pub fn resolve_mut(&mut self, path: &str) -> Result<&mut FolderNode> {
        let mut node = Arc::make_mut(&mut self.root);
        for segment in segments(path) {
            let name = decode_name(segment);
            let child = match node.folders.iter_mut().find(|f| f.name == name) {
                Some(child) => child,
                None => return Err(Error::DirectoryNotFound(trim_remote(path).to_string())),
            };
            node = Arc::make_mut(child);
        }
        Ok(node)
    }

    /// Documents anywhere in the tree.
    pub fn total_documents(&self) -> i64 {
        self.root.total_documents()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(id: &str, name: &str, count: i64, folders: Vec<Folder>) -> Folder {
        let now = Utc::now();
        Folder {
            id: FolderId(id.to_string()),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
            document_count: count,
            folders,
        }
    }

    fn sample_tree() -> Tree {
        let profile = Profile {
            space_max: 100,
            space_used: 0,
            space_free: 100,
            subscription_date: Utc::now(),
        };
        let folders = vec![
            folder(
                "f1",
                "docs",
                1,
                vec![folder("f2", "2024", 3, vec![]), folder("f3", "a/b", 0, vec![])],
            ),
            folder("f4", "docs", 7, vec![]),
        ];
        Tree::from_remote(&profile, folders, 2)
    }

    #[test]
    fn test_resolve_root_and_nested() {
        let tree = sample_tree();
        assert!(tree.resolve("").unwrap().id.is_root());
        assert!(tree.resolve("/").unwrap().id.is_root());
        assert_eq!(tree.resolve("docs/2024").unwrap().id.as_str(), "f2");
        assert_eq!(tree.resolve("/docs/2024/").unwrap().id.as_str(), "f2");
    }

    #[test]
    fn test_resolve_decodes_segments() {
        let tree = sample_tree();
        assert_eq!(tree.resolve("docs/a／b").unwrap().id.as_str(), "f3");
    }

    #[test]
    fn test_first_duplicate_wins() {
        let tree = sample_tree();
        assert_eq!(tree.resolve("docs").unwrap().id.as_str(), "f1");
    }

    #[test]
    fn test_resolve_is_exact() {
        let tree = sample_tree();
        assert!(matches!(
            tree.resolve("Docs"),
            Err(Error::DirectoryNotFound(p)) if p == "Docs"
        ));
        assert!(matches!(
            tree.resolve("docs/20"),
            Err(Error::DirectoryNotFound(_))
        ));
    }

    #[test]
    fn test_total_documents() {
        let tree = sample_tree();
        assert_eq!(tree.total_documents(), 2 + 1 + 3 + 7);
        assert_eq!(tree.resolve("docs").unwrap().total_documents(), 4);
    }

    #[test]
    fn test_patch_leaves_snapshot_untouched() {
        let mut tree = sample_tree();
        let snapshot = Arc::clone(tree.resolve("docs/2024").unwrap());

        tree.resolve_mut("docs/2024").unwrap().document_count += 1;

        assert_eq!(snapshot.document_count, 3);
        assert_eq!(tree.resolve("docs/2024").unwrap().document_count, 4);
    }

    #[test]
    fn test_locate_tells_duplicates_apart() {
        let mut tree = sample_tree();
        let second = FolderId("f4".into());
        assert_eq!(tree.locate("docs", &second).unwrap().document_count, 7);
        assert!(tree.locate("", &FolderId::root()).unwrap().id.is_root());
        assert!(matches!(
            tree.locate("docs", &FolderId("f2".into())),
            Err(Error::DirectoryNotFound(p)) if p == "docs"
        ));

        tree.locate_mut("docs", &second).unwrap().document_count += 1;
        assert_eq!(tree.resolve("docs").unwrap().document_count, 1);
        assert_eq!(tree.locate("docs", &second).unwrap().document_count, 8);
    }

    #[test]
    fn test_remove_and_take_children() {
        let mut tree = sample_tree();
        let docs = tree.resolve_mut("docs").unwrap();
        let taken = docs.take_child(&FolderId("f3".into())).unwrap();
        assert_eq!(taken.name, "a/b");
        assert_eq!(docs.remove_children(&[FolderId("f2".into())]), 1);
        assert!(docs.folders.is_empty());
    }
}
