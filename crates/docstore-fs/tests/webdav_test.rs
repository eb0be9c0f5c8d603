#![cfg(feature = "webdav")]

use bytes::Bytes;
use dav_server::davpath::DavPath;
use dav_server::fs::{DavDirEntry, DavFileSystem, DavMetaData, FsError, ReadDirMeta};
use docstore_fs::webdav::DocDavFs;
use docstore_fs::{DocFs, Entry};
use docstore_remote::MemoryStore;
use futures::StreamExt;
use std::sync::Arc;

async fn setup() -> DocDavFs {
    let fs = DocFs::new(Arc::new(MemoryStore::new()));
    fs.mkdir("docs").await.unwrap();
    fs.put("docs/a.txt", Bytes::from_static(b"hello"))
        .await
        .unwrap();
    fs.put("docs/._a.txt", Bytes::from_static(b"finder"))
        .await
        .unwrap();
    DocDavFs::new(fs)
}

fn dav(path: &str) -> DavPath {
    DavPath::new(path).unwrap()
}

async fn names(dav_fs: &DocDavFs, path: &str) -> Vec<String> {
    let mut stream = dav_fs
        .read_dir(&dav(path), ReadDirMeta::None)
        .await
        .unwrap();
    let mut names = Vec::new();
    while let Some(entry) = stream.next().await {
        let entry = entry.unwrap();
        names.push(String::from_utf8(entry.name()).unwrap());
    }
    names.sort();
    names
}

#[tokio::test]
async fn read_dir_hides_finder_files() {
    let dav_fs = setup().await;
    assert_eq!(names(&dav_fs, "/").await, vec!["docs"]);
    assert_eq!(names(&dav_fs, "/docs/").await, vec!["a.txt"]);
}

#[tokio::test]
async fn metadata_of_folders_and_documents() {
    let dav_fs = setup().await;

    let folder = dav_fs.metadata(&dav("/docs")).await.unwrap();
    assert!(folder.is_dir());
    assert_eq!(folder.len(), 0);

    let file = dav_fs.metadata(&dav("/docs/a.txt")).await.unwrap();
    assert!(!file.is_dir());
    assert_eq!(file.len(), 5);

    assert!(matches!(
        dav_fs.metadata(&dav("/docs/missing.txt")).await,
        Err(FsError::NotFound)
    ));
}

#[tokio::test]
async fn create_dir_twice_reports_exists() {
    let dav_fs = setup().await;
    dav_fs.create_dir(&dav("/new")).await.unwrap();
    assert!(matches!(
        dav_fs.create_dir(&dav("/new")).await,
        Err(FsError::Exists)
    ));
    assert_eq!(names(&dav_fs, "/").await, vec!["docs", "new"]);
}

#[tokio::test]
async fn remove_dir_refuses_folders_with_documents() {
    let dav_fs = setup().await;
    assert!(matches!(
        dav_fs.remove_dir(&dav("/docs")).await,
        Err(FsError::Forbidden)
    ));

    dav_fs.create_dir(&dav("/empty")).await.unwrap();
    dav_fs.remove_dir(&dav("/empty")).await.unwrap();
    assert_eq!(names(&dav_fs, "/").await, vec!["docs"]);
}

#[tokio::test]
async fn rename_documents_and_folders() {
    let dav_fs = setup().await;
    dav_fs.create_dir(&dav("/archive")).await.unwrap();

    dav_fs
        .rename(&dav("/docs/a.txt"), &dav("/archive/b.txt"))
        .await
        .unwrap();
    assert_eq!(names(&dav_fs, "/archive").await, vec!["b.txt"]);

    dav_fs
        .rename(&dav("/archive"), &dav("/docs/archive"))
        .await
        .unwrap();
    assert_eq!(names(&dav_fs, "/docs").await, vec!["archive"]);

    let moved = dav_fs.fs().stat("docs/archive/b.txt").await.unwrap();
    assert!(matches!(moved, Entry::Document(_)));
}

#[tokio::test]
async fn copy_and_remove_file() {
    let dav_fs = setup().await;
    dav_fs
        .copy(&dav("/docs/a.txt"), &dav("/c.txt"))
        .await
        .unwrap();
    assert_eq!(names(&dav_fs, "/").await, vec!["c.txt", "docs"]);

    assert!(matches!(
        dav_fs.copy(&dav("/docs"), &dav("/docs2")).await,
        Err(FsError::NotImplemented)
    ));

    dav_fs.remove_file(&dav("/c.txt")).await.unwrap();
    assert_eq!(names(&dav_fs, "/").await, vec!["docs"]);
}
