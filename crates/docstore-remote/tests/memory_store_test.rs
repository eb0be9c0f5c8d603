use bytes::Bytes;
use docstore_remote::{Document, FolderId, Location, MemoryStore, RemoteStore, StoreCall};

#[tokio::test]
async fn folders_are_listed_nested_with_counts() {
    let store = MemoryStore::new();
    let root = FolderId::root();

    let docs = store.create_folder(&root, "docs").await.unwrap();
    let year = store.create_folder(&docs.id, "2024").await.unwrap();
    store
        .create_document(&year.id, "a.pdf", Bytes::from_static(b"aaa"))
        .await
        .unwrap();
    store
        .create_document(&year.id, "b.pdf", Bytes::from_static(b"bb"))
        .await
        .unwrap();

    let folders = store.list_folders().await.unwrap();
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0].name, "docs");
    assert_eq!(folders[0].document_count, 0);
    assert_eq!(folders[0].folders.len(), 1);
    assert_eq!(folders[0].folders[0].name, "2024");
    assert_eq!(folders[0].folders[0].document_count, 2);
}

#[tokio::test]
async fn trashed_documents_leave_normal_search() {
    let store = MemoryStore::new();
    let root = FolderId::root();
    let doc = store
        .create_document(&root, "note.txt", Bytes::from_static(b"hello"))
        .await
        .unwrap();
    assert_eq!(doc.mime_type, "text/plain");
    assert_eq!(doc.location, Location::Safe);

    store
        .trash(std::slice::from_ref(&doc.id), &[])
        .await
        .unwrap();

    assert!(store.list_documents().await.unwrap().is_empty());
    let trashed = store
        .search_documents(&root, Some(&Location::TRASHED[..]))
        .await
        .unwrap();
    assert_eq!(trashed.len(), 1);
    assert_eq!(trashed[0].location, Location::TrashSafe);
    assert_eq!(store.trashed_documents().await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_folder_is_recursive() {
    let store = MemoryStore::new();
    let root = FolderId::root();
    let outer = store.create_folder(&root, "outer").await.unwrap();
    let inner = store.create_folder(&outer.id, "inner").await.unwrap();
    store
        .create_document(&inner.id, "deep.txt", Bytes::from_static(b"x"))
        .await
        .unwrap();

    store
        .delete(&[], std::slice::from_ref(&outer.id))
        .await
        .unwrap();

    assert!(store.list_folders().await.unwrap().is_empty());
    assert!(store.search_documents(&inner.id, None).await.is_err());
    assert_eq!(store.get_profile().await.unwrap().space_used, 0);
}

#[tokio::test]
async fn copies_land_next_to_original() {
    let store = MemoryStore::new();
    let root = FolderId::root();
    let folder = store.create_folder(&root, "a").await.unwrap();
    let doc = store
        .create_document(&folder.id, "f.txt", Bytes::from_static(b"data"))
        .await
        .unwrap();

    let copies = store
        .copy_documents(std::slice::from_ref(&doc.id))
        .await
        .unwrap();
    assert_eq!(copies.len(), 1);
    assert_ne!(copies[0].id, doc.id);

    let listed = store.search_documents(&folder.id, None).await.unwrap();
    let names: Vec<&str> = listed.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["f.txt", "f.txt"]);

    let (content, mime) = store.document_content(&copies[0].id).await.unwrap();
    assert_eq!(content, Bytes::from_static(b"data"));
    assert_eq!(mime, "text/plain");
}

#[tokio::test]
async fn journal_records_calls_in_order() {
    let store = MemoryStore::new();
    let root = FolderId::root();
    store.list_folders().await.unwrap();
    store.create_folder(&root, "x").await.unwrap();

    assert_eq!(
        store.calls(),
        vec![StoreCall::ListFolders, StoreCall::CreateFolder]
    );
    store.clear_calls();
    assert!(store.calls().is_empty());
}

#[test]
fn document_wire_format_is_camel_case() {
    let json = r#"{
        "id": "doc-1",
        "name": "payslip.pdf",
        "size": 1024,
        "mimeType": "application/pdf",
        "createdAt": "2024-01-31T08:00:00Z",
        "location": "TRASH_INBOX",
        "userTags": ["employer=ACME"]
    }"#;

    let document: Document = serde_json::from_str(json).unwrap();
    assert_eq!(document.id.as_str(), "doc-1");
    assert_eq!(document.location, Location::TrashInbox);
    assert_eq!(document.user_tags, vec!["employer=ACME".to_string()]);
}
