use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Opaque remote identifier of a folder.
///
/// The empty identifier designates the account root.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(pub String);

impl FolderId {
    /// Identifier of the account root.
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("<root>")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// Opaque remote identifier of a document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a document lives on the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Location {
    Inbox,
    Safe,
    TrashInbox,
    TrashSafe,
}

impl Location {
    /// Locations of documents that are not in the trash.
    pub const NORMAL: [Location; 2] = [Location::Inbox, Location::Safe];
    /// Locations of trashed documents.
    pub const TRASHED: [Location; 2] = [Location::TrashInbox, Location::TrashSafe];

    pub fn is_trashed(self) -> bool {
        matches!(self, Location::TrashInbox | Location::TrashSafe)
    }

    /// The location a document moves to when trashed.
    pub fn trashed(self) -> Self {
        match self {
            Location::Inbox | Location::TrashInbox => Location::TrashInbox,
            Location::Safe | Location::TrashSafe => Location::TrashSafe,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Location::Inbox => "INBOX",
            Location::Safe => "SAFE",
            Location::TrashInbox => "TRASH_INBOX",
            Location::TrashSafe => "TRASH_SAFE",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A folder as returned by the remote, with its nested subfolders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Number of documents stored directly in this folder.
    #[serde(default)]
    pub document_count: i64,
    #[serde(default)]
    pub folders: Vec<Folder>,
}

/// A document as returned by the remote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
    pub location: Location,
    /// Free-form `key=value` tags.
    #[serde(default)]
    pub user_tags: Vec<String>,
}

/// Account profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub space_max: u64,
    pub space_used: u64,
    pub space_free: u64,
    pub subscription_date: DateTime<Utc>,
}

/// Guess a MIME type from a document name's extension.
pub fn guess_mime_type(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|v| v.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "html" | "htm" => "text/html",
        "md" => "text/markdown",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trashed_location_keeps_area() {
        assert_eq!(Location::Inbox.trashed(), Location::TrashInbox);
        assert_eq!(Location::Safe.trashed(), Location::TrashSafe);
        assert_eq!(Location::TrashSafe.trashed(), Location::TrashSafe);
        assert!(Location::TrashInbox.is_trashed());
        assert!(!Location::Safe.is_trashed());
    }

    #[test]
    fn test_root_folder_id() {
        assert!(FolderId::root().is_root());
        assert_eq!(FolderId::root().to_string(), "<root>");
        assert!(!FolderId("f1".into()).is_root());
    }

    #[test]
    fn test_guess_mime_type() {
        assert_eq!(guess_mime_type("report.PDF"), "application/pdf");
        assert_eq!(guess_mime_type("notes.md"), "text/markdown");
        assert_eq!(guess_mime_type("no-extension"), "application/octet-stream");
    }
}
