//! `dav_server::fs::DavFileSystem` over a [`DocFs`].

use super::file::{DocDavFile, NoopDavFile};
use crate::entry::Entry;
use crate::error::Error;
use crate::fs::DocFs;
use crate::path::encode_name;
use dav_server::davpath::DavPath;
use dav_server::fs::{
    DavDirEntry, DavFile, DavFileSystem, DavMetaData, FsError, FsFuture, FsStream, OpenOptions,
    ReadDirMeta,
};
use futures::stream;
use log::{debug, trace};
use std::path::Component;
use std::time::SystemTime;

/// WebDAV view of a [`DocFs`].
///
/// Resource paths are filesystem paths: remote names appear with `/`
/// escaped. Writes are buffered in a temporary file and uploaded when the
/// client finishes the request.
#[derive(Clone, Debug)]
pub struct DocDavFs {
    fs: DocFs,
    started: SystemTime,
}

impl DocDavFs {
    pub fn new(fs: DocFs) -> Self {
        Self {
            fs,
            started: SystemTime::now(),
        }
    }

    pub fn fs(&self) -> &DocFs {
        &self.fs
    }
}

/// Filesystem path of a DAV resource.
pub(super) fn remote_path(path: &DavPath) -> Result<String, FsError> {
    let rel = path.as_rel_ospath();
    for component in rel.components() {
        match component {
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(FsError::Forbidden);
            }
            _ => {}
        }
    }
    Ok(rel.to_string_lossy().trim_matches('/').to_string())
}

/// Files the Finder creates on every volume it touches.
pub(super) fn is_ignored_name(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.starts_with("._") || name == ".DS_Store"
}

pub(super) fn map_error(err: Error) -> FsError {
    debug!("docstore error: {}", err);
    match err {
        Error::NotFound(_) | Error::DirectoryNotFound(_) => FsError::NotFound,
        Error::IsDirectory(_)
        | Error::NotEmpty(_)
        | Error::UnsupportedEntry(_)
        | Error::DuplicateDocuments { .. } => FsError::Forbidden,
        Error::NotImplemented(_) => FsError::NotImplemented,
        Error::Remote {
            source: docstore_remote::Error::NotFound { .. },
            ..
        } => FsError::NotFound,
        Error::UnexpectedResponse { .. }
        | Error::Remote { .. }
        | Error::Replace { .. }
        | Error::Timeout { .. } => FsError::GeneralFailure,
    }
}

impl DavFileSystem for DocDavFs {
    fn open<'a>(&'a self, path: &'a DavPath, options: OpenOptions) -> FsFuture<'a, Box<dyn DavFile>> {
        trace!("open({:?}, {:?})", path, options);

        Box::pin(async move {
            let remote = remote_path(path)?;
            if remote.is_empty() {
                return Err(FsError::Forbidden);
            }
            if is_ignored_name(&remote) {
                return Ok(Box::new(NoopDavFile::new()) as Box<dyn DavFile>);
            }
            if options.append {
                return Err(FsError::NotImplemented);
            }

            let existing = match self.fs.new_object(&remote).await {
                Ok(document) => Some(document),
                Err(Error::NotFound(_)) => None,
                Err(err) => return Err(map_error(err)),
            };

            let wants_write =
                options.write || options.create || options.create_new || options.truncate;
            if wants_write {
                if options.create_new && existing.is_some() {
                    return Err(FsError::Exists);
                }
                if existing.is_none() && !options.create && !options.create_new {
                    return Err(FsError::NotFound);
                }
                let file = DocDavFile::new_write(self.fs.clone(), remote)?;
                return Ok(Box::new(file) as Box<dyn DavFile>);
            }

            let document = existing.ok_or(FsError::NotFound)?;
            let content = document.open().await.map_err(map_error)?;
            Ok(Box::new(DocDavFile::new_read(&document, content)) as Box<dyn DavFile>)
        })
    }

    fn read_dir<'a>(
        &'a self,
        path: &'a DavPath,
        _meta: ReadDirMeta,
    ) -> FsFuture<'a, FsStream<Box<dyn DavDirEntry>>> {
        trace!("read_dir({:?})", path);

        Box::pin(async move {
            let remote = remote_path(path)?;
            let entries = self.fs.list(&remote).await.map_err(map_error)?;
            debug!("read_dir: returning {} entries", entries.len());

            let dav_entries: Vec<Box<dyn DavDirEntry>> = entries
                .iter()
                .filter(|entry| !is_ignored_name(entry.name()))
                .map(|entry| Box::new(DocDavDirEntry::new(entry)) as Box<dyn DavDirEntry>)
                .collect();
            let stream = stream::iter(dav_entries.into_iter().map(Ok));
            Ok(Box::pin(stream) as FsStream<Box<dyn DavDirEntry>>)
        })
    }

    fn metadata<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavMetaData>> {
        trace!("metadata({:?})", path);

        Box::pin(async move {
            let remote = remote_path(path)?;
            if is_ignored_name(&remote) {
                return Ok(Box::new(DocDavMetaData::file(0, self.started, self.started))
                    as Box<dyn DavMetaData>);
            }
            let entry = self.fs.stat(&remote).await.map_err(map_error)?;
            Ok(Box::new(DocDavMetaData::from_entry(&entry)) as Box<dyn DavMetaData>)
        })
    }

    fn create_dir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        trace!("create_dir({:?})", path);

        Box::pin(async move {
            let remote = remote_path(path)?;
            if remote.is_empty() {
                return Err(FsError::Exists);
            }
            match self.fs.stat(&remote).await {
                Ok(_) => return Err(FsError::Exists),
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(map_error(err)),
            }
            self.fs.mkdir(&remote).await.map_err(map_error)
        })
    }

    fn remove_dir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        trace!("remove_dir({:?})", path);

        Box::pin(async move {
            let remote = remote_path(path)?;
            if remote.is_empty() {
                return Err(FsError::Forbidden);
            }
            self.fs.rmdir(&remote).await.map_err(map_error)
        })
    }

    fn remove_file<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        trace!("remove_file({:?})", path);

        Box::pin(async move {
            let remote = remote_path(path)?;
            if is_ignored_name(&remote) {
                return Ok(());
            }
            let document = self.fs.new_object(&remote).await.map_err(map_error)?;
            document.remove().await.map_err(map_error)?;
            Ok(())
        })
    }

    fn rename<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, ()> {
        trace!("rename({:?}, {:?})", from, to);

        Box::pin(async move {
            let from = remote_path(from)?;
            let to = remote_path(to)?;
            if from.is_empty() || to.is_empty() {
                return Err(FsError::Forbidden);
            }
            if is_ignored_name(&from) || is_ignored_name(&to) {
                return Ok(());
            }

            match self.fs.stat(&from).await.map_err(map_error)? {
                Entry::Folder(_) => {
                    self.fs
                        .dir_move(&self.fs, &from, &to)
                        .await
                        .map_err(map_error)?;
                }
                entry @ Entry::Document(_) => {
                    self.fs.move_object(&entry, &to).await.map_err(map_error)?;
                }
            }
            Ok(())
        })
    }

    fn copy<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, ()> {
        trace!("copy({:?}, {:?})", from, to);

        Box::pin(async move {
            let from = remote_path(from)?;
            let to = remote_path(to)?;
            if is_ignored_name(&from) || is_ignored_name(&to) {
                return Ok(());
            }

            let entry = self.fs.stat(&from).await.map_err(map_error)?;
            if entry.is_dir() {
                return Err(FsError::NotImplemented);
            }
            self.fs.copy_object(&entry, &to).await.map_err(map_error)?;
            Ok(())
        })
    }
}

struct DocDavDirEntry {
    name: String,
    meta: DocDavMetaData,
}

impl DocDavDirEntry {
    fn new(entry: &Entry) -> Self {
        Self {
            name: encode_name(entry.name()),
            meta: DocDavMetaData::from_entry(entry),
        }
    }
}

impl DavDirEntry for DocDavDirEntry {
    fn name(&self) -> Vec<u8> {
        self.name.as_bytes().to_vec()
    }

    fn metadata(&self) -> FsFuture<'_, Box<dyn DavMetaData>> {
        let meta = self.meta.clone();
        Box::pin(async move { Ok(Box::new(meta) as Box<dyn DavMetaData>) })
    }
}

#[derive(Clone, Debug)]
pub(super) struct DocDavMetaData {
    is_dir: bool,
    len: u64,
    modified: SystemTime,
    created: SystemTime,
}

impl DocDavMetaData {
    fn directory(created: SystemTime, modified: SystemTime) -> Self {
        Self {
            is_dir: true,
            len: 0,
            modified,
            created,
        }
    }

    pub(super) fn file(len: u64, created: SystemTime, modified: SystemTime) -> Self {
        Self {
            is_dir: false,
            len,
            modified,
            created,
        }
    }

    fn from_entry(entry: &Entry) -> Self {
        match entry {
            Entry::Folder(folder) => Self::directory(
                SystemTime::from(folder.created_at()),
                SystemTime::from(folder.modified()),
            ),
            Entry::Document(document) => Self::file(
                document.size(),
                SystemTime::from(document.created_at()),
                SystemTime::from(document.modified()),
            ),
        }
    }
}

impl DavMetaData for DocDavMetaData {
    fn len(&self) -> u64 {
        self.len
    }

    fn modified(&self) -> Result<SystemTime, FsError> {
        Ok(self.modified)
    }

    fn is_dir(&self) -> bool {
        self.is_dir
    }

    fn created(&self) -> Result<SystemTime, FsError> {
        Ok(self.created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignored_names() {
        assert!(is_ignored_name(".DS_Store"));
        assert!(is_ignored_name("docs/._report.pdf"));
        assert!(!is_ignored_name("docs/report.pdf"));
        assert!(!is_ignored_name(".trash"));
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            map_error(Error::NotEmpty("a".into())),
            FsError::Forbidden
        ));
        assert!(matches!(
            map_error(Error::DirectoryNotFound("a".into())),
            FsError::NotFound
        ));
        assert!(matches!(
            map_error(Error::NotImplemented("update")),
            FsError::NotImplemented
        ));
        assert!(matches!(
            map_error(Error::Remote {
                op: "delete",
                context: "a".into(),
                source: docstore_remote::Error::Unavailable("down".into()),
            }),
            FsError::GeneralFailure
        ));
    }
}
