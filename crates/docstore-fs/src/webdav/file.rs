//! Open DAV files: downloaded content for reads, a temp-file buffer for
//! writes.

use super::filesystem::{map_error, DocDavMetaData};
use crate::entry::DocumentEntry;
use crate::fs::DocFs;
use bytes::{Buf, Bytes};
use dav_server::fs::{DavFile, DavMetaData, FsError, FsFuture};
use log::debug;
use std::io::{self, SeekFrom, Write};
use std::time::SystemTime;
use tempfile::NamedTempFile;

#[derive(Debug)]
pub(super) struct DocDavFile {
    inner: DocDavFileInner,
}

#[derive(Debug)]
enum DocDavFileInner {
    Read(ReadState),
    Write(WriteState),
}

#[derive(Debug)]
struct ReadState {
    content: Bytes,
    created: SystemTime,
    modified: SystemTime,
    position: u64,
}

#[derive(Debug)]
struct WriteState {
    buffer: WriteBuffer,
    fs: DocFs,
    committed: bool,
}

#[derive(Debug)]
struct WriteBuffer {
    temp: NamedTempFile,
    path: String,
    created: SystemTime,
    modified: SystemTime,
}

impl WriteBuffer {
    fn new(path: String) -> Result<Self, FsError> {
        let temp = NamedTempFile::new().map_err(map_io_error)?;
        let now = SystemTime::now();
        Ok(Self {
            temp,
            path,
            created: now,
            modified: now,
        })
    }

    fn len(&self) -> u64 {
        self.temp
            .as_file()
            .metadata()
            .map(|meta| meta.len())
            .unwrap_or(0)
    }
}

impl DocDavFile {
    pub(super) fn new_read(document: &DocumentEntry, content: Bytes) -> Self {
        Self {
            inner: DocDavFileInner::Read(ReadState {
                content,
                created: SystemTime::from(document.created_at()),
                modified: SystemTime::from(document.modified()),
                position: 0,
            }),
        }
    }

    /// A file whose content is uploaded to `path` on flush.
    pub(super) fn new_write(fs: DocFs, path: String) -> Result<Self, FsError> {
        Ok(Self {
            inner: DocDavFileInner::Write(WriteState {
                buffer: WriteBuffer::new(path)?,
                fs,
                committed: false,
            }),
        })
    }
}

impl DavFile for DocDavFile {
    fn metadata(&mut self) -> FsFuture<'_, Box<dyn DavMetaData>> {
        let meta = match &self.inner {
            DocDavFileInner::Read(state) => DocDavMetaData::file(
                state.content.len() as u64,
                state.created,
                state.modified,
            ),
            DocDavFileInner::Write(state) => DocDavMetaData::file(
                state.buffer.len(),
                state.buffer.created,
                state.buffer.modified,
            ),
        };
        Box::pin(async move { Ok(Box::new(meta) as Box<dyn DavMetaData>) })
    }

    fn read_bytes(&mut self, count: usize) -> FsFuture<'_, Bytes> {
        let result = match &mut self.inner {
            DocDavFileInner::Read(state) => Ok(read_content(state, count)),
            DocDavFileInner::Write(_) => Err(FsError::Forbidden),
        };
        Box::pin(async move { result })
    }

    fn seek(&mut self, pos: SeekFrom) -> FsFuture<'_, u64> {
        let result = match &mut self.inner {
            DocDavFileInner::Read(state) => seek_content(state, pos),
            DocDavFileInner::Write(_) => Ok(0),
        };
        Box::pin(async move { result })
    }

    fn write_buf(&mut self, buf: Box<dyn Buf + Send>) -> FsFuture<'_, ()> {
        let result = match &mut self.inner {
            DocDavFileInner::Write(state) => write_buf_to_temp(state, buf),
            DocDavFileInner::Read(_) => Err(FsError::Forbidden),
        };
        Box::pin(async move { result })
    }

    fn write_bytes(&mut self, buf: Bytes) -> FsFuture<'_, ()> {
        let result = match &mut self.inner {
            DocDavFileInner::Write(state) => write_bytes_to_temp(state, &buf),
            DocDavFileInner::Read(_) => Err(FsError::Forbidden),
        };
        Box::pin(async move { result })
    }

    fn flush(&mut self) -> FsFuture<'_, ()> {
        Box::pin(async move {
            match &mut self.inner {
                DocDavFileInner::Write(state) => commit_write(state).await,
                DocDavFileInner::Read(_) => Ok(()),
            }
        })
    }
}

/// Stand-in for files that are accepted and then forgotten.
#[derive(Debug)]
pub(super) struct NoopDavFile {
    created: SystemTime,
}

impl NoopDavFile {
    pub(super) fn new() -> Self {
        Self {
            created: SystemTime::now(),
        }
    }
}

impl DavFile for NoopDavFile {
    fn metadata(&mut self) -> FsFuture<'_, Box<dyn DavMetaData>> {
        let meta = DocDavMetaData::file(0, self.created, self.created);
        Box::pin(async move { Ok(Box::new(meta) as Box<dyn DavMetaData>) })
    }

    fn write_buf(&mut self, _buf: Box<dyn Buf + Send>) -> FsFuture<'_, ()> {
        Box::pin(async move { Ok(()) })
    }

    fn write_bytes(&mut self, _buf: Bytes) -> FsFuture<'_, ()> {
        Box::pin(async move { Ok(()) })
    }

    fn read_bytes(&mut self, _count: usize) -> FsFuture<'_, Bytes> {
        Box::pin(async move { Ok(Bytes::new()) })
    }

    fn seek(&mut self, _pos: SeekFrom) -> FsFuture<'_, u64> {
        Box::pin(async move { Ok(0) })
    }

    fn flush(&mut self) -> FsFuture<'_, ()> {
        Box::pin(async move { Ok(()) })
    }
}

fn read_content(state: &mut ReadState, count: usize) -> Bytes {
    let len = state.content.len() as u64;
    let start = state.position.min(len) as usize;
    let end = start.saturating_add(count).min(len as usize);
    state.position = end as u64;
    state.content.slice(start..end)
}

fn seek_content(state: &mut ReadState, pos: SeekFrom) -> Result<u64, FsError> {
    let new_pos = match pos {
        SeekFrom::Start(n) => n as i64,
        SeekFrom::End(n) => state.content.len() as i64 + n,
        SeekFrom::Current(n) => state.position as i64 + n,
    };
    if new_pos < 0 {
        return Err(FsError::GeneralFailure);
    }
    state.position = new_pos as u64;
    Ok(state.position)
}

fn write_buf_to_temp(state: &mut WriteState, mut buf: Box<dyn Buf + Send>) -> Result<(), FsError> {
    if state.committed {
        return Err(FsError::Forbidden);
    }
    let file = state.buffer.temp.as_file_mut();
    while buf.has_remaining() {
        let chunk = buf.chunk();
        if chunk.is_empty() {
            break;
        }
        file.write_all(chunk).map_err(map_io_error)?;
        let len = chunk.len();
        buf.advance(len);
    }
    state.buffer.modified = SystemTime::now();
    Ok(())
}

fn write_bytes_to_temp(state: &mut WriteState, buf: &[u8]) -> Result<(), FsError> {
    if state.committed {
        return Err(FsError::Forbidden);
    }
    state
        .buffer
        .temp
        .as_file_mut()
        .write_all(buf)
        .map_err(map_io_error)?;
    state.buffer.modified = SystemTime::now();
    Ok(())
}

async fn commit_write(state: &mut WriteState) -> Result<(), FsError> {
    if state.committed {
        return Ok(());
    }
    state
        .buffer
        .temp
        .as_file_mut()
        .flush()
        .map_err(map_io_error)?;
    let content = tokio::fs::read(state.buffer.temp.path())
        .await
        .map_err(map_io_error)?;
    debug!("uploading {} bytes to {}", content.len(), state.buffer.path);

    state
        .fs
        .put(&state.buffer.path, Bytes::from(content))
        .await
        .map_err(map_error)?;
    state.committed = true;
    Ok(())
}

fn map_io_error(err: io::Error) -> FsError {
    match err.kind() {
        io::ErrorKind::NotFound => FsError::NotFound,
        io::ErrorKind::PermissionDenied => FsError::Forbidden,
        io::ErrorKind::AlreadyExists => FsError::Exists,
        _ => FsError::GeneralFailure,
    }
}
