//! Filesystem store: one file per stream under a root directory.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::{resolve_name, ByteSink, ByteSource, SequentialStore, StreamKey};
use crate::error::StoreError;

#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `key`. Leading slashes are ignored so
    /// card-style names like `/w01.txt` stay under the root.
    pub fn path(&self, key: StreamKey<'_>) -> PathBuf {
        let name = resolve_name(key);
        self.root.join(name.trim_start_matches('/'))
    }
}

fn map_io(err: io::Error) -> StoreError {
    log::error!("store I/O failure: {err}");
    match err.kind() {
        io::ErrorKind::NotFound => StoreError::NotFound,
        io::ErrorKind::PermissionDenied => StoreError::PermissionDenied,
        io::ErrorKind::WriteZero => StoreError::Full,
        _ => StoreError::Io,
    }
}

#[derive(Debug)]
pub struct DirReader {
    inner: BufReader<File>,
}

impl ByteSource for DirReader {
    fn read_byte(&mut self) -> Result<Option<u8>, StoreError> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(map_io(e)),
            }
        }
    }

    fn rewind(&mut self) -> Result<(), StoreError> {
        self.inner.seek(SeekFrom::Start(0)).map(|_| ()).map_err(map_io)
    }
}

#[derive(Debug)]
pub struct DirWriter {
    inner: BufWriter<File>,
}

impl ByteSink for DirWriter {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
        self.inner.write_all(bytes).map_err(map_io)
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        self.inner.flush().map_err(map_io)
    }
}

impl SequentialStore for DirStore {
    type Reader<'s> = DirReader;
    type Writer<'s> = DirWriter;

    fn open_read(&self, key: StreamKey<'_>) -> Result<DirReader, StoreError> {
        let file = File::open(self.path(key)).map_err(map_io)?;
        Ok(DirReader {
            inner: BufReader::new(file),
        })
    }

    fn open_write(&self, key: StreamKey<'_>) -> Result<DirWriter, StoreError> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(map_io)?;
        }
        let file = File::create(path).map_err(map_io)?;
        Ok(DirWriter {
            inner: BufWriter::new(file),
        })
    }

    fn remove(&self, key: StreamKey<'_>) -> Result<(), StoreError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(map_io(e)),
        }
    }
}
