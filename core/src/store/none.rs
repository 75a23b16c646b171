//! Null backend: every open fails with [`StoreError::Unavailable`].
//!
//! Used for sessions whose operands all live in RAM; any accidental stream
//! access reports an error instead of reading garbage.

use super::{ByteSink, ByteSource, SequentialStore, StreamKey};
use crate::error::StoreError;

#[derive(Debug, Clone, Copy, Default)]
pub struct NoStore;

/// Handle type of [`NoStore`]. Never constructed.
#[derive(Debug)]
pub enum NoStream {}

impl ByteSource for NoStream {
    fn read_byte(&mut self) -> Result<Option<u8>, StoreError> {
        match *self {}
    }

    fn rewind(&mut self) -> Result<(), StoreError> {
        match *self {}
    }
}

impl ByteSink for NoStream {
    fn write_bytes(&mut self, _bytes: &[u8]) -> Result<(), StoreError> {
        match *self {}
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        match *self {}
    }
}

impl SequentialStore for NoStore {
    type Reader<'s> = NoStream;
    type Writer<'s> = NoStream;

    fn open_read(&self, _key: StreamKey<'_>) -> Result<NoStream, StoreError> {
        Err(StoreError::Unavailable)
    }

    fn open_write(&self, _key: StreamKey<'_>) -> Result<NoStream, StoreError> {
        Err(StoreError::Unavailable)
    }

    fn remove(&self, _key: StreamKey<'_>) -> Result<(), StoreError> {
        Err(StoreError::Unavailable)
    }
}
