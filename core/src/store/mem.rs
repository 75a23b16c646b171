//! RAM-backed store.
//!
//! Streams live in a `BTreeMap` behind a `RefCell`, so the store can hand out
//! several handles at once through `&self`. A reader takes a snapshot of the
//! stream when it is opened; a writer appends straight into the map.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;

use super::{resolve_name, ByteCursor, ByteSink, ByteSource, SequentialStore, StreamKey};
use crate::codec;
use crate::error::{StoreError, StreamRole, TrickleError, TrickleResult};

#[derive(Debug, Default)]
pub struct MemStore {
    streams: RefCell<BTreeMap<String, Vec<u8>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a stream with raw bytes.
    pub fn insert_bytes<'k>(&self, key: impl Into<StreamKey<'k>>, bytes: impl Into<Vec<u8>>) {
        let name = resolve_name(key.into());
        self.streams.borrow_mut().insert(name, bytes.into());
    }

    /// Replace a stream with values in the scalar line format.
    pub fn insert_values<'k>(&self, key: impl Into<StreamKey<'k>>, values: &[f32]) {
        let mut bytes = Vec::new();
        for &v in values {
            // Writing into a Vec cannot fail.
            let _ = codec::write_f32(&mut bytes, v);
        }
        self.insert_bytes(key, bytes);
    }

    /// Raw bytes of a stream.
    pub fn bytes<'k>(&self, key: impl Into<StreamKey<'k>>) -> Option<Vec<u8>> {
        self.streams.borrow().get(&resolve_name(key.into())).cloned()
    }

    /// Decode every line of a stream.
    pub fn values<'k>(&self, key: impl Into<StreamKey<'k>>) -> TrickleResult<Vec<f32>> {
        let bytes = self.bytes(key).ok_or(TrickleError::Store {
            role: StreamRole::Tensor,
            source: StoreError::NotFound,
        })?;
        let mut cursor = ByteCursor::new(&bytes);
        let mut values = Vec::new();
        while let Some(v) =
            codec::read_f32(&mut cursor).map_err(TrickleError::store(StreamRole::Tensor))?
        {
            values.push(v);
        }
        Ok(values)
    }

    pub fn contains<'k>(&self, key: impl Into<StreamKey<'k>>) -> bool {
        self.streams.borrow().contains_key(&resolve_name(key.into()))
    }

    /// Number of streams.
    pub fn len(&self) -> usize {
        self.streams.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.borrow().is_empty()
    }
}

#[derive(Debug)]
pub struct MemReader {
    bytes: Vec<u8>,
    pos: usize,
}

impl ByteSource for MemReader {
    fn read_byte(&mut self) -> Result<Option<u8>, StoreError> {
        let byte = self.bytes.get(self.pos).copied();
        if byte.is_some() {
            self.pos += 1;
        }
        Ok(byte)
    }

    fn rewind(&mut self) -> Result<(), StoreError> {
        self.pos = 0;
        Ok(())
    }
}

#[derive(Debug)]
pub struct MemWriter<'s> {
    streams: &'s RefCell<BTreeMap<String, Vec<u8>>>,
    name: String,
}

impl ByteSink for MemWriter<'_> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
        let mut streams = self.streams.borrow_mut();
        match streams.get_mut(&self.name) {
            Some(stream) => stream.extend_from_slice(bytes),
            None => {
                streams.insert(self.name.clone(), bytes.to_vec());
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl SequentialStore for MemStore {
    type Reader<'s> = MemReader;
    type Writer<'s> = MemWriter<'s>;

    fn open_read(&self, key: StreamKey<'_>) -> Result<MemReader, StoreError> {
        let bytes = self
            .streams
            .borrow()
            .get(&resolve_name(key))
            .cloned()
            .ok_or(StoreError::NotFound)?;
        Ok(MemReader { bytes, pos: 0 })
    }

    fn open_write(&self, key: StreamKey<'_>) -> Result<MemWriter<'_>, StoreError> {
        let name = resolve_name(key);
        self.streams.borrow_mut().insert(name.clone(), Vec::new());
        Ok(MemWriter {
            streams: &self.streams,
            name,
        })
    }

    fn remove(&self, key: StreamKey<'_>) -> Result<(), StoreError> {
        self.streams.borrow_mut().remove(&resolve_name(key));
        Ok(())
    }
}
