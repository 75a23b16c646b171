//! Sequential byte-stream storage.
//!
//! The engine never touches a filesystem directly. It opens named streams
//! through [`SequentialStore`], reads them byte by byte from the start
//! (rewinding when a layer needs another pass), and writes output streams
//! from scratch. Backends:
//!
//! - [`NoStore`]: no storage at all, for pure-memory sessions.
//! - [`MemStore`] (`alloc`): streams kept in RAM; host tools and tests.
//! - [`DirStore`] (`std`): one file per stream under a root directory.

#[cfg(feature = "std")]
pub mod dir;
#[cfg(feature = "alloc")]
pub mod mem;
pub mod none;

#[cfg(feature = "std")]
pub use dir::DirStore;
#[cfg(feature = "alloc")]
pub use mem::MemStore;
pub use none::NoStore;

use crate::error::StoreError;

/// Address of a stream.
///
/// Packed tensors, weights and biases use a plain name. Tensors stored one
/// plane per stream add the channel index; each backend decides how that maps
/// onto its own naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamKey<'n> {
    pub name: &'n str,
    pub channel: Option<usize>,
}

impl<'n> StreamKey<'n> {
    pub const fn named(name: &'n str) -> Self {
        Self { name, channel: None }
    }

    pub const fn channel(name: &'n str, index: usize) -> Self {
        Self {
            name,
            channel: Some(index),
        }
    }
}

impl<'n> From<&'n str> for StreamKey<'n> {
    fn from(name: &'n str) -> Self {
        Self::named(name)
    }
}

/// Read side of an open stream.
pub trait ByteSource {
    /// Next byte, or `Ok(None)` at the end of the stream.
    fn read_byte(&mut self) -> Result<Option<u8>, StoreError>;

    /// Move back to the first byte.
    fn rewind(&mut self) -> Result<(), StoreError>;
}

/// Write side of an open stream.
pub trait ByteSink {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), StoreError>;

    fn flush(&mut self) -> Result<(), StoreError>;
}

/// A store of named, sequentially accessed byte streams.
///
/// Handles borrow the store, so several streams (input, weights, bias,
/// output) can be open at once during one engine call.
pub trait SequentialStore {
    type Reader<'s>: ByteSource
    where
        Self: 's;
    type Writer<'s>: ByteSink
    where
        Self: 's;

    fn open_read(&self, key: StreamKey<'_>) -> Result<Self::Reader<'_>, StoreError>;

    /// Open for writing, truncating any previous content.
    fn open_write(&self, key: StreamKey<'_>) -> Result<Self::Writer<'_>, StoreError>;

    /// Delete a stream. Removing a stream that does not exist is not an error.
    fn remove(&self, key: StreamKey<'_>) -> Result<(), StoreError>;
}

/// Flat name for a key: `conv1.txt` + channel 3 becomes `conv1_003.txt`.
#[cfg(feature = "alloc")]
pub fn resolve_name(key: StreamKey<'_>) -> alloc::string::String {
    use alloc::borrow::ToOwned;
    use alloc::format;

    let Some(channel) = key.channel else {
        return key.name.to_owned();
    };
    match key.name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !stem.ends_with('/') && !ext.contains('/') => {
            format!("{stem}_{channel:03}.{ext}")
        }
        _ => format!("{}_{channel:03}", key.name),
    }
}

#[cfg(feature = "alloc")]
impl ByteSink for alloc::vec::Vec<u8> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
        self.extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Reader over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct ByteCursor<'b> {
    bytes: &'b [u8],
    pos: usize,
}

impl<'b> ByteCursor<'b> {
    pub const fn new(bytes: &'b [u8]) -> Self {
        Self { bytes, pos: 0 }
    }
}

impl ByteSource for ByteCursor<'_> {
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
