//! Plane sources and sinks.
//!
//! Every layer is written once against [`Source`] and [`Sink`]; the memory
//! and stream adapters below supply the operands. A memory `f32` source
//! hands out borrowed sub-slices, everything else (streams, byte grids)
//! materializes its runs into a caller buffer.

use crate::codec;
use crate::error::{StoreError, StreamRole, TrickleError, TrickleResult};
use crate::store::{ByteSink, ByteSource, SequentialStore, StreamKey};
use crate::tensor::require_len;

/// Numeric element of a memory tensor.
pub trait Element: Copy {
    /// `true` when runs can be borrowed as `&[f32]` without conversion.
    const ZERO_COPY: bool = false;

    fn to_f32(self) -> f32;

    fn as_f32s(run: &[Self]) -> Option<&[f32]> {
        let _ = run;
        None
    }
}

impl Element for f32 {
    const ZERO_COPY: bool = true;

    #[inline(always)]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline(always)]
    fn as_f32s(run: &[f32]) -> Option<&[f32]> {
        Some(run)
    }
}

impl Element for u8 {
    #[inline(always)]
    fn to_f32(self) -> f32 {
        f32::from(self)
    }
}

impl Element for i8 {
    #[inline(always)]
    fn to_f32(self) -> f32 {
        f32::from(self)
    }
}

/// Sequential reader of tensor values.
pub trait Source {
    /// Restart from the first value.
    fn rewind(&mut self) -> TrickleResult<()>;

    fn read_value(&mut self) -> TrickleResult<f32>;

    /// The next `len` values, borrowed when possible, otherwise copied into
    /// `buf`.
    fn read_run<'s>(&'s mut self, len: usize, buf: &'s mut [f32]) -> TrickleResult<&'s [f32]> {
        require_len(buf.len(), len)?;
        let run = &mut buf[..len];
        for slot in run.iter_mut() {
            *slot = self.read_value()?;
        }
        Ok(run)
    }

    /// Whether [`read_run`](Source::read_run) needs the caller buffer.
    fn needs_buffer(&self) -> bool {
        true
    }
}

/// Sequential writer of tensor values.
pub trait Sink {
    fn write_value(&mut self, value: f32) -> TrickleResult<()>;

    fn write_run(&mut self, values: &[f32]) -> TrickleResult<()> {
        values.iter().try_for_each(|&v| self.write_value(v))
    }

    /// Flush and close whatever the sink holds open.
    fn finish(&mut self) -> TrickleResult<()> {
        Ok(())
    }
}

// =============================================================================
// Memory
// =============================================================================

#[derive(Debug, Clone)]
pub struct SliceSource<'t, T> {
    data: &'t [T],
    pos: usize,
}

impl<'t, T: Element> SliceSource<'t, T> {
    pub const fn new(data: &'t [T]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> TrickleResult<&'t [T]> {
        let data: &'t [T] = self.data;
        let run = data
            .get(self.pos..self.pos + len)
            .ok_or(TrickleError::BufferTooSmall {
                required: self.pos + len,
                available: data.len(),
            })?;
        self.pos += len;
        Ok(run)
    }
}

impl<T: Element> Source for SliceSource<'_, T> {
    fn rewind(&mut self) -> TrickleResult<()> {
        self.pos = 0;
        Ok(())
    }

    #[inline]
    fn read_value(&mut self) -> TrickleResult<f32> {
        Ok(self.take(1)?[0].to_f32())
    }

    fn read_run<'s>(&'s mut self, len: usize, buf: &'s mut [f32]) -> TrickleResult<&'s [f32]> {
        let run = self.take(len)?;
        if let Some(values) = T::as_f32s(run) {
            return Ok(values);
        }
        require_len(buf.len(), len)?;
        let out = &mut buf[..len];
        for (slot, v) in out.iter_mut().zip(run) {
            *slot = v.to_f32();
        }
        Ok(out)
    }

    fn needs_buffer(&self) -> bool {
        !T::ZERO_COPY
    }
}

#[derive(Debug)]
pub struct SliceSink<'t> {
    data: &'t mut [f32],
    pos: usize,
}

impl<'t> SliceSink<'t> {
    pub fn new(data: &'t mut [f32]) -> Self {
        Self { data, pos: 0 }
    }

    /// Values written so far.
    pub fn written(&self) -> usize {
        self.pos
    }
}

impl Sink for SliceSink<'_> {
    #[inline]
    fn write_value(&mut self, value: f32) -> TrickleResult<()> {
        let available = self.data.len();
        let slot = self.data.get_mut(self.pos).ok_or(TrickleError::BufferTooSmall {
            required: self.pos + 1,
            available,
        })?;
        *slot = value;
        self.pos += 1;
        Ok(())
    }

    fn write_run(&mut self, values: &[f32]) -> TrickleResult<()> {
        let end = self.pos + values.len();
        require_len(self.data.len(), end)?;
        self.data[self.pos..end].copy_from_slice(values);
        self.pos = end;
        Ok(())
    }
}

// =============================================================================
// Packed streams
// =============================================================================

/// Values of a single stream.
#[derive(Debug)]
pub struct StreamSource<R> {
    reader: R,
    role: StreamRole,
}

impl<R: ByteSource> StreamSource<R> {
    pub fn new(reader: R, role: StreamRole) -> Self {
        Self { reader, role }
    }
}

impl<R: ByteSource> Source for StreamSource<R> {
    fn rewind(&mut self) -> TrickleResult<()> {
        self.reader.rewind().map_err(TrickleError::store(self.role))
    }

    fn read_value(&mut self) -> TrickleResult<f32> {
        codec::read_f32(&mut self.reader)
            .map_err(TrickleError::store(self.role))?
            .ok_or(TrickleError::UnexpectedEof { role: self.role })
    }
}

#[derive(Debug)]
pub struct StreamSink<W> {
    writer: W,
    role: StreamRole,
}

impl<W: ByteSink> StreamSink<W> {
    pub fn new(writer: W, role: StreamRole) -> Self {
        Self { writer, role }
    }
}

impl<W: ByteSink> Sink for StreamSink<W> {
    fn write_value(&mut self, value: f32) -> TrickleResult<()> {
        codec::write_f32(&mut self.writer, value).map_err(TrickleError::store(self.role))
    }

    fn finish(&mut self) -> TrickleResult<()> {
        self.writer.flush().map_err(TrickleError::store(self.role))
    }
}

// =============================================================================
// Per-channel streams
// =============================================================================

/// A tensor stored one plane per stream (`name` + channel index). Planes are
/// opened lazily, in channel order.
pub struct ChannelSource<'s, S: SequentialStore + 's> {
    store: &'s S,
    name: &'s str,
    role: StreamRole,
    plane_len: usize,
    next: usize,
    consumed: usize,
    current: Option<S::Reader<'s>>,
}

impl<'s, S: SequentialStore + 's> ChannelSource<'s, S> {
    pub fn new(store: &'s S, name: &'s str, plane_len: usize, role: StreamRole) -> Self {
        Self {
            store,
            name,
            role,
            plane_len,
            next: 0,
            consumed: 0,
            current: None,
        }
    }
}

impl<'s, S: SequentialStore + 's> Source for ChannelSource<'s, S> {
    fn rewind(&mut self) -> TrickleResult<()> {
        self.current = None;
        self.next = 0;
        self.consumed = 0;
        Ok(())
    }

    fn read_value(&mut self) -> TrickleResult<f32> {
        if self.current.is_none() || self.consumed >= self.plane_len {
            let key = StreamKey::channel(self.name, self.next);
            let reader = self.store.open_read(key).map_err(TrickleError::store(self.role))?;
            self.current = Some(reader);
            self.next += 1;
            self.consumed = 0;
        }
        let role = self.role;
        let reader = self
            .current
            .as_mut()
            .ok_or(TrickleError::UnexpectedEof { role })?;
        let value = codec::read_f32(reader)
            .map_err(TrickleError::store(role))?
            .ok_or(TrickleError::UnexpectedEof { role })?;
        self.consumed += 1;
        Ok(value)
    }
}

pub struct ChannelSink<'s, S: SequentialStore + 's> {
    store: &'s S,
    name: &'s str,
    role: StreamRole,
    plane_len: usize,
    next: usize,
    written: usize,
    current: Option<S::Writer<'s>>,
}

impl<'s, S: SequentialStore + 's> ChannelSink<'s, S> {
    pub fn new(store: &'s S, name: &'s str, plane_len: usize, role: StreamRole) -> Self {
        Self {
            store,
            name,
            role,
            plane_len,
            next: 0,
            written: 0,
            current: None,
        }
    }

    fn close_current(&mut self) -> TrickleResult<()> {
        if let Some(mut writer) = self.current.take() {
            writer.flush().map_err(TrickleError::store(self.role))?;
        }
        Ok(())
    }
}

impl<'s, S: SequentialStore + 's> Sink for ChannelSink<'s, S> {
    fn write_value(&mut self, value: f32) -> TrickleResult<()> {
        if self.current.is_none() || self.written >= self.plane_len {
            self.close_current()?;
            let key = StreamKey::channel(self.name, self.next);
            let writer = self.store.open_write(key).map_err(TrickleError::store(self.role))?;
            self.current = Some(writer);
            self.next += 1;
            self.written = 0;
        }
        let role = self.role;
        let writer = self
            .current
            .as_mut()
            .ok_or(TrickleError::Store {
                role,
                source: StoreError::Unavailable,
            })?;
        codec::write_f32(writer, value).map_err(TrickleError::store(role))?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> TrickleResult<()> {
        self.close_current()
    }
}

// =============================================================================
// Operand descriptors
// =============================================================================

/// Where a layer reads its input tensor from.
#[derive(Debug, Clone, Copy)]
pub enum TensorIn<'t> {
    F32(&'t [f32]),
    /// Byte grid, e.g. a camera frame.
    U8(&'t [u8]),
    I8(&'t [i8]),
    /// All planes packed in one stream, channel after channel.
    Stream(&'t str),
    /// One stream per plane, see [`StreamKey::channel`].
    Channels(&'t str),
}

impl<'t> From<&'t [f32]> for TensorIn<'t> {
    fn from(data: &'t [f32]) -> Self {
        Self::F32(data)
    }
}

impl<'t> From<&'t [u8]> for TensorIn<'t> {
    fn from(data: &'t [u8]) -> Self {
        Self::U8(data)
    }
}

impl<'t> From<&'t [i8]> for TensorIn<'t> {
    fn from(data: &'t [i8]) -> Self {
        Self::I8(data)
    }
}

/// Where a layer writes its output tensor.
#[derive(Debug)]
pub enum TensorOut<'t> {
    Memory(&'t mut [f32]),
    Stream(&'t str),
    Channels(&'t str),
}

impl<'t> From<&'t mut [f32]> for TensorOut<'t> {
    fn from(data: &'t mut [f32]) -> Self {
        Self::Memory(data)
    }
}

/// An opened [`TensorIn`] or parameter operand.
pub(crate) enum Reader<'x, S: SequentialStore + 'x> {
    F32(SliceSource<'x, f32>),
    U8(SliceSource<'x, u8>),
    I8(SliceSource<'x, i8>),
    Stream(StreamSource<S::Reader<'x>>),
    Channels(ChannelSource<'x, S>),
}

impl<'x, S: SequentialStore + 'x> Reader<'x, S> {
    /// Open `input`. Memory tensors must hold at least `len` values.
    pub(crate) fn open(
        store: &'x S,
        input: TensorIn<'x>,
        plane_len: usize,
        len: usize,
        role: StreamRole,
    ) -> TrickleResult<Self> {
        Ok(match input {
            TensorIn::F32(data) => {
                require_len(data.len(), len)?;
                Self::F32(SliceSource::new(data))
            }
            TensorIn::U8(data) => {
                require_len(data.len(), len)?;
                Self::U8(SliceSource::new(data))
            }
            TensorIn::I8(data) => {
                require_len(data.len(), len)?;
                Self::I8(SliceSource::new(data))
            }
            TensorIn::Stream(name) => Self::stream(store, name, role)?,
            TensorIn::Channels(name) => {
                Self::Channels(ChannelSource::new(store, name, plane_len, role))
            }
        })
    }

    pub(crate) fn stream(store: &'x S, name: &'x str, role: StreamRole) -> TrickleResult<Self> {
        let reader = store
            .open_read(StreamKey::named(name))
            .map_err(TrickleError::store(role))?;
        Ok(Self::Stream(StreamSource::new(reader, role)))
    }

    /// Memory parameters must match the layer exactly.
    pub(crate) fn exact(values: &'x [f32], len: usize) -> TrickleResult<Self> {
        if values.len() != len {
            return Err(TrickleError::DimensionMismatch {
                expected: len,
                actual: values.len(),
            });
        }
        Ok(Self::F32(SliceSource::new(values)))
    }
}

impl<'x, S: SequentialStore + 'x> Source for Reader<'x, S> {
    fn rewind(&mut self) -> TrickleResult<()> {
        match self {
            Self::F32(s) => s.rewind(),
            Self::U8(s) => s.rewind(),
            Self::I8(s) => s.rewind(),
            Self::Stream(s) => s.rewind(),
            Self::Channels(s) => s.rewind(),
        }
    }

    fn read_value(&mut self) -> TrickleResult<f32> {
        match self {
            Self::F32(s) => s.read_value(),
            Self::U8(s) => s.read_value(),
            Self::I8(s) => s.read_value(),
            Self::Stream(s) => s.read_value(),
            Self::Channels(s) => s.read_value(),
        }
    }

    fn read_run<'s>(&'s mut self, len: usize, buf: &'s mut [f32]) -> TrickleResult<&'s [f32]> {
        match self {
            Self::F32(s) => s.read_run(len, buf),
            Self::U8(s) => s.read_run(len, buf),
            Self::I8(s) => s.read_run(len, buf),
            Self::Stream(s) => s.read_run(len, buf),
            Self::Channels(s) => s.read_run(len, buf),
        }
    }

    fn needs_buffer(&self) -> bool {
        match self {
            Self::F32(s) => s.needs_buffer(),
            Self::U8(s) => s.needs_buffer(),
            Self::I8(s) => s.needs_buffer(),
            Self::Stream(s) => s.needs_buffer(),
            Self::Channels(s) => s.needs_buffer(),
        }
    }
}

/// An opened [`TensorOut`].
pub(crate) enum Writer<'x, S: SequentialStore + 'x> {
    Memory(SliceSink<'x>),
    Stream(StreamSink<S::Writer<'x>>),
    Channels(ChannelSink<'x, S>),
}

impl<'x, S: SequentialStore + 'x> Writer<'x, S> {
    /// Open `output`. Stream outputs are truncated here, so callers validate
    /// everything else first.
    pub(crate) fn open(
        store: &'x S,
        output: TensorOut<'x>,
        plane_len: usize,
        len: usize,
    ) -> TrickleResult<Self> {
        let role = StreamRole::Output;
        Ok(match output {
            TensorOut::Memory(data) => {
                require_len(data.len(), len)?;
                Self::Memory(SliceSink::new(data))
            }
            TensorOut::Stream(name) => {
                let writer = store
                    .open_write(StreamKey::named(name))
                    .map_err(TrickleError::store(role))?;
                Self::Stream(StreamSink::new(writer, role))
            }
            TensorOut::Channels(name) => {
                Self::Channels(ChannelSink::new(store, name, plane_len, role))
            }
        })
    }
}

impl<'x, S: SequentialStore + 'x> Sink for Writer<'x, S> {
    fn write_value(&mut self, value: f32) -> TrickleResult<()> {
        match self {
            Self::Memory(s) => s.write_value(value),
            Self::Stream(s) => s.write_value(value),
            Self::Channels(s) => s.write_value(value),
        }
    }

    fn write_run(&mut self, values: &[f32]) -> TrickleResult<()> {
        match self {
            Self::Memory(s) => s.write_run(values),
            Self::Stream(s) => s.write_run(values),
            Self::Channels(s) => s.write_run(values),
        }
    }

    fn finish(&mut self) -> TrickleResult<()> {
        match self {
            Self::Memory(s) => s.finish(),
            Self::Stream(s) => s.finish(),
            Self::Channels(s) => s.finish(),
        }
    }
}
