//! Engine context.
//!
//! An [`Engine`] owns everything a session of layer calls shares: the store
//! the streams live in, the scratch pool, the pooling mode, and the optional
//! progress hook. The layer operations themselves are implemented in
//! `layers::*` as further `impl Engine` blocks.
//!
//! ```ignore
//! let store = DirStore::new("/sd");
//! let mut input_buf = [0.0f32; 28 * 28];
//! let mut accum = [0.0f32; 28 * 28];
//! let mut engine = Engine::new(&store, ScratchPool::new(&mut input_buf, &mut accum));
//!
//! let conv = Conv::stream(3, "w01.txt", "b01.txt").padding(Padding::Same);
//! let v = engine.conv2d(TensorIn::U8(&frame), 1, TensorOut::Stream("c01.txt"), 4, 28, &conv, &Pool::new(2, 2))?;
//! ```

use crate::codec;
use crate::config::{EngineConfig, PoolMode};
use crate::error::{StreamRole, TrickleError, TrickleResult};
use crate::io::{Sink, StreamSink};
use crate::progress::Progress;
use crate::scratch::ScratchPool;
use crate::store::{ByteSink, NoStore, SequentialStore, StreamKey};

/// Progress callback: receives values in `[0, 1]`.
pub type ProgressHook<'a> = &'a mut (dyn FnMut(f32) + 'a);

pub struct Engine<'a, S: SequentialStore> {
    pub(crate) store: &'a S,
    pub(crate) scratch: ScratchPool<'a>,
    pub(crate) config: EngineConfig,
    pub(crate) progress: Option<ProgressHook<'a>>,
}

static NO_STORE: NoStore = NoStore;

impl<'a> Engine<'a, NoStore> {
    /// Engine without storage: every operand must live in memory.
    pub fn in_memory(scratch: ScratchPool<'a>) -> Self {
        Self::new(&NO_STORE, scratch)
    }
}

impl<'a, S: SequentialStore> Engine<'a, S> {
    pub fn new(store: &'a S, scratch: ScratchPool<'a>) -> Self {
        Self {
            store,
            scratch,
            config: EngineConfig::default(),
            progress: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Install a progress hook, called between units of work.
    pub fn with_progress(mut self, hook: ProgressHook<'a>) -> Self {
        self.progress = Some(hook);
        self
    }

    #[inline]
    pub fn pool_mode(&self) -> PoolMode {
        self.config.pool_mode
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn store(&self) -> &'a S {
        self.store
    }

    pub fn scratch(&self) -> &ScratchPool<'a> {
        &self.scratch
    }

    /// Split the engine into the parts a layer call needs at once.
    pub(crate) fn parts(
        &mut self,
        units: usize,
    ) -> (&'a S, &mut ScratchPool<'a>, PoolMode, Progress<'_, 'a>) {
        let Self {
            store,
            scratch,
            config,
            progress,
        } = self;
        let progress = Progress::new(progress.as_deref_mut(), units);
        (*store, scratch, config.pool_mode, progress)
    }

    /// Delete a stream. Missing streams are not an error.
    pub fn remove(&self, name: &str) -> TrickleResult<()> {
        self.store
            .remove(StreamKey::named(name))
            .map_err(TrickleError::store(StreamRole::Tensor))
    }

    /// Delete the per-channel streams `0..channels` of `name`.
    pub fn remove_channels(&self, name: &str, channels: usize) -> TrickleResult<()> {
        (0..channels).try_for_each(|c| {
            self.store
                .remove(StreamKey::channel(name, c))
                .map_err(TrickleError::store(StreamRole::Tensor))
        })
    }

    // =========================================================================
    // Tensor streams
    // =========================================================================

    /// Write `values` to a new stream, one per line.
    pub fn write_tensor(&self, name: &str, values: &[f32]) -> TrickleResult<()> {
        let role = StreamRole::Tensor;
        let writer = self
            .store
            .open_write(StreamKey::named(name))
            .map_err(TrickleError::store(role))?;
        let mut sink = StreamSink::new(writer, role);
        sink.write_run(values)?;
        sink.finish()
    }

    /// Write a byte grid (e.g. a camera frame) to a new stream as integers.
    pub fn write_byte_tensor(&self, name: &str, values: &[u8]) -> TrickleResult<()> {
        let role = StreamRole::Tensor;
        let mut writer = self
            .store
            .open_write(StreamKey::named(name))
            .map_err(TrickleError::store(role))?;
        for &v in values {
            codec::write_int(&mut writer, i64::from(v)).map_err(TrickleError::store(role))?;
        }
        writer.flush().map_err(TrickleError::store(role))
    }

    /// Fill `out` from the start of a stream. The stream must hold at least
    /// `out.len()` values.
    pub fn read_tensor(&self, name: &str, out: &mut [f32]) -> TrickleResult<usize> {
        let role = StreamRole::Tensor;
        let mut reader = self
            .store
            .open_read(StreamKey::named(name))
            .map_err(TrickleError::store(role))?;
        for slot in out.iter_mut() {
            *slot = codec::read_f32(&mut reader)
                .map_err(TrickleError::store(role))?
                .ok_or(TrickleError::UnexpectedEof { role })?;
        }
        Ok(out.len())
    }

    /// [`read_tensor`](Engine::read_tensor) for byte grids; values are
    /// rounded and saturated to `0..=255`.
    pub fn read_byte_tensor(&self, name: &str, out: &mut [u8]) -> TrickleResult<usize> {
        let role = StreamRole::Tensor;
        let mut reader = self
            .store
            .open_read(StreamKey::named(name))
            .map_err(TrickleError::store(role))?;
        for slot in out.iter_mut() {
            *slot = codec::read_u8(&mut reader)
                .map_err(TrickleError::store(role))?
                .ok_or(TrickleError::UnexpectedEof { role })?;
        }
        Ok(out.len())
    }

    /// Copy the first line of a stream (up to `\n` or `\r`) into `buf`, e.g.
    /// a label stored next to a sample. Returns the number of bytes copied;
    /// an empty stream gives 0.
    pub fn read_first_line(&self, name: &str, buf: &mut [u8]) -> TrickleResult<usize> {
        let role = StreamRole::Tensor;
        let mut reader = self
            .store
            .open_read(StreamKey::named(name))
            .map_err(TrickleError::store(role))?;
        let len = codec::read_line(&mut reader, buf)
            .map_err(TrickleError::store(role))?
            .unwrap_or(0);
        Ok(buf[..len].iter().position(|&b| b == b'\r').unwrap_or(len))
    }
}
