//! Standalone pooling.
//!
//! Convolutions pool their own output; these entry points pool a map the
//! caller already holds in memory.

use super::Pool;
use crate::config::PoolMode;
use crate::engine::Engine;
use crate::error::{StreamRole, TrickleError, TrickleResult};
use crate::io::{SliceSink, Sink, StreamSink};
use crate::math;
use crate::store::{SequentialStore, StreamKey};
use crate::tensor;

/// Pool a `w×w` map into the front of `out`. Returns the output size.
pub fn pool2d_into(
    mode: PoolMode,
    map: &[f32],
    w: usize,
    pool: &Pool,
    out: &mut [f32],
) -> TrickleResult<usize> {
    let wo = math::check_pool(w, pool.size, pool.stride)?;
    tensor::require_len(out.len(), wo * wo)?;
    math::pool_2d(map, w, pool.size, pool.stride, mode, &mut SliceSink::new(out))
}

/// Pool a `w×w` map into plane `z` of a channel-major tensor of `Wo×Wo`
/// planes.
pub fn pool2d_into_plane(
    mode: PoolMode,
    map: &[f32],
    w: usize,
    pool: &Pool,
    tensor: &mut [f32],
    z: usize,
) -> TrickleResult<usize> {
    let wo = math::check_pool(w, pool.size, pool.stride)?;
    let plane = tensor::plane_mut(tensor, wo, z)?;
    math::pool_2d(map, w, pool.size, pool.stride, mode, &mut SliceSink::new(plane))
}

impl<S: SequentialStore> Engine<'_, S> {
    /// Pool a `w×w` map into a new stream. Returns the output size.
    pub fn pool2d_to_stream(&self, map: &[f32], w: usize, pool: &Pool, output: &str) -> TrickleResult<usize> {
        math::check_pool(w, pool.size, pool.stride)?;
        tensor::require_len(map.len(), w * w)?;
        log::debug!("pool2d: {w}x{w} window {}/{} -> {output}", pool.size, pool.stride);
        let mut sink = self.open_sink(output)?;
        let wo = math::pool_2d(map, w, pool.size, pool.stride, self.pool_mode(), &mut sink)?;
        sink.finish()?;
        Ok(wo)
    }

    /// Pool a `w×w` map into `out` with the engine's pooling mode.
    pub fn pool2d_to_buffer(&self, map: &[f32], w: usize, pool: &Pool, out: &mut [f32]) -> TrickleResult<usize> {
        pool2d_into(self.pool_mode(), map, w, pool, out)
    }

    /// Pool a `w×w` map into plane `z` of `tensor`.
    pub fn pool2d_to_plane(
        &self,
        map: &[f32],
        w: usize,
        pool: &Pool,
        tensor: &mut [f32],
        z: usize,
    ) -> TrickleResult<usize> {
        pool2d_into_plane(self.pool_mode(), map, w, pool, tensor, z)
    }

    /// Pool a length-`w` signal into a new stream. Returns the output length.
    pub fn pool1d_to_stream(&self, signal: &[f32], w: usize, pool: &Pool, output: &str) -> TrickleResult<usize> {
        math::check_pool(w, pool.size, pool.stride)?;
        tensor::require_len(signal.len(), w)?;
        log::debug!("pool1d: {w} window {}/{} -> {output}", pool.size, pool.stride);
        let mut sink = self.open_sink(output)?;
        let wo = math::pool_1d(signal, w, pool.size, pool.stride, self.pool_mode(), &mut sink)?;
        sink.finish()?;
        Ok(wo)
    }

    pub(crate) fn open_sink(&self, name: &str) -> TrickleResult<StreamSink<S::Writer<'_>>> {
        let writer = self
            .store
            .open_write(StreamKey::named(name))
            .map_err(TrickleError::store(StreamRole::Output))?;
        Ok(StreamSink::new(writer, StreamRole::Output))
    }
}
