//! Channel-major to interleaved flatten.
//!
//! Dense layers after a conv stack expect `[V*V][C]`: all channels of one
//! position next to each other, `out[i*C + c] = in[c][i]`.

use crate::engine::Engine;
use crate::error::{StreamRole, TrickleResult};
use crate::io::{Reader, Source, TensorIn};
use crate::store::SequentialStore;
use crate::tensor;

/// Flatten a memory tensor of `channels` planes of `v×v`. Returns the vector
/// length.
pub fn flatten_planes(input: &[f32], v: usize, channels: usize, out: &mut [f32]) -> TrickleResult<usize> {
    let plane_len = v * v;
    let total = plane_len * channels;
    tensor::require_len(input.len(), total)?;
    tensor::require_len(out.len(), total)?;
    for (c, plane) in input[..total].chunks_exact(plane_len.max(1)).enumerate() {
        for (i, &x) in plane.iter().enumerate() {
            out[i * channels + c] = x;
        }
    }
    Ok(total)
}

impl<S: SequentialStore> Engine<'_, S> {
    /// Flatten `channels` planes of `v×v` from any source into `out`.
    /// Returns the vector length.
    pub fn flatten(&self, input: TensorIn<'_>, v: usize, channels: usize, out: &mut [f32]) -> TrickleResult<usize> {
        if let TensorIn::F32(data) = input {
            return flatten_planes(data, v, channels, out);
        }
        let plane_len = v * v;
        let total = plane_len * channels;
        log::debug!("flatten: {channels}x{v}x{v} -> {total}");
        tensor::require_len(out.len(), total)?;
        let mut input = Reader::open(self.store, input, plane_len, total, StreamRole::Input)?;
        for c in 0..channels {
            for i in 0..plane_len {
                out[i * channels + c] = input.read_value()?;
            }
        }
        Ok(total)
    }
}
