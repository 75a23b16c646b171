//! Depthwise 2D convolution: one kernel per channel, no cross-channel sum.

use super::{Conv, Pool, MAX_KERNEL};
use crate::config::Activation;
use crate::engine::Engine;
use crate::error::{StreamRole, TrickleError, TrickleResult};
use crate::io::{Reader, Sink, Source, TensorIn, TensorOut, Writer};
use crate::math;
use crate::store::SequentialStore;

impl<S: SequentialStore> Engine<'_, S> {
    /// Convolve each of `channels` planes with its own `K×K` kernel, add the
    /// channel's bias, activate, and pool into `output`. Returns the pooled
    /// size. `n_outputs` must equal `n_inputs`.
    ///
    /// The input is read once, front to back.
    #[allow(clippy::too_many_arguments)]
    pub fn depthwise_conv2d(
        &mut self,
        input: TensorIn<'_>,
        n_inputs: usize,
        output: TensorOut<'_>,
        n_outputs: usize,
        w: usize,
        conv: &Conv<'_>,
        pool: &Pool,
    ) -> TrickleResult<usize> {
        if n_outputs != n_inputs {
            return Err(TrickleError::DimensionMismatch {
                expected: n_inputs,
                actual: n_outputs,
            });
        }
        let channels = n_inputs;
        let k = conv.kernel;
        let padding = conv.padding.resolve(k);
        let v = math::check_conv_2d(w, k, padding, conv.stride)?;
        let wo = math::check_pool(v, pool.size, pool.stride)?;
        if conv.activation == Activation::Softmax {
            return Err(TrickleError::UnsupportedActivation(conv.activation));
        }
        conv.params.check_kernel(k)?;
        log::debug!(
            "depthwise_conv2d: {channels}x{w}x{w} -> {channels}x{v}x{v} (k={k} p={padding} s={}), pool {}/{} -> {wo}",
            conv.stride,
            pool.size,
            pool.stride
        );

        let (store, scratch, mode, mut progress) = self.parts(channels);
        let plane_len = w * w;
        let mut input = Reader::open(store, input, plane_len, channels * plane_len, StreamRole::Input)?;
        let (mut weights, mut bias) = conv.params.open(store, channels * k * k, channels)?;
        let input_len = if input.needs_buffer() { plane_len } else { 0 };
        let side = w.max(v);
        let (plane_buf, accum) = scratch.borrow(input_len, side * side)?;
        let mut out = Writer::open(store, output, wo * wo, channels * wo * wo)?;
        let mut kernel_buf = [0.0f32; MAX_KERNEL * MAX_KERNEL];

        for c in 0..channels {
            let map = &mut accum[..v * v];
            map.fill(0.0);
            let plane = input.read_run(plane_len, plane_buf)?;
            let kernel = weights.read_run(k * k, &mut kernel_buf)?;
            math::conv2d_accumulate(plane, w, kernel, k, padding, conv.stride, map);
            let b = bias.read_value()?;
            math::bias_activation(map, b, conv.activation)?;
            math::pool_2d(map, v, pool.size, pool.stride, mode, &mut out)?;
            progress.tick();
            log::trace!("depthwise_conv2d: channel {c} written");
        }
        out.finish()?;
        Ok(wo)
    }
}
