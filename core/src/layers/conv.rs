//! Dense 2D convolution.

use super::{Conv, Pool, MAX_KERNEL};
use crate::config::Activation;
use crate::engine::Engine;
use crate::error::{StreamRole, TrickleError, TrickleResult};
use crate::io::{Reader, Sink, Source, TensorIn, TensorOut, Writer};
use crate::math;
use crate::store::SequentialStore;

impl<S: SequentialStore> Engine<'_, S> {
    /// Convolve `n_inputs` planes of `w×w` into `n_outputs` maps, add bias,
    /// activate, and pool each map into `output`. Returns the pooled size.
    ///
    /// Weights are `n_outputs` groups of `n_inputs` kernels of `K×K` values,
    /// the bias holds `n_outputs` values. A stream input is rewound before
    /// every output channel, so it must not be the output stream.
    ///
    /// Scratch: the accumulator needs `max(W, V)²` values, buffer #1 needs
    /// `W²` unless the input is an `f32` slice.
    #[allow(clippy::too_many_arguments)]
    pub fn conv2d(
        &mut self,
        input: TensorIn<'_>,
        n_inputs: usize,
        output: TensorOut<'_>,
        n_outputs: usize,
        w: usize,
        conv: &Conv<'_>,
        pool: &Pool,
    ) -> TrickleResult<usize> {
        let k = conv.kernel;
        let padding = conv.padding.resolve(k);
        let v = math::check_conv_2d(w, k, padding, conv.stride)?;
        let wo = math::check_pool(v, pool.size, pool.stride)?;
        if conv.activation == Activation::Softmax {
            return Err(TrickleError::UnsupportedActivation(conv.activation));
        }
        conv.params.check_kernel(k)?;
        log::debug!(
            "conv2d: {n_inputs}x{w}x{w} -> {n_outputs}x{v}x{v} (k={k} p={padding} s={}), pool {}/{} -> {wo}",
            conv.stride,
            pool.size,
            pool.stride
        );

        let (store, scratch, mode, mut progress) = self.parts(n_inputs * n_outputs);
        let plane_len = w * w;
        let mut input = Reader::open(store, input, plane_len, n_inputs * plane_len, StreamRole::Input)?;
        let (mut weights, mut bias) = conv.params.open(store, n_outputs * n_inputs * k * k, n_outputs)?;
        let input_len = if input.needs_buffer() { plane_len } else { 0 };
        let side = w.max(v);
        let (plane_buf, accum) = scratch.borrow(input_len, side * side)?;
        let mut out = Writer::open(store, output, wo * wo, n_outputs * wo * wo)?;
        let mut kernel_buf = [0.0f32; MAX_KERNEL * MAX_KERNEL];

        for o in 0..n_outputs {
            let map = &mut accum[..v * v];
            map.fill(0.0);
            input.rewind()?;
            for _ in 0..n_inputs {
                let plane = input.read_run(plane_len, plane_buf)?;
                let kernel = weights.read_run(k * k, &mut kernel_buf)?;
                math::conv2d_accumulate(plane, w, kernel, k, padding, conv.stride, map);
                progress.tick();
            }
            let b = bias.read_value()?;
            math::bias_activation(map, b, conv.activation)?;
            math::pool_2d(map, v, pool.size, pool.stride, mode, &mut out)?;
            log::trace!("conv2d: output channel {o} written");
        }
        out.finish()?;
        Ok(wo)
    }
}
