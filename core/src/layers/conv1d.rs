//! 1D convolution over channel-major signals.

use super::{Conv, Pool, MAX_KERNEL};
use crate::config::Activation;
use crate::engine::Engine;
use crate::error::{StreamRole, TrickleError, TrickleResult};
use crate::io::{Reader, Sink, Source, TensorIn, TensorOut, Writer};
use crate::math;
use crate::store::SequentialStore;

impl<S: SequentialStore> Engine<'_, S> {
    /// 1D counterpart of [`conv2d`](Engine::conv2d): `n_inputs` signals of
    /// length `w`, kernels of `K` taps, output pooled with a 1D window.
    /// Returns the pooled length.
    ///
    /// Scratch: the accumulator needs `max(W, V)` values, buffer #1 needs `W`
    /// unless the input is an `f32` slice.
    #[allow(clippy::too_many_arguments)]
    pub fn conv1d(
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
        let v = math::check_conv(w, k, padding, conv.stride)?;
        let wo = math::check_pool(v, pool.size, pool.stride)?;
        if conv.activation == Activation::Softmax {
            return Err(TrickleError::UnsupportedActivation(conv.activation));
        }
        conv.params.check_kernel(k)?;
        log::debug!(
            "conv1d: {n_inputs}x{w} -> {n_outputs}x{v} (k={k} p={padding} s={}), pool {}/{} -> {wo}",
            conv.stride,
            pool.size,
            pool.stride
        );

        let (store, scratch, mode, mut progress) = self.parts(n_inputs * n_outputs);
        let mut input = Reader::open(store, input, w, n_inputs * w, StreamRole::Input)?;
        let (mut weights, mut bias) = conv.params.open(store, n_outputs * n_inputs * k, n_outputs)?;
        let input_len = if input.needs_buffer() { w } else { 0 };
        let (signal_buf, accum) = scratch.borrow(input_len, w.max(v))?;
        let mut out = Writer::open(store, output, wo, n_outputs * wo)?;
        let mut kernel_buf = [0.0f32; MAX_KERNEL];

        for o in 0..n_outputs {
            let map = &mut accum[..v];
            map.fill(0.0);
            input.rewind()?;
            for _ in 0..n_inputs {
                let signal = input.read_run(w, signal_buf)?;
                let kernel = weights.read_run(k, &mut kernel_buf)?;
                math::conv1d_accumulate(signal, w, kernel, k, padding, conv.stride, map);
                progress.tick();
            }
            let b = bias.read_value()?;
            math::bias_activation(map, b, conv.activation)?;
            math::pool_1d(map, v, pool.size, pool.stride, mode, &mut out)?;
            log::trace!("conv1d: output channel {o} written");
        }
        out.finish()?;
        Ok(wo)
    }

    /// [`conv1d`](Engine::conv1d) without pooling. Returns `V`.
    pub fn conv1d_unpooled(
        &mut self,
        input: TensorIn<'_>,
        n_inputs: usize,
        output: TensorOut<'_>,
        n_outputs: usize,
        w: usize,
        conv: &Conv<'_>,
    ) -> TrickleResult<usize> {
        self.conv1d(input, n_inputs, output, n_outputs, w, conv, &Pool::IDENTITY)
    }
}
