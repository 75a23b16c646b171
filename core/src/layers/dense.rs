//! Fully-connected layer.
//!
//! `y[k] = bias[k] + Σ_j x[j] * weight[k][j]`, one neuron at a time. The
//! input is rewound for every neuron, so neither the input vector nor the
//! weights ever need to fit in RAM.

use super::{activations, Dense};
use crate::config::Activation;
use crate::engine::Engine;
use crate::error::{StreamRole, TrickleResult};
use crate::io::{Reader, Sink, Source, TensorIn, TensorOut, Writer};
use crate::progress::Progress;
use crate::store::SequentialStore;
use crate::tensor;

/// Evaluate every neuron in order and hand `(index, value)` to `emit`.
/// ReLU is applied here; softmax is left to the caller.
#[allow(clippy::too_many_arguments)]
fn neurons<I, P>(
    input: &mut I,
    weights: &mut P,
    bias: &mut P,
    n_inputs: usize,
    n_outputs: usize,
    activation: Activation,
    progress: &mut Progress<'_, '_>,
    mut emit: impl FnMut(usize, f32) -> TrickleResult<()>,
) -> TrickleResult<()>
where
    I: Source + ?Sized,
    P: Source + ?Sized,
{
    for k in 0..n_outputs {
        input.rewind()?;
        let mut h = bias.read_value()?;
        for _ in 0..n_inputs {
            h += input.read_value()? * weights.read_value()?;
        }
        if activation == Activation::Relu && h < 0.0 {
            h = 0.0;
        }
        emit(k, h)?;
        progress.tick();
    }
    Ok(())
}

impl<S: SequentialStore> Engine<'_, S> {
    /// Fully-connected layer from `n_inputs` values to `n_outputs` values.
    /// Returns `n_outputs`.
    ///
    /// Weights are `n_outputs` runs of `n_inputs` values. With
    /// [`Activation::Softmax`] the whole output vector is normalized once all
    /// neurons are computed; for stream outputs the values are staged in the
    /// accumulator, which then needs `n_outputs` values. A per-channel input
    /// is read as a single plane of `n_inputs` values.
    pub fn dense(
        &mut self,
        input: TensorIn<'_>,
        n_inputs: usize,
        output: TensorOut<'_>,
        n_outputs: usize,
        layer: &Dense<'_>,
    ) -> TrickleResult<usize> {
        log::debug!("dense: {n_inputs} -> {n_outputs} ({:?})", layer.activation);
        let (store, scratch, _, mut progress) = self.parts(n_outputs);
        let mut input = Reader::open(store, input, n_inputs, n_inputs, StreamRole::Input)?;
        let (mut weights, mut bias) = layer.params.open(store, n_outputs * n_inputs, n_outputs)?;
        let activation = layer.activation;

        match (activation, output) {
            (Activation::Softmax, TensorOut::Memory(out)) => {
                tensor::require_len(out.len(), n_outputs)?;
                let out = &mut out[..n_outputs];
                neurons(
                    &mut input,
                    &mut weights,
                    &mut bias,
                    n_inputs,
                    n_outputs,
                    activation,
                    &mut progress,
                    |k, h| {
                        out[k] = h;
                        Ok(())
                    },
                )?;
                activations::softmax(out);
            }
            (Activation::Softmax, output) => {
                let (_, staged) = scratch.borrow(0, n_outputs)?;
                let mut out = Writer::open(store, output, n_outputs, n_outputs)?;
                neurons(
                    &mut input,
                    &mut weights,
                    &mut bias,
                    n_inputs,
                    n_outputs,
                    activation,
                    &mut progress,
                    |k, h| {
                        staged[k] = h;
                        Ok(())
                    },
                )?;
                activations::softmax(staged);
                out.write_run(staged)?;
                out.finish()?;
            }
            (_, output) => {
                let mut out = Writer::open(store, output, n_outputs, n_outputs)?;
                neurons(
                    &mut input,
                    &mut weights,
                    &mut bias,
                    n_inputs,
                    n_outputs,
                    activation,
                    &mut progress,
                    |_, h| out.write_value(h),
                )?;
                out.finish()?;
            }
        }
        Ok(n_outputs)
    }
}
