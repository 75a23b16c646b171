//! Per-channel reductions and rescaling: global average pooling and batch
//! normalization.

use crate::engine::Engine;
use crate::error::{StreamRole, TrickleError, TrickleResult};
use crate::io::{Reader, Source, TensorIn};
use crate::store::SequentialStore;
use crate::tensor;

/// Mean of every `v×v` plane, written in place to the first `channels` slots.
/// Returns `channels`.
///
/// Slot `c` is written only after plane `c` has been fully read, and slot `c`
/// never lies in a later plane, so the in-place write is safe.
pub fn gap(tensor: &mut [f32], v: usize, channels: usize) -> TrickleResult<usize> {
    let plane_len = v * v;
    if plane_len == 0 {
        return Err(TrickleError::EmptyInput);
    }
    tensor::require_len(tensor.len(), plane_len * channels)?;
    for c in 0..channels {
        let start = c * plane_len;
        let sum: f64 = tensor[start..start + plane_len].iter().map(|&x| f64::from(x)).sum();
        tensor[c] = (sum / plane_len as f64) as f32;
    }
    Ok(channels)
}

impl<S: SequentialStore> Engine<'_, S> {
    /// Global average pool from any source into `out[..channels]`.
    pub fn gap(&self, input: TensorIn<'_>, v: usize, channels: usize, out: &mut [f32]) -> TrickleResult<usize> {
        let plane_len = v * v;
        if plane_len == 0 {
            return Err(TrickleError::EmptyInput);
        }
        tensor::require_len(out.len(), channels)?;
        log::debug!("gap: {channels}x{v}x{v}");
        let mut input = Reader::open(self.store, input, plane_len, plane_len * channels, StreamRole::Input)?;
        for slot in out[..channels].iter_mut() {
            let mut sum = 0.0f64;
            for _ in 0..plane_len {
                sum += f64::from(input.read_value()?);
            }
            *slot = (sum / plane_len as f64) as f32;
        }
        Ok(channels)
    }
}

/// Per-channel batch-norm statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchNormParams<'p> {
    pub gamma: &'p [f32],
    pub beta: &'p [f32],
    pub mean: &'p [f32],
    pub var: &'p [f32],
    pub eps: f32,
}

impl<'p> BatchNormParams<'p> {
    pub const DEFAULT_EPS: f32 = 1e-3;

    pub const fn new(gamma: &'p [f32], beta: &'p [f32], mean: &'p [f32], var: &'p [f32]) -> Self {
        Self {
            gamma,
            beta,
            mean,
            var,
            eps: Self::DEFAULT_EPS,
        }
    }

    /// Split `[gamma | beta | mean | var]`, each `channels` long.
    pub fn from_packed(packed: &'p [f32], channels: usize) -> TrickleResult<Self> {
        if packed.len() != 4 * channels {
            return Err(TrickleError::DimensionMismatch {
                expected: 4 * channels,
                actual: packed.len(),
            });
        }
        let (gamma, rest) = packed.split_at(channels);
        let (beta, rest) = rest.split_at(channels);
        let (mean, var) = rest.split_at(channels);
        Ok(Self::new(gamma, beta, mean, var))
    }

    pub const fn with_eps(mut self, eps: f32) -> Self {
        self.eps = eps;
        self
    }

    fn check(&self, channels: usize) -> TrickleResult<()> {
        for stat in [self.gamma, self.beta, self.mean, self.var] {
            if stat.len() != channels {
                return Err(TrickleError::DimensionMismatch {
                    expected: channels,
                    actual: stat.len(),
                });
            }
        }
        Ok(())
    }

    /// `(scale, shift)` of channel `c`.
    #[inline]
    fn affine(&self, c: usize) -> (f32, f32) {
        let scale = self.gamma[c] / libm::sqrtf(self.var[c] + self.eps);
        (scale, self.beta[c] - scale * self.mean[c])
    }
}

fn apply(tensor: &mut [f32], w: usize, channels: usize, params: &BatchNormParams<'_>, relu: bool) -> TrickleResult<usize> {
    params.check(channels)?;
    let plane_len = w * w;
    tensor::require_len(tensor.len(), plane_len * channels)?;
    for c in 0..channels {
        let (scale, shift) = params.affine(c);
        for x in tensor::plane_mut(tensor, w, c)? {
            *x = scale * *x + shift;
            if relu && *x < 0.0 {
                *x = 0.0;
            }
        }
    }
    Ok(w)
}

/// Batch-normalize `channels` planes of `w×w` in place. Returns `w`.
pub fn batch_norm(tensor: &mut [f32], w: usize, channels: usize, params: &BatchNormParams<'_>) -> TrickleResult<usize> {
    apply(tensor, w, channels, params, false)
}

/// [`batch_norm`] followed by ReLU.
pub fn batch_norm_relu(
    tensor: &mut [f32],
    w: usize,
    channels: usize,
    params: &BatchNormParams<'_>,
) -> TrickleResult<usize> {
    apply(tensor, w, channels, params, true)
}
