//! `f32` kernels shared by the layer engines.
//!
//! These functions work on one plane at a time and never touch a store. The
//! layer engines validate geometry and buffer sizes up front, so the kernels
//! index directly.
//!
//! Summation order is fixed per output element: the kernel taps are summed
//! row by row into a local, which is then added to the accumulator. Memory
//! and stream operands go through the same kernels, so their results are
//! bit-identical.

use crate::config::{Activation, PoolMode};
use crate::error::{TrickleError, TrickleResult};
use crate::io::Sink;

// =============================================================================
// Geometry
// =============================================================================

/// `(W - K + 2P) / S + 1`. Assumes [`check_conv`] passed.
#[inline]
pub const fn conv_output_size(w: usize, kernel: usize, padding: usize, stride: usize) -> usize {
    (w.saturating_add(padding.saturating_mul(2)) - kernel) / stride + 1
}

/// `(W - K) / T + 1`. Assumes [`check_pool`] passed.
#[inline]
pub const fn pool_output_size(w: usize, size: usize, stride: usize) -> usize {
    (w - size) / stride + 1
}

/// Validate a convolution and return its output size.
pub fn check_conv(w: usize, kernel: usize, padding: usize, stride: usize) -> TrickleResult<usize> {
    let padded = padding.checked_mul(2).and_then(|p| p.checked_add(w));
    match padded {
        Some(padded) if stride != 0 && kernel != 0 && kernel <= padded => {
            Ok((padded - kernel) / stride + 1)
        }
        _ => Err(TrickleError::InvalidGeometry {
            size: w,
            kernel,
            padding,
            stride,
        }),
    }
}

/// [`check_conv`] for square maps: also rejects geometries whose input or
/// output plane has more cells than `usize` can count.
pub fn check_conv_2d(w: usize, kernel: usize, padding: usize, stride: usize) -> TrickleResult<usize> {
    let v = check_conv(w, kernel, padding, stride)?;
    let side = w.max(v);
    if side.checked_mul(side).is_none() {
        return Err(TrickleError::InvalidGeometry {
            size: w,
            kernel,
            padding,
            stride,
        });
    }
    Ok(v)
}

/// Validate a valid-mode pooling window and return its output size.
pub fn check_pool(w: usize, size: usize, stride: usize) -> TrickleResult<usize> {
    if stride == 0 || size == 0 || size > w {
        return Err(TrickleError::InvalidGeometry {
            size: w,
            kernel: size,
            padding: 0,
            stride,
        });
    }
    Ok(pool_output_size(w, size, stride))
}

// =============================================================================
// Convolution
// =============================================================================

/// Accumulate one input plane convolved with one kernel into `acc`.
///
/// `plane` is `W×W`, `kernel` is `K×K` row-major, `acc` is the `V×V` output
/// map. Taps that land in the padding contribute nothing.
pub fn conv2d_accumulate(
    plane: &[f32],
    w: usize,
    kernel: &[f32],
    k: usize,
    padding: usize,
    stride: usize,
    acc: &mut [f32],
) {
    let v = conv_output_size(w, k, padding, stride);
    for i in 0..v {
        for j in 0..v {
            let mut sum = 0.0f32;
            for kr in 0..k {
                let r = i * stride + kr;
                if r < padding || r >= w + padding {
                    continue;
                }
                let row = &plane[(r - padding) * w..(r - padding + 1) * w];
                let taps = &kernel[kr * k..(kr + 1) * k];
                for (kc, &tap) in taps.iter().enumerate() {
                    let c = j * stride + kc;
                    if c < padding || c >= w + padding {
                        continue;
                    }
                    sum += tap * row[c - padding];
                }
            }
            acc[i * v + j] += sum;
        }
    }
}

/// 1D counterpart of [`conv2d_accumulate`]: `signal` has length `W`,
/// `acc` length `V`.
pub fn conv1d_accumulate(
    signal: &[f32],
    w: usize,
    kernel: &[f32],
    k: usize,
    padding: usize,
    stride: usize,
    acc: &mut [f32],
) {
    let v = conv_output_size(w, k, padding, stride);
    for (i, out) in acc.iter_mut().enumerate().take(v) {
        let mut sum = 0.0f32;
        for (kc, &tap) in kernel.iter().enumerate().take(k) {
            let c = i * stride + kc;
            if c < padding || c >= w + padding {
                continue;
            }
            sum += tap * signal[c - padding];
        }
        *out += sum;
    }
}

/// Add `bias` to every element and apply the activation.
pub fn bias_activation(map: &mut [f32], bias: f32, activation: Activation) -> TrickleResult<()> {
    match activation {
        Activation::None => map.iter_mut().for_each(|x| *x += bias),
        Activation::Relu => map.iter_mut().for_each(|x| {
            *x += bias;
            if *x < 0.0 {
                *x = 0.0;
            }
        }),
        Activation::Softmax => return Err(TrickleError::UnsupportedActivation(activation)),
    }
    Ok(())
}

// =============================================================================
// Pooling
// =============================================================================

#[inline]
fn reduce(mode: PoolMode, values: impl Iterator<Item = f32>, count: usize) -> f32 {
    match mode {
        PoolMode::Max => values.fold(f32::NEG_INFINITY, f32::max),
        PoolMode::Mean => values.sum::<f32>() / count as f32,
    }
}

/// Pool a `W×W` map into `sink`, row by row. Returns the output size.
pub fn pool_2d<K: Sink + ?Sized>(
    map: &[f32],
    w: usize,
    size: usize,
    stride: usize,
    mode: PoolMode,
    sink: &mut K,
) -> TrickleResult<usize> {
    let wo = check_pool(w, size, stride)?;
    crate::tensor::require_len(map.len(), w * w)?;
    for i in 0..wo {
        for j in 0..wo {
            let window = (0..size).flat_map(|r| {
                let start = (i * stride + r) * w + j * stride;
                map[start..start + size].iter().copied()
            });
            sink.write_value(reduce(mode, window, size * size))?;
        }
    }
    Ok(wo)
}

/// Pool a length-`W` signal into `sink`. Returns the output length.
pub fn pool_1d<K: Sink + ?Sized>(
    signal: &[f32],
    w: usize,
    size: usize,
    stride: usize,
    mode: PoolMode,
    sink: &mut K,
) -> TrickleResult<usize> {
    let wo = check_pool(w, size, stride)?;
    crate::tensor::require_len(signal.len(), w)?;
    for i in 0..wo {
        let start = i * stride;
        let window = signal[start..start + size].iter().copied();
        sink.write_value(reduce(mode, window, size))?;
    }
    Ok(wo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conv_output_size() {
        assert_eq!(check_conv(28, 3, 0, 1), Ok(26));
        assert_eq!(check_conv(28, 3, 1, 1), Ok(28));
        assert_eq!(check_conv(28, 5, 2, 2), Ok(14));
        assert!(check_conv(2, 5, 1, 1).is_err());
        assert!(check_conv(4, 3, 0, 0).is_err());
        assert!(check_conv(4, 0, 0, 1).is_err());
    }

    #[test]
    fn test_oversized_padding_rejected() {
        let huge = usize::MAX / 2 + 1;
        assert_eq!(
            check_conv(8, 3, huge, 1),
            Err(TrickleError::InvalidGeometry { size: 8, kernel: 3, padding: huge, stride: 1 })
        );
        assert!(check_conv(usize::MAX, 1, 1, 1).is_err());
        // The run fits but its square does not.
        let quarter = usize::MAX / 4;
        assert!(check_conv(8, 3, quarter, 1).is_ok());
        assert!(check_conv_2d(8, 3, quarter, 1).is_err());
        assert_eq!(check_conv_2d(28, 5, 2, 2), Ok(14));
    }

    #[test]
    fn test_padded_taps_are_zero() {
        // 2×2 plane, 3×3 all-ones kernel, padding 1: every output sums the
        // whole plane because the rest of each window is padding.
        let plane = [1.0, 2.0, 3.0, 4.0];
        let kernel = [1.0; 9];
        let mut acc = [0.0; 4];
        conv2d_accumulate(&plane, 2, &kernel, 3, 1, 1, &mut acc);
        assert_eq!(acc, [10.0; 4]);
    }

    #[test]
    fn test_conv1d_stride() {
        let signal = [1.0, 2.0, 3.0, 4.0, 5.0];
        let mut acc = [0.0; 2];
        conv1d_accumulate(&signal, 5, &[1.0, -1.0], 2, 0, 2, &mut acc);
        assert_eq!(acc, [-1.0, -1.0]);
    }

    #[test]
    fn test_bias_relu() {
        let mut map = [-2.0, 0.5, 3.0];
        bias_activation(&mut map, 1.0, Activation::Relu).unwrap();
        assert_eq!(map, [0.0, 1.5, 4.0]);
        assert_eq!(
            bias_activation(&mut map, 0.0, Activation::Softmax),
            Err(TrickleError::UnsupportedActivation(Activation::Softmax))
        );
    }
}
