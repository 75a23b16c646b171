//! Channel-major tensor addressing.
//!
//! Tensors carry no shape metadata; the caller passes `W` and the channel
//! count on every call. A 2D tensor of `C` channels is `C` stacked `W×W`
//! planes, a 1D tensor `C` stacked runs of length `W`. These helpers compute
//! the plane offsets and hand out borrowed sub-slices, checking the bounds
//! that raw offset arithmetic would not.

use crate::error::{TrickleError, TrickleResult};

/// Number of values in a `channels × w × w` tensor.
#[inline]
pub const fn len_2d(w: usize, channels: usize) -> usize {
    channels * w * w
}

/// Plane `z` of a channel-major `W×W` tensor.
#[inline]
pub fn plane<T>(flat: &[T], w: usize, z: usize) -> TrickleResult<&[T]> {
    run(flat, area(w, flat.len())?, z)
}

#[inline]
pub fn plane_mut<T>(flat: &mut [T], w: usize, z: usize) -> TrickleResult<&mut [T]> {
    let len = area(w, flat.len())?;
    run_mut(flat, len, z)
}

/// Run `z` of a channel-major tensor of length-`w` rows.
#[inline]
pub fn line<T>(flat: &[T], w: usize, z: usize) -> TrickleResult<&[T]> {
    run(flat, w, z)
}

#[inline]
pub fn line_mut<T>(flat: &mut [T], w: usize, z: usize) -> TrickleResult<&mut [T]> {
    run_mut(flat, w, z)
}

fn area(w: usize, available: usize) -> TrickleResult<usize> {
    w.checked_mul(w).ok_or(TrickleError::BufferTooSmall {
        required: usize::MAX,
        available,
    })
}

/// `start..end` of run `z`; an offset past `usize::MAX` can never fit.
fn span(len: usize, z: usize, available: usize) -> TrickleResult<core::ops::Range<usize>> {
    let end = z.checked_add(1).and_then(|n| n.checked_mul(len));
    match end {
        Some(end) => Ok(end - len..end),
        None => Err(TrickleError::BufferTooSmall {
            required: usize::MAX,
            available,
        }),
    }
}

fn run<T>(flat: &[T], len: usize, z: usize) -> TrickleResult<&[T]> {
    let range = span(len, z, flat.len())?;
    let required = range.end;
    flat.get(range).ok_or(TrickleError::BufferTooSmall {
        required,
        available: flat.len(),
    })
}

fn run_mut<T>(flat: &mut [T], len: usize, z: usize) -> TrickleResult<&mut [T]> {
    let available = flat.len();
    let range = span(len, z, available)?;
    let required = range.end;
    flat.get_mut(range).ok_or(TrickleError::BufferTooSmall {
        required,
        available,
    })
}

/// Check that a memory tensor holds at least `required` values.
#[inline]
pub(crate) fn require_len(available: usize, required: usize) -> TrickleResult<()> {
    if available < required {
        return Err(TrickleError::BufferTooSmall {
            required,
            available,
        });
    }
    Ok(())
}

/// Fixed-size `f32` tensor on the stack.
///
/// On targets without an allocator this is the usual home for the tensors
/// kept in RAM between layers. `N` is the total element count; the plane
/// geometry stays with the caller.
#[derive(Debug, Clone)]
pub struct Tensor<const N: usize> {
    data: [f32; N],
}

impl<const N: usize> Tensor<N> {
    pub const fn zeros() -> Self {
        Self { data: [0.0; N] }
    }

    pub fn from_slice(slice: &[f32]) -> TrickleResult<Self> {
        if slice.len() != N {
            return Err(TrickleError::DimensionMismatch {
                expected: N,
                actual: slice.len(),
            });
        }
        let mut data = [0.0; N];
        data.copy_from_slice(slice);
        Ok(Self { data })
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Plane `z` when the tensor holds `W×W` planes.
    pub fn plane(&self, w: usize, z: usize) -> TrickleResult<&[f32]> {
        plane(&self.data, w, z)
    }

    pub fn plane_mut(&mut self, w: usize, z: usize) -> TrickleResult<&mut [f32]> {
        plane_mut(&mut self.data, w, z)
    }

    #[inline(always)]
    pub const fn len(&self) -> usize {
        N
    }

    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }
}

impl<const N: usize> Default for Tensor<N> {
    fn default() -> Self {
        Self::zeros()
    }
}
