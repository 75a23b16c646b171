//! Vector activations, applied in place to a memory vector.
//!
//! These are terminal operations: [`softmax`] for mutually exclusive classes,
//! [`sigmoid`] for independent per-class scores.

use crate::error::{TrickleError, TrickleResult};

/// `max(0, x)` for every element.
pub fn relu(data: &mut [f32]) {
    for x in data.iter_mut() {
        if *x < 0.0 {
            *x = 0.0;
        }
    }
}

/// `1 / (1 + e^-x)` for every element.
pub fn sigmoid(data: &mut [f32]) {
    for x in data.iter_mut() {
        *x = 1.0 / (1.0 + libm::expf(-*x));
    }
}

/// Normalized exponentials. The maximum is subtracted first so large logits
/// do not overflow. Empty input is left alone.
pub fn softmax(data: &mut [f32]) {
    if data.is_empty() {
        return;
    }
    let max = data.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    for x in data.iter_mut() {
        *x = libm::expf(*x - max);
        sum += *x;
    }
    for x in data.iter_mut() {
        *x /= sum;
    }
}

/// Largest value and its index. Ties keep the first index.
pub fn find_max(data: &[f32]) -> TrickleResult<(f32, usize)> {
    let (&first, rest) = data.split_first().ok_or(TrickleError::EmptyInput)?;
    let mut best = (first, 0);
    for (i, &x) in rest.iter().enumerate() {
        if x > best.0 {
            best = (x, i + 1);
        }
    }
    Ok(best)
}
