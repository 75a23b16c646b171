//! Error types for trickle-core.
//!
//! Every engine call returns `TrickleResult<T>` instead of panicking. On a
//! microcontroller a panic halts the device, and a silently wrong stream
//! produces silently wrong classifications, so both store failures and
//! caller-contract violations surface here.

use core::fmt;

use thiserror::Error;

use crate::config::Activation;

/// Which stream of an engine call a store failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRole {
    Input,
    Output,
    Weights,
    Bias,
    /// Streams opened by the tensor helpers outside a layer call.
    Tensor,
}

impl fmt::Display for StreamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Weights => "weights",
            Self::Bias => "bias",
            Self::Tensor => "tensor",
        };
        f.write_str(name)
    }
}

/// Failures reported by a [`SequentialStore`](crate::store::SequentialStore) backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("stream not found")]
    NotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("storage full")]
    Full,
    #[error("no storage backend configured")]
    Unavailable,
    #[error("I/O error")]
    Io,
}

/// All error conditions of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TrickleError {
    #[error("buffer too small: required {required}, available {available}")]
    BufferTooSmall { required: usize, available: usize },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A call needs temp buffer #1 but the pool was built with the accumulator only.
    #[error("input scratch buffer is not configured")]
    MissingScratch,

    #[error("invalid geometry: size {size}, kernel {kernel}, padding {padding}, stride {stride}")]
    InvalidGeometry {
        size: usize,
        kernel: usize,
        padding: usize,
        stride: usize,
    },

    #[error("kernel size {kernel} exceeds the supported maximum {max}")]
    KernelTooLarge { kernel: usize, max: usize },

    #[error("activation {0:?} cannot be applied here")]
    UnsupportedActivation(Activation),

    /// The stream ended where the layout still expected a value.
    #[error("{role} stream ended before the expected value")]
    UnexpectedEof { role: StreamRole },

    #[error("{role} stream: {source}")]
    Store {
        role: StreamRole,
        #[source]
        source: StoreError,
    },

    #[error("empty input")]
    EmptyInput,
}

impl TrickleError {
    pub(crate) fn store(role: StreamRole) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Store { role, source }
    }
}

pub type TrickleResult<T> = Result<T, TrickleError>;
