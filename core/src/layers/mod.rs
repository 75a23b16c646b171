//! Layer engines and their parameter records.
//!
//! Records are plain per-call values. Each layer module adds its operations
//! to [`Engine`](crate::Engine).

pub mod activations;
pub mod conv;
pub mod conv1d;
pub mod dense;
pub mod depthwise;
pub mod flatten;
pub mod norm;
pub mod pooling;

use crate::config::{Activation, Padding};
use crate::error::{StreamRole, TrickleError, TrickleResult};
use crate::io::Reader;
use crate::store::SequentialStore;

/// Largest kernel side read from a stream; stream kernels are staged in a
/// `MAX_KERNEL × MAX_KERNEL` stack buffer. Memory kernels are borrowed and
/// have no limit.
pub const MAX_KERNEL: usize = 7;

/// Weights and bias of one layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Params<'p> {
    /// Stream names in the engine's store.
    Stream { weights: &'p str, bias: &'p str },
    Memory { weights: &'p [f32], bias: &'p [f32] },
}

impl<'p> Params<'p> {
    /// Open the weight and bias operands. Memory parameters must hold exactly
    /// `weights_len` and `bias_len` values.
    pub(crate) fn open<'x, S>(
        self,
        store: &'x S,
        weights_len: usize,
        bias_len: usize,
    ) -> TrickleResult<(Reader<'x, S>, Reader<'x, S>)>
    where
        'p: 'x,
        S: SequentialStore + 'x,
    {
        match self {
            Self::Stream { weights, bias } => Ok((
                Reader::stream(store, weights, StreamRole::Weights)?,
                Reader::stream(store, bias, StreamRole::Bias)?,
            )),
            Self::Memory { weights, bias } => Ok((
                Reader::exact(weights, weights_len)?,
                Reader::exact(bias, bias_len)?,
            )),
        }
    }

    /// Stream kernels must fit the stack staging buffer.
    pub(crate) fn check_kernel(&self, kernel: usize) -> TrickleResult<()> {
        if matches!(self, Self::Stream { .. }) && kernel > MAX_KERNEL {
            return Err(TrickleError::KernelTooLarge {
                kernel,
                max: MAX_KERNEL,
            });
        }
        Ok(())
    }
}

/// Convolution record (2D dense, 2D depthwise and 1D).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conv<'p> {
    pub kernel: usize,
    pub padding: Padding,
    pub stride: usize,
    pub activation: Activation,
    pub params: Params<'p>,
}

impl<'p> Conv<'p> {
    /// Valid padding, stride 1, ReLU.
    pub const fn new(kernel: usize, params: Params<'p>) -> Self {
        Self {
            kernel,
            padding: Padding::Valid,
            stride: 1,
            activation: Activation::Relu,
            params,
        }
    }

    pub const fn stream(kernel: usize, weights: &'p str, bias: &'p str) -> Self {
        Self::new(kernel, Params::Stream { weights, bias })
    }

    pub const fn memory(kernel: usize, weights: &'p [f32], bias: &'p [f32]) -> Self {
        Self::new(kernel, Params::Memory { weights, bias })
    }

    pub const fn padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    pub const fn stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    pub const fn activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }
}

/// Pooling window applied after a convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pool {
    pub size: usize,
    pub stride: usize,
}

impl Pool {
    /// 1×1 window, stride 1: the map passes through unchanged.
    pub const IDENTITY: Self = Self { size: 1, stride: 1 };

    pub const fn new(size: usize, stride: usize) -> Self {
        Self { size, stride }
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Fully-connected record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dense<'p> {
    pub activation: Activation,
    pub params: Params<'p>,
}

impl<'p> Dense<'p> {
    pub const fn new(activation: Activation, params: Params<'p>) -> Self {
        Self { activation, params }
    }

    pub const fn stream(activation: Activation, weights: &'p str, bias: &'p str) -> Self {
        Self::new(activation, Params::Stream { weights, bias })
    }

    pub const fn memory(activation: Activation, weights: &'p [f32], bias: &'p [f32]) -> Self {
        Self::new(activation, Params::Memory { weights, bias })
    }
}

pub use activations::{find_max, relu, sigmoid, softmax};
pub use norm::{gap, BatchNormParams};
