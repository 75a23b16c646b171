//! Engine-wide configuration and the small enums shared by layer records.
//!
//! With the `serde` feature these derive `Serialize`/`Deserialize`, so host
//! tooling can keep layer settings in a config file next to the exported
//! weight streams.

/// Activation applied after the bias of a layer.
///
/// `Softmax` is a whole-vector operation and is only accepted by the
/// fully-connected engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Activation {
    None,
    #[default]
    Relu,
    Softmax,
}

/// Symmetric convolution padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Padding {
    /// No padding.
    #[default]
    Valid,
    /// `(K - 1) / 2` on every side; preserves the size at stride 1 for odd `K`.
    Same,
    /// Explicit amount on every side.
    Explicit(usize),
}

impl Padding {
    /// Resolve to the number of zero rows/columns added on each side.
    #[inline]
    pub const fn resolve(self, kernel: usize) -> usize {
        match self {
            Self::Valid => 0,
            Self::Same => kernel.saturating_sub(1) / 2,
            Self::Explicit(p) => p,
        }
    }
}

/// Reduction used by every pooling window of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PoolMode {
    Max,
    #[default]
    Mean,
}

/// Settings fixed for the lifetime of an [`Engine`](crate::Engine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    pub pool_mode: PoolMode,
}

impl EngineConfig {
    pub const fn new(pool_mode: PoolMode) -> Self {
        Self { pool_mode }
    }
}
