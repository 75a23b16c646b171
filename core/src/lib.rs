//! # trickle-core: streaming CNN inference for tiny RAM budgets
//!
//! A `no_std` library that runs small convolutional and fully-connected
//! networks on microcontrollers whose RAM is far smaller than a model's
//! activations or weights. Every tensor operand of every layer can live
//! either in a RAM buffer or as a sequential ASCII stream on external
//! storage, and the arithmetic is the same either way.
//!
//! ## Architecture
//!
//! - **Store**: [`SequentialStore`] opens named byte streams ([`DirStore`]
//!   on a filesystem, [`MemStore`] in RAM, [`NoStore`] for none at all).
//! - **Codec**: one value per line, six fractional digits.
//! - **Scratch**: two caller-owned `f32` buffers ([`ScratchPool`]), the only
//!   working memory the engine uses.
//! - **Engine**: [`Engine`] runs one layer per call: [`conv2d`],
//!   [`depthwise_conv2d`], [`conv1d`], [`dense`], pooling, flatten, GAP.
//!   Operands are [`TensorIn`] / [`TensorOut`] values.
//!
//! [`conv2d`]: Engine::conv2d
//! [`depthwise_conv2d`]: Engine::depthwise_conv2d
//! [`conv1d`]: Engine::conv1d
//! [`dense`]: Engine::dense
//!
//! ## Usage
//!
//! ```ignore
//! use trickle_core::*;
//!
//! let store = DirStore::new("/sd");
//! let mut plane = [0.0f32; 28 * 28];
//! let mut accum = [0.0f32; 28 * 28];
//! let mut engine = Engine::new(&store, ScratchPool::new(&mut plane, &mut accum));
//!
//! // Conv 3×3 (1 → 8) + 2×2 pooling, image in RAM, activations on the card.
//! let conv = Conv::stream(3, "w01.txt", "b01.txt");
//! let v = engine.conv2d(TensorIn::U8(&image), 1, TensorOut::Stream("a01.txt"), 8, 28, &conv, &Pool::new(2, 2))?;
//!
//! let mut flat = [0.0f32; 8 * 13 * 13];
//! let n = engine.flatten(TensorIn::Stream("a01.txt"), v, 8, &mut flat)?;
//!
//! let mut scores = [0.0f32; 10];
//! let fc = Dense::stream(Activation::Softmax, "w02.txt", "b02.txt");
//! engine.dense(TensorIn::F32(&flat), n, TensorOut::Memory(&mut scores), 10, &fc)?;
//! let (confidence, class) = find_max(&scores)?;
//! ```

#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod layers;
pub mod math;
pub mod progress;
pub mod scratch;
pub mod store;
pub mod tensor;

pub use config::{Activation, EngineConfig, Padding, PoolMode};
pub use engine::{Engine, ProgressHook};
pub use error::{StoreError, StreamRole, TrickleError, TrickleResult};
pub use io::{Sink, Source, TensorIn, TensorOut};
pub use layers::flatten::flatten_planes;
pub use layers::norm::{batch_norm, batch_norm_relu, gap, BatchNormParams};
pub use layers::pooling::{pool2d_into, pool2d_into_plane};
pub use layers::{find_max, relu, sigmoid, softmax, Conv, Dense, Params, Pool, MAX_KERNEL};
pub use scratch::ScratchPool;
#[cfg(feature = "std")]
pub use store::DirStore;
#[cfg(feature = "alloc")]
pub use store::MemStore;
pub use store::{NoStore, SequentialStore, StreamKey};
pub use tensor::Tensor;
