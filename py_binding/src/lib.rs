//! Python bindings for trickle-core via PyO3.
//!
//! Host-side twin of the device engine: the same layer calls over a
//! directory of ASCII streams, used to validate exported weights before they
//! are copied to a card.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use trickle_core::math;
use trickle_core::{
    find_max, softmax, Activation, Conv, Dense, DirStore, Engine, EngineConfig, Padding, Params,
    Pool, PoolMode, ScratchPool, TensorIn, TensorOut, TrickleError, TrickleResult,
};

fn to_py_err(e: TrickleError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// A tensor operand: a stream name or a list of values.
#[derive(FromPyObject)]
enum PyTensor {
    Name(String),
    Values(Vec<f32>),
}

impl PyTensor {
    fn input(&self, per_channel: bool) -> TensorIn<'_> {
        match self {
            Self::Name(name) if per_channel => TensorIn::Channels(name),
            Self::Name(name) => TensorIn::Stream(name),
            Self::Values(values) => TensorIn::F32(values),
        }
    }
}

fn params<'p>(weights: &'p PyTensor, bias: &'p PyTensor) -> PyResult<Params<'p>> {
    match (weights, bias) {
        (PyTensor::Name(w), PyTensor::Name(b)) => Ok(Params::Stream { weights: w, bias: b }),
        (PyTensor::Values(w), PyTensor::Values(b)) => Ok(Params::Memory { weights: w, bias: b }),
        _ => Err(PyValueError::new_err(
            "weights and bias must both be stream names or both be value lists",
        )),
    }
}

fn activation(name: &str) -> PyResult<Activation> {
    match name {
        "none" | "linear" => Ok(Activation::None),
        "relu" => Ok(Activation::Relu),
        "softmax" => Ok(Activation::Softmax),
        _ => Err(PyValueError::new_err(format!("unknown activation {name:?}"))),
    }
}

fn padding(name: &str, amount: usize) -> PyResult<Padding> {
    match name {
        "valid" => Ok(Padding::Valid),
        "same" => Ok(Padding::Same),
        "explicit" => Ok(Padding::Explicit(amount)),
        _ => Err(PyValueError::new_err(format!("unknown padding {name:?}"))),
    }
}

/// Streaming engine over a directory of value streams.
#[pyclass]
pub struct PyEngine {
    store: DirStore,
    input: Vec<f32>,
    accum: Vec<f32>,
    config: EngineConfig,
}

impl PyEngine {
    /// Run one layer call, writing either to `output` or to a returned list
    /// of `len` values.
    fn run<F>(&mut self, output: Option<&str>, per_channel: bool, len: usize, layer: F) -> PyResult<(usize, Vec<f32>)>
    where
        F: FnOnce(&mut Engine<'_, DirStore>, TensorOut<'_>) -> TrickleResult<usize>,
    {
        let scratch = if self.input.is_empty() {
            ScratchPool::accumulator_only(&mut self.accum)
        } else {
            ScratchPool::new(&mut self.input, &mut self.accum)
        };
        let mut engine = Engine::new(&self.store, scratch).with_config(self.config);
        match output {
            Some(name) => {
                let out = if per_channel { TensorOut::Channels(name) } else { TensorOut::Stream(name) };
                let size = layer(&mut engine, out).map_err(to_py_err)?;
                Ok((size, Vec::new()))
            }
            None => {
                let mut values = vec![0.0f32; len];
                let size = layer(&mut engine, TensorOut::Memory(&mut values)).map_err(to_py_err)?;
                Ok((size, values))
            }
        }
    }

    fn conv_len(w: usize, n_outputs: usize, conv: &Conv<'_>, pool: &Pool) -> PyResult<usize> {
        let v = math::check_conv_2d(w, conv.kernel, conv.padding.resolve(conv.kernel), conv.stride).map_err(to_py_err)?;
        let wo = math::check_pool(v, pool.size, pool.stride).map_err(to_py_err)?;
        Ok(n_outputs * wo * wo)
    }
}

#[pymethods]
impl PyEngine {
    #[new]
    #[pyo3(signature = (root, input_scratch, accum_scratch, pool_mode = "mean"))]
    fn new(root: &str, input_scratch: usize, accum_scratch: usize, pool_mode: &str) -> PyResult<Self> {
        let pool_mode = match pool_mode {
            "mean" | "avg" => PoolMode::Mean,
            "max" => PoolMode::Max,
            _ => return Err(PyValueError::new_err(format!("unknown pool mode {pool_mode:?}"))),
        };
        Ok(Self {
            store: DirStore::new(root),
            input: vec![0.0; input_scratch],
            accum: vec![0.0; accum_scratch],
            config: EngineConfig::new(pool_mode),
        })
    }

    fn write_tensor(&mut self, name: &str, values: Vec<f32>) -> PyResult<()> {
        let engine = Engine::new(&self.store, ScratchPool::accumulator_only(&mut self.accum));
        engine.write_tensor(name, &values).map_err(to_py_err)
    }

    fn read_tensor(&mut self, name: &str, len: usize) -> PyResult<Vec<f32>> {
        let engine = Engine::new(&self.store, ScratchPool::accumulator_only(&mut self.accum));
        let mut values = vec![0.0f32; len];
        engine.read_tensor(name, &mut values).map_err(to_py_err)?;
        Ok(values)
    }

    #[pyo3(signature = (name, channels = None))]
    fn remove(&mut self, name: &str, channels: Option<usize>) -> PyResult<()> {
        let engine = Engine::new(&self.store, ScratchPool::accumulator_only(&mut self.accum));
        match channels {
            Some(n) => engine.remove_channels(name, n),
            None => engine.remove(name),
        }
        .map_err(to_py_err)
    }

    /// 2D convolution (dense or depthwise). Returns `(pooled_size, values)`;
    /// `values` is empty when `output` names a stream.
    #[pyo3(signature = (
        input, n_inputs, n_outputs, w, kernel, weights, bias,
        output = None, padding_mode = "valid", padding_amount = 0, stride = 1,
        act = "relu", pool = 1, pool_stride = 1, depthwise = false, per_channel = false
    ))]
    #[allow(clippy::too_many_arguments)]
    fn conv2d(
        &mut self,
        input: PyTensor,
        n_inputs: usize,
        n_outputs: usize,
        w: usize,
        kernel: usize,
        weights: PyTensor,
        bias: PyTensor,
        output: Option<&str>,
        padding_mode: &str,
        padding_amount: usize,
        stride: usize,
        act: &str,
        pool: usize,
        pool_stride: usize,
        depthwise: bool,
        per_channel: bool,
    ) -> PyResult<(usize, Vec<f32>)> {
        let conv = Conv::new(kernel, params(&weights, &bias)?)
            .padding(padding(padding_mode, padding_amount)?)
            .stride(stride)
            .activation(activation(act)?);
        let pool = Pool::new(pool, pool_stride);
        let len = Self::conv_len(w, n_outputs, &conv, &pool)?;
        let input = input.input(per_channel);
        self.run(output, per_channel, len, |engine, out| {
            if depthwise {
                engine.depthwise_conv2d(input, n_inputs, out, n_outputs, w, &conv, &pool)
            } else {
                engine.conv2d(input, n_inputs, out, n_outputs, w, &conv, &pool)
            }
        })
    }

    /// 1D convolution over `n_inputs` signals of length `w`.
    #[pyo3(signature = (
        input, n_inputs, n_outputs, w, kernel, weights, bias,
        output = None, padding_mode = "valid", padding_amount = 0, stride = 1,
        act = "relu", pool = 1, pool_stride = 1, per_channel = false
    ))]
    #[allow(clippy::too_many_arguments)]
    fn conv1d(
        &mut self,
        input: PyTensor,
        n_inputs: usize,
        n_outputs: usize,
        w: usize,
        kernel: usize,
        weights: PyTensor,
        bias: PyTensor,
        output: Option<&str>,
        padding_mode: &str,
        padding_amount: usize,
        stride: usize,
        act: &str,
        pool: usize,
        pool_stride: usize,
        per_channel: bool,
    ) -> PyResult<(usize, Vec<f32>)> {
        let conv = Conv::new(kernel, params(&weights, &bias)?)
            .padding(padding(padding_mode, padding_amount)?)
            .stride(stride)
            .activation(activation(act)?);
        let pool = Pool::new(pool, pool_stride);
        let v = math::check_conv(w, kernel, conv.padding.resolve(kernel), stride).map_err(to_py_err)?;
        let wo = math::check_pool(v, pool.size, pool.stride).map_err(to_py_err)?;
        let input = input.input(per_channel);
        self.run(output, per_channel, n_outputs * wo, |engine, out| {
            engine.conv1d(input, n_inputs, out, n_outputs, w, &conv, &pool)
        })
    }

    /// Fully-connected layer. Returns `(n_outputs, values)`.
    #[pyo3(signature = (input, n_inputs, n_outputs, weights, bias, output = None, act = "relu"))]
    #[allow(clippy::too_many_arguments)]
    fn dense(
        &mut self,
        input: PyTensor,
        n_inputs: usize,
        n_outputs: usize,
        weights: PyTensor,
        bias: PyTensor,
        output: Option<&str>,
        act: &str,
    ) -> PyResult<(usize, Vec<f32>)> {
        let fc = Dense::new(activation(act)?, params(&weights, &bias)?);
        let input = input.input(false);
        self.run(output, false, n_outputs, |engine, out| {
            engine.dense(input, n_inputs, out, n_outputs, &fc)
        })
    }

    #[pyo3(signature = (input, v, channels, per_channel = false))]
    fn flatten(&mut self, input: PyTensor, v: usize, channels: usize, per_channel: bool) -> PyResult<Vec<f32>> {
        let engine = Engine::new(&self.store, ScratchPool::accumulator_only(&mut self.accum));
        let mut out = vec![0.0f32; v * v * channels];
        engine.flatten(input.input(per_channel), v, channels, &mut out).map_err(to_py_err)?;
        Ok(out)
    }

    #[pyo3(signature = (input, v, channels, per_channel = false))]
    fn gap(&mut self, input: PyTensor, v: usize, channels: usize, per_channel: bool) -> PyResult<Vec<f32>> {
        let engine = Engine::new(&self.store, ScratchPool::accumulator_only(&mut self.accum));
        let mut out = vec![0.0f32; channels];
        engine.gap(input.input(per_channel), v, channels, &mut out).map_err(to_py_err)?;
        Ok(out)
    }
}

#[pyfunction]
fn softmax_values(mut values: Vec<f32>) -> Vec<f32> {
    softmax(&mut values);
    values
}

/// `(value, index)` of the first maximum.
#[pyfunction]
fn argmax(values: Vec<f32>) -> PyResult<(f32, usize)> {
    find_max(&values).map_err(to_py_err)
}

#[pymodule]
fn trickle_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyEngine>()?;
    m.add_function(wrap_pyfunction!(softmax_values, m)?)?;
    m.add_function(wrap_pyfunction!(argmax, m)?)?;
    Ok(())
}
