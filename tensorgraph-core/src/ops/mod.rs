//! # Operation catalog (`ops`)
//!
//! Every node of a [`Graph`](crate::autograd::Graph) carries one [`Op`]. The
//! catalog is closed: adding an operation means adding a variant here, and the
//! compiler then points at every `match` that has to learn about it (shape
//! inference, forward, reverse, the parallel backend's kernel binding).
//!
//! ## Structure:
//!
//! - [`arithmetic`]: element-wise binary operations (add, subtract, multiply, divide).
//! - [`activation`]: element-wise unary functions (exp, log, tanh, sigmoid, ...).
//! - [`linalg`]: matrix product and transpose.
//! - [`view`]: reshape, broadcast, slice, concat.
//! - [`conv`]: strided 2-D convolution and deconvolution with implicit zero padding.
//! - [`reduction`]: row sums, row means, collapse to a scalar.
//! - [`stochastic`]: dropout, gaussian noise, bernoulli sampling.
//! - [`loss`]: softmax and sigmoid nodes with fused cross-entropy adjoints.
//! - [`scalar`]: scalar kernels generic over `num_traits::Float`, shared with
//!   the f32 device kernels of the parallel backend.
//!
//! Each submodule exposes `*_forward` / `*_reverse` functions. `reverse`
//! receives the forward inputs, the node's own forward value, the recorded
//! stochastic mask (if any) and the output adjoint, and returns one adjoint per
//! input, in input order.

use crate::error::TensorGraphError;
use crate::parameter::ParamId;
use crate::tensor::Tensor;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub mod activation;
pub mod arithmetic;
pub mod conv;
pub mod linalg;
pub mod loss;
pub mod reduction;
pub mod scalar;
pub mod stochastic;
pub mod view;

/// The closed set of node kinds.
///
/// Variants with fields carry the non-structural parameters of the node; they
/// are what serialization writes next to the input ids and shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Op {
    // --- Leaves ---
    /// Bound externally for each evaluation.
    Input,
    /// Reads a trainable tensor from a [`ParamStore`](crate::parameter::ParamStore).
    Variable { param: ParamId },
    /// A fixed scalar broadcast to the node's shape.
    Constant { value: f64 },

    // --- Element-wise binary ---
    Add,
    Subtract,
    Multiply,
    Divide,

    // --- Linear algebra ---
    MatMul,
    Transpose,

    // --- Element-wise unary ---
    Exp,
    Log,
    Invert,
    Negate,
    Abs,
    Power { exponent: f64 },
    Scale { factor: f64 },
    Tanh,
    Sigmoid,
    Relu,

    // --- Layout ---
    Reshape { rows: usize, columns: usize },
    Broadcast { row_repeat: usize, column_repeat: usize },
    Slice { row: usize, column: usize, rows: usize, columns: usize },
    Concat,

    // --- Convolution ---
    /// Inputs: the image followed by one or more equally shaped kernels.
    Convolution { stride_rows: usize, stride_columns: usize },
    /// Inputs: the image followed by one or more equally shaped kernels.
    Deconvolution { stride_rows: usize, stride_columns: usize },

    // --- Reductions ---
    RowSum,
    RowMean,
    CollapseSum,

    // --- Stochastic ---
    Dropout { rate: f64 },
    GaussianNoise { std_dev: f64 },
    Sample,

    // --- Loss-fused ---
    /// Inputs: logits, target.
    SoftmaxLoss,
    /// Inputs: logits, target.
    SigmoidLoss,
}

/// Result of a forward rule: the node value and, for stochastic nodes, the
/// mask that was sampled so the reverse pass can reuse it.
#[derive(Debug)]
pub(crate) struct Forward {
    pub value: Tensor,
    pub mask: Option<Tensor>,
}

impl Forward {
    fn plain(value: Tensor) -> Self {
        Forward { value, mask: None }
    }
}

enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Op {
    /// Short, stable name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Op::Input => "input",
            Op::Variable { .. } => "variable",
            Op::Constant { .. } => "constant",
            Op::Add => "add",
            Op::Subtract => "subtract",
            Op::Multiply => "multiply",
            Op::Divide => "divide",
            Op::MatMul => "matmul",
            Op::Transpose => "transpose",
            Op::Exp => "exp",
            Op::Log => "log",
            Op::Invert => "invert",
            Op::Negate => "negate",
            Op::Abs => "abs",
            Op::Power { .. } => "power",
            Op::Scale { .. } => "scale",
            Op::Tanh => "tanh",
            Op::Sigmoid => "sigmoid",
            Op::Relu => "relu",
            Op::Reshape { .. } => "reshape",
            Op::Broadcast { .. } => "broadcast",
            Op::Slice { .. } => "slice",
            Op::Concat => "concat",
            Op::Convolution { .. } => "convolution",
            Op::Deconvolution { .. } => "deconvolution",
            Op::RowSum => "row_sum",
            Op::RowMean => "row_mean",
            Op::CollapseSum => "collapse_sum",
            Op::Dropout { .. } => "dropout",
            Op::GaussianNoise { .. } => "gaussian_noise",
            Op::Sample => "sample",
            Op::SoftmaxLoss => "softmax_loss",
            Op::SigmoidLoss => "sigmoid_loss",
        }
    }

    /// True for nodes without inputs: Input, Variable, Constant.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Op::Input | Op::Variable { .. } | Op::Constant { .. })
    }

    /// True for nodes that draw random numbers during forward evaluation.
    pub fn is_stochastic(&self) -> bool {
        matches!(
            self,
            Op::Dropout { .. } | Op::GaussianNoise { .. } | Op::Sample
        )
    }

    fn arity(&self) -> Arity {
        match self {
            Op::Input | Op::Variable { .. } | Op::Constant { .. } => Arity::Exact(0),
            Op::Add
            | Op::Subtract
            | Op::Multiply
            | Op::Divide
            | Op::MatMul
            | Op::Concat
            | Op::SoftmaxLoss
            | Op::SigmoidLoss => Arity::Exact(2),
            Op::Convolution { .. } | Op::Deconvolution { .. } => Arity::AtLeast(2),
            _ => Arity::Exact(1),
        }
    }

    /// Validates the op's parameters against its input shapes and returns the
    /// output shape. Called once, when the node is constructed.
    pub(crate) fn infer_shape(
        &self,
        inputs: &[(usize, usize)],
    ) -> Result<(usize, usize), TensorGraphError> {
        match self.arity() {
            Arity::Exact(0) => {
                return Err(TensorGraphError::invalid_parameter(
                    self.name(),
                    "leaf nodes take their shape from the builder, not from inputs",
                ))
            }
            Arity::Exact(n) if inputs.len() != n => {
                return Err(TensorGraphError::invalid_parameter(
                    self.name(),
                    format!("expected {} inputs, got {}", n, inputs.len()),
                ))
            }
            Arity::AtLeast(n) if inputs.len() < n => {
                return Err(TensorGraphError::invalid_parameter(
                    self.name(),
                    format!("expected at least {} inputs, got {}", n, inputs.len()),
                ))
            }
            _ => {}
        }

        let first = inputs[0];
        match self {
            Op::Input | Op::Variable { .. } | Op::Constant { .. } => {
                unreachable!("leaf arity handled above")
            }
            Op::Add
            | Op::Subtract
            | Op::Multiply
            | Op::Divide
            | Op::SoftmaxLoss
            | Op::SigmoidLoss => {
                if inputs[1] != first {
                    return Err(TensorGraphError::shape_mismatch(
                        first,
                        inputs[1],
                        self.name(),
                    ));
                }
                Ok(first)
            }
            Op::MatMul => linalg::matmul_shape(first, inputs[1]),
            Op::Transpose => Ok((first.1, first.0)),
            Op::Exp
            | Op::Log
            | Op::Invert
            | Op::Negate
            | Op::Abs
            | Op::Tanh
            | Op::Sigmoid
            | Op::Relu
            | Op::Sample => Ok(first),
            Op::Power { exponent } => {
                if !exponent.is_finite() {
                    return Err(TensorGraphError::invalid_parameter(
                        self.name(),
                        format!("exponent must be finite, got {}", exponent),
                    ));
                }
                Ok(first)
            }
            Op::Scale { factor } => {
                if !factor.is_finite() {
                    return Err(TensorGraphError::invalid_parameter(
                        self.name(),
                        format!("factor must be finite, got {}", factor),
                    ));
                }
                Ok(first)
            }
            Op::Reshape { rows, columns } => view::reshape_shape(first, *rows, *columns),
            Op::Broadcast {
                row_repeat,
                column_repeat,
            } => view::broadcast_shape(first, *row_repeat, *column_repeat),
            Op::Slice {
                row,
                column,
                rows,
                columns,
            } => view::slice_shape(first, *row, *column, *rows, *columns),
            Op::Concat => view::concat_shape(first, inputs[1]),
            Op::Convolution {
                stride_rows,
                stride_columns,
            } => conv::convolution_shape(first, &inputs[1..], *stride_rows, *stride_columns),
            Op::Deconvolution {
                stride_rows,
                stride_columns,
            } => conv::deconvolution_shape(first, &inputs[1..], *stride_rows, *stride_columns),
            Op::RowSum | Op::RowMean => Ok((first.0, 1)),
            Op::CollapseSum => Ok((1, 1)),
            Op::Dropout { rate } => {
                if !(0.0..1.0).contains(rate) {
                    return Err(TensorGraphError::invalid_parameter(
                        self.name(),
                        format!("rate must lie in [0, 1), got {}", rate),
                    ));
                }
                Ok(first)
            }
            Op::GaussianNoise { std_dev } => {
                if !(std_dev.is_finite() && *std_dev >= 0.0) {
                    return Err(TensorGraphError::invalid_parameter(
                        self.name(),
                        format!("std_dev must be finite and non-negative, got {}", std_dev),
                    ));
                }
                Ok(first)
            }
        }
    }

    /// Computes the node value from its inputs' forward values.
    ///
    /// `stochastic` is false during inference: stochastic nodes then behave
    /// deterministically (see [`stochastic`]).
    pub(crate) fn forward<R: Rng + ?Sized>(
        &self,
        inputs: &[&Tensor],
        rng: &mut R,
        stochastic: bool,
    ) -> Result<Forward, TensorGraphError> {
        let value = match self {
            Op::Input | Op::Variable { .. } | Op::Constant { .. } => {
                return Err(TensorGraphError::invalid_parameter(
                    self.name(),
                    "leaf values are supplied by the graph",
                ))
            }
            Op::Add | Op::Subtract | Op::Multiply | Op::Divide => {
                arithmetic::binary_forward(self, inputs[0], inputs[1])?
            }
            Op::MatMul => linalg::matmul_forward(inputs[0], inputs[1])?,
            Op::Transpose => inputs[0].transpose(),
            Op::Exp
            | Op::Log
            | Op::Invert
            | Op::Negate
            | Op::Abs
            | Op::Power { .. }
            | Op::Scale { .. }
            | Op::Tanh
            | Op::Sigmoid
            | Op::Relu => activation::unary_forward(self, inputs[0]),
            Op::Reshape { rows, columns } => inputs[0].reshape(*rows, *columns)?,
            Op::Broadcast {
                row_repeat,
                column_repeat,
            } => inputs[0].repmat(*row_repeat, *column_repeat),
            Op::Slice {
                row,
                column,
                rows,
                columns,
            } => inputs[0].slice(*row, *column, *rows, *columns)?,
            Op::Concat => inputs[0].concat_columns(inputs[1])?,
            Op::Convolution {
                stride_rows,
                stride_columns,
            } => conv::convolution_forward(inputs[0], &inputs[1..], *stride_rows, *stride_columns),
            Op::Deconvolution {
                stride_rows,
                stride_columns,
            } => {
                conv::deconvolution_forward(inputs[0], &inputs[1..], *stride_rows, *stride_columns)
            }
            Op::RowSum => inputs[0].row_sum(),
            Op::RowMean => inputs[0].row_mean(),
            Op::CollapseSum => Tensor::full(1, 1, inputs[0].sum()),
            Op::Dropout { rate } => {
                return Ok(stochastic::dropout_forward(inputs[0], *rate, rng, stochastic))
            }
            Op::GaussianNoise { std_dev } => {
                return stochastic::noise_forward(inputs[0], *std_dev, rng, stochastic)
            }
            Op::Sample => return Ok(stochastic::sample_forward(inputs[0], rng, stochastic)),
            Op::SoftmaxLoss => loss::softmax_forward(inputs[0]),
            Op::SigmoidLoss => activation::unary_forward(&Op::Sigmoid, inputs[0]),
        };
        Ok(Forward::plain(value))
    }

    /// Vector-Jacobian product: one adjoint per input, in input order.
    pub(crate) fn reverse(
        &self,
        inputs: &[&Tensor],
        output: &Tensor,
        mask: Option<&Tensor>,
        adjoint: &Tensor,
    ) -> Result<Vec<Tensor>, TensorGraphError> {
        match self {
            Op::Input | Op::Variable { .. } | Op::Constant { .. } => Ok(Vec::new()),
            Op::Add | Op::Subtract | Op::Multiply | Op::Divide => {
                arithmetic::binary_reverse(self, inputs[0], inputs[1], adjoint)
            }
            Op::MatMul => linalg::matmul_reverse(inputs[0], inputs[1], adjoint),
            Op::Transpose => Ok(vec![adjoint.transpose()]),
            Op::Exp
            | Op::Log
            | Op::Invert
            | Op::Negate
            | Op::Abs
            | Op::Power { .. }
            | Op::Scale { .. }
            | Op::Tanh
            | Op::Sigmoid
            | Op::Relu => Ok(vec![activation::unary_reverse(
                self, inputs[0], output, adjoint,
            )?]),
            Op::Reshape { .. } => Ok(vec![adjoint.reshape(inputs[0].rows(), inputs[0].columns())?]),
            Op::Broadcast { .. } => Ok(vec![view::broadcast_reverse(inputs[0].shape(), adjoint)]),
            Op::Slice { row, column, .. } => Ok(vec![view::slice_reverse(
                inputs[0].shape(),
                *row,
                *column,
                adjoint,
            )?]),
            Op::Concat => view::concat_reverse(inputs[0].columns(), inputs[1].columns(), adjoint),
            Op::Convolution {
                stride_rows,
                stride_columns,
            } => Ok(conv::convolution_reverse(
                inputs[0],
                &inputs[1..],
                *stride_rows,
                *stride_columns,
                adjoint,
            )),
            Op::Deconvolution {
                stride_rows,
                stride_columns,
            } => Ok(conv::deconvolution_reverse(
                inputs[0],
                &inputs[1..],
                *stride_rows,
                *stride_columns,
                adjoint,
            )),
            Op::RowSum => Ok(vec![reduction::row_sum_reverse(inputs[0].shape(), adjoint)]),
            Op::RowMean => Ok(vec![reduction::row_mean_reverse(inputs[0].shape(), adjoint)]),
            Op::CollapseSum => Ok(vec![reduction::collapse_sum_reverse(
                inputs[0].shape(),
                adjoint,
            )]),
            Op::Dropout { .. } => Ok(vec![stochastic::dropout_reverse(mask, adjoint)?]),
            Op::GaussianNoise { .. } => Ok(vec![adjoint.clone()]),
            Op::Sample => Ok(vec![inputs[0].zeros_like()]),
            Op::SoftmaxLoss | Op::SigmoidLoss => loss::fused_reverse(output, inputs[1]),
        }
    }
}

#[cfg(test)]
#[path = "ops_test.rs"]
mod tests;
