// Element-wise unary functions and their derivatives.

use crate::error::TensorGraphError;
use crate::ops::scalar;
use crate::ops::Op;
use crate::tensor::Tensor;

/// Applies the element-wise function of `op`.
///
/// Callers only pass unary element-wise ops; anything else is returned unchanged.
pub(crate) fn unary_forward(op: &Op, x: &Tensor) -> Tensor {
    match op {
        Op::Exp => x.map(f64::exp),
        Op::Log => x.map(f64::ln),
        Op::Invert => x.map(scalar::invert),
        Op::Negate => x.map(|v| -v),
        Op::Abs => x.map(f64::abs),
        Op::Power { exponent } => {
            let n = *exponent;
            x.map(|v| v.powf(n))
        }
        Op::Scale { factor } => x.mul_scalar(*factor),
        Op::Tanh => x.map(f64::tanh),
        Op::Sigmoid => x.map(scalar::sigmoid),
        Op::Relu => x.map(scalar::relu),
        _ => x.clone(),
    }
}

/// Multiplies the adjoint by `f'(x)`.
///
/// Exp, Tanh and Sigmoid read their derivative off the cached forward value
/// `y` instead of re-evaluating the transcendental function.
pub(crate) fn unary_reverse(
    op: &Op,
    x: &Tensor,
    y: &Tensor,
    adjoint: &Tensor,
) -> Result<Tensor, TensorGraphError> {
    match op {
        Op::Exp => adjoint.mul(y),
        Op::Log => adjoint.div(x),
        Op::Invert => adjoint.zip_map(x, |g, v| -g / (v * v)),
        Op::Negate => Ok(adjoint.mul_scalar(-1.0)),
        Op::Abs => adjoint.zip_map(x, |g, v| g * scalar::sign(v)),
        Op::Power { exponent } => {
            let n = *exponent;
            adjoint.zip_map(x, |g, v| g * n * v.powf(n - 1.0))
        }
        Op::Scale { factor } => Ok(adjoint.mul_scalar(*factor)),
        Op::Tanh => adjoint.zip_map(y, |g, t| g * (1.0 - t * t)),
        Op::Sigmoid => adjoint.zip_map(y, |g, s| g * s * (1.0 - s)),
        Op::Relu => adjoint.zip_map(x, |g, v| if v > 0.0 { g } else { 0.0 }),
        other => Err(TensorGraphError::invalid_parameter(
            other.name(),
            "not an element-wise unary operation",
        )),
    }
}
