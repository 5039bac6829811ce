// Element-wise binary operations: Add, Subtract, Multiply, Divide.

use crate::error::TensorGraphError;
use crate::ops::Op;
use crate::tensor::Tensor;

pub(crate) fn binary_forward(op: &Op, a: &Tensor, b: &Tensor) -> Result<Tensor, TensorGraphError> {
    match op {
        Op::Add => a.add(b),
        Op::Subtract => a.sub(b),
        Op::Multiply => a.mul(b),
        Op::Divide => a.div(b),
        other => Err(TensorGraphError::invalid_parameter(
            other.name(),
            "not an element-wise binary operation",
        )),
    }
}

pub(crate) fn binary_reverse(
    op: &Op,
    a: &Tensor,
    b: &Tensor,
    adjoint: &Tensor,
) -> Result<Vec<Tensor>, TensorGraphError> {
    match op {
        Op::Add => Ok(vec![adjoint.clone(), adjoint.clone()]),
        Op::Subtract => Ok(vec![adjoint.clone(), adjoint.mul_scalar(-1.0)]),
        Op::Multiply => Ok(vec![adjoint.mul(b)?, adjoint.mul(a)?]),
        Op::Divide => {
            let grad_a = adjoint.div(b)?;
            // d(a/b)/db = -a / b^2
            let grad_b = adjoint
                .mul(a)?
                .zip_map(b, |g, denom| -g / (denom * denom))?;
            Ok(vec![grad_a, grad_b])
        }
        other => Err(TensorGraphError::invalid_parameter(
            other.name(),
            "not an element-wise binary operation",
        )),
    }
}
