use crate::error::TensorGraphError;
use crate::tensor::Tensor;

pub(crate) fn matmul_shape(
    a: (usize, usize),
    b: (usize, usize),
) -> Result<(usize, usize), TensorGraphError> {
    if a.1 != b.0 {
        return Err(TensorGraphError::shape_mismatch((a.1, b.1), b, "matmul"));
    }
    Ok((a.0, b.1))
}

pub(crate) fn matmul_forward(a: &Tensor, b: &Tensor) -> Result<Tensor, TensorGraphError> {
    a.matmul(b)
}

/// `dA = adj · Bᵗ`, `dB = Aᵗ · adj`.
pub(crate) fn matmul_reverse(
    a: &Tensor,
    b: &Tensor,
    adjoint: &Tensor,
) -> Result<Vec<Tensor>, TensorGraphError> {
    let grad_a = adjoint.matmul(&b.transpose())?;
    let grad_b = a.transpose().matmul(adjoint)?;
    Ok(vec![grad_a, grad_b])
}
