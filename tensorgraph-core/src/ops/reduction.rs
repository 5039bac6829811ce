use crate::tensor::Tensor;

/// Spreads a `rows x 1` adjoint across every summed column.
pub(crate) fn row_sum_reverse(input: (usize, usize), adjoint: &Tensor) -> Tensor {
    adjoint.repmat(1, input.1)
}

pub(crate) fn row_mean_reverse(input: (usize, usize), adjoint: &Tensor) -> Tensor {
    let scale = 1.0 / input.1 as f64;
    let mut grad = adjoint.repmat(1, input.1);
    grad.mul_scalar_(scale);
    grad
}

/// Every element of the input contributed once to the scalar.
pub(crate) fn collapse_sum_reverse(input: (usize, usize), adjoint: &Tensor) -> Tensor {
    Tensor::full(input.0, input.1, adjoint.at(0, 0))
}
