// Layout operations: reshape, broadcast (tiling), slice, column concat.

use crate::error::TensorGraphError;
use crate::tensor::Tensor;

pub(crate) fn reshape_shape(
    input: (usize, usize),
    rows: usize,
    columns: usize,
) -> Result<(usize, usize), TensorGraphError> {
    if input.0 * input.1 != rows * columns {
        return Err(TensorGraphError::shape_mismatch(input, (rows, columns), "reshape"));
    }
    Ok((rows, columns))
}

pub(crate) fn broadcast_shape(
    input: (usize, usize),
    row_repeat: usize,
    column_repeat: usize,
) -> Result<(usize, usize), TensorGraphError> {
    if row_repeat == 0 || column_repeat == 0 {
        return Err(TensorGraphError::invalid_parameter(
            "broadcast",
            format!(
                "repeat counts must be positive, got ({}, {})",
                row_repeat, column_repeat
            ),
        ));
    }
    Ok((input.0 * row_repeat, input.1 * column_repeat))
}

pub(crate) fn slice_shape(
    input: (usize, usize),
    row: usize,
    column: usize,
    rows: usize,
    columns: usize,
) -> Result<(usize, usize), TensorGraphError> {
    if rows == 0 || columns == 0 {
        return Err(TensorGraphError::invalid_parameter(
            "slice",
            "slices must be at least 1x1",
        ));
    }
    if row + rows > input.0 || column + columns > input.1 {
        return Err(TensorGraphError::IndexOutOfBounds {
            index: (row + rows, column + columns),
            shape: input,
        });
    }
    Ok((rows, columns))
}

pub(crate) fn concat_shape(
    left: (usize, usize),
    right: (usize, usize),
) -> Result<(usize, usize), TensorGraphError> {
    if left.0 != right.0 {
        return Err(TensorGraphError::shape_mismatch((left.0, right.1), right, "concat"));
    }
    Ok((left.0, left.1 + right.1))
}

/// Folds the tiled adjoint back onto the input shape by summing every tile.
pub(crate) fn broadcast_reverse(input: (usize, usize), adjoint: &Tensor) -> Tensor {
    let (rows, columns) = input;
    let mut folded = Tensor::zeros(rows, columns);
    for r in 0..adjoint.rows() {
        for c in 0..adjoint.columns() {
            *folded.at_mut(r % rows, c % columns) += adjoint.at(r, c);
        }
    }
    folded
}

pub(crate) fn slice_reverse(
    input: (usize, usize),
    row: usize,
    column: usize,
    adjoint: &Tensor,
) -> Result<Tensor, TensorGraphError> {
    let mut grad = Tensor::zeros(input.0, input.1);
    grad.blit(adjoint, row, column)?;
    Ok(grad)
}

pub(crate) fn concat_reverse(
    left_columns: usize,
    right_columns: usize,
    adjoint: &Tensor,
) -> Result<Vec<Tensor>, TensorGraphError> {
    let rows = adjoint.rows();
    Ok(vec![
        adjoint.slice(0, 0, rows, left_columns)?,
        adjoint.slice(0, left_columns, rows, right_columns)?,
    ])
}
