// src/tensor/mod.rs

use crate::error::TensorGraphError;
use serde::{Deserialize, Serialize};

mod arithmetic;
pub mod create;
mod debug;
mod reduction;
mod view_methods;

pub use create::{full, ones, zeros};

/// A dense 2-D array of `f64` values stored row-major.
///
/// Tensors are values: arithmetic that is not explicitly in-place returns a new
/// `Tensor`. The in-place variants carry a trailing underscore (`add_`,
/// `mul_scalar_`, ...) and return `&mut Self` so calls can be chained.
///
/// Invariant: `rows * columns == data.len()`. Every constructor checks it and
/// deserialization goes through the same check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TensorRecord")]
pub struct Tensor {
    rows: usize,
    columns: usize,
    data: Vec<f64>,
}

/// Unchecked wire form of a [`Tensor`].
#[derive(Deserialize)]
struct TensorRecord {
    rows: usize,
    columns: usize,
    data: Vec<f64>,
}

impl TryFrom<TensorRecord> for Tensor {
    type Error = TensorGraphError;

    fn try_from(record: TensorRecord) -> Result<Self, Self::Error> {
        Tensor::new(record.data, record.rows, record.columns)
    }
}

impl Tensor {
    /// Creates a tensor from a flat row-major buffer.
    pub fn new(data: Vec<f64>, rows: usize, columns: usize) -> Result<Self, TensorGraphError> {
        if rows * columns != data.len() {
            return Err(TensorGraphError::TensorCreationError {
                data_len: data.len(),
                shape: (rows, columns),
            });
        }
        Ok(Tensor {
            rows,
            columns,
            data,
        })
    }

    /// Builds a tensor whose length is known to match. Internal kernels only.
    pub(crate) fn from_parts(data: Vec<f64>, rows: usize, columns: usize) -> Self {
        debug_assert_eq!(rows * columns, data.len());
        Tensor {
            rows,
            columns,
            data,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Returns `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.columns)
    }

    /// Returns the number of elements.
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Read-only view of the row-major buffer.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable view of the row-major buffer.
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Consumes the tensor and returns its buffer.
    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    fn check_index(&self, row: usize, column: usize) -> Result<usize, TensorGraphError> {
        if row >= self.rows || column >= self.columns {
            return Err(TensorGraphError::IndexOutOfBounds {
                index: (row, column),
                shape: self.shape(),
            });
        }
        Ok(row * self.columns + column)
    }

    /// Reads the element at `(row, column)`.
    pub fn get(&self, row: usize, column: usize) -> Result<f64, TensorGraphError> {
        let offset = self.check_index(row, column)?;
        Ok(self.data[offset])
    }

    /// Writes the element at `(row, column)`.
    pub fn set(
        &mut self,
        row: usize,
        column: usize,
        value: f64,
    ) -> Result<&mut Self, TensorGraphError> {
        let offset = self.check_index(row, column)?;
        self.data[offset] = value;
        Ok(self)
    }

    /// Unchecked element read for inner loops whose bounds are already established.
    #[inline]
    pub(crate) fn at(&self, row: usize, column: usize) -> f64 {
        self.data[row * self.columns + column]
    }

    #[inline]
    pub(crate) fn at_mut(&mut self, row: usize, column: usize) -> &mut f64 {
        &mut self.data[row * self.columns + column]
    }

    /// Fails with `ShapeMismatch` unless `other` has the same shape as `self`.
    pub(crate) fn expect_same_shape(
        &self,
        other: &Tensor,
        operation: &str,
    ) -> Result<(), TensorGraphError> {
        if self.shape() != other.shape() {
            return Err(TensorGraphError::shape_mismatch(
                self.shape(),
                other.shape(),
                operation,
            ));
        }
        Ok(())
    }

    /// Checks element-wise closeness within an absolute tolerance.
    pub fn approx_eq(&self, other: &Tensor, tolerance: f64) -> bool {
        self.shape() == other.shape()
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| (a - b).abs() <= tolerance)
    }
}

#[cfg(test)]
#[path = "tensor_test.rs"]
mod tests;
