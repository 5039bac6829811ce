// src/tensor/create.rs

use crate::error::TensorGraphError;
use crate::tensor::Tensor;
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

/// Creates a new tensor filled with zeros.
pub fn zeros(rows: usize, columns: usize) -> Tensor {
    full(rows, columns, 0.0)
}

/// Creates a new tensor filled with ones.
pub fn ones(rows: usize, columns: usize) -> Tensor {
    full(rows, columns, 1.0)
}

/// Creates a new tensor filled with `value`.
pub fn full(rows: usize, columns: usize, value: f64) -> Tensor {
    Tensor::from_parts(vec![value; rows * columns], rows, columns)
}

impl Tensor {
    pub fn zeros(rows: usize, columns: usize) -> Tensor {
        zeros(rows, columns)
    }

    pub fn ones(rows: usize, columns: usize) -> Tensor {
        ones(rows, columns)
    }

    pub fn full(rows: usize, columns: usize, value: f64) -> Tensor {
        full(rows, columns, value)
    }

    /// Creates a zero tensor with the same shape as `self`.
    pub fn zeros_like(&self) -> Tensor {
        zeros(self.rows(), self.columns())
    }

    /// Creates a tensor from literal rows.
    ///
    /// Every row must have the same length; an empty slice yields a `0 x 0` tensor.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Tensor, TensorGraphError> {
        let columns = rows.first().map_or(0, |r| r.as_ref().len());
        let mut data = Vec::with_capacity(rows.len() * columns);
        for row in rows {
            let row = row.as_ref();
            if row.len() != columns {
                return Err(TensorGraphError::TensorCreationError {
                    data_len: row.len(),
                    shape: (1, columns),
                });
            }
            data.extend_from_slice(row);
        }
        Tensor::new(data, rows.len(), columns)
    }

    /// Creates a `1 x n` row vector.
    pub fn row_vector(values: &[f64]) -> Tensor {
        Tensor::from_parts(values.to_vec(), 1, values.len())
    }

    /// Creates an `n x 1` column vector.
    pub fn column_vector(values: &[f64]) -> Tensor {
        Tensor::from_parts(values.to_vec(), values.len(), 1)
    }

    /// Creates a tensor with values drawn uniformly from `[low, high)`.
    pub fn random_uniform<R: Rng + ?Sized>(
        rows: usize,
        columns: usize,
        low: f64,
        high: f64,
        rng: &mut R,
    ) -> Result<Tensor, TensorGraphError> {
        if !(low < high) {
            return Err(TensorGraphError::invalid_parameter(
                "random_uniform",
                format!("low ({}) must be below high ({})", low, high),
            ));
        }
        let dist = Uniform::new(low, high);
        let data = (0..rows * columns).map(|_| dist.sample(rng)).collect();
        Ok(Tensor::from_parts(data, rows, columns))
    }

    /// Creates a tensor with values drawn from `N(mean, std_dev^2)`.
    pub fn random_normal<R: Rng + ?Sized>(
        rows: usize,
        columns: usize,
        mean: f64,
        std_dev: f64,
        rng: &mut R,
    ) -> Result<Tensor, TensorGraphError> {
        let dist = Normal::new(mean, std_dev).map_err(|e| {
            TensorGraphError::invalid_parameter("random_normal", e.to_string())
        })?;
        let data = (0..rows * columns).map(|_| dist.sample(rng)).collect();
        Ok(Tensor::from_parts(data, rows, columns))
    }
}
