// src/tensor/reduction.rs

use crate::tensor::Tensor;

impl Tensor {
    /// Sums across columns, producing a `rows x 1` tensor.
    pub fn row_sum(&self) -> Tensor {
        let columns = self.columns();
        let data = (0..self.rows())
            .map(|r| self.data()[r * columns..(r + 1) * columns].iter().sum())
            .collect();
        Tensor::from_parts(data, self.rows(), 1)
    }

    /// Averages across columns, producing a `rows x 1` tensor.
    pub fn row_mean(&self) -> Tensor {
        let columns = self.columns() as f64;
        let mut sums = self.row_sum();
        sums.map_(|s| s / columns);
        sums
    }

    /// Sums down each column, producing a `1 x columns` tensor.
    pub fn column_sum(&self) -> Tensor {
        let mut data = vec![0.0; self.columns()];
        for r in 0..self.rows() {
            for (c, acc) in data.iter_mut().enumerate() {
                *acc += self.at(r, c);
            }
        }
        Tensor::from_parts(data, 1, self.columns())
    }

    /// Sum of every element.
    pub fn sum(&self) -> f64 {
        self.data().iter().sum()
    }

    /// Mean of every element; `NaN` for an empty tensor.
    pub fn mean(&self) -> f64 {
        self.sum() / self.numel() as f64
    }

    /// Smallest element, or `None` for an empty tensor.
    pub fn min(&self) -> Option<f64> {
        self.data().iter().copied().reduce(f64::min)
    }

    /// Largest element, or `None` for an empty tensor.
    pub fn max(&self) -> Option<f64> {
        self.data().iter().copied().reduce(f64::max)
    }
}
