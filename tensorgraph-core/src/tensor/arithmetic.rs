// src/tensor/arithmetic.rs

use crate::error::TensorGraphError;
use crate::tensor::Tensor;

impl Tensor {
    // --- Generic element-wise application ---

    /// Applies `f` to every element, returning a new tensor.
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Tensor {
        let data = self.data().iter().map(|&x| f(x)).collect();
        Tensor::from_parts(data, self.rows(), self.columns())
    }

    /// Applies `f` to every element in place.
    pub fn map_<F: Fn(f64) -> f64>(&mut self, f: F) -> &mut Self {
        self.data_mut().iter_mut().for_each(|x| *x = f(*x));
        self
    }

    /// Combines two equally shaped tensors element by element.
    pub fn zip_map<F: Fn(f64, f64) -> f64>(
        &self,
        other: &Tensor,
        f: F,
    ) -> Result<Tensor, TensorGraphError> {
        self.expect_same_shape(other, "zip_map")?;
        let data = self
            .data()
            .iter()
            .zip(other.data().iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        Ok(Tensor::from_parts(data, self.rows(), self.columns()))
    }

    /// In-place form of [`Tensor::zip_map`]; `self` receives the result.
    pub fn zip_map_<F: Fn(f64, f64) -> f64>(
        &mut self,
        other: &Tensor,
        f: F,
    ) -> Result<&mut Self, TensorGraphError> {
        self.expect_same_shape(other, "zip_map_")?;
        self.data_mut()
            .iter_mut()
            .zip(other.data().iter())
            .for_each(|(a, &b)| *a = f(*a, b));
        Ok(self)
    }

    // --- Element-wise binary arithmetic ---

    pub fn add(&self, other: &Tensor) -> Result<Tensor, TensorGraphError> {
        self.zip_map(other, |a, b| a + b)
            .map_err(|e| relabel(e, "add"))
    }

    pub fn sub(&self, other: &Tensor) -> Result<Tensor, TensorGraphError> {
        self.zip_map(other, |a, b| a - b)
            .map_err(|e| relabel(e, "sub"))
    }

    /// Element-wise (Hadamard) product.
    pub fn mul(&self, other: &Tensor) -> Result<Tensor, TensorGraphError> {
        self.zip_map(other, |a, b| a * b)
            .map_err(|e| relabel(e, "mul"))
    }

    pub fn div(&self, other: &Tensor) -> Result<Tensor, TensorGraphError> {
        self.zip_map(other, |a, b| a / b)
            .map_err(|e| relabel(e, "div"))
    }

    pub fn add_(&mut self, other: &Tensor) -> Result<&mut Self, TensorGraphError> {
        self.zip_map_(other, |a, b| a + b)
            .map_err(|e| relabel(e, "add_"))
    }

    pub fn sub_(&mut self, other: &Tensor) -> Result<&mut Self, TensorGraphError> {
        self.zip_map_(other, |a, b| a - b)
            .map_err(|e| relabel(e, "sub_"))
    }

    pub fn mul_(&mut self, other: &Tensor) -> Result<&mut Self, TensorGraphError> {
        self.zip_map_(other, |a, b| a * b)
            .map_err(|e| relabel(e, "mul_"))
    }

    /// `self += alpha * other`, the update used by the optimizers.
    pub fn add_scaled_(
        &mut self,
        other: &Tensor,
        alpha: f64,
    ) -> Result<&mut Self, TensorGraphError> {
        self.zip_map_(other, |a, b| a + alpha * b)
            .map_err(|e| relabel(e, "add_scaled_"))
    }

    // --- Scalar arithmetic ---

    pub fn add_scalar(&self, value: f64) -> Tensor {
        self.map(|x| x + value)
    }

    pub fn sub_scalar(&self, value: f64) -> Tensor {
        self.map(|x| x - value)
    }

    pub fn mul_scalar(&self, value: f64) -> Tensor {
        self.map(|x| x * value)
    }

    pub fn add_scalar_(&mut self, value: f64) -> &mut Self {
        self.map_(|x| x + value)
    }

    pub fn mul_scalar_(&mut self, value: f64) -> &mut Self {
        self.map_(|x| x * value)
    }

    pub fn fill_(&mut self, value: f64) -> &mut Self {
        self.data_mut().fill(value);
        self
    }

    // --- Linear algebra ---

    /// Matrix product `self · other`.
    ///
    /// Requires `self.columns() == other.rows()`; the result is
    /// `self.rows() x other.columns()`.
    pub fn matmul(&self, other: &Tensor) -> Result<Tensor, TensorGraphError> {
        if self.columns() != other.rows() {
            return Err(TensorGraphError::shape_mismatch(
                (self.columns(), other.columns()),
                other.shape(),
                "matmul",
            ));
        }
        let (m, k, n) = (self.rows(), self.columns(), other.columns());
        let mut output = vec![0.0; m * n];
        let a = self.data();
        let b = other.data();
        for i in 0..m {
            let out_row = &mut output[i * n..(i + 1) * n];
            for l in 0..k {
                let a_il = a[i * k + l];
                let b_row = &b[l * n..(l + 1) * n];
                for (o, &b_lj) in out_row.iter_mut().zip(b_row.iter()) {
                    *o += a_il * b_lj;
                }
            }
        }
        Ok(Tensor::from_parts(output, m, n))
    }
}

fn relabel(err: TensorGraphError, operation: &str) -> TensorGraphError {
    match err {
        TensorGraphError::ShapeMismatch {
            expected, actual, ..
        } => TensorGraphError::shape_mismatch(expected, actual, operation),
        other => other,
    }
}

#[cfg(test)]
#[path = "arithmetic_test.rs"]
mod tests;
