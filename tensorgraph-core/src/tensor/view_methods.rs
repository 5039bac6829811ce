// src/tensor/view_methods.rs

use crate::error::TensorGraphError;
use crate::tensor::Tensor;
use rand::seq::SliceRandom;
use rand::Rng;

impl Tensor {
    /// Returns a copy of row `row` as a `1 x columns` tensor.
    pub fn row(&self, row: usize) -> Result<Tensor, TensorGraphError> {
        self.slice(row, 0, 1, self.columns())
    }

    /// Overwrites row `row` with the contents of a `1 x columns` tensor.
    pub fn set_row(&mut self, row: usize, values: &Tensor) -> Result<&mut Self, TensorGraphError> {
        if values.shape() != (1, self.columns()) {
            return Err(TensorGraphError::shape_mismatch(
                (1, self.columns()),
                values.shape(),
                "set_row",
            ));
        }
        self.blit(values, row, 0)
    }

    /// Appends a `1 x columns` row at the bottom.
    ///
    /// A tensor with no rows adopts the width of the first appended row. A
    /// tensor with rows but no columns only accepts `1 x 0` rows.
    pub fn append_row(&mut self, values: &Tensor) -> Result<&mut Self, TensorGraphError> {
        if self.rows() == 0 && values.rows() == 1 {
            self.columns = values.columns();
        }
        if values.shape() != (1, self.columns()) {
            return Err(TensorGraphError::shape_mismatch(
                (1, self.columns()),
                values.shape(),
                "append_row",
            ));
        }
        self.data.extend_from_slice(values.data());
        self.rows += 1;
        Ok(self)
    }

    /// Copies the `rows x columns` block whose top-left corner is `(row, column)`.
    pub fn slice(
        &self,
        row: usize,
        column: usize,
        rows: usize,
        columns: usize,
    ) -> Result<Tensor, TensorGraphError> {
        if row + rows > self.rows() || column + columns > self.columns() {
            return Err(TensorGraphError::IndexOutOfBounds {
                index: (row + rows, column + columns),
                shape: self.shape(),
            });
        }
        let mut data = Vec::with_capacity(rows * columns);
        for r in row..row + rows {
            let start = r * self.columns() + column;
            data.extend_from_slice(&self.data()[start..start + columns]);
        }
        Ok(Tensor::from_parts(data, rows, columns))
    }

    /// Writes `source` into `self` with its top-left corner at `(row, column)`.
    pub fn blit(
        &mut self,
        source: &Tensor,
        row: usize,
        column: usize,
    ) -> Result<&mut Self, TensorGraphError> {
        if row + source.rows() > self.rows() || column + source.columns() > self.columns() {
            return Err(TensorGraphError::IndexOutOfBounds {
                index: (row + source.rows(), column + source.columns()),
                shape: self.shape(),
            });
        }
        let width = self.columns();
        for r in 0..source.rows() {
            let dst = (row + r) * width + column;
            let src = r * source.columns();
            self.data[dst..dst + source.columns()]
                .copy_from_slice(&source.data()[src..src + source.columns()]);
        }
        Ok(self)
    }

    /// Returns the matrix transpose.
    pub fn transpose(&self) -> Tensor {
        let (rows, columns) = self.shape();
        let mut data = vec![0.0; rows * columns];
        for r in 0..rows {
            for c in 0..columns {
                data[c * rows + r] = self.at(r, c);
            }
        }
        Tensor::from_parts(data, columns, rows)
    }

    /// Reinterprets the row-major buffer with new dimensions.
    ///
    /// The buffer is not reordered: element `(r, c)` of the result is buffer
    /// index `r * columns + c`, whatever position that index held before.
    pub fn reshape(&self, rows: usize, columns: usize) -> Result<Tensor, TensorGraphError> {
        if rows * columns != self.numel() {
            return Err(TensorGraphError::shape_mismatch(
                self.shape(),
                (rows, columns),
                "reshape",
            ));
        }
        Ok(Tensor::from_parts(self.data().to_vec(), rows, columns))
    }

    /// Tiles the tensor `row_repeat` times vertically and `column_repeat` times horizontally.
    pub fn repmat(&self, row_repeat: usize, column_repeat: usize) -> Tensor {
        let (rows, columns) = self.shape();
        let out_columns = columns * column_repeat;
        let mut data = Vec::with_capacity(rows * row_repeat * out_columns);
        for _ in 0..row_repeat {
            for r in 0..rows {
                let src = &self.data()[r * columns..(r + 1) * columns];
                for _ in 0..column_repeat {
                    data.extend_from_slice(src);
                }
            }
        }
        Tensor::from_parts(data, rows * row_repeat, out_columns)
    }

    /// Places `other` to the right of `self`. Both must have the same row count.
    pub fn concat_columns(&self, other: &Tensor) -> Result<Tensor, TensorGraphError> {
        if self.rows() != other.rows() {
            return Err(TensorGraphError::shape_mismatch(
                (self.rows(), other.columns()),
                other.shape(),
                "concat_columns",
            ));
        }
        let columns = self.columns() + other.columns();
        let mut data = Vec::with_capacity(self.rows() * columns);
        for r in 0..self.rows() {
            data.extend_from_slice(&self.data()[r * self.columns()..(r + 1) * self.columns()]);
            data.extend_from_slice(&other.data()[r * other.columns()..(r + 1) * other.columns()]);
        }
        Ok(Tensor::from_parts(data, self.rows(), columns))
    }

    /// Shuffles whole rows in place.
    pub fn shuffle_rows<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &mut Self {
        let mut order: Vec<usize> = (0..self.rows()).collect();
        order.shuffle(rng);
        let columns = self.columns();
        let mut data = Vec::with_capacity(self.numel());
        for r in order {
            data.extend_from_slice(&self.data()[r * columns..(r + 1) * columns]);
        }
        self.data = data;
        self
    }
}

#[cfg(test)]
#[path = "view_methods_test.rs"]
mod tests;
