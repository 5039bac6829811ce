//! Strided 2-D convolution and deconvolution.
//!
//! Kernels are centered: tap `(kr, kc)` of a kernel anchored at `(r, c)` lands
//! on `(r + kr - kernel_rows / 2, c + kc - kernel_columns / 2)`. Taps that land
//! outside the target are skipped, which is the same as zero padding.
//!
//! With several kernels the per-kernel maps are stacked vertically: kernel `k`
//! owns output rows `k * map_rows .. (k + 1) * map_rows`.

use crate::error::TensorGraphError;
use crate::tensor::Tensor;

/// Sizes and strides of one convolution, shared with the parallel backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConvGeometry {
    pub image: (usize, usize),
    pub kernel: (usize, usize),
    pub stride_rows: usize,
    pub stride_columns: usize,
}

impl ConvGeometry {
    pub fn new(
        image: (usize, usize),
        kernel: (usize, usize),
        stride_rows: usize,
        stride_columns: usize,
    ) -> Self {
        ConvGeometry {
            image,
            kernel,
            stride_rows,
            stride_columns,
        }
    }

    /// Per-kernel output size of a convolution: one cell per strided anchor.
    pub fn convolution_map(&self) -> (usize, usize) {
        (
            self.image.0.div_ceil(self.stride_rows),
            self.image.1.div_ceil(self.stride_columns),
        )
    }

    /// Per-kernel output size of a deconvolution: the image scaled by the strides.
    pub fn deconvolution_map(&self) -> (usize, usize) {
        (
            self.image.0 * self.stride_rows,
            self.image.1 * self.stride_columns,
        )
    }

    /// Cell reached by tap `(kr, kc)` of a kernel anchored at `anchor`, if it
    /// falls inside `bounds`.
    #[inline]
    pub fn tap(
        &self,
        anchor: (usize, usize),
        kr: usize,
        kc: usize,
        bounds: (usize, usize),
    ) -> Option<(usize, usize)> {
        let row = (anchor.0 + kr).checked_sub(self.kernel.0 / 2)?;
        let column = (anchor.1 + kc).checked_sub(self.kernel.1 / 2)?;
        if row < bounds.0 && column < bounds.1 {
            Some((row, column))
        } else {
            None
        }
    }
}

fn validate(
    operation: &str,
    kernels: &[(usize, usize)],
    stride_rows: usize,
    stride_columns: usize,
) -> Result<(usize, usize), TensorGraphError> {
    if stride_rows == 0 || stride_columns == 0 {
        return Err(TensorGraphError::invalid_parameter(
            operation,
            format!("strides must be positive, got ({}, {})", stride_rows, stride_columns),
        ));
    }
    let kernel = kernels[0];
    if kernel.0 == 0 || kernel.1 == 0 {
        return Err(TensorGraphError::invalid_parameter(
            operation,
            "kernels must be at least 1x1",
        ));
    }
    if let Some(other) = kernels.iter().find(|k| **k != kernel) {
        return Err(TensorGraphError::shape_mismatch(kernel, *other, operation));
    }
    Ok(kernel)
}

pub(crate) fn convolution_shape(
    image: (usize, usize),
    kernels: &[(usize, usize)],
    stride_rows: usize,
    stride_columns: usize,
) -> Result<(usize, usize), TensorGraphError> {
    let kernel = validate("convolution", kernels, stride_rows, stride_columns)?;
    let (rows, columns) =
        ConvGeometry::new(image, kernel, stride_rows, stride_columns).convolution_map();
    Ok((rows * kernels.len(), columns))
}

pub(crate) fn deconvolution_shape(
    image: (usize, usize),
    kernels: &[(usize, usize)],
    stride_rows: usize,
    stride_columns: usize,
) -> Result<(usize, usize), TensorGraphError> {
    let kernel = validate("deconvolution", kernels, stride_rows, stride_columns)?;
    let (rows, columns) =
        ConvGeometry::new(image, kernel, stride_rows, stride_columns).deconvolution_map();
    Ok((rows * kernels.len(), columns))
}

pub(crate) fn convolution_forward(
    image: &Tensor,
    kernels: &[&Tensor],
    stride_rows: usize,
    stride_columns: usize,
) -> Tensor {
    let geometry = ConvGeometry::new(image.shape(), kernels[0].shape(), stride_rows, stride_columns);
    let (map_rows, map_columns) = geometry.convolution_map();
    let mut output = Tensor::zeros(map_rows * kernels.len(), map_columns);
    for (k, kernel) in kernels.iter().enumerate() {
        for r in 0..map_rows {
            for c in 0..map_columns {
                let anchor = (r * stride_rows, c * stride_columns);
                let mut acc = 0.0;
                for kr in 0..kernel.rows() {
                    for kc in 0..kernel.columns() {
                        if let Some((ir, ic)) = geometry.tap(anchor, kr, kc, image.shape()) {
                            acc += image.at(ir, ic) * kernel.at(kr, kc);
                        }
                    }
                }
                *output.at_mut(k * map_rows + r, c) = acc;
            }
        }
    }
    output
}

/// Scatters each output adjoint back along the taps that produced it.
/// Returns `[d_image, d_kernel_0, d_kernel_1, ...]`.
pub(crate) fn convolution_reverse(
    image: &Tensor,
    kernels: &[&Tensor],
    stride_rows: usize,
    stride_columns: usize,
    adjoint: &Tensor,
) -> Vec<Tensor> {
    let geometry = ConvGeometry::new(image.shape(), kernels[0].shape(), stride_rows, stride_columns);
    let (map_rows, map_columns) = geometry.convolution_map();
    let mut grad_image = image.zeros_like();
    let mut grad_kernels: Vec<Tensor> = kernels.iter().map(|k| k.zeros_like()).collect();
    for (k, kernel) in kernels.iter().enumerate() {
        let grad_kernel = &mut grad_kernels[k];
        for r in 0..map_rows {
            for c in 0..map_columns {
                let g = adjoint.at(k * map_rows + r, c);
                let anchor = (r * stride_rows, c * stride_columns);
                for kr in 0..kernel.rows() {
                    for kc in 0..kernel.columns() {
                        if let Some((ir, ic)) = geometry.tap(anchor, kr, kc, image.shape()) {
                            *grad_image.at_mut(ir, ic) += g * kernel.at(kr, kc);
                            *grad_kernel.at_mut(kr, kc) += g * image.at(ir, ic);
                        }
                    }
                }
            }
        }
    }
    let mut grads = Vec::with_capacity(kernels.len() + 1);
    grads.push(grad_image);
    grads.extend(grad_kernels);
    grads
}

pub(crate) fn deconvolution_forward(
    image: &Tensor,
    kernels: &[&Tensor],
    stride_rows: usize,
    stride_columns: usize,
) -> Tensor {
    let geometry = ConvGeometry::new(image.shape(), kernels[0].shape(), stride_rows, stride_columns);
    let map = geometry.deconvolution_map();
    let mut output = Tensor::zeros(map.0 * kernels.len(), map.1);
    for (k, kernel) in kernels.iter().enumerate() {
        for r in 0..image.rows() {
            for c in 0..image.columns() {
                let value = image.at(r, c);
                let anchor = (r * stride_rows, c * stride_columns);
                for kr in 0..kernel.rows() {
                    for kc in 0..kernel.columns() {
                        if let Some((or, oc)) = geometry.tap(anchor, kr, kc, map) {
                            *output.at_mut(k * map.0 + or, oc) += value * kernel.at(kr, kc);
                        }
                    }
                }
            }
        }
    }
    output
}

/// Gathers the adjoint back through the same scatter pattern as the forward pass.
pub(crate) fn deconvolution_reverse(
    image: &Tensor,
    kernels: &[&Tensor],
    stride_rows: usize,
    stride_columns: usize,
    adjoint: &Tensor,
) -> Vec<Tensor> {
    let geometry = ConvGeometry::new(image.shape(), kernels[0].shape(), stride_rows, stride_columns);
    let map = geometry.deconvolution_map();
    let mut grad_image = image.zeros_like();
    let mut grad_kernels: Vec<Tensor> = kernels.iter().map(|k| k.zeros_like()).collect();
    for (k, kernel) in kernels.iter().enumerate() {
        let grad_kernel = &mut grad_kernels[k];
        for r in 0..image.rows() {
            for c in 0..image.columns() {
                let value = image.at(r, c);
                let anchor = (r * stride_rows, c * stride_columns);
                let mut acc = 0.0;
                for kr in 0..kernel.rows() {
                    for kc in 0..kernel.columns() {
                        if let Some((or, oc)) = geometry.tap(anchor, kr, kc, map) {
                            let g = adjoint.at(k * map.0 + or, oc);
                            acc += g * kernel.at(kr, kc);
                            *grad_kernel.at_mut(kr, kc) += g * value;
                        }
                    }
                }
                *grad_image.at_mut(r, c) += acc;
            }
        }
    }
    let mut grads = Vec::with_capacity(kernels.len() + 1);
    grads.push(grad_image);
    grads.extend(grad_kernels);
    grads
}

#[cfg(test)]
#[path = "conv_test.rs"]
mod tests;
