//! Per-node `f32` kernels dispatched on the rayon pool.
//!
//! Each kernel mirrors the forward rule of one [`Op`] in `tensorgraph-core`
//! and reuses its scalar functions and convolution geometry, so the two
//! backends differ only in precision and summation order.

use crate::error::BackendError;
use rayon::prelude::*;
use tensorgraph_core::ops::conv::ConvGeometry;
use tensorgraph_core::ops::scalar;
use tensorgraph_core::Op;

/// How a launch is split across workers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkSize {
    /// One work item per output element.
    OneD(usize),
    /// One work item per output cell, scheduled a row (`width` cells) at a time.
    TwoD { width: usize, height: usize },
}

impl WorkSize {
    pub fn items(&self) -> usize {
        match *self {
            WorkSize::OneD(n) => n,
            WorkSize::TwoD { width, height } => width * height,
        }
    }
}

/// A read-only input buffer together with its logical shape.
#[derive(Clone, Copy, Debug)]
pub struct Operand<'a> {
    pub data: &'a [f32],
    pub shape: (usize, usize),
}

impl Operand<'_> {
    #[inline]
    fn at(&self, row: usize, column: usize) -> f32 {
        self.data[row * self.shape.1 + column]
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UnaryKind {
    Exp,
    Log,
    Invert,
    Negate,
    Abs,
    Power(f32),
    Scale(f32),
    Tanh,
    Sigmoid,
    Relu,
}

impl UnaryKind {
    #[inline]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            UnaryKind::Exp => x.exp(),
            UnaryKind::Log => x.ln(),
            UnaryKind::Invert => scalar::invert(x),
            UnaryKind::Negate => -x,
            UnaryKind::Abs => x.abs(),
            UnaryKind::Power(n) => x.powf(n),
            UnaryKind::Scale(factor) => x * factor,
            UnaryKind::Tanh => x.tanh(),
            UnaryKind::Sigmoid => scalar::sigmoid(x),
            UnaryKind::Relu => scalar::relu(x),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryKind {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryKind {
    #[inline]
    pub fn apply(self, a: f32, b: f32) -> f32 {
        match self {
            BinaryKind::Add => a + b,
            BinaryKind::Subtract => a - b,
            BinaryKind::Multiply => a * b,
            BinaryKind::Divide => a / b,
        }
    }
}

/// The kernel bound to one node of a compiled program.
#[derive(Clone, Debug, PartialEq)]
pub enum Kernel {
    /// Input and Variable leaves: the program copies host data in, nothing runs.
    Upload,
    Fill(f32),
    Unary(UnaryKind),
    Binary(BinaryKind),
    MatMul,
    Transpose,
    /// Reshape keeps the row-major buffer as is.
    Copy,
    Broadcast,
    Slice { row: usize, column: usize },
    Concat,
    Convolution(ConvGeometry),
    Deconvolution(ConvGeometry),
    RowSum,
    RowMean,
    CollapseSum,
    Softmax,
}

impl Kernel {
    /// Picks the kernel for `op` whose inputs have `input_shapes`.
    ///
    /// Stochastic ops have no device kernel.
    pub fn bind(op: &Op, input_shapes: &[(usize, usize)]) -> Result<Kernel, BackendError> {
        let kernel = match op {
            Op::Input | Op::Variable { .. } => Kernel::Upload,
            Op::Constant { value } => Kernel::Fill(*value as f32),
            Op::Add => Kernel::Binary(BinaryKind::Add),
            Op::Subtract => Kernel::Binary(BinaryKind::Subtract),
            Op::Multiply => Kernel::Binary(BinaryKind::Multiply),
            Op::Divide => Kernel::Binary(BinaryKind::Divide),
            Op::MatMul => Kernel::MatMul,
            Op::Transpose => Kernel::Transpose,
            Op::Exp => Kernel::Unary(UnaryKind::Exp),
            Op::Log => Kernel::Unary(UnaryKind::Log),
            Op::Invert => Kernel::Unary(UnaryKind::Invert),
            Op::Negate => Kernel::Unary(UnaryKind::Negate),
            Op::Abs => Kernel::Unary(UnaryKind::Abs),
            Op::Power { exponent } => Kernel::Unary(UnaryKind::Power(*exponent as f32)),
            Op::Scale { factor } => Kernel::Unary(UnaryKind::Scale(*factor as f32)),
            Op::Tanh => Kernel::Unary(UnaryKind::Tanh),
            Op::Sigmoid | Op::SigmoidLoss => Kernel::Unary(UnaryKind::Sigmoid),
            Op::Relu => Kernel::Unary(UnaryKind::Relu),
            Op::Reshape { .. } => Kernel::Copy,
            Op::Broadcast { .. } => Kernel::Broadcast,
            Op::Slice { row, column, .. } => Kernel::Slice {
                row: *row,
                column: *column,
            },
            Op::Concat => Kernel::Concat,
            Op::Convolution {
                stride_rows,
                stride_columns,
            } => Kernel::Convolution(geometry(op, input_shapes, *stride_rows, *stride_columns)?),
            Op::Deconvolution {
                stride_rows,
                stride_columns,
            } => Kernel::Deconvolution(geometry(op, input_shapes, *stride_rows, *stride_columns)?),
            Op::RowSum => Kernel::RowSum,
            Op::RowMean => Kernel::RowMean,
            Op::CollapseSum => Kernel::CollapseSum,
            Op::SoftmaxLoss => Kernel::Softmax,
            Op::Dropout { .. } | Op::GaussianNoise { .. } | Op::Sample => {
                return Err(BackendError::UnsupportedOperation(op.name().to_string()))
            }
        };
        Ok(kernel)
    }

    /// Work size for an output of shape `output`: 2-D for matrix product and
    /// convolutions, 1-D otherwise.
    pub fn work_size(&self, output: (usize, usize)) -> WorkSize {
        match self {
            Kernel::MatMul | Kernel::Convolution(_) | Kernel::Deconvolution(_) => WorkSize::TwoD {
                width: output.1,
                height: output.0,
            },
            _ => WorkSize::OneD(output.0 * output.1),
        }
    }

    /// Writes the node value into `output`, which must be zeroed and sized to
    /// the output shape. Must run inside the pool that should do the work.
    pub fn launch(
        &self,
        inputs: &[Operand<'_>],
        output: &mut [f32],
        output_shape: (usize, usize),
        min_chunk: usize,
    ) {
        if output.is_empty() {
            return;
        }
        let (_, out_columns) = output_shape;
        match self {
            Kernel::Upload => {}
            Kernel::Fill(value) => {
                let value = *value;
                output.par_iter_mut().with_min_len(min_chunk).for_each(|x| *x = value);
            }
            Kernel::Unary(kind) => {
                let kind = *kind;
                output
                    .par_iter_mut()
                    .zip(inputs[0].data.par_iter())
                    .with_min_len(min_chunk)
                    .for_each(|(o, &x)| *o = kind.apply(x));
            }
            Kernel::Binary(kind) => {
                let kind = *kind;
                output
                    .par_iter_mut()
                    .zip(inputs[0].data.par_iter().zip(inputs[1].data.par_iter()))
                    .with_min_len(min_chunk)
                    .for_each(|(o, (&a, &b))| *o = kind.apply(a, b));
            }
            Kernel::MatMul => {
                let (a, b) = (inputs[0], inputs[1]);
                let inner = a.shape.1;
                output
                    .par_chunks_mut(out_columns)
                    .enumerate()
                    .for_each(|(i, row)| {
                        for l in 0..inner {
                            let a_il = a.at(i, l);
                            let b_row = &b.data[l * out_columns..(l + 1) * out_columns];
                            for (o, &b_lj) in row.iter_mut().zip(b_row) {
                                *o += a_il * b_lj;
                            }
                        }
                    });
            }
            Kernel::Transpose => {
                let x = inputs[0];
                output
                    .par_chunks_mut(out_columns)
                    .enumerate()
                    .for_each(|(j, row)| {
                        for (i, o) in row.iter_mut().enumerate() {
                            *o = x.at(i, j);
                        }
                    });
            }
            Kernel::Copy => {
                output
                    .par_iter_mut()
                    .zip(inputs[0].data.par_iter())
                    .with_min_len(min_chunk)
                    .for_each(|(o, &x)| *o = x);
            }
            Kernel::Broadcast => {
                let x = inputs[0];
                let (rows, columns) = x.shape;
                output
                    .par_chunks_mut(out_columns)
                    .enumerate()
                    .for_each(|(i, row)| {
                        for (j, o) in row.iter_mut().enumerate() {
                            *o = x.at(i % rows, j % columns);
                        }
                    });
            }
            Kernel::Slice { row, column } => {
                let x = inputs[0];
                let (row, column) = (*row, *column);
                output
                    .par_chunks_mut(out_columns)
                    .enumerate()
                    .for_each(|(i, out_row)| {
                        let start = (row + i) * x.shape.1 + column;
                        out_row.copy_from_slice(&x.data[start..start + out_columns]);
                    });
            }
            Kernel::Concat => {
                let (a, b) = (inputs[0], inputs[1]);
                let split = a.shape.1;
                output
                    .par_chunks_mut(out_columns)
                    .enumerate()
                    .for_each(|(i, row)| {
                        row[..split].copy_from_slice(&a.data[i * split..(i + 1) * split]);
                        row[split..].copy_from_slice(
                            &b.data[i * b.shape.1..(i + 1) * b.shape.1],
                        );
                    });
            }
            Kernel::Convolution(geometry) => convolution(geometry, inputs, output, out_columns),
            Kernel::Deconvolution(geometry) => deconvolution(geometry, inputs, output),
            Kernel::RowSum | Kernel::RowMean => {
                let x = inputs[0];
                let columns = x.shape.1;
                let mean = matches!(self, Kernel::RowMean);
                output.par_iter_mut().enumerate().for_each(|(r, o)| {
                    let sum: f32 = x.data[r * columns..(r + 1) * columns].iter().sum();
                    *o = if mean { sum / columns as f32 } else { sum };
                });
            }
            Kernel::CollapseSum => {
                output[0] = inputs[0].data.par_iter().with_min_len(min_chunk).sum();
            }
            Kernel::Softmax => {
                output.copy_from_slice(inputs[0].data);
                output
                    .par_chunks_mut(out_columns)
                    .for_each(scalar::softmax_in_place);
            }
        }
    }
}

fn geometry(
    op: &Op,
    input_shapes: &[(usize, usize)],
    stride_rows: usize,
    stride_columns: usize,
) -> Result<ConvGeometry, BackendError> {
    match input_shapes {
        [image, kernel, ..] => Ok(ConvGeometry::new(*image, *kernel, stride_rows, stride_columns)),
        _ => Err(BackendError::UnsupportedOperation(format!(
            "{} with {} input(s)",
            op.name(),
            input_shapes.len()
        ))),
    }
}

/// Gathers one output row at a time. Output row `i` belongs to kernel
/// `i / map_rows`.
fn convolution(geometry: &ConvGeometry, inputs: &[Operand<'_>], output: &mut [f32], width: usize) {
    let image = inputs[0];
    let kernels = &inputs[1..];
    let (map_rows, _) = geometry.convolution_map();
    let (kernel_rows, kernel_columns) = geometry.kernel;
    output.par_chunks_mut(width).enumerate().for_each(|(i, row)| {
        let kernel = kernels[i / map_rows];
        let r = i % map_rows;
        for (c, o) in row.iter_mut().enumerate() {
            let anchor = (r * geometry.stride_rows, c * geometry.stride_columns);
            let mut acc = 0.0;
            for kr in 0..kernel_rows {
                for kc in 0..kernel_columns {
                    if let Some((ir, ic)) = geometry.tap(anchor, kr, kc, image.shape) {
                        acc += image.at(ir, ic) * kernel.at(kr, kc);
                    }
                }
            }
            *o = acc;
        }
    });
}

/// Scatters the image through each kernel. Kernels own disjoint output
/// blocks, so they run in parallel and each scatter stays sequential.
fn deconvolution(geometry: &ConvGeometry, inputs: &[Operand<'_>], output: &mut [f32]) {
    let image = inputs[0];
    let kernels = &inputs[1..];
    let map = geometry.deconvolution_map();
    let (kernel_rows, kernel_columns) = geometry.kernel;
    output
        .par_chunks_mut(map.0 * map.1)
        .zip(kernels.par_iter())
        .for_each(|(block, kernel)| {
            for r in 0..image.shape.0 {
                for c in 0..image.shape.1 {
                    let value = image.at(r, c);
                    let anchor = (r * geometry.stride_rows, c * geometry.stride_columns);
                    for kr in 0..kernel_rows {
                        for kc in 0..kernel_columns {
                            if let Some((or, oc)) = geometry.tap(anchor, kr, kc, map) {
                                block[or * map.1 + oc] += value * kernel.at(kr, kc);
                            }
                        }
                    }
                }
            }
        });
}
