//! Nodes that draw random numbers during the forward pass.
//!
//! Randomness comes from the RNG of the evaluation, so a seeded evaluation is
//! reproducible. When the evaluation is not stochastic (inference), Dropout
//! and GaussianNoise pass their input through and Sample thresholds at 0.5.

use crate::error::TensorGraphError;
use crate::ops::Forward;
use crate::tensor::Tensor;
use rand::Rng;
use rand_distr::{Bernoulli, Distribution, Normal};

/// Zeroes each element with probability `rate`. The mask is kept for the
/// reverse pass; no rescaling is applied to the survivors.
pub(crate) fn dropout_forward<R: Rng + ?Sized>(
    x: &Tensor,
    rate: f64,
    rng: &mut R,
    stochastic: bool,
) -> Forward {
    if !stochastic || rate == 0.0 {
        return Forward {
            value: x.clone(),
            mask: None,
        };
    }
    let keep: Vec<f64> = (0..x.numel())
        .map(|_| if rng.gen::<f64>() < rate { 0.0 } else { 1.0 })
        .collect();
    let value = x
        .data()
        .iter()
        .zip(keep.iter())
        .map(|(v, m)| v * m)
        .collect();
    let value = Tensor::from_parts(value, x.rows(), x.columns());
    let mask = Tensor::from_parts(keep, x.rows(), x.columns());
    Forward {
        value,
        mask: Some(mask),
    }
}

pub(crate) fn dropout_reverse(
    mask: Option<&Tensor>,
    adjoint: &Tensor,
) -> Result<Tensor, TensorGraphError> {
    match mask {
        Some(mask) => adjoint.mul(mask),
        None => Ok(adjoint.clone()),
    }
}

pub(crate) fn noise_forward<R: Rng + ?Sized>(
    x: &Tensor,
    std_dev: f64,
    rng: &mut R,
    stochastic: bool,
) -> Result<Forward, TensorGraphError> {
    if !stochastic || std_dev == 0.0 {
        return Ok(Forward {
            value: x.clone(),
            mask: None,
        });
    }
    let normal = Normal::new(0.0, std_dev)
        .map_err(|e| TensorGraphError::invalid_parameter("gaussian_noise", e.to_string()))?;
    let data = x.data().iter().map(|v| v + normal.sample(rng)).collect();
    Ok(Forward {
        value: Tensor::from_parts(data, x.rows(), x.columns()),
        mask: None,
    })
}

/// Draws binary states with `P(1) = x`. Probabilities outside `[0, 1]` are clamped.
pub(crate) fn sample_forward<R: Rng + ?Sized>(
    x: &Tensor,
    rng: &mut R,
    stochastic: bool,
) -> Forward {
    let value = if stochastic {
        let data = x
            .data()
            .iter()
            .map(|&p| {
                let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
                match Bernoulli::new(p) {
                    Ok(coin) if coin.sample(rng) => 1.0,
                    _ => 0.0,
                }
            })
            .collect();
        Tensor::from_parts(data, x.rows(), x.columns())
    } else {
        x.map(|p| if p >= 0.5 { 1.0 } else { 0.0 })
    };
    Forward { value, mask: None }
}
