//! Scalar kernels generic over `num_traits::Float`.
//!
//! The CPU graph evaluates them in `f64`; the parallel backend calls the same
//! functions on its `f32` device buffers, so both paths share one definition
//! of every element-wise rule.

use num_traits::Float;

pub fn sigmoid<F: Float>(x: F) -> F {
    F::one() / (F::one() + (-x).exp())
}

pub fn relu<F: Float>(x: F) -> F {
    if x > F::zero() {
        x
    } else {
        F::zero()
    }
}

/// Sign with `sign(0) = 0`, the derivative used by `Abs`.
pub fn sign<F: Float>(x: F) -> F {
    if x > F::zero() {
        F::one()
    } else if x < F::zero() {
        -F::one()
    } else {
        F::zero()
    }
}

pub fn invert<F: Float>(x: F) -> F {
    F::one() / x
}

/// Softmax over one row, subtracting the row maximum before exponentiating.
pub fn softmax_in_place<F: Float>(row: &mut [F]) {
    let max = row.iter().copied().fold(F::neg_infinity(), F::max);
    let mut total = F::zero();
    for x in row.iter_mut() {
        *x = (*x - max).exp();
        total = total + *x;
    }
    for x in row.iter_mut() {
        *x = *x / total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sigmoid_f32_and_f64_agree() {
        assert_relative_eq!(sigmoid(0.0f64), 0.5);
        assert_relative_eq!(sigmoid(2.0f32) as f64, sigmoid(2.0f64), epsilon = 1e-6);
    }

    #[test]
    fn test_sign_of_zero_is_zero() {
        assert_eq!(sign(0.0f64), 0.0);
        assert_eq!(sign(-3.0f64), -1.0);
        assert_eq!(sign(0.1f32), 1.0);
    }

    #[test]
    fn test_softmax_is_stable() {
        let mut row = [1000.0f64, 1000.0, 1000.0 + 2.0f64.ln()];
        softmax_in_place(&mut row);
        assert_relative_eq!(row[0], 0.25, epsilon = 1e-12);
        assert_relative_eq!(row[2], 0.5, epsilon = 1e-12);
        assert!(row.iter().all(|x| x.is_finite()));
    }
}
