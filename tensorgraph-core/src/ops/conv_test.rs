use super::*;
use crate::utils::testing::check_tensor_near;
use approx::assert_relative_eq;

fn image_3x3() -> Tensor {
    Tensor::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]).unwrap()
}

/// `sum(output * weights)`, a scalar with a non-uniform adjoint.
fn weighted_sum(output: &Tensor) -> f64 {
    output
        .data()
        .iter()
        .enumerate()
        .map(|(i, v)| v * (1.0 + 0.1 * i as f64))
        .sum()
}

fn weights_like(output: &Tensor) -> Tensor {
    let data = (0..output.numel()).map(|i| 1.0 + 0.1 * i as f64).collect();
    Tensor::new(data, output.rows(), output.columns()).unwrap()
}

#[test]
fn test_convolution_shape_stacks_kernels() {
    assert_eq!(convolution_shape((5, 4), &[(3, 3)], 2, 2).unwrap(), (3, 2));
    assert_eq!(convolution_shape((5, 4), &[(3, 3), (3, 3)], 2, 2).unwrap(), (6, 2));
    assert_eq!(deconvolution_shape((2, 3), &[(3, 3)], 2, 1).unwrap(), (4, 3));
}

#[test]
fn test_convolution_shape_rejects_bad_parameters() {
    match convolution_shape((3, 3), &[(3, 3)], 0, 1) {
        Err(TensorGraphError::InvalidParameter { operation, .. }) => {
            assert_eq!(operation, "convolution")
        }
        other => panic!("Expected InvalidParameter, got {:?}", other),
    }
    assert!(matches!(
        deconvolution_shape((3, 3), &[(3, 3), (2, 2)], 1, 1),
        Err(TensorGraphError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_convolution_skips_out_of_bounds_taps() {
    let image = image_3x3();
    let kernel = Tensor::ones(3, 3);
    let output = convolution_forward(&image, &[&kernel], 1, 1);
    check_tensor_near(
        &output,
        (3, 3),
        &[12.0, 21.0, 16.0, 27.0, 45.0, 33.0, 24.0, 39.0, 28.0],
        1e-12,
    );
}

#[test]
fn test_strided_convolution_with_two_kernels() {
    let image = image_3x3();
    let ones = Tensor::ones(3, 3);
    let twos = Tensor::full(3, 3, 2.0);
    let output = convolution_forward(&image, &[&ones, &twos], 2, 2);
    check_tensor_near(
        &output,
        (4, 2),
        &[12.0, 16.0, 24.0, 28.0, 24.0, 32.0, 48.0, 56.0],
        1e-12,
    );
}

#[test]
fn test_deconvolution_scatters_taps() {
    let image = Tensor::full(1, 1, 2.0);
    let kernel = image_3x3();
    let output = deconvolution_forward(&image, &[&kernel], 2, 2);
    check_tensor_near(&output, (2, 2), &[10.0, 12.0, 16.0, 18.0], 1e-12);
}

fn check_reverse_against_differences(deconvolve: bool) {
    let image = Tensor::from_rows(&[[0.5, -1.0, 2.0], [1.5, 0.3, -0.7]]).unwrap();
    let kernels = [
        Tensor::from_rows(&[[0.2, -0.4], [1.1, 0.6]]).unwrap(),
        Tensor::from_rows(&[[-0.3, 0.8], [0.5, -1.2]]).unwrap(),
    ];
    let (sr, sc) = (2, 1);
    let run = |image: &Tensor, kernels: &[Tensor]| {
        let refs: Vec<&Tensor> = kernels.iter().collect();
        if deconvolve {
            deconvolution_forward(image, &refs, sr, sc)
        } else {
            convolution_forward(image, &refs, sr, sc)
        }
    };
    let output = run(&image, &kernels);
    let adjoint = weights_like(&output);
    let refs: Vec<&Tensor> = kernels.iter().collect();
    let grads = if deconvolve {
        deconvolution_reverse(&image, &refs, sr, sc, &adjoint)
    } else {
        convolution_reverse(&image, &refs, sr, sc, &adjoint)
    };
    assert_eq!(grads.len(), 3);

    let h = 1e-6;
    for i in 0..image.numel() {
        let mut plus = image.clone();
        plus.data_mut()[i] += h;
        let mut minus = image.clone();
        minus.data_mut()[i] -= h;
        let numeric =
            (weighted_sum(&run(&plus, &kernels)) - weighted_sum(&run(&minus, &kernels))) / (2.0 * h);
        assert_relative_eq!(grads[0].data()[i], numeric, epsilon = 1e-6);
    }
    for k in 0..kernels.len() {
        for i in 0..kernels[k].numel() {
            let mut plus = kernels.clone();
            plus[k].data_mut()[i] += h;
            let mut minus = kernels.clone();
            minus[k].data_mut()[i] -= h;
            let numeric =
                (weighted_sum(&run(&image, &plus)) - weighted_sum(&run(&image, &minus))) / (2.0 * h);
            assert_relative_eq!(grads[k + 1].data()[i], numeric, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_convolution_reverse_matches_differences() {
    check_reverse_against_differences(false);
}

#[test]
fn test_deconvolution_reverse_matches_differences() {
    check_reverse_against_differences(true);
}

#[test]
fn test_convolution_reverse_keeps_nan_from_zero_adjoint() {
    let image = Tensor::full(1, 1, f64::INFINITY);
    let kernel = Tensor::full(1, 1, 2.0);
    let adjoint = Tensor::zeros(1, 1);
    let grads = convolution_reverse(&image, &[&kernel], 1, 1, &adjoint);
    assert_eq!(grads[0].data(), &[0.0]);
    assert!(grads[1].data()[0].is_nan());
}
