use tensorgraph_core::autograd::{check_gradients, GradCheckConfig};
use tensorgraph_core::{Bindings, Graph, ParamStore, Tensor};

mod common;
use common::{check_op, init_logger, sample_tensor, seeded_rng};

#[test]
fn test_elementwise_binary() {
    check_op(&[(2, 3), (2, 3)], false, |g, x| g.add(x[0], x[1]));
    check_op(&[(2, 3), (2, 3)], false, |g, x| g.sub(x[0], x[1]));
    check_op(&[(2, 3), (2, 3)], false, |g, x| g.mul(x[0], x[1]));
    check_op(&[(2, 3), (2, 3)], false, |g, x| g.div(x[0], x[1]));
}

#[test]
fn test_matmul_and_transpose() {
    check_op(&[(2, 3), (3, 4)], false, |g, x| g.matmul(x[0], x[1]));
    check_op(&[(2, 3)], false, |g, x| g.transpose(x[0]));
}

#[test]
fn test_elementwise_unary() {
    check_op(&[(3, 2)], false, |g, x| g.exp(x[0]));
    check_op(&[(3, 2)], true, |g, x| g.log(x[0]));
    check_op(&[(3, 2)], false, |g, x| g.invert(x[0]));
    check_op(&[(3, 2)], false, |g, x| g.negate(x[0]));
    check_op(&[(3, 2)], false, |g, x| g.abs(x[0]));
    check_op(&[(3, 2)], false, |g, x| g.pow(x[0], 3.0));
    check_op(&[(3, 2)], true, |g, x| g.pow(x[0], 2.5));
    check_op(&[(3, 2)], false, |g, x| g.scale(x[0], -1.7));
    check_op(&[(3, 2)], false, |g, x| g.tanh(x[0]));
    check_op(&[(3, 2)], false, |g, x| g.sigmoid(x[0]));
    check_op(&[(3, 2)], false, |g, x| g.relu(x[0]));
}

#[test]
fn test_layout() {
    check_op(&[(2, 3)], false, |g, x| g.reshape(x[0], 3, 2));
    check_op(&[(2, 3)], false, |g, x| g.reshape(x[0], 1, 6));
    check_op(&[(1, 3)], false, |g, x| g.broadcast(x[0], 4, 1));
    check_op(&[(2, 1)], false, |g, x| g.broadcast(x[0], 2, 3));
    check_op(&[(4, 5)], false, |g, x| g.slice(x[0], 1, 2, 2, 3));
    check_op(&[(3, 2), (3, 4)], false, |g, x| g.concat(x[0], x[1]));
}

#[test]
fn test_convolution() {
    check_op(&[(5, 4), (3, 3)], false, |g, x| g.convolution(x[0], &[x[1]], 1, 1));
    check_op(&[(5, 4), (3, 3), (3, 3)], false, |g, x| {
        g.convolution(x[0], &[x[1], x[2]], 2, 2)
    });
    check_op(&[(4, 6), (2, 3)], false, |g, x| g.convolution(x[0], &[x[1]], 1, 3));
}

#[test]
fn test_deconvolution() {
    check_op(&[(2, 3), (3, 3)], false, |g, x| g.deconvolution(x[0], &[x[1]], 2, 2));
    check_op(&[(3, 2), (2, 2), (2, 2)], false, |g, x| {
        g.deconvolution(x[0], &[x[1], x[2]], 1, 2)
    });
}

#[test]
fn test_reductions() {
    check_op(&[(3, 4)], false, |g, x| g.row_sum(x[0]));
    check_op(&[(3, 4)], false, |g, x| g.row_mean(x[0]));
    check_op(&[(3, 4)], false, |g, x| g.collapse_sum(x[0]));
}

#[test]
fn test_stochastic_with_fixed_seed() {
    check_op(&[(4, 4)], false, |g, x| g.dropout(x[0], 0.3));
    check_op(&[(4, 4)], false, |g, x| g.dropout(x[0], 0.0));
    check_op(&[(4, 4)], false, |g, x| g.gaussian_noise(x[0], 0.5));
}

#[test]
fn test_composite_with_fan_in() {
    // x feeds three consumers; its adjoint is the sum of all three
    check_op(&[(2, 2), (2, 2)], false, |g, x| {
        let a = g.mul(x[0], x[1])?;
        let b = g.tanh(x[0])?;
        let c = g.add(a, b)?;
        let d = g.matmul(c, x[0])?;
        g.sub(d, x[1])
    });
}

#[test]
fn test_variables_receive_gradients() {
    init_logger();
    let mut rng = seeded_rng(9);
    let mut graph = Graph::new();
    let mut params = ParamStore::new();
    let x = graph.input(3, 2);
    let w = graph.parameter(&mut params, sample_tensor(2, 4, false, &mut rng));
    let b = graph.parameter(&mut params, sample_tensor(1, 4, false, &mut rng));
    let xw = graph.matmul(x, w).unwrap();
    let bias = graph.broadcast(b, 3, 1).unwrap();
    let z = graph.add(xw, bias).unwrap();
    let h = graph.sigmoid(z).unwrap();
    let loss = graph.collapse_sum(h).unwrap();

    let bindings = Bindings::new().bind(x, sample_tensor(3, 2, false, &mut rng));
    check_gradients(
        &graph,
        &params,
        &bindings,
        loss,
        &[x, w, b],
        GradCheckConfig::default(),
    )
    .unwrap();
}

/// Central differences at one image cell and one kernel cell of a 3x3
/// convolution, compared against the reverse pass.
fn check_convolution_cells(
    image_shape: (usize, usize),
    stride: (usize, usize),
    seed: u64,
    image_cell: (usize, usize),
    kernel_cell: (usize, usize),
) {
    let mut graph = Graph::new();
    let image = graph.input(image_shape.0, image_shape.1);
    let kernel = graph.input(3, 3);
    let conv = graph.convolution(image, &[kernel], stride.0, stride.1).unwrap();
    let loss = graph.collapse_sum(conv).unwrap();

    let mut rng = seeded_rng(seed);
    let image_value = sample_tensor(image_shape.0, image_shape.1, false, &mut rng);
    let kernel_value = sample_tensor(3, 3, false, &mut rng);
    let params = ParamStore::new();
    let run = |image_value: &Tensor, kernel_value: &Tensor| {
        let bindings = Bindings::new()
            .bind(image, image_value.clone())
            .bind(kernel, kernel_value.clone());
        graph.evaluate(&params, &bindings, loss).unwrap().sum()
    };
    let bindings = Bindings::new()
        .bind(image, image_value.clone())
        .bind(kernel, kernel_value.clone());
    let gradients = graph.gradient(&params, &bindings, loss).unwrap();

    let h = 1e-6;
    let (r, c) = image_cell;
    let mut plus = image_value.clone();
    plus.set(r, c, image_value.get(r, c).unwrap() + h).unwrap();
    let mut minus = image_value.clone();
    minus.set(r, c, image_value.get(r, c).unwrap() - h).unwrap();
    let numeric = (run(&plus, &kernel_value) - run(&minus, &kernel_value)) / (2.0 * h);
    let analytic = gradients.wrt(image).unwrap().unwrap().get(r, c).unwrap();
    approx::assert_relative_eq!(analytic, numeric, epsilon = 1e-6);

    let (kr, kc) = kernel_cell;
    let mut plus = kernel_value.clone();
    plus.set(kr, kc, kernel_value.get(kr, kc).unwrap() + h).unwrap();
    let mut minus = kernel_value.clone();
    minus.set(kr, kc, kernel_value.get(kr, kc).unwrap() - h).unwrap();
    let numeric = (run(&image_value, &plus) - run(&image_value, &minus)) / (2.0 * h);
    let analytic = gradients.wrt(kernel).unwrap().unwrap().get(kr, kc).unwrap();
    approx::assert_relative_eq!(analytic, numeric, epsilon = 1e-6);
}

#[test]
fn test_convolution_single_cells() {
    check_convolution_cells((4, 4), (2, 1), 17, (1, 2), (0, 1));
}

#[test]
fn test_convolution_5x5_unit_stride_single_cells() {
    // Interior and corner cells of the image, centre and edge taps of the kernel.
    check_convolution_cells((5, 5), (1, 1), 23, (2, 2), (1, 1));
    check_convolution_cells((5, 5), (1, 1), 23, (0, 4), (2, 0));
}

/// `-sum(target * ln(p))` for rows of probabilities `p`.
fn cross_entropy(p: &Tensor, target: &Tensor) -> f64 {
    p.data()
        .iter()
        .zip(target.data())
        .map(|(p, t)| -t * p.ln())
        .sum()
}

/// `-sum(t ln p + (1 - t) ln(1 - p))`.
fn binary_cross_entropy(p: &Tensor, target: &Tensor) -> f64 {
    p.data()
        .iter()
        .zip(target.data())
        .map(|(p, t)| -(t * p.ln() + (1.0 - t) * (1.0 - p).ln()))
        .sum()
}

#[test]
fn test_fused_losses_match_cross_entropy() {
    let mut rng = seeded_rng(23);
    let logits_value = sample_tensor(3, 4, false, &mut rng);
    let one_hot = Tensor::from_rows(&[
        [0.0, 1.0, 0.0, 0.0],
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ])
    .unwrap();
    let params = ParamStore::new();

    for softmax in [true, false] {
        let mut graph = Graph::new();
        let logits = graph.input(3, 4);
        let target = graph.input(3, 4);
        let loss = if softmax {
            graph.softmax_loss(logits, target).unwrap()
        } else {
            graph.sigmoid_loss(logits, target).unwrap()
        };
        let objective = |value: &Tensor| {
            let bindings = Bindings::new()
                .bind(logits, value.clone())
                .bind(target, one_hot.clone());
            let p = graph.evaluate(&params, &bindings, loss).unwrap();
            if softmax {
                cross_entropy(&p, &one_hot)
            } else {
                binary_cross_entropy(&p, &one_hot)
            }
        };
        let bindings = Bindings::new()
            .bind(logits, logits_value.clone())
            .bind(target, one_hot.clone());
        let gradients = graph.gradient(&params, &bindings, loss).unwrap();
        let analytic = gradients.wrt(logits).unwrap().unwrap();
        assert_eq!(gradients.wrt(target).unwrap().unwrap(), &Tensor::zeros(3, 4));

        let h = 1e-6;
        for i in 0..logits_value.numel() {
            let mut plus = logits_value.clone();
            plus.data_mut()[i] += h;
            let mut minus = logits_value.clone();
            minus.data_mut()[i] -= h;
            let numeric = (objective(&plus) - objective(&minus)) / (2.0 * h);
            approx::assert_relative_eq!(analytic.data()[i], numeric, epsilon = 1e-5);
        }
    }
}
