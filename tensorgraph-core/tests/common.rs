use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tensorgraph_core::autograd::{check_gradients, GradCheckConfig};
use tensorgraph_core::{Bindings, Graph, NodeId, ParamStore, Tensor, TensorGraphError};

// Helpers shared by the integration tests. Not every test file uses every
// helper, hence the allow(dead_code) markers.

#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[allow(dead_code)]
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Values with magnitude in `[0.5, 1.5]`, kept away from the kinks of Abs and
/// Relu and the poles of Divide and Invert. `positive` drops the random sign.
#[allow(dead_code)]
pub fn sample_tensor(rows: usize, columns: usize, positive: bool, rng: &mut StdRng) -> Tensor {
    let data = (0..rows * columns)
        .map(|_| {
            let magnitude = rng.gen_range(0.5..1.5);
            if positive || rng.gen_bool(0.5) {
                magnitude
            } else {
                -magnitude
            }
        })
        .collect();
    Tensor::new(data, rows, columns).expect("sample tensor shape")
}

/// Builds inputs of the given shapes, applies `build`, and checks the reverse
/// pass of `sum(output * weights)` for random weights against finite
/// differences with respect to every input.
#[allow(dead_code)]
pub fn check_op<F>(shapes: &[(usize, usize)], positive: bool, build: F)
where
    F: Fn(&mut Graph, &[NodeId]) -> Result<NodeId, TensorGraphError>,
{
    init_logger();
    let mut rng = seeded_rng(42);
    let mut graph = Graph::new();
    let inputs: Vec<NodeId> = shapes.iter().map(|&(r, c)| graph.input(r, c)).collect();
    let output = build(&mut graph, &inputs).expect("op construction");
    let (rows, columns) = graph.shape(output).expect("output shape");
    let weights = graph.input(rows, columns);
    let weighted = graph.mul(output, weights).expect("weighting");
    let loss = graph.collapse_sum(weighted).expect("loss");

    let mut bindings = Bindings::new().with_seed(5);
    for (&id, &(r, c)) in inputs.iter().zip(shapes) {
        bindings.set(id, sample_tensor(r, c, positive, &mut rng));
    }
    bindings.set(
        weights,
        Tensor::random_uniform(rows, columns, -1.0, 1.0, &mut rng).expect("weights"),
    );

    let config = GradCheckConfig {
        epsilon: 1e-6,
        tolerance: 1e-4,
    };
    if let Err(err) = check_gradients(&graph, &ParamStore::new(), &bindings, loss, &inputs, config)
    {
        panic!("gradient check failed: {}", err);
    }
}
