//! Fits `y = 3x - 0.5` with plain gradient descent.
//!
//! Run with `RUST_LOG=debug` to see the per-step optimizer logs.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tensorgraph_core::optim::{Optimizer, SgdConfig, SgdOptimizer};
use tensorgraph_core::{Bindings, Graph, ParamStore, Tensor, TensorGraphError};

fn main() -> Result<(), TensorGraphError> {
    env_logger::init();
    let mut rng = StdRng::seed_from_u64(0);
    let samples = 32;

    let xs = Tensor::random_uniform(samples, 1, -2.0, 2.0, &mut rng)?;
    let noise = Tensor::random_normal(samples, 1, 0.0, 0.05, &mut rng)?;
    let mut ys = xs.mul_scalar(3.0).add_scalar(-0.5);
    ys.add_(&noise)?;
    // shuffle (x, y) pairs together
    let mut pairs = xs.concat_columns(&ys)?;
    pairs.shuffle_rows(&mut rng);
    let xs = pairs.slice(0, 0, samples, 1)?;
    let ys = pairs.slice(0, 1, samples, 1)?;

    let mut graph = Graph::new();
    let mut params = ParamStore::new();
    let x = graph.input(samples, 1);
    let y = graph.input(samples, 1);
    let w_param = params.insert(Tensor::zeros(1, 1));
    let b_param = params.insert(Tensor::zeros(1, 1));
    let w = graph.variable(&params, w_param)?;
    let b = graph.variable(&params, b_param)?;
    let xw = graph.matmul(x, w)?;
    let bias = graph.broadcast(b, samples, 1)?;
    let prediction = graph.add(xw, bias)?;
    let error = graph.sub(prediction, y)?;
    let squared = graph.pow(error, 2.0)?;
    let mean = graph.collapse_sum(squared)?;
    let loss = graph.scale(mean, 1.0 / samples as f64)?;

    let graph = Arc::new(graph);
    let mut optimizer =
        SgdOptimizer::new(graph.clone(), vec![w, b], SgdConfig { learning_rate: 0.05 })?;
    let bindings = Bindings::new().bind(x, xs).bind(y, ys);

    for step in 0..=400 {
        let value = optimizer.minimize(&mut params, loss, &bindings)?;
        if step % 100 == 0 {
            println!("step {:>3}: loss {:.6}", step, value);
        }
    }

    println!(
        "w = {:.4}, b = {:.4}",
        params.get(w_param)?.get(0, 0)?,
        params.get(b_param)?.get(0, 0)?
    );
    Ok(())
}
