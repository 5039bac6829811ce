//! Trains a 2-8-1 tanh network on XOR with the momentum optimizer, then
//! saves the trained graph as JSON and reloads it.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tensorgraph_core::optim::{MomentumConfig, MomentumOptimizer, Optimizer};
use tensorgraph_core::serialization::{from_text, to_text};
use tensorgraph_core::{Bindings, Graph, ParamStore, Tensor, TensorGraphError};

fn main() -> Result<(), TensorGraphError> {
    env_logger::init();
    let mut rng = StdRng::seed_from_u64(42);
    let hidden = 8;

    let mut graph = Graph::new();
    let mut params = ParamStore::new();
    let x = graph.input(4, 2);
    let target = graph.input(4, 1);
    let w1 = graph.parameter(&mut params, Tensor::random_normal(2, hidden, 0.0, 1.0, &mut rng)?);
    let b1 = graph.parameter(&mut params, Tensor::zeros(1, hidden));
    let w2 = graph.parameter(&mut params, Tensor::random_normal(hidden, 1, 0.0, 1.0, &mut rng)?);
    let b2 = graph.parameter(&mut params, Tensor::zeros(1, 1));

    let xw1 = graph.matmul(x, w1)?;
    let bias1 = graph.broadcast(b1, 4, 1)?;
    let z1 = graph.add(xw1, bias1)?;
    let h = graph.tanh(z1)?;
    let hw2 = graph.matmul(h, w2)?;
    let bias2 = graph.broadcast(b2, 4, 1)?;
    let logits = graph.add(hw2, bias2)?;
    let output = graph.sigmoid_loss(logits, target)?;

    let graph = Arc::new(graph);
    let config = MomentumConfig {
        learning_rate: 0.5,
        ..MomentumConfig::default()
    };
    let mut optimizer = MomentumOptimizer::new(graph.clone(), vec![w1, b1, w2, b2], config)?;
    let bindings = Bindings::new()
        .bind(x, Tensor::from_rows(&[[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]])?)
        .bind(target, Tensor::column_vector(&[0.0, 1.0, 1.0, 0.0]));

    for epoch in 0..2000 {
        optimizer.minimize(&mut params, output, &bindings)?;
        if epoch % 500 == 0 {
            let predictions = graph.evaluate(&params, &bindings, output)?;
            println!("epoch {:>4}: {:?}", epoch, predictions.data());
        }
    }

    let text = to_text(&graph, &params)?;
    let (restored, restored_params) = from_text(&text)?;
    let permuted = Tensor::from_rows(&[[0.0, 1.0], [1.0, 1.0], [0.0, 0.0], [1.0, 0.0]])?;
    let restored_bindings = Bindings::new()
        .bind(restored.handle(x.index())?, permuted)
        .bind(restored.handle(target.index())?, Tensor::zeros(4, 1));
    let output = restored.handle(output.index())?;
    println!(
        "restored graph ({} nodes) on permuted inputs:\n{}",
        restored.len(),
        restored.evaluate(&restored_params, &restored_bindings, output)?
    );
    Ok(())
}
