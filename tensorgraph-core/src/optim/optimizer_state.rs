use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Snapshot of an optimizer's hyper-parameters and per-variable state.
///
/// Velocities are keyed by the index of the Variable node they belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OptimizerState {
    /// Plain gradient descent keeps no per-variable state.
    Sgd { learning_rate: f64 },
    Momentum {
        learning_rate: f64,
        momentum: f64,
        velocities: BTreeMap<usize, Tensor>,
    },
}
