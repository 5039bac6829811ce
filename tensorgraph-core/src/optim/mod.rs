//! Optimizers for training graph parameters.
//!
//! This module provides the `Optimizer` trait, the shared
//! `GradientAccumulator` and `OptimizerState`, and two update rules:
//! plain gradient descent (`SgdOptimizer`) and exponentially averaged
//! momentum (`MomentumOptimizer`).

pub mod accumulator;
pub mod momentum;
pub mod optimizer_state;
pub mod optimizer_trait;
pub mod sgd;

pub use accumulator::GradientAccumulator;
pub use momentum::{MomentumConfig, MomentumOptimizer};
pub use optimizer_state::OptimizerState;
pub use optimizer_trait::Optimizer;
pub use sgd::{SgdConfig, SgdOptimizer};

use crate::autograd::{Graph, NodeId};
use crate::error::TensorGraphError;

/// Every trainable node must be a distinct Variable node of `graph`.
pub(crate) fn check_variables(graph: &Graph, variables: &[NodeId]) -> Result<(), TensorGraphError> {
    for (position, &variable) in variables.iter().enumerate() {
        if variables[..position].contains(&variable) {
            return Err(TensorGraphError::invalid_parameter(
                "optimizer",
                format!("node {} is listed more than once", variable.index()),
            ));
        }
        if graph.param_of(variable)?.is_none() {
            return Err(TensorGraphError::invalid_parameter(
                "optimizer",
                format!(
                    "node {} is a {} node, not a variable",
                    variable.index(),
                    graph.node(variable)?.op().name()
                ),
            ));
        }
    }
    Ok(())
}

pub(crate) fn check_learning_rate(learning_rate: f64) -> Result<(), TensorGraphError> {
    if !(learning_rate.is_finite() && learning_rate > 0.0) {
        return Err(TensorGraphError::invalid_parameter(
            "optimizer",
            format!("learning rate must be positive and finite, got {}", learning_rate),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod sgd_test;

#[cfg(test)]
mod momentum_test;
