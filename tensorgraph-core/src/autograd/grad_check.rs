use crate::autograd::evaluation::Bindings;
use crate::autograd::graph::{Graph, NodeId};
use crate::error::TensorGraphError;
use crate::ops::Op;
use crate::parameter::ParamStore;
use crate::tensor::Tensor;
use approx::relative_eq;
use log::{debug, warn};
use thiserror::Error;

/// Error type specifically for gradient checking failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradCheckError {
    #[error("Gradient check failed for node {node}, element {element}: analytical {analytical:?} != numerical {numerical:?} (difference {difference:?})")]
    GradientMismatch {
        node: usize,
        element: usize,
        analytical: f64,
        numerical: f64,
        difference: f64,
    },
    #[error("Node {node} is a {kind} node; only inputs and variables can be perturbed")]
    NotPerturbable { node: usize, kind: &'static str },
    #[error("Numerical gradient is NaN or infinite for node {node}, element {element}. Loss+: {loss_plus:?}, Loss-: {loss_minus:?}")]
    NumericalGradNaNOrInfinite {
        node: usize,
        element: usize,
        loss_plus: f64,
        loss_minus: f64,
    },
    #[error("Graph error during gradient check: {0}")]
    Graph(#[from] TensorGraphError),
}

/// Step size and tolerance of the central-difference check.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradCheckConfig {
    pub epsilon: f64,
    /// Used both as absolute and as relative tolerance.
    pub tolerance: f64,
}

impl Default for GradCheckConfig {
    fn default() -> Self {
        GradCheckConfig {
            epsilon: 1e-6,
            tolerance: 1e-5,
        }
    }
}

/// Checks the reverse-mode gradient of `sum(loss)` against central finite
/// differences, element by element, for every node in `wrt`.
///
/// `wrt` may name Input nodes (their binding is perturbed) and Variable nodes
/// (their parameter is perturbed in a private copy of the store). Stochastic
/// nodes are evaluated with the bindings' seed, or with seed 0 when none is
/// set, so every perturbed evaluation draws the same masks.
pub fn check_gradients(
    graph: &Graph,
    params: &ParamStore,
    bindings: &Bindings,
    loss: NodeId,
    wrt: &[NodeId],
    config: GradCheckConfig,
) -> Result<(), GradCheckError> {
    let bindings = match bindings.seed() {
        Some(_) => bindings.clone(),
        None => bindings.clone().with_seed(0),
    };
    let gradients = graph.gradient(params, &bindings, loss)?;
    let objective = |params: &ParamStore, bindings: &Bindings| -> Result<f64, TensorGraphError> {
        Ok(graph.evaluate(params, bindings, loss)?.sum())
    };

    for &id in wrt {
        let node = graph.node(id)?;
        let original: Tensor = match node.op() {
            Op::Input => match bindings.get(id) {
                Some(bound) => bound.clone(),
                None => return Err(TensorGraphError::UnboundInput { node: id.index() }.into()),
            },
            Op::Variable { param } => params.get(*param)?.clone(),
            other => {
                return Err(GradCheckError::NotPerturbable {
                    node: id.index(),
                    kind: other.name(),
                })
            }
        };
        let analytical = match gradients.wrt(id)? {
            Some(grad) => grad.clone(),
            None => {
                warn!("node {} does not reach the loss; expecting a zero gradient", id.index());
                original.zeros_like()
            }
        };

        let mut params_copy = params.clone();
        let mut bindings_copy = bindings.clone();
        let mut evaluate_with = |perturbed: Tensor| -> Result<f64, TensorGraphError> {
            match node.op() {
                Op::Variable { param } => params_copy.set(*param, perturbed)?,
                _ => {
                    bindings_copy.set(id, perturbed);
                }
            }
            objective(&params_copy, &bindings_copy)
        };

        for element in 0..original.numel() {
            let mut plus = original.clone();
            plus.data_mut()[element] += config.epsilon;
            let mut minus = original.clone();
            minus.data_mut()[element] -= config.epsilon;

            let loss_plus = evaluate_with(plus)?;
            let loss_minus = evaluate_with(minus)?;
            let numerical = (loss_plus - loss_minus) / (2.0 * config.epsilon);
            if !numerical.is_finite() {
                return Err(GradCheckError::NumericalGradNaNOrInfinite {
                    node: id.index(),
                    element,
                    loss_plus,
                    loss_minus,
                });
            }

            let value = analytical.data()[element];
            if !relative_eq!(
                value,
                numerical,
                epsilon = config.tolerance,
                max_relative = config.tolerance
            ) {
                return Err(GradCheckError::GradientMismatch {
                    node: id.index(),
                    element,
                    analytical: value,
                    numerical,
                    difference: (value - numerical).abs(),
                });
            }
        }
        debug!("gradient check passed for node {}", id.index());
    }
    Ok(())
}

#[cfg(test)]
#[path = "grad_check_test.rs"]
mod tests;
