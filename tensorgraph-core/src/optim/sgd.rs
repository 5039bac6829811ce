use crate::autograd::{Graph, NodeId};
use crate::error::TensorGraphError;
use crate::optim::accumulator::GradientAccumulator;
use crate::optim::optimizer_state::OptimizerState;
use crate::optim::optimizer_trait::Optimizer;
use crate::optim::{check_learning_rate, check_variables};
use crate::parameter::ParamStore;
use log::debug;
use std::sync::Arc;

/// Hyper-parameters of [`SgdOptimizer`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SgdConfig {
    pub learning_rate: f64,
}

impl Default for SgdConfig {
    fn default() -> Self {
        SgdConfig {
            learning_rate: 0.01,
        }
    }
}

/// Plain gradient descent: `w -= learning_rate * accumulated_gradient`.
#[derive(Debug)]
pub struct SgdOptimizer {
    graph: Arc<Graph>,
    variables: Vec<NodeId>,
    learning_rate: f64,
    accumulator: GradientAccumulator,
}

impl SgdOptimizer {
    /// Creates an optimizer for `variables`, which must all be Variable nodes
    /// of `graph`.
    pub fn new(
        graph: Arc<Graph>,
        variables: Vec<NodeId>,
        config: SgdConfig,
    ) -> Result<Self, TensorGraphError> {
        check_learning_rate(config.learning_rate)?;
        check_variables(&graph, &variables)?;
        Ok(SgdOptimizer {
            graph,
            variables,
            learning_rate: config.learning_rate,
            accumulator: GradientAccumulator::new(),
        })
    }
}

impl Optimizer for SgdOptimizer {
    fn graph(&self) -> &Graph {
        &self.graph
    }

    fn variables(&self) -> &[NodeId] {
        &self.variables
    }

    fn accumulator(&self) -> &GradientAccumulator {
        &self.accumulator
    }

    fn accumulator_mut(&mut self) -> &mut GradientAccumulator {
        &mut self.accumulator
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f64) -> Result<(), TensorGraphError> {
        check_learning_rate(learning_rate)?;
        self.learning_rate = learning_rate;
        Ok(())
    }

    fn apply_gradients(&mut self, params: &mut ParamStore) -> Result<(), TensorGraphError> {
        if self.accumulator.is_empty() {
            debug!("sgd: no accumulated gradients, skipping update");
            return Ok(());
        }
        for &variable in &self.variables {
            let gradient = match self.accumulator.get(variable.index()) {
                Some(gradient) => gradient,
                None => continue,
            };
            if let Some(param) = self.graph.param_of(variable)? {
                params
                    .get_mut(param)?
                    .add_scaled_(gradient, -self.learning_rate)?;
            }
        }
        debug!(
            "sgd: updated {} variables (lr = {})",
            self.accumulator.len(),
            self.learning_rate
        );
        Ok(())
    }

    fn state_dict(&self) -> OptimizerState {
        OptimizerState::Sgd {
            learning_rate: self.learning_rate,
        }
    }

    fn load_state_dict(&mut self, state: &OptimizerState) -> Result<(), TensorGraphError> {
        match state {
            OptimizerState::Sgd { learning_rate } => self.set_learning_rate(*learning_rate),
            _ => Err(TensorGraphError::invalid_parameter(
                "sgd",
                "state was produced by a different optimizer",
            )),
        }
    }
}
