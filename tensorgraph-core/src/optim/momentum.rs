use crate::autograd::{Graph, NodeId};
use crate::error::TensorGraphError;
use crate::optim::accumulator::GradientAccumulator;
use crate::optim::optimizer_state::OptimizerState;
use crate::optim::optimizer_trait::Optimizer;
use crate::optim::{check_learning_rate, check_variables};
use crate::parameter::ParamStore;
use crate::tensor::Tensor;
use log::{debug, warn};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Hyper-parameters of [`MomentumOptimizer`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MomentumConfig {
    pub learning_rate: f64,
    /// Decay of the velocity, in `[0, 1)`.
    pub momentum: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        MomentumConfig {
            learning_rate: 0.01,
            momentum: 0.9,
        }
    }
}

/// Gradient descent on an exponential moving average of the gradients.
///
/// `v = momentum * v + (1 - momentum) * g`, then `w -= learning_rate * v`.
/// The first update of a variable has no history and seeds `v = g`.
#[derive(Debug)]
pub struct MomentumOptimizer {
    graph: Arc<Graph>,
    variables: Vec<NodeId>,
    learning_rate: f64,
    momentum: f64,
    accumulator: GradientAccumulator,
    velocities: BTreeMap<usize, Tensor>,
}

fn check_momentum(momentum: f64) -> Result<(), TensorGraphError> {
    if !(0.0..1.0).contains(&momentum) {
        return Err(TensorGraphError::invalid_parameter(
            "momentum",
            format!("momentum must lie in [0, 1), got {}", momentum),
        ));
    }
    Ok(())
}

impl MomentumOptimizer {
    pub fn new(
        graph: Arc<Graph>,
        variables: Vec<NodeId>,
        config: MomentumConfig,
    ) -> Result<Self, TensorGraphError> {
        check_learning_rate(config.learning_rate)?;
        check_momentum(config.momentum)?;
        check_variables(&graph, &variables)?;
        Ok(MomentumOptimizer {
            graph,
            variables,
            learning_rate: config.learning_rate,
            momentum: config.momentum,
            accumulator: GradientAccumulator::new(),
            velocities: BTreeMap::new(),
        })
    }

    pub fn momentum(&self) -> f64 {
        self.momentum
    }

    /// The velocity of `variable`, once it has been updated at least once.
    pub fn velocity(&self, variable: NodeId) -> Option<&Tensor> {
        self.velocities.get(&variable.index())
    }
}

impl Optimizer for MomentumOptimizer {
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
            debug!("momentum: no accumulated gradients, skipping update");
            return Ok(());
        }
        let decay = self.momentum;
        for &variable in &self.variables {
            let gradient = match self.accumulator.get(variable.index()) {
                Some(gradient) => gradient,
                None => continue,
            };
            let param = match self.graph.param_of(variable)? {
                Some(param) => param,
                None => continue,
            };
            let velocity = match self.velocities.entry(variable.index()) {
                Entry::Occupied(entry) => {
                    let velocity = entry.into_mut();
                    velocity
                        .mul_scalar_(decay)
                        .add_scaled_(gradient, 1.0 - decay)?;
                    velocity
                }
                Entry::Vacant(entry) => entry.insert(gradient.clone()),
            };
            params
                .get_mut(param)?
                .add_scaled_(velocity, -self.learning_rate)?;
        }
        debug!(
            "momentum: updated {} variables (lr = {}, momentum = {})",
            self.accumulator.len(),
            self.learning_rate,
            self.momentum
        );
        Ok(())
    }

    fn state_dict(&self) -> OptimizerState {
        OptimizerState::Momentum {
            learning_rate: self.learning_rate,
            momentum: self.momentum,
            velocities: self.velocities.clone(),
        }
    }

    fn load_state_dict(&mut self, state: &OptimizerState) -> Result<(), TensorGraphError> {
        let (learning_rate, momentum, velocities) = match state {
            OptimizerState::Momentum {
                learning_rate,
                momentum,
                velocities,
            } => (*learning_rate, *momentum, velocities),
            _ => {
                return Err(TensorGraphError::invalid_parameter(
                    "momentum",
                    "state was produced by a different optimizer",
                ))
            }
        };
        check_learning_rate(learning_rate)?;
        check_momentum(momentum)?;

        let mut restored = BTreeMap::new();
        for (&index, velocity) in velocities {
            let variable = match self.variables.iter().find(|v| v.index() == index) {
                Some(variable) => *variable,
                None => {
                    warn!("momentum: ignoring velocity for unknown node {}", index);
                    continue;
                }
            };
            let expected = self.graph.shape(variable)?;
            if velocity.shape() != expected {
                return Err(TensorGraphError::shape_mismatch(
                    expected,
                    velocity.shape(),
                    "load_state_dict",
                ));
            }
            restored.insert(index, velocity.clone());
        }

        self.learning_rate = learning_rate;
        self.momentum = momentum;
        self.velocities = restored;
        Ok(())
    }
}
