use crate::autograd::{Bindings, Graph, Gradients, NodeId};
use crate::error::TensorGraphError;
use crate::optim::accumulator::GradientAccumulator;
use crate::optim::optimizer_state::OptimizerState;
use crate::parameter::ParamStore;

/// Trait defining the common interface for all optimizers.
///
/// An optimizer is bound to one graph and a fixed list of Variable nodes.
/// Gradients are summed into its [`GradientAccumulator`] by
/// `accumulate_gradients` / `add_gradients`, consumed by `apply_gradients`,
/// and discarded by `clear_gradients`. Without the clear between steps the
/// sums keep growing.
pub trait Optimizer {
    fn graph(&self) -> &Graph;

    /// The Variable nodes this optimizer updates.
    fn variables(&self) -> &[NodeId];

    fn accumulator(&self) -> &GradientAccumulator;

    fn accumulator_mut(&mut self) -> &mut GradientAccumulator;

    fn learning_rate(&self) -> f64;

    fn set_learning_rate(&mut self, learning_rate: f64) -> Result<(), TensorGraphError>;

    /// Updates the parameters from the accumulated gradients.
    ///
    /// An empty accumulator leaves the parameters untouched.
    fn apply_gradients(&mut self, params: &mut ParamStore) -> Result<(), TensorGraphError>;

    /// Returns the optimizer's current state as an `OptimizerState` object.
    fn state_dict(&self) -> OptimizerState;

    /// Restores a state produced by `state_dict` of the same optimizer kind.
    fn load_state_dict(&mut self, state: &OptimizerState) -> Result<(), TensorGraphError>;

    /// Folds gradients computed elsewhere (for instance per example on
    /// several threads) into the accumulator.
    fn add_gradients(&mut self, gradients: &Gradients) -> Result<(), TensorGraphError> {
        let variables = self.variables().to_vec();
        for variable in variables {
            if let Some(gradient) = gradients.wrt(variable)? {
                self.accumulator_mut().add(variable.index(), gradient)?;
            }
        }
        Ok(())
    }

    /// Runs a gradient pass for `loss` and adds the variables' gradients.
    fn accumulate_gradients(
        &mut self,
        params: &ParamStore,
        loss: NodeId,
        bindings: &Bindings,
    ) -> Result<(), TensorGraphError> {
        let gradients = self.graph().gradient(params, bindings, loss)?;
        self.add_gradients(&gradients)
    }

    fn clear_gradients(&mut self) {
        self.accumulator_mut().clear();
    }

    /// Accumulate, apply and clear in one call. Returns the summed loss value
    /// of the forward pass that produced the gradients.
    fn minimize(
        &mut self,
        params: &mut ParamStore,
        loss: NodeId,
        bindings: &Bindings,
    ) -> Result<f64, TensorGraphError> {
        let evaluation = self.graph().forward(params, bindings, loss)?;
        let loss_value = evaluation.value(loss)?.sum();
        let gradients = self.graph().gradient_from(&evaluation, loss)?;
        self.add_gradients(&gradients)?;
        self.apply_gradients(params)?;
        self.clear_gradients();
        Ok(loss_value)
    }
}
