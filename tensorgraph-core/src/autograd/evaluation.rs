use crate::autograd::graph::{Graph, NodeId};
use crate::error::TensorGraphError;
use crate::ops::Op;
use crate::parameter::ParamStore;
use crate::tensor::Tensor;
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

/// Values for the Input nodes of one evaluation, plus evaluation options.
///
/// `seed` makes stochastic nodes reproducible: two evaluations with the same
/// seed draw the same dropout masks, noise and samples. With `stochastic`
/// turned off (see [`Bindings::inference`]) Dropout and GaussianNoise pass
/// their input through and Sample thresholds at 0.5.
#[derive(Clone, Debug)]
pub struct Bindings {
    values: HashMap<NodeId, Tensor>,
    seed: Option<u64>,
    stochastic: bool,
}

impl Default for Bindings {
    fn default() -> Self {
        Bindings {
            values: HashMap::new(),
            seed: None,
            stochastic: true,
        }
    }
}

impl Bindings {
    pub fn new() -> Self {
        Bindings::default()
    }

    /// Builder form of [`Bindings::set`].
    pub fn bind(mut self, input: NodeId, value: Tensor) -> Self {
        self.values.insert(input, value);
        self
    }

    pub fn set(&mut self, input: NodeId, value: Tensor) -> &mut Self {
        self.values.insert(input, value);
        self
    }

    pub fn get(&self, input: NodeId) -> Option<&Tensor> {
        self.values.get(&input)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Disables random draws for this evaluation.
    pub fn inference(mut self) -> Self {
        self.stochastic = false;
        self
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn is_stochastic(&self) -> bool {
        self.stochastic
    }

    pub(crate) fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Forward cache of one evaluation: the value of every node up to the
/// target, plus the masks drawn by stochastic nodes.
#[derive(Clone, Debug)]
pub struct Evaluation {
    graph: u64,
    values: Vec<Tensor>,
    masks: Vec<Option<Tensor>>,
}

impl Evaluation {
    /// Index of the last evaluated node.
    pub fn target(&self) -> usize {
        self.values.len() - 1
    }

    pub fn value(&self, id: NodeId) -> Result<&Tensor, TensorGraphError> {
        self.check(id)?;
        Ok(&self.values[id.index()])
    }

    /// The mask recorded by a Dropout node, if one was drawn.
    pub fn mask(&self, id: NodeId) -> Result<Option<&Tensor>, TensorGraphError> {
        self.check(id)?;
        Ok(self.masks[id.index()].as_ref())
    }

    fn check(&self, id: NodeId) -> Result<(), TensorGraphError> {
        if id.graph_uid() != self.graph || id.index() >= self.values.len() {
            return Err(TensorGraphError::InvalidIdentifier {
                id: id.index(),
                len: self.values.len(),
            });
        }
        Ok(())
    }

    /// Consumes the cache and returns the target value.
    pub fn into_target(mut self) -> Tensor {
        self.values.pop().unwrap_or_else(|| Tensor::zeros(0, 0))
    }
}

/// Adjoints of one reverse pass, one slot per graph node.
///
/// Nodes the target does not depend on, including every node created after
/// it, have no adjoint.
#[derive(Clone, Debug)]
pub struct Gradients {
    graph: u64,
    adjoints: Vec<Option<Tensor>>,
}

impl Gradients {
    /// The adjoint of `id`, or `None` when no path leads from `id` to the target.
    pub fn wrt(&self, id: NodeId) -> Result<Option<&Tensor>, TensorGraphError> {
        if id.graph_uid() != self.graph || id.index() >= self.adjoints.len() {
            return Err(TensorGraphError::InvalidIdentifier {
                id: id.index(),
                len: self.adjoints.len(),
            });
        }
        Ok(self.adjoints[id.index()].as_ref())
    }

    pub fn len(&self) -> usize {
        self.adjoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjoints.is_empty()
    }

    /// `(node index, adjoint)` for every node that received one.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Tensor)> {
        self.adjoints
            .iter()
            .enumerate()
            .filter_map(|(index, adjoint)| adjoint.as_ref().map(|a| (index, a)))
    }
}

impl Graph {
    /// Evaluates `target` and returns its value.
    pub fn evaluate(
        &self,
        params: &ParamStore,
        bindings: &Bindings,
        target: NodeId,
    ) -> Result<Tensor, TensorGraphError> {
        Ok(self.forward(params, bindings, target)?.into_target())
    }

    /// Evaluates every node up to `target` and returns the whole cache.
    pub fn forward(
        &self,
        params: &ParamStore,
        bindings: &Bindings,
        target: NodeId,
    ) -> Result<Evaluation, TensorGraphError> {
        let mut rng = bindings.rng();
        self.forward_with_rng(params, bindings, target, &mut rng)
    }

    /// Like [`Graph::forward`], drawing stochastic nodes from `rng` instead of
    /// the bindings' seed.
    pub fn forward_with_rng<R: Rng + ?Sized>(
        &self,
        params: &ParamStore,
        bindings: &Bindings,
        target: NodeId,
        rng: &mut R,
    ) -> Result<Evaluation, TensorGraphError> {
        let target = self.resolve(target)?;
        debug!(
            "graph {}: forward over nodes 0..={} (stochastic: {})",
            self.uid(),
            target,
            bindings.is_stochastic()
        );
        let mut values: Vec<Tensor> = Vec::with_capacity(target + 1);
        let mut masks: Vec<Option<Tensor>> = Vec::with_capacity(target + 1);

        for node in &self.nodes()[..=target] {
            let (value, mask) = match node.op() {
                Op::Input => {
                    let bound = bindings
                        .get(self.id_at(node.id()))
                        .ok_or(TensorGraphError::UnboundInput { node: node.id() })?;
                    if bound.shape() != node.shape() {
                        return Err(TensorGraphError::shape_mismatch(
                            node.shape(),
                            bound.shape(),
                            "input binding",
                        ));
                    }
                    (bound.clone(), None)
                }
                Op::Variable { param } => {
                    let stored = params.get(*param)?;
                    if stored.shape() != node.shape() {
                        return Err(TensorGraphError::shape_mismatch(
                            node.shape(),
                            stored.shape(),
                            "variable",
                        ));
                    }
                    (stored.clone(), None)
                }
                Op::Constant { value } => {
                    let (rows, columns) = node.shape();
                    (Tensor::full(rows, columns, *value), None)
                }
                op => {
                    let inputs: Vec<&Tensor> = node.inputs().iter().map(|&i| &values[i]).collect();
                    let forward = op.forward(&inputs, rng, bindings.is_stochastic())?;
                    (forward.value, forward.mask)
                }
            };
            trace!("node {} ({}) = {:?}", node.id(), node.op().name(), value.shape());
            values.push(value);
            masks.push(mask);
        }

        Ok(Evaluation {
            graph: self.uid(),
            values,
            masks,
        })
    }

    /// Evaluates `target` and back-propagates a ones adjoint from it.
    pub fn gradient(
        &self,
        params: &ParamStore,
        bindings: &Bindings,
        target: NodeId,
    ) -> Result<Gradients, TensorGraphError> {
        let evaluation = self.forward(params, bindings, target)?;
        self.gradient_from(&evaluation, target)
    }

    /// Back-propagates a ones adjoint through an existing forward cache.
    pub fn gradient_from(
        &self,
        evaluation: &Evaluation,
        target: NodeId,
    ) -> Result<Gradients, TensorGraphError> {
        let (rows, columns) = self.shape(target)?;
        self.gradient_with_adjoint(evaluation, target, Tensor::ones(rows, columns))
    }

    /// Back-propagates `seed` as the adjoint of `target`.
    ///
    /// Nodes are visited in descending order; a node without an adjoint is
    /// skipped, and contributions from several consumers are summed.
    pub fn gradient_with_adjoint(
        &self,
        evaluation: &Evaluation,
        target: NodeId,
        seed: Tensor,
    ) -> Result<Gradients, TensorGraphError> {
        let target_index = self.resolve(target)?;
        if evaluation.graph != self.uid() || target_index > evaluation.target() {
            return Err(TensorGraphError::InvalidIdentifier {
                id: target_index,
                len: evaluation.values.len(),
            });
        }
        let expected = self.nodes()[target_index].shape();
        if seed.shape() != expected {
            return Err(TensorGraphError::shape_mismatch(expected, seed.shape(), "gradient seed"));
        }
        debug!("graph {}: reverse from node {}", self.uid(), target_index);

        let mut adjoints: Vec<Option<Tensor>> = vec![None; self.len()];
        adjoints[target_index] = Some(seed);

        for index in (0..=target_index).rev() {
            let node = &self.nodes()[index];
            if node.op().is_leaf() {
                continue;
            }
            let adjoint = match adjoints[index].as_ref() {
                Some(adjoint) => adjoint,
                None => continue,
            };
            let inputs: Vec<&Tensor> = node
                .inputs()
                .iter()
                .map(|&i| &evaluation.values[i])
                .collect();
            let grads = node.op().reverse(
                &inputs,
                &evaluation.values[index],
                evaluation.masks[index].as_ref(),
                adjoint,
            )?;
            trace!("node {} ({}) -> {:?}", index, node.op().name(), node.inputs());
            for (&input, grad) in node.inputs().iter().zip(grads) {
                match adjoints[input].as_mut() {
                    Some(accumulated) => {
                        accumulated.add_(&grad)?;
                    }
                    None => adjoints[input] = Some(grad),
                }
            }
        }

        Ok(Gradients {
            graph: self.uid(),
            adjoints,
        })
    }
}

#[cfg(test)]
#[path = "evaluation_test.rs"]
mod tests;
