use crate::error::TensorGraphError;
use crate::tensor::Tensor;
use std::collections::BTreeMap;

/// Running sum of gradients per trainable node, keyed by node index.
///
/// The first gradient for a node is stored as is; later ones are added to it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GradientAccumulator {
    sums: BTreeMap<usize, Tensor>,
}

impl GradientAccumulator {
    pub fn new() -> Self {
        GradientAccumulator::default()
    }

    pub fn add(&mut self, node: usize, gradient: &Tensor) -> Result<(), TensorGraphError> {
        match self.sums.get_mut(&node) {
            Some(sum) => {
                sum.add_(gradient)?;
            }
            None => {
                self.sums.insert(node, gradient.clone());
            }
        }
        Ok(())
    }

    pub fn get(&self, node: usize) -> Option<&Tensor> {
        self.sums.get(&node)
    }

    pub fn clear(&mut self) {
        self.sums.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sums.len()
    }
}
