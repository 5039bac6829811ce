use crate::error::TensorGraphError;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// Handle to one trainable tensor inside a [`ParamStore`].
///
/// Variable nodes hold a `ParamId` rather than the tensor itself, so a graph
/// can be shared read-only while the optimizer mutates the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParamId(pub(crate) usize);

impl ParamId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Owner of the trainable state of one or more graphs.
///
/// Tensors are only appended; their shapes are fixed at insertion and every
/// replacement is shape-checked.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamStore {
    tensors: Vec<Tensor>,
}

impl ParamStore {
    pub fn new() -> Self {
        ParamStore::default()
    }

    /// Adds a tensor and returns its handle.
    pub fn insert(&mut self, tensor: Tensor) -> ParamId {
        self.tensors.push(tensor);
        ParamId(self.tensors.len() - 1)
    }

    fn check(&self, id: ParamId) -> Result<usize, TensorGraphError> {
        if id.0 >= self.tensors.len() {
            return Err(TensorGraphError::InvalidIdentifier {
                id: id.0,
                len: self.tensors.len(),
            });
        }
        Ok(id.0)
    }

    pub fn get(&self, id: ParamId) -> Result<&Tensor, TensorGraphError> {
        let index = self.check(id)?;
        Ok(&self.tensors[index])
    }

    /// Mutable access for in-place updates. The shape must not change.
    pub fn get_mut(&mut self, id: ParamId) -> Result<&mut Tensor, TensorGraphError> {
        let index = self.check(id)?;
        Ok(&mut self.tensors[index])
    }

    /// Replaces the tensor behind `id` with one of the same shape.
    pub fn set(&mut self, id: ParamId, tensor: Tensor) -> Result<(), TensorGraphError> {
        let slot = self.get_mut(id)?;
        slot.expect_same_shape(&tensor, "param_set")?;
        *slot = tensor;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamId, &Tensor)> {
        self.tensors
            .iter()
            .enumerate()
            .map(|(index, tensor)| (ParamId(index), tensor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut store = ParamStore::new();
        let a = store.insert(Tensor::ones(2, 2));
        let b = store.insert(Tensor::zeros(1, 3));
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(b).unwrap().shape(), (1, 3));
        assert_eq!(store.iter().count(), 2);
    }

    #[test]
    fn test_set_checks_shape() {
        let mut store = ParamStore::new();
        let a = store.insert(Tensor::ones(2, 2));
        store.set(a, Tensor::full(2, 2, 3.0)).unwrap();
        assert_eq!(store.get(a).unwrap().sum(), 12.0);
        assert!(matches!(
            store.set(a, Tensor::ones(1, 4)),
            Err(TensorGraphError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_handle_is_rejected() {
        let store = ParamStore::new();
        match store.get(ParamId(3)) {
            Err(TensorGraphError::InvalidIdentifier { id, len }) => {
                assert_eq!((id, len), (3, 0))
            }
            other => panic!("Expected InvalidIdentifier, got {:?}", other),
        }
    }
}
