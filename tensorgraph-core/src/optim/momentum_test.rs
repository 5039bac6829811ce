#[cfg(test)]
mod tests {
    use crate::{
        autograd::{Bindings, Graph, NodeId},
        error::TensorGraphError,
        optim::momentum::{MomentumConfig, MomentumOptimizer},
        optim::optimizer_state::OptimizerState,
        optim::optimizer_trait::Optimizer,
        parameter::ParamStore,
        tensor::Tensor,
        utils::testing::check_tensor_near,
    };
    use std::collections::BTreeMap;
    use std::sync::Arc;

    // loss = sum(x * w); d loss / d w = x
    fn setup(config: MomentumConfig) -> (MomentumOptimizer, ParamStore, NodeId, NodeId, NodeId) {
        let mut graph = Graph::new();
        let mut params = ParamStore::new();
        let x = graph.input(1, 2);
        let w = graph.parameter(&mut params, Tensor::zeros(1, 2));
        let y = graph.mul(x, w).unwrap();
        let loss = graph.collapse_sum(y).unwrap();
        let optimizer = MomentumOptimizer::new(Arc::new(graph), vec![w], config).unwrap();
        (optimizer, params, x, w, loss)
    }

    #[test]
    fn test_first_step_seeds_velocity() -> Result<(), TensorGraphError> {
        let config = MomentumConfig {
            learning_rate: 0.5,
            momentum: 0.9,
        };
        let (mut optimizer, mut params, x, w, loss) = setup(config);
        let first = Bindings::new().bind(x, Tensor::row_vector(&[1.0, 2.0]));
        optimizer.minimize(&mut params, loss, &first)?;
        check_tensor_near(optimizer.velocity(w).unwrap(), (1, 2), &[1.0, 2.0], 1e-12);
        let param = optimizer.graph().param_of(w)?.unwrap();
        check_tensor_near(params.get(param)?, (1, 2), &[-0.5, -1.0], 1e-12);

        // v = 0.9 * [1, 2] + 0.1 * [3, -2] = [1.2, 1.6]
        let second = Bindings::new().bind(x, Tensor::row_vector(&[3.0, -2.0]));
        optimizer.minimize(&mut params, loss, &second)?;
        check_tensor_near(optimizer.velocity(w).unwrap(), (1, 2), &[1.2, 1.6], 1e-12);
        check_tensor_near(params.get(param)?, (1, 2), &[-1.1, -1.8], 1e-12);
        Ok(())
    }

    #[test]
    fn test_empty_apply_keeps_velocity() -> Result<(), TensorGraphError> {
        let (mut optimizer, mut params, x, w, loss) = setup(MomentumConfig::default());
        optimizer.apply_gradients(&mut params)?;
        assert!(optimizer.velocity(w).is_none());

        let bindings = Bindings::new().bind(x, Tensor::ones(1, 2));
        optimizer.minimize(&mut params, loss, &bindings)?;
        let before = optimizer.velocity(w).cloned();
        optimizer.apply_gradients(&mut params)?;
        assert_eq!(optimizer.velocity(w).cloned(), before);
        Ok(())
    }

    #[test]
    fn test_config_validation() {
        let defaults = MomentumConfig::default();
        assert_eq!((defaults.learning_rate, defaults.momentum), (0.01, 0.9));

        let mut graph = Graph::new();
        let mut params = ParamStore::new();
        let w = graph.parameter(&mut params, Tensor::zeros(1, 1));
        let graph = Arc::new(graph);
        let bad = MomentumConfig {
            learning_rate: 0.1,
            momentum: 1.0,
        };
        assert!(matches!(
            MomentumOptimizer::new(graph, vec![w], bad),
            Err(TensorGraphError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_duplicate_variables_rejected() {
        let mut graph = Graph::new();
        let mut params = ParamStore::new();
        let w = graph.parameter(&mut params, Tensor::zeros(1, 2));
        let result = MomentumOptimizer::new(Arc::new(graph), vec![w, w], MomentumConfig::default());
        assert!(matches!(
            result,
            Err(TensorGraphError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_state_dict_round_trip() -> Result<(), TensorGraphError> {
        let (mut optimizer, mut params, x, w, loss) = setup(MomentumConfig::default());
        let bindings = Bindings::new().bind(x, Tensor::row_vector(&[0.3, -0.7]));
        optimizer.minimize(&mut params, loss, &bindings)?;
        let state = optimizer.state_dict();

        let (mut restored, _params, _x, restored_w, _loss) = setup(MomentumConfig {
            learning_rate: 0.2,
            momentum: 0.5,
        });
        restored.load_state_dict(&state)?;
        assert_eq!(restored.state_dict(), state);
        assert_eq!(restored.momentum(), 0.9);
        assert_eq!(restored.velocity(restored_w), optimizer.velocity(w));
        Ok(())
    }

    #[test]
    fn test_load_state_checks_shapes_and_skips_unknown_nodes() -> Result<(), TensorGraphError> {
        let (mut optimizer, _params, _x, w, _loss) = setup(MomentumConfig::default());

        let mut velocities = BTreeMap::new();
        velocities.insert(w.index(), Tensor::ones(1, 2));
        velocities.insert(99, Tensor::ones(3, 3));
        optimizer.load_state_dict(&OptimizerState::Momentum {
            learning_rate: 0.05,
            momentum: 0.8,
            velocities,
        })?;
        assert_eq!(optimizer.velocity(w), Some(&Tensor::ones(1, 2)));
        assert_eq!(optimizer.learning_rate(), 0.05);

        let mut wrong = BTreeMap::new();
        wrong.insert(w.index(), Tensor::ones(2, 1));
        let result = optimizer.load_state_dict(&OptimizerState::Momentum {
            learning_rate: 0.05,
            momentum: 0.8,
            velocities: wrong,
        });
        assert!(matches!(result, Err(TensorGraphError::ShapeMismatch { .. })));
        // a failed load leaves the previous state in place
        assert_eq!(optimizer.velocity(w), Some(&Tensor::ones(1, 2)));
        Ok(())
    }
}
