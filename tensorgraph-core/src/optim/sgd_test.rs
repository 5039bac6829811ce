#[cfg(test)]
mod tests {
    use crate::{
        autograd::{Bindings, Graph, NodeId},
        error::TensorGraphError,
        optim::optimizer_state::OptimizerState,
        optim::optimizer_trait::Optimizer,
        optim::sgd::{SgdConfig, SgdOptimizer},
        parameter::{ParamId, ParamStore},
        tensor::Tensor,
        utils::testing::check_tensor_near,
    };
    use std::sync::Arc;

    // loss = sum(x * w); d loss / d w = x
    fn linear_graph() -> (Arc<Graph>, ParamStore, NodeId, NodeId, NodeId, ParamId) {
        let mut graph = Graph::new();
        let mut params = ParamStore::new();
        let x = graph.input(1, 2);
        let w = graph.parameter(&mut params, Tensor::row_vector(&[1.0, 2.0]));
        let y = graph.mul(x, w).unwrap();
        let loss = graph.collapse_sum(y).unwrap();
        let param = graph.param_of(w).unwrap().unwrap();
        (Arc::new(graph), params, x, w, loss, param)
    }

    #[test]
    fn test_sgd_basic_step() -> Result<(), TensorGraphError> {
        let (graph, mut params, x, w, loss, param) = linear_graph();
        let mut optimizer =
            SgdOptimizer::new(graph, vec![w], SgdConfig { learning_rate: 0.1 })?;
        let bindings = Bindings::new().bind(x, Tensor::row_vector(&[0.5, -1.0]));

        let value = optimizer.minimize(&mut params, loss, &bindings)?;
        assert_eq!(value, 0.5 - 2.0);
        check_tensor_near(params.get(param)?, (1, 2), &[0.95, 2.1], 1e-12);
        assert!(optimizer.accumulator().is_empty());
        Ok(())
    }

    #[test]
    fn test_sgd_accumulates_until_cleared() -> Result<(), TensorGraphError> {
        let (graph, mut params, x, w, loss, param) = linear_graph();
        let mut optimizer = SgdOptimizer::new(graph, vec![w], SgdConfig { learning_rate: 1.0 })?;

        for sample in [[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]] {
            let bindings = Bindings::new().bind(x, Tensor::row_vector(&sample));
            optimizer.accumulate_gradients(&params, loss, &bindings)?;
        }
        check_tensor_near(optimizer.accumulator().get(w.index()).unwrap(), (1, 2), &[2.0, 2.0], 0.0);
        optimizer.apply_gradients(&mut params)?;
        check_tensor_near(params.get(param)?, (1, 2), &[-1.0, 0.0], 0.0);

        // Without a clear the same sums are applied again.
        optimizer.apply_gradients(&mut params)?;
        check_tensor_near(params.get(param)?, (1, 2), &[-3.0, -2.0], 0.0);

        optimizer.clear_gradients();
        optimizer.apply_gradients(&mut params)?;
        check_tensor_near(params.get(param)?, (1, 2), &[-3.0, -2.0], 0.0);
        Ok(())
    }

    #[test]
    fn test_sgd_rejects_non_variables() {
        let (graph, _params, x, _w, _loss, _param) = linear_graph();
        match SgdOptimizer::new(graph, vec![x], SgdConfig::default()) {
            Err(TensorGraphError::InvalidParameter { reason, .. }) => {
                assert!(reason.contains("input"))
            }
            other => panic!("Expected InvalidParameter, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_sgd_rejects_duplicate_variables() {
        let (graph, _params, _x, w, _loss, _param) = linear_graph();
        match SgdOptimizer::new(graph, vec![w, w], SgdConfig { learning_rate: 0.1 }) {
            Err(TensorGraphError::InvalidParameter { reason, .. }) => {
                assert!(reason.contains("more than once"))
            }
            other => panic!("Expected InvalidParameter, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_sgd_trains_with_variable_created_after_loss() -> Result<(), TensorGraphError> {
        let mut graph = Graph::new();
        let mut params = ParamStore::new();
        let x = graph.input(1, 2);
        let w1 = graph.parameter(&mut params, Tensor::row_vector(&[1.0, 2.0]));
        let y1 = graph.mul(x, w1)?;
        let loss1 = graph.collapse_sum(y1)?;
        let w2 = graph.parameter(&mut params, Tensor::row_vector(&[3.0, 4.0]));
        let _head2 = graph.mul(x, w2)?;
        let p1 = graph.param_of(w1)?.unwrap();
        let p2 = graph.param_of(w2)?.unwrap();

        let mut optimizer =
            SgdOptimizer::new(Arc::new(graph), vec![w1, w2], SgdConfig { learning_rate: 0.1 })?;
        let bindings = Bindings::new().bind(x, Tensor::row_vector(&[1.0, 1.0]));
        optimizer.minimize(&mut params, loss1, &bindings)?;

        check_tensor_near(params.get(p1)?, (1, 2), &[0.9, 1.9], 1e-12);
        // w2 does not feed loss1 and stays put.
        check_tensor_near(params.get(p2)?, (1, 2), &[3.0, 4.0], 0.0);
        Ok(())
    }

    #[test]
    fn test_sgd_config_validation() {
        let (graph, _params, _x, w, _loss, _param) = linear_graph();
        assert_eq!(SgdConfig::default().learning_rate, 0.01);
        assert!(SgdOptimizer::new(graph.clone(), vec![w], SgdConfig { learning_rate: 0.0 }).is_err());
        let mut optimizer = SgdOptimizer::new(graph, vec![w], SgdConfig::default()).unwrap();
        assert!(optimizer.set_learning_rate(f64::NAN).is_err());
        optimizer.set_learning_rate(0.5).unwrap();
        assert_eq!(optimizer.learning_rate(), 0.5);
    }

    #[test]
    fn test_sgd_state_dict() -> Result<(), TensorGraphError> {
        let (graph, _params, _x, w, _loss, _param) = linear_graph();
        let mut optimizer = SgdOptimizer::new(graph, vec![w], SgdConfig { learning_rate: 0.3 })?;
        let state = optimizer.state_dict();
        assert_eq!(state, OptimizerState::Sgd { learning_rate: 0.3 });

        optimizer.set_learning_rate(0.1)?;
        optimizer.load_state_dict(&state)?;
        assert_eq!(optimizer.learning_rate(), 0.3);

        let foreign = OptimizerState::Momentum {
            learning_rate: 0.1,
            momentum: 0.9,
            velocities: Default::default(),
        };
        assert!(optimizer.load_state_dict(&foreign).is_err());
        Ok(())
    }
}
