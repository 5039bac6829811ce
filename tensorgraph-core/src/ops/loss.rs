// Loss-fused output nodes.
//
// SoftmaxLoss and SigmoidLoss output the activated logits. Their reverse rule
// is the cross-entropy gradient `activation - target`, which does not depend
// on the adjoint arriving from above.

use crate::error::TensorGraphError;
use crate::ops::scalar;
use crate::tensor::Tensor;

/// Row-wise softmax.
pub(crate) fn softmax_forward(logits: &Tensor) -> Tensor {
    let mut output = logits.clone();
    let columns = output.columns();
    if columns > 0 {
        output
            .data_mut()
            .chunks_mut(columns)
            .for_each(scalar::softmax_in_place);
    }
    output
}

/// Returns `[output - target, 0]`: the logits adjoint and a zero target adjoint.
pub(crate) fn fused_reverse(
    output: &Tensor,
    target: &Tensor,
) -> Result<Vec<Tensor>, TensorGraphError> {
    Ok(vec![output.sub(target)?, target.zeros_like()])
}
