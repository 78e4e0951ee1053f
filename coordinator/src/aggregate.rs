//! Order-independent aggregation of executor responses.

use ndarray::Array2;

use crate::CoordinatorError;

/// One executor's answer for a round: its mean local gradients and its
/// local loss.
#[derive(Debug, Clone)]
pub struct ExecutorResponse {
    pub executor_id: usize,
    pub grads: Vec<Array2<f64>>,
    pub loss: f64,
}

/// Averages gradients and losses across responders.
///
/// The reduction is commutative summation, so the aggregate does not depend
/// on the order in which responses arrived.
///
/// # Arguments
/// * `responses` - The responses of one round, must be non-empty.
///
/// # Returns
/// The mean gradient matrices and the mean reported loss.
pub fn mean_gradients(
    responses: &[ExecutorResponse],
) -> Result<(Vec<Array2<f64>>, f64), CoordinatorError> {
    let Some(first) = responses.first() else {
        return Err(CoordinatorError::InvalidConfig(
            "cannot aggregate an empty response set".into(),
        ));
    };

    let mut grads: Vec<Array2<f64>> = first.grads.iter().map(|g| Array2::zeros(g.dim())).collect();
    let mut loss = 0.0;

    for response in responses {
        if response.grads.len() != grads.len() {
            return Err(CoordinatorError::ExecutorError {
                executor_id: response.executor_id,
                msg: format!(
                    "returned {} gradient matrices, expected {}",
                    response.grads.len(),
                    grads.len()
                ),
            });
        }

        for (acc, g) in grads.iter_mut().zip(&response.grads) {
            if acc.dim() != g.dim() {
                return Err(CoordinatorError::ExecutorError {
                    executor_id: response.executor_id,
                    msg: format!(
                        "returned a {:?} gradient matrix, expected {:?}",
                        g.dim(),
                        acc.dim()
                    ),
                });
            }

            *acc += g;
        }

        loss += response.loss;
    }

    let n = responses.len() as f64;
    for g in &mut grads {
        *g /= n;
    }

    Ok((grads, loss / n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(executor_id: usize, values: [f64; 4], loss: f64) -> ExecutorResponse {
        ExecutorResponse {
            executor_id,
            grads: vec![Array2::from_shape_vec((2, 2), values.to_vec()).unwrap()],
            loss,
        }
    }

    #[test]
    fn aggregation_is_order_independent() {
        let a = response(0, [1.0, 2.0, 3.0, 4.0], 0.5);
        let b = response(1, [-1.0, 0.0, 1.0, 2.0], 0.7);
        let c = response(2, [0.5, 0.5, 0.5, 0.5], 0.3);

        let ordered = [a.clone(), b.clone(), c.clone()];
        let permuted = [c, a, b];

        let (g1, l1) = mean_gradients(&ordered).unwrap();
        let (g2, l2) = mean_gradients(&permuted).unwrap();

        assert_eq!(g1, g2);
        assert!((l1 - l2).abs() < 1e-12);
    }

    #[test]
    fn the_mean_is_taken_over_responders() {
        let a = response(0, [2.0, 2.0, 2.0, 2.0], 1.0);
        let b = response(1, [4.0, 4.0, 4.0, 4.0], 3.0);

        let (grads, loss) = mean_gradients(&[a, b]).unwrap();

        assert!(grads[0].iter().all(|&v| v == 3.0));
        assert_eq!(loss, 2.0);
    }

    #[test]
    fn an_empty_response_set_is_rejected() {
        let err = mean_gradients(&[]).unwrap_err();
        assert!(matches!(err, CoordinatorError::InvalidConfig(_)));
    }

    #[test]
    fn a_mismatched_responder_is_named() {
        let a = response(0, [1.0, 1.0, 1.0, 1.0], 1.0);
        let b = ExecutorResponse {
            executor_id: 7,
            grads: vec![],
            loss: 0.0,
        };

        let err = mean_gradients(&[a, b]).unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::ExecutorError { executor_id: 7, .. }
        ));
    }
}
