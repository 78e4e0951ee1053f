//! The iteration loop shared by the local training strategies.
//!
//! Each iteration measures the error on a stable weight snapshot, checks
//! the convergence guard, then computes gradients and applies the single
//! in-place update. The loop owns exclusive write access for the update
//! step.

use log::debug;
use ndarray::Array2;

use crate::{
    NetError, Result,
    network::Network,
    settings::ErrorPoint,
    train::{
        Outcome, build_pool,
        gradient::{Sample, batch_gradient, batch_loss},
        partitions,
    },
};

/// Applies one weight update in place:
/// `W ← W − lr · (gradient + λ · W)`.
///
/// The regularization term is zero when the network carries no
/// regularization policy.
///
/// # Arguments
/// * `network` - The network whose weights are updated.
/// * `grads` - One gradient matrix per junction.
/// * `lr` - The learning rate for this iteration.
///
/// # Returns
/// A shape error when the gradients disagree with the weight matrices.
pub fn apply_update(network: &mut Network, grads: &[Array2<f64>], lr: f64) -> Result<()> {
    let lambda = network
        .settings()
        .regularization
        .map(|r| r.lambda)
        .unwrap_or(0.0);

    if grads.len() != network.weights().len() {
        return Err(NetError::ShapeMismatch {
            what: "gradients",
            got: grads.len(),
            expected: network.weights().len(),
        });
    }

    for (w, g) in network.weights_mut().iter_mut().zip(grads) {
        if w.dim() != g.dim() {
            return Err(NetError::ShapeMismatch {
                what: "gradient matrix",
                got: g.len(),
                expected: w.len(),
            });
        }

        w.zip_mut_with(g, |w, &g| *w -= lr * (g + lambda * *w));
    }

    Ok(())
}

/// Runs the shared training loop over paired samples.
///
/// When `settings.partitions` is set the sample sequence is split at the
/// given boundaries and each segment gets its own gradient pass and update
/// within an iteration.
pub(crate) fn run(
    network: &mut Network,
    inputs: &[Vec<f64>],
    targets: &[Vec<f64>],
    strategy: &'static str,
) -> Result<Outcome> {
    if inputs.len() != targets.len() {
        return Err(NetError::ShapeMismatch {
            what: "targets",
            got: targets.len(),
            expected: inputs.len(),
        });
    }
    if inputs.is_empty() {
        return Err(NetError::ShapeMismatch {
            what: "inputs",
            got: 0,
            expected: 1,
        });
    }

    let settings = network.settings().clone();
    let pool = build_pool(settings.parallelism)?;

    let samples: Vec<Sample> = inputs
        .iter()
        .zip(targets)
        .map(|(x, y)| (x.as_slice(), y.as_slice()))
        .collect();

    let segments = match &settings.partitions {
        Some(boundaries) => partitions::split(samples.len(), boundaries)?,
        None => vec![0..samples.len()],
    };

    let approximation = settings.approximation.map(|a| a.epsilon);

    for iteration in 0..settings.iterations {
        let error = batch_loss(network.arch(), network.weights(), &samples)?;

        if let Some(sink) = &settings.error_sink {
            // a closed sink only loses the curve, never the run
            let _ = sink.send(ErrorPoint { iteration, error });
        }

        if settings.verbose {
            debug!(strategy = strategy, iteration = iteration, error = error; "training iteration");
        }

        if error <= settings.precision {
            return Ok(Outcome::Converged { iterations: iteration, error });
        }

        let lr = settings.lr.at(iteration);

        for segment in &segments {
            let (grads, _) = batch_gradient(
                network.arch(),
                network.weights(),
                &samples[segment.clone()],
                approximation,
                &pool,
            )?;

            apply_update(network, &grads, lr)?;
        }
    }

    let error = batch_loss(network.arch(), network.weights(), &samples)?;
    Ok(Outcome::MaxIterationsReached { error })
}
