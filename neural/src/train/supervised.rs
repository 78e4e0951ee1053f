//! Supervised training against paired input/target sequences.

use log::warn;

use crate::{NetError, Result, network::Network, train::{Outcome, run}};

/// The supervised training strategy: iterates until the error against the
/// provided targets reaches the configured precision or the iteration cap.
#[derive(Clone, Copy, Debug, Default)]
pub struct SupervisedTraining;

impl SupervisedTraining {
    pub fn new() -> Self {
        Self
    }

    /// Trains `network` in place on paired samples.
    ///
    /// # Arguments
    /// * `network` - The network whose weights are optimized.
    /// * `inputs` - The input sequence.
    /// * `targets` - The expected outputs, paired by index with `inputs`.
    ///
    /// # Returns
    /// The terminal state of the run, or the error that stopped it.
    pub fn train(
        &self,
        network: &mut Network,
        inputs: &[Vec<f64>],
        targets: &[Vec<f64>],
    ) -> Result<Outcome> {
        if inputs.len() != targets.len() {
            return Err(NetError::ShapeMismatch {
                what: "targets",
                got: targets.len(),
                expected: inputs.len(),
            });
        }

        check_local_settings(network, "supervised");
        run::run(network, inputs, targets, "supervised")
    }
}

/// Warns about settings a local strategy has no use for. The run proceeds
/// with them ignored, an incompatibility here is never an error.
pub(crate) fn check_local_settings(network: &Network, strategy: &'static str) {
    if let Some(node) = &network.settings().coordinator {
        let addr = node.to_string();
        warn!(strategy = strategy, coordinator = addr.as_str(); "coordinator setting is unused by a local strategy, ignoring");
    }
}
