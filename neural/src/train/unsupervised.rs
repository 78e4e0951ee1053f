//! Unsupervised training: the loss is defined against the network's own
//! reconstruction of each input.

use crate::{
    Result,
    network::Network,
    train::{Outcome, run, supervised::check_local_settings},
};

/// The unsupervised training strategy. Reconstruction targets are the
/// inputs themselves, so the output layer must mirror the input
/// dimensionality (the usual autoencoder shape, typically with a `Focus`
/// marker on the bottleneck layer).
#[derive(Clone, Copy, Debug, Default)]
pub struct UnsupervisedTraining;

impl UnsupervisedTraining {
    pub fn new() -> Self {
        Self
    }

    /// Trains `network` in place to reconstruct its inputs.
    ///
    /// # Arguments
    /// * `network` - The network whose weights are optimized.
    /// * `inputs` - The input sequence, also serving as targets.
    ///
    /// # Returns
    /// The terminal state of the run, or the error that stopped it.
    pub fn train(&self, network: &mut Network, inputs: &[Vec<f64>]) -> Result<Outcome> {
        check_local_settings(network, "unsupervised");
        run::run(network, inputs, inputs, "unsupervised")
    }
}
