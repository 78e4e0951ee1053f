//! The executor's local slice of training data.

use comms::specs::ShardSpec;

use crate::{ExecutorError, Result};

/// Already-extracted numeric rows an executor trains against.
///
/// Decoding media into numbers happens outside the engine, a shard only
/// ever carries vectors.
#[derive(Debug, Clone)]
pub struct Shard {
    inputs: Vec<Vec<f64>>,
    targets: Vec<Vec<f64>>,
}

impl Shard {
    /// Builds the shard from its wire form, validating row geometry.
    ///
    /// # Arguments
    /// * `spec` - The shard description received at bootstrap.
    ///
    /// # Returns
    /// The shard, or an invalid-spec error naming the geometry violation.
    pub fn from_spec(spec: &ShardSpec) -> Result<Self> {
        match spec {
            ShardSpec::Supervised {
                data,
                x_size,
                y_size,
            } => Self::rows(data, *x_size, *y_size),
            ShardSpec::Unsupervised { data, x_size } => {
                let shard = Self::rows(data, *x_size, 0)?;

                // reconstruction targets are the inputs themselves
                Ok(Self {
                    targets: shard.inputs.clone(),
                    inputs: shard.inputs,
                })
            }
        }
    }

    fn rows(data: &[f64], x_size: usize, y_size: usize) -> Result<Self> {
        if x_size == 0 {
            return Err(ExecutorError::InvalidSpec(
                "shard rows need at least one input value".into(),
            ));
        }
        if data.is_empty() {
            return Err(ExecutorError::InvalidSpec("shard carries no samples".into()));
        }

        let row = x_size + y_size;
        if data.len() % row != 0 {
            return Err(ExecutorError::InvalidSpec(format!(
                "shard data length {} is not a multiple of the row size {row}",
                data.len()
            )));
        }

        let mut inputs = Vec::with_capacity(data.len() / row);
        let mut targets = Vec::with_capacity(data.len() / row);

        for chunk in data.chunks_exact(row) {
            inputs.push(chunk[..x_size].to_vec());
            targets.push(chunk[x_size..].to_vec());
        }

        Ok(Self { inputs, targets })
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Borrowed `(input, target)` pairs for the gradient pass.
    pub fn samples(&self) -> Vec<(&[f64], &[f64])> {
        self.inputs
            .iter()
            .zip(&self.targets)
            .map(|(x, y)| (x.as_slice(), y.as_slice()))
            .collect()
    }
}
