use serde::{Deserialize, Serialize};

/// Local training configuration for an executor instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrainingSpec {
    /// Finite-difference epsilon, switches the gradient path to the
    /// numerical approximation when set.
    pub approximation: Option<f64>,
    /// Worker threads for the local gradient pass.
    pub parallelism: usize,
}

/// The executor's local dataset shard, shipped inline at bootstrap.
///
/// Media decoding happens outside the engine, a shard always arrives as
/// already extracted numeric rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardSpec {
    /// Paired rows: `x_size` input values followed by `y_size` target values.
    Supervised {
        data: Vec<f64>,
        x_size: usize,
        y_size: usize,
    },
    /// Input rows only, reconstruction targets are the inputs themselves.
    Unsupervised { data: Vec<f64>, x_size: usize },
}
