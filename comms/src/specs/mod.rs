use serde::{Deserialize, Serialize};

pub mod model;
pub mod training;

pub use model::{ActFnSpec, LayerSpec};
pub use training::{ShardSpec, TrainingSpec};

/// Wire-level bootstrap specification for an executor node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorSpec {
    /// Executor identifier assigned by the coordinator.
    pub executor_id: usize,
    /// Identifier of the network being trained.
    pub network_id: String,
    /// Ordered layer sequence of the network.
    pub layers: Vec<LayerSpec>,
    /// Local training configuration.
    pub training: TrainingSpec,
    /// The executor's local data shard.
    pub shard: ShardSpec,
}
