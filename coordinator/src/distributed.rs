//! The distributed training strategy: fire the round loop against a set of
//! executor nodes and return without awaiting the result.

use std::{
    net::SocketAddr,
    thread::{self, JoinHandle},
    time::Duration,
};

use comms::specs::{ExecutorSpec, ShardSpec};
use log::warn;
use tokio::{runtime::Runtime, sync::watch};

use neural::{Network, Node, train::Outcome};

use crate::{
    CoordinatorError, FailurePolicy, adapter::executor_specs, round::RoundLoop, session,
};

/// Distributed training against remote executor nodes.
///
/// `train` connects and fires the coordinator round loop in the background,
/// returning immediately. The returned handle joins or cancels the run, the
/// actual convergence is driven by the round protocol.
pub struct DistributedTraining {
    policy: FailurePolicy,
    response_timeout: Duration,
}

impl DistributedTraining {
    /// Creates the strategy with an explicit partial-failure policy.
    ///
    /// # Arguments
    /// * `policy` - What to do when executors miss a round.
    pub fn new(policy: FailurePolicy) -> Self {
        Self {
            policy,
            response_timeout: Duration::from_secs(30),
        }
    }

    /// Overrides how long the coordinator waits for each executor response.
    pub fn with_response_timeout(mut self, response_timeout: Duration) -> Self {
        self.response_timeout = response_timeout;
        self
    }

    /// Starts training `network` against `nodes`, each seeded with its own
    /// data shard, and returns without blocking for a result.
    ///
    /// # Arguments
    /// * `network` - The network to train, moved into the background run.
    /// * `nodes` - The executor nodes to train against.
    /// * `shards` - One local data shard per node.
    ///
    /// # Returns
    /// A handle to the running training, or the configuration error that
    /// prevented the start.
    pub fn train(
        self,
        network: Network,
        nodes: &[Node],
        shards: Vec<ShardSpec>,
    ) -> Result<TrainingHandle, CoordinatorError> {
        if nodes.is_empty() {
            return Err(CoordinatorError::InvalidConfig(
                "at least one executor node is required".into(),
            ));
        }
        if nodes.len() != shards.len() {
            return Err(CoordinatorError::InvalidConfig(format!(
                "{} executor nodes but {} shards",
                nodes.len(),
                shards.len()
            )));
        }
        if network.settings().coordinator.is_none() {
            return Err(CoordinatorError::InvalidConfig(
                "distributed training requires the coordinator node setting".into(),
            ));
        }

        check_distributed_settings(&network);

        let specs = executor_specs(&network, shards);
        let mut targets: Vec<(SocketAddr, ExecutorSpec)> = Vec::with_capacity(nodes.len());

        for (node, spec) in nodes.iter().zip(specs) {
            let addr = node
                .resolve()
                .map_err(|source| CoordinatorError::ConnectionFailed {
                    addr: node.to_string(),
                    source,
                })?;
            targets.push((addr, spec));
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let policy = self.policy;
        let response_timeout = self.response_timeout;

        let join = thread::spawn(move || {
            let runtime = Runtime::new().map_err(CoordinatorError::Io)?;
            let mut network = network;

            let outcome = runtime.block_on(async {
                let channels = session::connect(&targets).await?;

                let round_loop = RoundLoop {
                    channels,
                    policy,
                    response_timeout,
                    cancel: cancel_rx,
                };

                round_loop.run(&mut network).await
            })?;

            Ok((network, outcome))
        });

        Ok(TrainingHandle {
            cancel: cancel_tx,
            join,
        })
    }
}

/// Warns about settings the distributed strategy has no use for. The run
/// proceeds with them ignored.
fn check_distributed_settings(network: &Network) {
    if network.settings().partitions.is_some() {
        warn!(strategy = "distributed"; "partitions setting is unused by distributed training, ignoring");
    }
}

/// A distributed training run executing in the background.
#[derive(Debug)]
pub struct TrainingHandle {
    cancel: watch::Sender<bool>,
    join: JoinHandle<Result<(Network, Outcome), CoordinatorError>>,
}

impl TrainingHandle {
    /// Requests cancellation: no further rounds are issued and executors
    /// are told to discard in-flight work.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Whether the background run has terminated.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Blocks until the run terminates, yielding the trained network and
    /// its terminal state.
    pub fn join(self) -> Result<(Network, Outcome), CoordinatorError> {
        match self.join.join() {
            Ok(result) => result,
            Err(_) => Err(CoordinatorError::InvalidConfig(
                "the training thread panicked".into(),
            )),
        }
    }
}
