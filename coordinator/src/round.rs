//! The per-round broadcast / collect / aggregate cycle.
//!
//! Per round the coordinator chunks its current weights under the transport
//! limits, broadcasts them to every executor, collects the gradient chunks
//! each executor streams back, aggregates the responses order-independently
//! and applies the single weight update. Convergence is checked against the
//! mean reported loss before updating.

use std::io;

use comms::{
    WeightAssembler,
    msg::{ChunkHeader, Command, Msg, Payload},
    plan_chunks,
};
use futures::future;
use log::{info, warn};
use ndarray::Array2;
use tokio::{
    sync::watch,
    time::{Duration, timeout},
};

use neural::{Network, train, train::Outcome};

use crate::{
    CoordinatorError, FailurePolicy,
    aggregate::{ExecutorResponse, mean_gradients},
    session::ExecutorChannel,
};

pub(crate) struct RoundLoop {
    pub channels: Vec<ExecutorChannel>,
    pub policy: FailurePolicy,
    pub response_timeout: Duration,
    pub cancel: watch::Receiver<bool>,
}

impl RoundLoop {
    /// Drives rounds until convergence, the iteration cap, a policy failure
    /// or cancellation.
    pub async fn run(mut self, network: &mut Network) -> Result<Outcome, CoordinatorError> {
        let settings = network.settings().clone();
        let dims: Vec<(usize, usize)> = network.weights().iter().map(|w| w.dim()).collect();
        let mut last_error = f64::INFINITY;

        for round in 0..settings.iterations {
            if *self.cancel.borrow() {
                self.abort().await;
                return Err(CoordinatorError::Cancelled);
            }

            let (grads, error) = self.round(network, &dims, round).await?;
            last_error = error;

            if settings.verbose {
                info!(round = round, error = error; "distributed round");
            }

            if error <= settings.precision {
                self.disconnect().await;
                return Ok(Outcome::Converged {
                    iterations: round,
                    error,
                });
            }

            train::apply_update(network, &grads, settings.lr.at(round))?;
        }

        self.disconnect().await;
        Ok(Outcome::MaxIterationsReached { error: last_error })
    }

    /// One broadcast / collect / aggregate cycle, retried per the failure
    /// policy.
    async fn round(
        &mut self,
        network: &Network,
        dims: &[(usize, usize)],
        round: usize,
    ) -> Result<(Vec<Array2<f64>>, f64), CoordinatorError> {
        let (required, attempts) = match self.policy {
            FailurePolicy::ProceedDegraded { min_responders } => (min_responders.max(1), 1),
            FailurePolicy::AbortRound { max_retries } => (self.channels.len(), max_retries + 1),
        };

        let mut responders = 0;

        for attempt in 0..attempts {
            if attempt > 0 {
                warn!(round = round, attempt = attempt; "retrying round");
            }

            self.broadcast(network, dims, round).await?;

            let response_timeout = self.response_timeout;
            let collectors = self
                .channels
                .iter_mut()
                .map(|channel| collect_one(channel, dims, response_timeout, round));

            let responses: Vec<ExecutorResponse> = future::join_all(collectors)
                .await
                .into_iter()
                .flatten()
                .collect();

            responders = responses.len();
            if responders >= required {
                return mean_gradients(&responses);
            }

            warn!(round = round, responders = responders, required = required; "round lost its quorum");
        }

        match self.policy {
            FailurePolicy::ProceedDegraded { .. } => Err(CoordinatorError::QuorumLost {
                round,
                responders,
                required,
            }),
            FailurePolicy::AbortRound { max_retries } => Err(CoordinatorError::RetriesExhausted {
                round,
                retries: max_retries,
            }),
        }
    }

    /// Chunks the current weights and sends them to every executor,
    /// followed by the end-of-weights marker.
    async fn broadcast(
        &mut self,
        network: &Network,
        dims: &[(usize, usize)],
        round: usize,
    ) -> Result<(), CoordinatorError> {
        let transport = network.settings().transport;
        let plans = plan_chunks(dims, transport.message_group_size, transport.frame_size)
            .map_err(io::Error::from)?;

        for channel in &mut self.channels {
            for plan in &plans {
                let w = &network.weights()[plan.matrix];
                // junction matrices are standard layout, the buffer is row-major
                let slice = w.as_slice().unwrap();

                let header = ChunkHeader {
                    matrix: plan.matrix as u32,
                    rows: w.nrows() as u32,
                    cols: w.ncols() as u32,
                    offset: plan.offset as u64,
                };

                let msg = Msg::Data(Payload::Weights(
                    header,
                    &slice[plan.offset..plan.offset + plan.len],
                ));
                channel.tx.send(&msg).await?;
            }

            let done = Msg::Control(Command::WeightsDone {
                round: round as u64,
            });
            channel.tx.send(&done).await?;
        }

        Ok(())
    }

    /// Tells every executor to discard in-flight work.
    async fn abort(&mut self) {
        for channel in &mut self.channels {
            let _ = channel.tx.send(&Msg::Control(Command::Abort)).await;
        }
    }

    async fn disconnect(&mut self) {
        for channel in &mut self.channels {
            let _ = channel.tx.send(&Msg::Control(Command::Disconnect)).await;
        }
    }
}

/// Collects one executor's full gradient response, dropping the executor
/// for this round on timeout or protocol violation.
async fn collect_one(
    channel: &mut ExecutorChannel,
    dims: &[(usize, usize)],
    response_timeout: Duration,
    round: usize,
) -> Option<ExecutorResponse> {
    let executor_id = channel.executor_id;
    let result = timeout(response_timeout, recv_gradient(channel, dims, round)).await;

    match result {
        Ok(Ok(response)) => Some(response),
        Ok(Err(e)) => {
            warn!(executor_id = executor_id; "dropping response: {e}");
            None
        }
        Err(_) => {
            warn!(executor_id = executor_id; "response timed out");
            None
        }
    }
}

async fn recv_gradient(
    channel: &mut ExecutorChannel,
    dims: &[(usize, usize)],
    round: usize,
) -> io::Result<ExecutorResponse> {
    let mut assembler = WeightAssembler::new(dims.to_vec());

    loop {
        let msg: Msg = channel.rx.recv_into(&mut channel.buf).await?;

        match msg {
            Msg::Data(Payload::Gradient(header, values)) => {
                assembler.accept(header, values)?;
            }
            Msg::Control(Command::GradientDone { round: r, loss }) if r == round as u64 => {
                let grads = assembler
                    .into_parts()?
                    .into_iter()
                    // the assembler guarantees the buffer length matches the shape
                    .map(|(dim, data)| Array2::from_shape_vec(dim, data).unwrap())
                    .collect();

                return Ok(ExecutorResponse {
                    executor_id: channel.executor_id,
                    grads,
                    loss,
                });
            }
            Msg::Err(detail) => {
                return Err(io::Error::other(format!("executor error: {detail}")));
            }
            msg => {
                return Err(io::Error::other(format!("unexpected message: {msg:?}")));
            }
        }
    }
}
