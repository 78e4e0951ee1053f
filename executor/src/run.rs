//! The executor's round loop: weights in, gradients out.
//!
//! Each round the loop reassembles the broadcast weight chunks, installs
//! them into the local network, runs one gradient pass over the local shard
//! and streams the gradient back under the same chunking limits. An abort
//! discards whatever was assembled so far.

use comms::{
    WeightAssembler, WireReceiver, WireSender,
    msg::{ChunkHeader, Command, Msg, Payload},
    plan_chunks,
};
use log::{debug, info, warn};
use ndarray::Array2;
use tokio::io::{AsyncRead, AsyncWrite};

use neural::{Network, train};

use crate::{ExecutorError, Result, metrics::ExecutorMetrics, shard::Shard};

/// An executor node serving gradient rounds for one network.
pub struct Executor {
    executor_id: usize,
    network: Network,
    shard: Shard,
    pool: rayon::ThreadPool,
    metrics: ExecutorMetrics,
}

impl Executor {
    /// Creates the executor runtime for a bootstrapped network and shard.
    ///
    /// # Arguments
    /// * `executor_id` - Identifier used for observability.
    /// * `network` - The local network copy, weights arrive per round.
    /// * `shard` - The local data shard gradients are computed against.
    ///
    /// # Returns
    /// A new executor instance, or the error its worker pool raised.
    pub fn new(executor_id: usize, network: Network, shard: Shard) -> Result<Self> {
        let pool = train::build_pool(network.settings().parallelism)?;

        Ok(Self {
            executor_id,
            network,
            shard,
            pool,
            metrics: ExecutorMetrics::default(),
        })
    }

    pub fn metrics(&self) -> &ExecutorMetrics {
        &self.metrics
    }

    /// Serves rounds until the coordinator disconnects.
    ///
    /// # Arguments
    /// * `rx` - Receiving end of the coordinator channel.
    /// * `tx` - Sending end of the coordinator channel.
    ///
    /// # Returns
    /// The accumulated metrics on graceful disconnect, or the protocol or
    /// computation error that ended the session.
    pub async fn run<R, W>(
        mut self,
        mut rx: WireReceiver<R>,
        mut tx: WireSender<W>,
    ) -> Result<ExecutorMetrics>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let dims: Vec<(usize, usize)> = self.network.weights().iter().map(|w| w.dim()).collect();
        let mut buf: Vec<u64> = Vec::new();
        let mut assembler = WeightAssembler::new(dims.clone());

        loop {
            let msg: Msg = rx.recv_into(&mut buf).await?;

            match msg {
                Msg::Data(Payload::Weights(header, values)) => {
                    assembler.accept(header, values)?;
                    self.metrics.add_chunks_in(1);
                }
                Msg::Control(Command::WeightsDone { round }) => {
                    let full = std::mem::replace(&mut assembler, WeightAssembler::new(dims.clone()));
                    self.install(full)?;

                    let (loss, sent) = self.serve_round(round, &dims, &mut tx).await?;
                    self.metrics.add_chunks_out(sent);
                    self.metrics.bump_round();

                    debug!(executor_id = self.executor_id, round = round, loss = loss; "round served");
                }
                Msg::Control(Command::Abort) => {
                    assembler = WeightAssembler::new(dims.clone());
                    self.metrics.bump_aborted();
                    info!(executor_id = self.executor_id; "round aborted, discarding in-flight work");
                }
                Msg::Control(Command::Disconnect) => {
                    info!(executor_id = self.executor_id; "coordinator disconnected");
                    return Ok(self.metrics);
                }
                Msg::Err(detail) => {
                    warn!(executor_id = self.executor_id; "coordinator error: {detail}");
                    return Err(ExecutorError::UnexpectedMsg {
                        expected: "weights or a control command",
                        got: detail.into_owned(),
                    });
                }
                msg => {
                    return Err(ExecutorError::UnexpectedMsg {
                        expected: "weights or a control command",
                        got: format!("{msg:?}"),
                    });
                }
            }
        }
    }

    fn install(&mut self, assembler: WeightAssembler) -> Result<()> {
        let weights = assembler
            .into_parts()?
            .into_iter()
            // the assembler guarantees the buffer length matches the shape
            .map(|(dim, data)| Array2::from_shape_vec(dim, data).unwrap())
            .collect();

        self.network.install_weights(weights)?;
        Ok(())
    }

    async fn serve_round<W>(
        &mut self,
        round: u64,
        dims: &[(usize, usize)],
        tx: &mut WireSender<W>,
    ) -> Result<(f64, usize)>
    where
        W: AsyncWrite + Unpin,
    {
        let samples = self.shard.samples();
        let approximation = self.network.settings().approximation.map(|a| a.epsilon);

        // CPU-bound pass, keep the reactor responsive while it runs
        let (grads, loss) = tokio::task::block_in_place(|| {
            train::batch_gradient(
                self.network.arch(),
                self.network.weights(),
                &samples,
                approximation,
                &self.pool,
            )
        })?;

        let transport = self.network.settings().transport;
        let plans = plan_chunks(dims, transport.message_group_size, transport.frame_size)?;

        for plan in &plans {
            let g = &grads[plan.matrix];
            // gradient matrices are freshly built in standard layout
            let slice = g.as_slice().unwrap();

            let header = ChunkHeader {
                matrix: plan.matrix as u32,
                rows: g.nrows() as u32,
                cols: g.ncols() as u32,
                offset: plan.offset as u64,
            };

            let msg = Msg::Data(Payload::Gradient(
                header,
                &slice[plan.offset..plan.offset + plan.len],
            ));
            tx.send(&msg).await?;
        }

        tx.send(&Msg::Control(Command::GradientDone { round, loss })).await?;
        Ok((loss, plans.len()))
    }
}
