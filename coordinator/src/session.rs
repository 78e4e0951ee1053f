//! Connection setup against the executor nodes.

use std::net::SocketAddr;

use comms::{
    WireReceiver, WireSender,
    msg::{Command, Msg},
    specs::ExecutorSpec,
};
use log::info;
use tokio::net::{
    TcpStream,
    tcp::{OwnedReadHalf, OwnedWriteHalf},
};

use crate::CoordinatorError;

pub(crate) type NetRx = WireReceiver<OwnedReadHalf>;
pub(crate) type NetTx = WireSender<OwnedWriteHalf>;

/// One connected executor: its channel halves and receive buffer.
pub(crate) struct ExecutorChannel {
    pub executor_id: usize,
    pub rx: NetRx,
    pub tx: NetTx,
    pub buf: Vec<u64>,
}

/// Connects to every executor node and sends its bootstrap spec.
///
/// # Arguments
/// * `targets` - The resolved address and bootstrap spec of each executor.
///
/// # Returns
/// The open channels, or a connection error naming the unreachable node.
pub(crate) async fn connect(
    targets: &[(SocketAddr, ExecutorSpec)],
) -> Result<Vec<ExecutorChannel>, CoordinatorError> {
    let mut channels = Vec::with_capacity(targets.len());

    for (addr, spec) in targets {
        let stream =
            TcpStream::connect(addr)
                .await
                .map_err(|source| CoordinatorError::ConnectionFailed {
                    addr: addr.to_string(),
                    source,
                })?;

        let (rx, tx) = stream.into_split();
        let (rx, mut tx) = comms::channel(rx, tx);

        let msg = Msg::Control(Command::Bootstrap(Box::new(spec.clone())));
        tx.send(&msg).await?;

        let addr = addr.to_string();
        info!(executor_id = spec.executor_id, addr = addr.as_str(); "executor bootstrapped");

        channels.push(ExecutorChannel {
            executor_id: spec.executor_id,
            rx,
            tx,
            buf: Vec::new(),
        });
    }

    Ok(channels)
}
