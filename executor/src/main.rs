use std::{env, io};

use comms::msg::{Command, Msg};
use log::{info, warn};
use tokio::{net::TcpListener, signal};

use executor::{Executor, bootstrap};

const DEFAULT_HOST: &str = "127.0.0.1";

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let addr = format!(
        "{}:{}",
        env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
        env::var("PORT").map_err(io::Error::other)?,
    );

    let list = TcpListener::bind(&addr).await?;
    info!("listening at {addr}");

    'accept: loop {
        let accepted = tokio::select! {
            accepted = list.accept() => accepted,
            _ = signal::ctrl_c() => break,
        };

        let (stream, peer) = accepted?;
        let (rx, tx) = stream.into_split();
        let (mut rx, tx) = comms::channel(rx, tx);
        info!("coordinator connected from {peer}");

        let mut buf: Vec<u64> = Vec::new();
        let spec = loop {
            match rx.recv_into(&mut buf).await {
                Ok(Msg::Control(Command::Bootstrap(spec))) => break *spec,
                Ok(msg) => warn!("expected Bootstrap, got {msg:?}"),
                Err(e) => {
                    warn!("bootstrap failed: {e}");
                    continue 'accept;
                }
            }
        };

        let (network, shard) = match bootstrap::build(&spec) {
            Ok(parts) => parts,
            Err(e) => {
                warn!("invalid bootstrap spec: {e}");
                continue;
            }
        };

        let executor = match Executor::new(spec.executor_id, network, shard) {
            Ok(executor) => executor,
            Err(e) => {
                warn!("failed to start the executor: {e}");
                continue;
            }
        };

        tokio::select! {
            result = executor.run(rx, tx) => match result {
                Ok(metrics) => info!("session finished after {} rounds", metrics.rounds),
                Err(e) => warn!("session failed: {e}"),
            },
            _ = signal::ctrl_c() => break,
        }
    }

    Ok(())
}
