//! Full loopback run: a real coordinator training against executor nodes
//! served over local TCP.

use std::time::Duration;

use tokio::net::TcpListener;

use comms::{
    msg::{Command, Msg},
    specs::ShardSpec,
};
use coordinator::{DistributedTraining, FailurePolicy};
use executor::{Executor, bootstrap};
use neural::{
    Network, Node,
    arch::{Layer, activations::ActFn},
    init::Initializer,
    settings::{LrSchedule, Settings},
};

/// Binds an ephemeral port and serves exactly one executor session on it.
async fn serve_one_session(list: TcpListener) -> executor::Result<()> {
    let (stream, _) = list.accept().await.map_err(executor::ExecutorError::Io)?;
    let (rx, tx) = stream.into_split();
    let (mut rx, tx) = comms::channel(rx, tx);

    let mut buf: Vec<u64> = Vec::new();
    let spec = loop {
        match rx.recv_into(&mut buf).await? {
            Msg::Control(Command::Bootstrap(spec)) => break *spec,
            msg => panic!("expected Bootstrap, got {msg:?}"),
        }
    };

    let (network, shard) = bootstrap::build(&spec)?;
    let executor = Executor::new(spec.executor_id, network, shard)?;
    executor.run(rx, tx).await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distributed_training_converges_on_a_linear_problem() {
    let list_a = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let list_b = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port_a = list_a.local_addr().unwrap().port();
    let port_b = list_b.local_addr().unwrap().port();

    let server_a = tokio::spawn(serve_one_session(list_a));
    let server_b = tokio::spawn(serve_one_session(list_b));

    // y = 2x, convex, so the round loop must reach the precision quickly
    let settings = Settings::default()
        .with_lr(LrSchedule::Constant { rate: 0.05 })
        .with_precision(1e-6)
        .with_iterations(200)
        .with_coordinator(Node::new("127.0.0.1", 0));

    let network = Network::compose(
        "distributed-linear",
        vec![Layer::input(1), Layer::output(1, ActFn::Identity)],
        settings,
        Initializer::Zero,
        None,
    )
    .unwrap();

    let nodes = vec![
        Node::new("127.0.0.1", port_a),
        Node::new("127.0.0.1", port_b),
    ];
    let shards = vec![
        ShardSpec::Supervised {
            data: vec![1.0, 2.0],
            x_size: 1,
            y_size: 1,
        },
        ShardSpec::Supervised {
            data: vec![2.0, 4.0],
            x_size: 1,
            y_size: 1,
        },
    ];

    let strategy = DistributedTraining::new(FailurePolicy::AbortRound { max_retries: 0 })
        .with_response_timeout(Duration::from_secs(10));

    // train fires the run and returns, join blocks on the handle
    let handle = strategy.train(network, &nodes, shards).unwrap();
    let (trained, outcome) = tokio::task::spawn_blocking(move || handle.join())
        .await
        .unwrap()
        .unwrap();

    assert!(outcome.converged(), "expected convergence, got {outcome:?}");

    let out = trained.evaluate(&[3.0]).unwrap();
    assert!((out[0] - 6.0).abs() < 0.01);

    server_a.await.unwrap().unwrap();
    server_b.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn training_fails_without_a_coordinator_node() {
    let network = Network::compose(
        "no-coordinator",
        vec![Layer::input(1), Layer::output(1, ActFn::Identity)],
        Settings::default(),
        Initializer::Zero,
        None,
    )
    .unwrap();

    let nodes = vec![Node::new("127.0.0.1", 1)];
    let shards = vec![ShardSpec::Supervised {
        data: vec![1.0, 2.0],
        x_size: 1,
        y_size: 1,
    }];

    let err = DistributedTraining::new(FailurePolicy::ProceedDegraded { min_responders: 1 })
        .train(network, &nodes, shards)
        .unwrap_err();

    assert!(matches!(err, coordinator::CoordinatorError::InvalidConfig(_)));
}
