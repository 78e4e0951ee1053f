use std::borrow::Cow;

use tokio::io::{self, DuplexStream, ReadHalf, WriteHalf};

use comms::{
    WireReceiver, WireSender,
    msg::{ChunkHeader, Command, Msg, Payload},
    specs::{ActFnSpec, ExecutorSpec, LayerSpec, ShardSpec, TrainingSpec},
};

fn channel_pair() -> (
    (
        WireReceiver<ReadHalf<DuplexStream>>,
        WireSender<WriteHalf<DuplexStream>>,
    ),
    (
        WireReceiver<ReadHalf<DuplexStream>>,
        WireSender<WriteHalf<DuplexStream>>,
    ),
) {
    let (one, two) = io::duplex(4096);
    let (rx1, tx1) = io::split(one);
    let (rx2, tx2) = io::split(two);
    (comms::channel(rx1, tx1), comms::channel(rx2, tx2))
}

#[tokio::test]
async fn control_round_trip() -> io::Result<()> {
    let ((_, mut tx), (mut rx, _)) = channel_pair();

    tx.send(&Msg::Control(Command::WeightsDone { round: 7 })).await?;

    let mut buf: Vec<u64> = Vec::new();
    let msg: Msg = rx.recv_into(&mut buf).await?;

    assert!(matches!(
        msg,
        Msg::Control(Command::WeightsDone { round: 7 })
    ));
    Ok(())
}

#[tokio::test]
async fn weight_chunk_round_trip() -> io::Result<()> {
    let ((_, mut tx), (mut rx, _)) = channel_pair();

    let values = [1.5, -2.25, 0.0, 3.75];
    let header = ChunkHeader {
        matrix: 1,
        rows: 2,
        cols: 4,
        offset: 4,
    };

    tx.send(&Msg::Data(Payload::Weights(header, &values))).await?;

    let mut buf: Vec<u64> = Vec::new();
    let msg: Msg = rx.recv_into(&mut buf).await?;

    let Msg::Data(Payload::Weights(got_header, got_values)) = msg else {
        panic!("expected a weights chunk, got {msg:?}");
    };

    assert_eq!(got_header, header);
    assert_eq!(got_values, values);
    Ok(())
}

#[tokio::test]
async fn gradient_chunk_keeps_its_kind() -> io::Result<()> {
    let ((_, mut tx), (mut rx, _)) = channel_pair();

    let values = [0.125; 3];
    let header = ChunkHeader {
        matrix: 0,
        rows: 1,
        cols: 3,
        offset: 0,
    };

    tx.send(&Msg::Data(Payload::Gradient(header, &values))).await?;

    let mut buf: Vec<u64> = Vec::new();
    let msg: Msg = rx.recv_into(&mut buf).await?;

    assert!(matches!(msg, Msg::Data(Payload::Gradient(_, _))));
    Ok(())
}

#[tokio::test]
async fn error_message_round_trip() -> io::Result<()> {
    let ((_, mut tx), (mut rx, _)) = channel_pair();

    tx.send(&Msg::Err(Cow::Borrowed("executor 3 rejected the shard")))
        .await?;

    let mut buf: Vec<u64> = Vec::new();
    let msg: Msg = rx.recv_into(&mut buf).await?;

    let Msg::Err(detail) = msg else {
        panic!("expected an error message, got {msg:?}");
    };
    assert_eq!(detail, "executor 3 rejected the shard");
    Ok(())
}

#[tokio::test]
async fn bootstrap_spec_round_trip() -> io::Result<()> {
    let ((_, mut tx), (mut rx, _)) = channel_pair();

    let spec = ExecutorSpec {
        executor_id: 2,
        network_id: "xor".to_string(),
        layers: vec![
            LayerSpec::Input { neurons: 2 },
            LayerSpec::Dense {
                neurons: 3,
                act_fn: ActFnSpec::Sigmoid { amp: 1.0 },
            },
            LayerSpec::Output {
                neurons: 1,
                act_fn: ActFnSpec::Sigmoid { amp: 1.0 },
            },
        ],
        training: TrainingSpec {
            approximation: None,
            parallelism: 2,
        },
        shard: ShardSpec::Supervised {
            data: vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            x_size: 2,
            y_size: 1,
        },
    };

    tx.send(&Msg::Control(Command::Bootstrap(Box::new(spec)))).await?;

    let mut buf: Vec<u64> = Vec::new();
    let msg: Msg = rx.recv_into(&mut buf).await?;

    let Msg::Control(Command::Bootstrap(got)) = msg else {
        panic!("expected a bootstrap command, got {msg:?}");
    };

    assert_eq!(got.executor_id, 2);
    assert_eq!(got.network_id, "xor");
    assert_eq!(got.layers.len(), 3);
    assert!(matches!(
        got.shard,
        ShardSpec::Supervised { x_size: 2, y_size: 1, .. }
    ));
    Ok(())
}
