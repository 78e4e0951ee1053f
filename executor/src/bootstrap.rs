//! Turns a wire bootstrap spec into a runnable local network and shard.

use comms::specs::{ActFnSpec, ExecutorSpec, LayerSpec};
use neural::{
    Network,
    arch::{Conv, Layer, activations::ActFn},
    init::Initializer,
    settings::{Approximation, Settings},
};

use crate::{Result, shard::Shard};

fn act_fn(spec: ActFnSpec) -> ActFn {
    match spec {
        ActFnSpec::Sigmoid { amp } => ActFn::sigmoid(amp),
        ActFnSpec::Relu => ActFn::relu(),
        ActFnSpec::Tanh => ActFn::tanh(),
        ActFnSpec::Identity => ActFn::Identity,
    }
}

fn layer(spec: &LayerSpec) -> Result<Layer> {
    let layer = match spec {
        LayerSpec::Input { neurons } => Layer::input(*neurons),
        LayerSpec::Dense { neurons, act_fn: af } => Layer::dense(*neurons, act_fn(*af)),
        LayerSpec::Output { neurons, act_fn: af } => Layer::output(*neurons, act_fn(*af)),
        LayerSpec::Conv {
            dim_in,
            field,
            filters,
            stride,
            padding,
            act_fn: af,
        } => Layer::Conv(Conv::new(
            *dim_in, *field, *filters, *stride, *padding,
            act_fn(*af),
        )?),
        LayerSpec::Focus { inner } => Layer::focus(layer(inner)?),
    };

    Ok(layer)
}

/// Builds the local network and shard an executor trains with.
///
/// The local weights start zeroed, the authoritative values arrive with the
/// first broadcast round.
///
/// # Arguments
/// * `spec` - The bootstrap spec received from the coordinator.
///
/// # Returns
/// The assembled network and shard, or the structural error the spec
/// carries.
pub fn build(spec: &ExecutorSpec) -> Result<(Network, Shard)> {
    let layers = spec
        .layers
        .iter()
        .map(layer)
        .collect::<Result<Vec<_>>>()?;

    let settings = Settings {
        parallelism: spec.training.parallelism,
        approximation: spec.training.approximation.map(|epsilon| Approximation { epsilon }),
        ..Settings::default()
    };

    let network = Network::compose(
        spec.network_id.clone(),
        layers,
        settings,
        Initializer::Zero,
        None,
    )?;
    let shard = Shard::from_spec(&spec.shard)?;

    Ok((network, shard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use comms::specs::{ShardSpec, TrainingSpec};

    #[test]
    fn a_spec_builds_a_validated_network() {
        let spec = ExecutorSpec {
            executor_id: 0,
            network_id: "built".to_string(),
            layers: vec![
                LayerSpec::Input { neurons: 2 },
                LayerSpec::Dense {
                    neurons: 3,
                    act_fn: ActFnSpec::Tanh,
                },
                LayerSpec::Output {
                    neurons: 1,
                    act_fn: ActFnSpec::Identity,
                },
            ],
            training: TrainingSpec {
                approximation: Some(1e-6),
                parallelism: 2,
            },
            shard: ShardSpec::Supervised {
                data: vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
                x_size: 2,
                y_size: 1,
            },
        };

        let (network, shard) = build(&spec).unwrap();

        assert_eq!(network.id(), "built");
        assert_eq!(network.arch().junctions(), &[(3, 2), (1, 3)]);
        assert!(network.settings().approximation.is_some());
        assert_eq!(shard.len(), 2);
    }

    #[test]
    fn an_invalid_layer_sequence_is_rejected() {
        let spec = ExecutorSpec {
            executor_id: 0,
            network_id: "broken".to_string(),
            layers: vec![LayerSpec::Input { neurons: 2 }],
            training: TrainingSpec {
                approximation: None,
                parallelism: 1,
            },
            shard: ShardSpec::Unsupervised {
                data: vec![0.0, 0.0],
                x_size: 2,
            },
        };

        let err = build(&spec).unwrap_err();
        assert!(matches!(err, crate::ExecutorError::Net(_)));
    }
}
