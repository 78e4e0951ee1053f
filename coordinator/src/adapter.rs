//! Builds wire bootstrap specs from the core model types.

use comms::specs::{ActFnSpec, ExecutorSpec, LayerSpec, ShardSpec, TrainingSpec};
use neural::{
    Network,
    arch::{Layer, activations::ActFn},
};

fn act_fn_spec(act: ActFn) -> ActFnSpec {
    match act {
        ActFn::Sigmoid(s) => ActFnSpec::Sigmoid { amp: s.amp() },
        ActFn::Relu(_) => ActFnSpec::Relu,
        ActFn::Tanh(_) => ActFnSpec::Tanh,
        ActFn::Identity => ActFnSpec::Identity,
    }
}

fn layer_spec(layer: &Layer) -> LayerSpec {
    match layer {
        Layer::Input { neurons } => LayerSpec::Input { neurons: *neurons },
        Layer::Dense { neurons, act_fn } => LayerSpec::Dense {
            neurons: *neurons,
            act_fn: act_fn_spec(*act_fn),
        },
        Layer::Output { neurons, act_fn } => LayerSpec::Output {
            neurons: *neurons,
            act_fn: act_fn_spec(*act_fn),
        },
        Layer::Conv(conv) => LayerSpec::Conv {
            dim_in: conv.dim_in(),
            field: conv.field(),
            filters: conv.filters(),
            stride: conv.stride(),
            padding: conv.padding(),
            act_fn: act_fn_spec(conv.act_fn()),
        },
        Layer::Focus(inner) => LayerSpec::Focus {
            inner: Box::new(layer_spec(inner)),
        },
    }
}

/// One bootstrap spec per executor, pairing the network's wire description
/// with each executor's local data shard.
///
/// # Arguments
/// * `network` - The network being trained.
/// * `shards` - One shard per executor, index becomes the executor id.
///
/// # Returns
/// The bootstrap specs in shard order.
pub fn executor_specs(network: &Network, shards: Vec<ShardSpec>) -> Vec<ExecutorSpec> {
    let layers: Vec<LayerSpec> = network.arch().layers().iter().map(layer_spec).collect();
    let settings = network.settings();

    shards
        .into_iter()
        .enumerate()
        .map(|(executor_id, shard)| ExecutorSpec {
            executor_id,
            network_id: network.id().to_string(),
            layers: layers.clone(),
            training: TrainingSpec {
                approximation: settings.approximation.map(|a| a.epsilon),
                parallelism: settings.parallelism,
            },
            shard,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use neural::{init::Initializer, settings::Settings};

    #[test]
    fn specs_mirror_the_layer_sequence() {
        let network = Network::compose(
            "spec-map",
            vec![
                Layer::input(2),
                Layer::focus(Layer::dense(3, ActFn::sigmoid(2.))),
                Layer::output(1, ActFn::tanh()),
            ],
            Settings::default().with_parallelism(3),
            Initializer::Zero,
            None,
        )
        .unwrap();

        let shards = vec![ShardSpec::Unsupervised {
            data: vec![0.0, 1.0],
            x_size: 2,
        }];

        let specs = executor_specs(&network, shards);
        assert_eq!(specs.len(), 1);

        let spec = &specs[0];
        assert_eq!(spec.executor_id, 0);
        assert_eq!(spec.network_id, "spec-map");
        assert_eq!(spec.training.parallelism, 3);

        let LayerSpec::Focus { inner } = &spec.layers[1] else {
            panic!("expected a focus layer spec");
        };
        assert!(matches!(
            inner.as_ref(),
            LayerSpec::Dense { neurons: 3, act_fn: ActFnSpec::Sigmoid { .. } }
        ));
    }
}
