use serde::{Deserialize, Serialize};

/// Activation function specification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActFnSpec {
    Sigmoid { amp: f64 },
    Relu,
    Tanh,
    Identity,
}

/// Wire-level layer description mirroring the core layer model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSpec {
    Input {
        neurons: usize,
    },
    Dense {
        neurons: usize,
        act_fn: ActFnSpec,
    },
    Output {
        neurons: usize,
        act_fn: ActFnSpec,
    },
    Conv {
        dim_in: (usize, usize, usize),
        field: (usize, usize),
        filters: usize,
        stride: usize,
        padding: usize,
        act_fn: ActFnSpec,
    },
    Focus {
        inner: Box<LayerSpec>,
    },
}
