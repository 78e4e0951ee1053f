use std::fmt;

use ndarray::{Array2, ArrayView1};

use crate::{
    NetError, Result,
    arch::{Arch, Conv, Layer, validate},
    init::{Initializer, provide},
    settings::Settings,
};

/// The aggregate of an identifier, settings, a validated layer sequence and
/// the weight matrices.
///
/// Weights are mutated in place by the training strategies and only read
/// during forward evaluation.
#[derive(Debug)]
pub struct Network {
    id: String,
    settings: Settings,
    arch: Arch,
    weights: Vec<Array2<f64>>,
}

impl Network {
    /// The sole public construction entry point: validates the layer
    /// sequence, allocates the initial weights and assembles the network.
    ///
    /// # Arguments
    /// * `id` - A caller-chosen identifier used in diagnostics.
    /// * `layers` - The ordered layer sequence.
    /// * `settings` - The network's configuration.
    /// * `initializer` - The initial weight distribution.
    /// * `seed` - Fixes the weight initialization when set.
    ///
    /// # Returns
    /// A trainable network, or the structural rule the sequence violates.
    /// No weights are allocated for an invalid sequence.
    pub fn compose(
        id: impl Into<String>,
        layers: Vec<Layer>,
        settings: Settings,
        initializer: Initializer,
        seed: Option<u64>,
    ) -> Result<Self> {
        let arch = validate(layers)?;
        let weights = provide(&arch, initializer, seed)?;

        Ok(Self {
            id: id.into(),
            settings,
            arch,
            weights,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn arch(&self) -> &Arch {
        &self.arch
    }

    pub fn weights(&self) -> &[Array2<f64>] {
        &self.weights
    }

    pub(crate) fn weights_mut(&mut self) -> &mut [Array2<f64>] {
        &mut self.weights
    }

    /// Overwrites the weight values in place with externally supplied
    /// matrices, junction by junction.
    ///
    /// # Arguments
    /// * `weights` - One matrix per junction, shapes must match exactly.
    ///
    /// # Returns
    /// A shape error when the supplied matrices disagree with the
    /// architecture.
    pub fn install_weights(&mut self, weights: Vec<Array2<f64>>) -> Result<()> {
        if weights.len() != self.weights.len() {
            return Err(NetError::ShapeMismatch {
                what: "weight matrices",
                got: weights.len(),
                expected: self.weights.len(),
            });
        }

        for (current, new) in self.weights.iter().zip(&weights) {
            if current.dim() != new.dim() {
                return Err(NetError::ShapeMismatch {
                    what: "weight matrix",
                    got: new.len(),
                    expected: current.len(),
                });
            }
        }

        for (current, new) in self.weights.iter_mut().zip(&weights) {
            current.assign(new);
        }

        Ok(())
    }

    /// Forward-propagates `input` through every layer in order.
    ///
    /// When the sequence carries a `Focus` marker the evaluation returns at
    /// the marked layer's activation, otherwise at the final output. Pure:
    /// weights are only read, and always locally.
    ///
    /// # Arguments
    /// * `input` - The input vector, its length must match the input layer.
    ///
    /// # Returns
    /// The activation at the evaluation target, or a shape error.
    pub fn evaluate(&self, input: &[f64]) -> Result<Vec<f64>> {
        propagate(&self.arch, &self.weights, input, true)
    }
}

impl fmt::Display for Network {
    /// Renders the topology and the weight matrices, for inspection only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "network {}", self.id)?;

        for layer in self.arch.layers() {
            writeln!(f, "  {layer}")?;
        }

        for (i, w) in self.weights.iter().enumerate() {
            let (rows, cols) = w.dim();
            writeln!(f, "junction {i} ({rows}x{cols}):")?;
            writeln!(f, "{w}")?;
        }

        Ok(())
    }
}

/// Forward pass shared by evaluation and training.
///
/// # Arguments
/// * `arch` - The validated architecture.
/// * `weights` - The junction matrices.
/// * `input` - The input vector.
/// * `honor_focus` - Stop at a `Focus` marker instead of the final output.
///
/// # Returns
/// The activation at the chosen target.
pub(crate) fn propagate(
    arch: &Arch,
    weights: &[Array2<f64>],
    input: &[f64],
    honor_focus: bool,
) -> Result<Vec<f64>> {
    let layers = arch.layers();
    let expected = layers[0].neurons();

    if input.len() != expected {
        return Err(NetError::ShapeMismatch {
            what: "input",
            got: input.len(),
            expected,
        });
    }

    let mut a = input.to_vec();

    for (layer, w) in layers[1..].iter().zip(weights) {
        let (z, act) = match layer.effective() {
            Layer::Dense { act_fn, .. } | Layer::Output { act_fn, .. } => {
                (w.dot(&ArrayView1::from(&a[..])).to_vec(), *act_fn)
            }
            Layer::Conv(conv) => (conv_forward(conv, w, &a), conv.act_fn()),
            // validation rejects inputs and nested focus past position 0
            Layer::Input { .. } | Layer::Focus(_) => unreachable!(),
        };

        a = z.iter().map(|&v| act.f(v)).collect();

        if honor_focus && matches!(layer, Layer::Focus(_)) {
            return Ok(a);
        }
    }

    Ok(a)
}

/// Slides each filter of `bank` over the padded input volume.
///
/// Volumes are laid out channel-major: the value at `(channel, y, x)` lives
/// at `channel * w * h + y * w + x`.
pub(crate) fn conv_forward(conv: &Conv, bank: &Array2<f64>, input: &[f64]) -> Vec<f64> {
    let (w, h, depth) = conv.dim_in();
    let (fw, fh) = conv.field();
    let (ow, oh) = (conv.out_w(), conv.out_h());
    let stride = conv.stride();
    let padding = conv.padding() as isize;

    let mut out = vec![0.0; conv.neurons()];

    for f in 0..conv.filters() {
        for oy in 0..oh {
            for ox in 0..ow {
                let mut acc = 0.0;

                for c in 0..depth {
                    for ky in 0..fh {
                        for kx in 0..fw {
                            let iy = (oy * stride + ky) as isize - padding;
                            let ix = (ox * stride + kx) as isize - padding;

                            // zero padding
                            if iy < 0 || ix < 0 || iy >= h as isize || ix >= w as isize {
                                continue;
                            }

                            let x = input[c * w * h + iy as usize * w + ix as usize];
                            let k = bank[[f, c * fh * fw + ky * fw + kx]];
                            acc += x * k;
                        }
                    }
                }

                out[f * ow * oh + oy * ow + ox] = acc;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::activations::ActFn;

    fn linear_net(weights: Vec<Array2<f64>>) -> Network {
        let mut network = Network::compose(
            "test",
            vec![
                Layer::input(2),
                Layer::dense(2, ActFn::Identity),
                Layer::output(1, ActFn::Identity),
            ],
            Settings::default(),
            Initializer::Zero,
            None,
        )
        .unwrap();

        network.install_weights(weights).unwrap();
        network
    }

    #[test]
    fn evaluate_matches_a_hand_computed_pass() {
        let w1 = Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let w2 = Array2::from_shape_vec((1, 2), vec![0.5, -1.0]).unwrap();
        let network = linear_net(vec![w1, w2]);

        // hidden = [1*1 + 2*2, 3*1 + 4*2] = [5, 11]; out = 0.5*5 - 1*11
        let out = network.evaluate(&[1.0, 2.0]).unwrap();
        assert_eq!(out, vec![-8.5]);
    }

    #[test]
    fn evaluate_is_deterministic() {
        let network = Network::compose(
            "det",
            vec![
                Layer::input(3),
                Layer::dense(4, ActFn::sigmoid(1.)),
                Layer::output(2, ActFn::sigmoid(1.)),
            ],
            Settings::default(),
            Initializer::Uniform { low: -1., high: 1. },
            Some(11),
        )
        .unwrap();

        let a = network.evaluate(&[0.1, 0.2, 0.3]).unwrap();
        let b = network.evaluate(&[0.1, 0.2, 0.3]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn evaluate_rejects_a_mismatched_input() {
        let network = Network::compose(
            "bad-input",
            vec![
                Layer::input(3),
                Layer::dense(2, ActFn::sigmoid(1.)),
                Layer::output(1, ActFn::sigmoid(1.)),
            ],
            Settings::default(),
            Initializer::Zero,
            None,
        )
        .unwrap();

        let err = network.evaluate(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            NetError::ShapeMismatch { what: "input", got: 2, expected: 3 }
        ));
    }

    #[test]
    fn focus_returns_the_marked_activation() {
        let mut network = Network::compose(
            "focused",
            vec![
                Layer::input(2),
                Layer::focus(Layer::dense(2, ActFn::Identity)),
                Layer::output(1, ActFn::Identity),
            ],
            Settings::default(),
            Initializer::Zero,
            None,
        )
        .unwrap();

        let w1 = Array2::from_shape_vec((2, 2), vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        let w2 = Array2::from_shape_vec((1, 2), vec![1.0, 1.0]).unwrap();
        network.install_weights(vec![w1, w2]).unwrap();

        // evaluation stops at the focused layer, the output junction is skipped
        let out = network.evaluate(&[3.0, 4.0]).unwrap();
        assert_eq!(out, vec![3.0, 4.0]);
    }

    #[test]
    fn conv_forward_matches_a_hand_computed_volume() {
        // 5x5x1 input counting 0..25, one all-ones 3x3 filter, stride 1,
        // no padding: each output is its 3x3 window sum
        let conv = Conv::new((5, 5, 1), (3, 3), 1, 1, 0, ActFn::Identity).unwrap();
        let bank = Array2::from_shape_vec((1, 9), vec![1.0; 9]).unwrap();
        let input: Vec<f64> = (0..25).map(|i| i as f64).collect();

        let out = conv_forward(&conv, &bank, &input);
        assert_eq!(
            out,
            vec![54.0, 63.0, 72.0, 99.0, 108.0, 117.0, 144.0, 153.0, 162.0]
        );
    }

    #[test]
    fn conv_padding_reaches_the_borders() {
        // 2x2x1 input, 3x3 all-ones filter, stride 1, padding 1: output is
        // 2x2, each cell sums the whole input (every window covers it all)
        let conv = Conv::new((2, 2, 1), (3, 3), 1, 1, 1, ActFn::Identity).unwrap();
        let bank = Array2::from_shape_vec((1, 9), vec![1.0; 9]).unwrap();

        let out = conv_forward(&conv, &bank, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(out, vec![10.0, 10.0, 10.0, 10.0]);
    }

    #[test]
    fn install_weights_rejects_mismatched_shapes() {
        let mut network = Network::compose(
            "install",
            vec![
                Layer::input(2),
                Layer::dense(2, ActFn::Identity),
                Layer::output(1, ActFn::Identity),
            ],
            Settings::default(),
            Initializer::Zero,
            None,
        )
        .unwrap();

        let wrong = vec![Array2::zeros((3, 2)), Array2::zeros((1, 2))];
        let err = network.install_weights(wrong).unwrap_err();
        assert!(matches!(err, NetError::ShapeMismatch { .. }));
    }
}
