//! Structural soundness checks for layer sequences.
//!
//! Validation happens before any weight allocation: an invalid sequence
//! never produces partial or zeroed matrices.

use super::layers::Layer;
use crate::{NetError, Result};

/// A layer sequence that passed every structural soundness rule, together
/// with the derived shape of each trainable junction.
///
/// This is the only token the weight provider and the network accept, so an
/// `Arch` can never describe a malformed architecture.
#[derive(Clone, Debug, PartialEq)]
pub struct Arch {
    layers: Vec<Layer>,
    junctions: Vec<(usize, usize)>,
}

impl Arch {
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// The `(rows, cols)` weight matrix shape of each junction, one per
    /// adjacent layer pair.
    pub fn junctions(&self) -> &[(usize, usize)] {
        &self.junctions
    }

    pub fn input_neurons(&self) -> usize {
        self.layers[0].neurons()
    }

    pub fn output_neurons(&self) -> usize {
        // validation guarantees at least two layers
        self.layers[self.layers.len() - 1].neurons()
    }
}

/// Validates an ordered layer sequence.
///
/// A sound sequence starts with exactly one `Input`, ends with exactly one
/// `Output`, carries at most one `Focus` marker wrapping an activated hidden
/// layer, and chains convolution volumes consistently.
///
/// # Arguments
/// * `layers` - The proposed sequence.
///
/// # Returns
/// The validated architecture token, or the first rule the sequence
/// violates, naming the offending layer.
pub fn validate(layers: Vec<Layer>) -> Result<Arch> {
    if layers.len() < 2 {
        return Err(NetError::ArchitectureTooShort { len: layers.len() });
    }

    if !matches!(layers[0], Layer::Input { .. }) {
        return Err(NetError::MissingInput);
    }

    for (index, layer) in layers.iter().enumerate().skip(1) {
        if matches!(layer.effective(), Layer::Input { .. }) {
            return Err(NetError::MisplacedInput { index });
        }
    }

    let last = layers.len() - 1;
    if !matches!(layers[last], Layer::Output { .. }) {
        return Err(NetError::MissingOutput {
            found: layers[last].kind(),
        });
    }

    for (index, layer) in layers.iter().enumerate().take(last).skip(1) {
        match layer {
            Layer::Output { .. } => return Err(NetError::MisplacedOutput { index }),
            Layer::Focus(inner) => match inner.as_ref() {
                Layer::Dense { .. } | Layer::Conv(_) => {}
                other => {
                    return Err(NetError::InvalidFocus {
                        index,
                        kind: other.kind(),
                    });
                }
            },
            _ => {}
        }
    }

    let focused = layers
        .iter()
        .filter(|layer| matches!(layer, Layer::Focus(_)))
        .count();
    if focused > 1 {
        return Err(NetError::MultipleFocus { count: focused });
    }

    let mut junctions = Vec::with_capacity(layers.len() - 1);

    for (index, pair) in layers.windows(2).enumerate() {
        let prev = &pair[0];

        match pair[1].effective() {
            Layer::Dense { neurons, .. } | Layer::Output { neurons, .. } => {
                junctions.push((*neurons, prev.neurons()));
            }
            Layer::Conv(conv) => {
                // geometry holds by construction, check the volume contract
                if conv.in_neurons() != prev.neurons() {
                    return Err(NetError::ConvInputMismatch {
                        index: index + 1,
                        got: prev.neurons(),
                        expected: conv.in_neurons(),
                    });
                }
                junctions.push(conv.bank_dim());
            }
            // inputs past position 0 and nested focus are rejected above
            Layer::Input { .. } | Layer::Focus(_) => unreachable!(),
        }
    }

    Ok(Arch { layers, junctions })
}
