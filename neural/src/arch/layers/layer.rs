use std::fmt;

use super::Conv;
use crate::arch::activations::ActFn;

/// One layer of an architecture. Values are immutable, geometry and
/// activation are fixed at construction.
#[derive(Clone, Debug, PartialEq)]
pub enum Layer {
    /// Marks the sequence start, carries only dimensionality.
    Input { neurons: usize },
    /// A hidden fully-connected layer.
    Dense { neurons: usize, act_fn: ActFn },
    /// Marks the sequence end.
    Output { neurons: usize, act_fn: ActFn },
    /// A convolution over an input volume.
    Conv(Conv),
    /// Marks the wrapped layer as the evaluation target instead of the
    /// final output, used for autoencoder-style extraction.
    Focus(Box<Layer>),
}

impl Layer {
    pub fn input(neurons: usize) -> Self {
        Self::Input { neurons }
    }

    pub fn dense(neurons: usize, act_fn: ActFn) -> Self {
        Self::Dense { neurons, act_fn }
    }

    pub fn output(neurons: usize, act_fn: ActFn) -> Self {
        Self::Output { neurons, act_fn }
    }

    pub fn focus(inner: Layer) -> Self {
        Self::Focus(Box::new(inner))
    }

    /// The neuron count this layer exposes to its successor.
    pub fn neurons(&self) -> usize {
        match self {
            Self::Input { neurons }
            | Self::Dense { neurons, .. }
            | Self::Output { neurons, .. } => *neurons,
            Self::Conv(conv) => conv.neurons(),
            Self::Focus(inner) => inner.neurons(),
        }
    }

    /// The activation function, when this layer applies one.
    pub fn act_fn(&self) -> Option<ActFn> {
        match self {
            Self::Input { .. } => None,
            Self::Dense { act_fn, .. } | Self::Output { act_fn, .. } => Some(*act_fn),
            Self::Conv(conv) => Some(conv.act_fn()),
            Self::Focus(inner) => inner.act_fn(),
        }
    }

    /// Unwraps `Focus` markers down to the carried layer.
    pub fn effective(&self) -> &Layer {
        match self {
            Self::Focus(inner) => inner.effective(),
            other => other,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Input { .. } => "input",
            Self::Dense { .. } => "dense",
            Self::Output { .. } => "output",
            Self::Conv(_) => "conv",
            Self::Focus(_) => "focus",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input { neurons } => write!(f, "input({neurons})"),
            Self::Dense { neurons, .. } => write!(f, "dense({neurons})"),
            Self::Output { neurons, .. } => write!(f, "output({neurons})"),
            Self::Conv(conv) => {
                let (w, h, d) = conv.dim_in();
                write!(
                    f,
                    "conv({w}x{h}x{d} -> {}x{}x{})",
                    conv.out_w(),
                    conv.out_h(),
                    conv.out_depth()
                )
            }
            Self::Focus(inner) => write!(f, "focus({inner})"),
        }
    }
}
