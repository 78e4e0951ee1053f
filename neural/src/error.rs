use std::{
    error::Error,
    fmt::{self, Display},
};

use rand_distr::{NormalError, uniform::Error as UniformError};

/// The result type used across the network core.
pub type Result<T> = std::result::Result<T, NetError>;

/// The network core's error type.
///
/// Structural variants are raised at construction time and name the layer
/// or rule at fault, shape variants are raised when an evaluation or update
/// receives mismatched dimensions.
#[derive(Debug)]
pub enum NetError {
    /// A sequence needs at least an input and an output layer.
    ArchitectureTooShort { len: usize },
    /// The sequence does not start with an `Input` layer.
    MissingInput,
    /// An `Input` layer appeared after position zero.
    MisplacedInput { index: usize },
    /// The sequence does not end with an `Output` layer.
    MissingOutput { found: &'static str },
    /// An `Output` layer appeared before the last position.
    MisplacedOutput { index: usize },
    /// A `Focus` marker wraps a layer that cannot be an evaluation target.
    InvalidFocus { index: usize, kind: &'static str },
    /// More than one `Focus` marker in the sequence.
    MultipleFocus { count: usize },
    /// A convolution's receptive field exceeds its padded input.
    ConvFieldTooLarge {
        axis: &'static str,
        dim: usize,
        field: usize,
        padding: usize,
    },
    /// A convolution's stride does not divide its padded span evenly.
    ConvStrideMismatch {
        axis: &'static str,
        span: usize,
        stride: usize,
    },
    /// A convolution parameter that must be positive is zero.
    ConvZeroParam { what: &'static str },
    /// A convolution's declared input volume disagrees with its predecessor.
    ConvInputMismatch {
        index: usize,
        got: usize,
        expected: usize,
    },
    /// A dimension mismatch in an evaluation or update.
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// Weight initialization was given degenerate dimensions.
    Allocation {
        what: &'static str,
        rows: usize,
        cols: usize,
    },
    /// An initialization distribution could not be built.
    InvalidDistribution(String),
    /// A partition boundary is not strictly increasing.
    PartitionNotSorted { index: usize },
    /// A partition boundary falls outside the input sequence.
    PartitionOutOfRange { boundary: usize, len: usize },
    /// A setting value the current operation cannot work with.
    InvalidSettings {
        setting: &'static str,
        detail: String,
    },
}

impl Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::ArchitectureTooShort { len } => {
                write!(f, "a layer sequence needs at least 2 layers, got {len}")
            }
            NetError::MissingInput => {
                write!(f, "the layer sequence must start with an input layer")
            }
            NetError::MisplacedInput { index } => {
                write!(f, "found an input layer at position {index}, only position 0 is allowed")
            }
            NetError::MissingOutput { found } => {
                write!(f, "the layer sequence must end with an output layer, found {found}")
            }
            NetError::MisplacedOutput { index } => {
                write!(f, "found an output layer at position {index}, only the last position is allowed")
            }
            NetError::InvalidFocus { index, kind } => {
                write!(f, "the focus at position {index} wraps a {kind} layer, only activated hidden layers can be evaluation targets")
            }
            NetError::MultipleFocus { count } => {
                write!(f, "found {count} focus markers, at most one layer can be the evaluation target")
            }
            NetError::ConvFieldTooLarge {
                axis,
                dim,
                field,
                padding,
            } => write!(
                f,
                "convolution field {field} exceeds the padded input {axis} ({dim} + 2 * {padding})"
            ),
            NetError::ConvStrideMismatch { axis, span, stride } => write!(
                f,
                "convolution stride {stride} does not divide the padded {axis} span {span} evenly"
            ),
            NetError::ConvZeroParam { what } => {
                write!(f, "convolution {what} must be positive")
            }
            NetError::ConvInputMismatch {
                index,
                got,
                expected,
            } => write!(
                f,
                "the convolution at position {index} expects an input volume of {expected} neurons, its predecessor exposes {got}"
            ),
            NetError::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "there's a size mismatch in {what}, got {got} and expected {expected}"
            ),
            NetError::Allocation { what, rows, cols } => write!(
                f,
                "cannot allocate a {rows}x{cols} {what}, both dimensions must be positive"
            ),
            NetError::InvalidDistribution(detail) => {
                write!(f, "invalid initialization distribution: {detail}")
            }
            NetError::PartitionNotSorted { index } => {
                write!(f, "partition boundary {index} is not strictly increasing")
            }
            NetError::PartitionOutOfRange { boundary, len } => write!(
                f,
                "partition boundary {boundary} falls outside the input sequence of length {len}"
            ),
            NetError::InvalidSettings { setting, detail } => {
                write!(f, "invalid setting {setting}: {detail}")
            }
        }
    }
}

impl Error for NetError {}

impl From<NormalError> for NetError {
    fn from(value: NormalError) -> Self {
        Self::InvalidDistribution(value.to_string())
    }
}

impl From<UniformError> for NetError {
    fn from(value: UniformError) -> Self {
        Self::InvalidDistribution(value.to_string())
    }
}
