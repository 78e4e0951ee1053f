use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// Errors raised by the wire protocol layer: framing violations and
/// chunking limit violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The frame size cannot carry a single weight element next to the
    /// message headers.
    FrameTooSmall { frame_size: usize, needed: usize },
    /// A chunk referenced a matrix index outside the payload.
    MatrixOutOfRange { matrix: usize, matrices: usize },
    /// A chunk declared dimensions that disagree with the expected shape.
    DimMismatch {
        matrix: usize,
        got: (usize, usize),
        expected: (usize, usize),
    },
    /// A chunk's element range falls outside its matrix.
    ChunkOutOfBounds {
        matrix: usize,
        offset: usize,
        len: usize,
        size: usize,
    },
    /// A chunk covered elements that were already received this round.
    OverlappingChunk { matrix: usize, offset: usize },
    /// Payload reassembly finished with holes.
    IncompletePayload { matrix: usize, missing: usize },
}

impl Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::FrameTooSmall { frame_size, needed } => write!(
                f,
                "frame size {frame_size} cannot carry a single element, at least {needed} bytes are needed"
            ),
            ProtocolError::MatrixOutOfRange { matrix, matrices } => write!(
                f,
                "chunk references matrix {matrix} but the payload only has {matrices}"
            ),
            ProtocolError::DimMismatch {
                matrix,
                got,
                expected,
            } => write!(
                f,
                "chunk for matrix {matrix} declares dimensions {}x{}, expected {}x{}",
                got.0, got.1, expected.0, expected.1
            ),
            ProtocolError::ChunkOutOfBounds {
                matrix,
                offset,
                len,
                size,
            } => write!(
                f,
                "chunk for matrix {matrix} covers elements {offset}..{} of a {size} element matrix",
                offset + len
            ),
            ProtocolError::OverlappingChunk { matrix, offset } => write!(
                f,
                "chunk for matrix {matrix} at offset {offset} overlaps already received elements"
            ),
            ProtocolError::IncompletePayload { matrix, missing } => write!(
                f,
                "payload is incomplete, matrix {matrix} is missing {missing} elements"
            ),
        }
    }
}

impl Error for ProtocolError {}

impl From<ProtocolError> for io::Error {
    fn from(err: ProtocolError) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, err)
    }
}
