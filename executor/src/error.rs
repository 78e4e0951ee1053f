use std::{fmt, io};

use comms::ProtocolError;
use neural::NetError;

/// The result type used across the executor runtime.
pub type Result<T> = std::result::Result<T, ExecutorError>;

/// All errors that can occur inside an executor node.
#[derive(Debug)]
pub enum ExecutorError {
    /// The bootstrap spec describes an invalid network or shard.
    InvalidSpec(String),
    /// The network core rejected a computation.
    Net(NetError),
    /// A wire protocol violation.
    Protocol(ProtocolError),
    /// A message arrived that the protocol state does not allow.
    UnexpectedMsg { expected: &'static str, got: String },
    /// An underlying I/O error.
    Io(io::Error),
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSpec(msg) => write!(f, "invalid bootstrap spec: {msg}"),
            Self::Net(e) => write!(f, "network core error: {e}"),
            Self::Protocol(e) => write!(f, "protocol error: {e}"),
            Self::UnexpectedMsg { expected, got } => {
                write!(f, "expected {expected}, got {got}")
            }
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for ExecutorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Net(e) => Some(e),
            Self::Protocol(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<NetError> for ExecutorError {
    fn from(e: NetError) -> Self {
        Self::Net(e)
    }
}

impl From<ProtocolError> for ExecutorError {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

impl From<io::Error> for ExecutorError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
