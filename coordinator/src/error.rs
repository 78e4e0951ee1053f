use std::{fmt, io};

use neural::NetError;

/// All errors that can occur on the coordinator side of distributed
/// training.
#[derive(Debug)]
pub enum CoordinatorError {
    /// Invalid configuration, caught before connecting.
    InvalidConfig(String),
    /// Failed to connect to an executor node.
    ConnectionFailed { addr: String, source: io::Error },
    /// An executor produced an unrecoverable error during a round.
    ExecutorError { executor_id: usize, msg: String },
    /// A round ended with fewer responders than the failure policy allows.
    QuorumLost {
        round: usize,
        responders: usize,
        required: usize,
    },
    /// A round kept failing and the retry budget is exhausted.
    RetriesExhausted { round: usize, retries: usize },
    /// The run was cancelled by its owner.
    Cancelled,
    /// The network core rejected an update.
    Net(NetError),
    /// An underlying I/O error not covered by the above variants.
    Io(io::Error),
}

impl fmt::Display for CoordinatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::ConnectionFailed { addr, source } => {
                write!(f, "connection failed to {addr}: {source}")
            }
            Self::ExecutorError { executor_id, msg } => {
                write!(f, "executor {executor_id} error: {msg}")
            }
            Self::QuorumLost {
                round,
                responders,
                required,
            } => write!(
                f,
                "round {round} lost its quorum, {responders} of the required {required} executors responded"
            ),
            Self::RetriesExhausted { round, retries } => {
                write!(f, "round {round} failed after {retries} retries")
            }
            Self::Cancelled => write!(f, "the training run was cancelled"),
            Self::Net(e) => write!(f, "network core error: {e}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for CoordinatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ConnectionFailed { source, .. } => Some(source),
            Self::Net(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CoordinatorError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<NetError> for CoordinatorError {
    fn from(e: NetError) -> Self {
        Self::Net(e)
    }
}
