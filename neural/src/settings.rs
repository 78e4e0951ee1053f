//! Per-network configuration: schedules, convergence bounds, transport
//! limits and the optional training policies.

use std::{
    collections::HashMap,
    fmt,
    io,
    net::{SocketAddr, ToSocketAddrs},
    sync::mpsc::Sender,
};

/// A distributed participant. Coordinator and executors are both addressed
/// as `Node` values, their roles come from the protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub host: String,
    pub port: u16,
}

impl Node {
    /// Creates a new `Node`.
    ///
    /// # Arguments
    /// * `host` - The node's host name or address.
    /// * `port` - The node's port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Resolves this node to a socket address.
    ///
    /// # Returns
    /// The first resolved address, or an io error naming the node.
    pub fn resolve(&self) -> io::Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::other(format!("no address found for node {self}")))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// The learning rate as a function of the iteration index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LrSchedule {
    /// The same rate every iteration.
    Constant { rate: f64 },
    /// Multiplies the rate by `drop` once every `every` iterations.
    StepDecay { initial: f64, drop: f64, every: usize },
    /// `initial * decay^iteration`.
    ExpDecay { initial: f64, decay: f64 },
}

impl LrSchedule {
    /// The learning rate for the given iteration index.
    pub fn at(&self, iteration: usize) -> f64 {
        match *self {
            Self::Constant { rate } => rate,
            Self::StepDecay {
                initial,
                drop,
                every,
            } => initial * drop.powi((iteration / every.max(1)) as i32),
            Self::ExpDecay { initial, decay } => initial * decay.powi(iteration as i32),
        }
    }
}

/// An L2 penalty added to every weight update to discourage overfitting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regularization {
    pub lambda: f64,
}

/// Switches gradient computation to symmetric finite differences with the
/// given perturbation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Approximation {
    pub epsilon: f64,
}

/// Transport limits for distributed weight exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transport {
    /// Maximum weight elements per message.
    pub message_group_size: usize,
    /// Maximum wire message size in bytes.
    pub frame_size: usize,
}

impl Default for Transport {
    fn default() -> Self {
        Self {
            message_group_size: 1024,
            frame_size: 16 * 1024,
        }
    }
}

/// One point of the error curve, emitted per iteration when a sink is
/// configured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorPoint {
    pub iteration: usize,
    pub error: f64,
}

/// Immutable per-network configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Emit a diagnostic line per iteration.
    pub verbose: bool,
    /// The learning rate schedule.
    pub lr: LrSchedule,
    /// Error threshold, training halts once reached.
    pub precision: f64,
    /// Iteration cap, training halts once reached.
    pub iterations: usize,
    /// Worker threads for local gradient computation.
    pub parallelism: usize,
    /// The coordinator node for distributed training.
    pub coordinator: Option<Node>,
    /// Message size limits for distributed weight exchange.
    pub transport: Transport,
    /// Receives one `ErrorPoint` per iteration when set.
    pub error_sink: Option<Sender<ErrorPoint>>,
    /// The L2 penalty, no regularization when unset.
    pub regularization: Option<Regularization>,
    /// The finite-difference policy, analytic backpropagation when unset.
    pub approximation: Option<Approximation>,
    /// 0-based boundaries splitting a training sequence into segments.
    pub partitions: Option<Vec<usize>>,
    /// Free-form strategy tunables.
    pub specifics: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            verbose: false,
            lr: LrSchedule::Constant { rate: 0.1 },
            precision: 1e-3,
            iterations: 1000,
            parallelism: 1,
            coordinator: None,
            transport: Transport::default(),
            error_sink: None,
            regularization: None,
            approximation: None,
            partitions: None,
            specifics: HashMap::new(),
        }
    }
}

impl Settings {
    pub fn with_lr(mut self, lr: LrSchedule) -> Self {
        self.lr = lr;
        self
    }

    pub fn with_precision(mut self, precision: f64) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_coordinator(mut self, node: Node) -> Self {
        self.coordinator = Some(node);
        self
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_error_sink(mut self, sink: Sender<ErrorPoint>) -> Self {
        self.error_sink = Some(sink);
        self
    }

    pub fn with_regularization(mut self, lambda: f64) -> Self {
        self.regularization = Some(Regularization { lambda });
        self
    }

    pub fn with_approximation(mut self, epsilon: f64) -> Self {
        self.approximation = Some(Approximation { epsilon });
        self
    }

    pub fn with_partitions(mut self, boundaries: Vec<usize>) -> Self {
        self.partitions = Some(boundaries);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_schedule_ignores_the_iteration() {
        let lr = LrSchedule::Constant { rate: 0.5 };
        assert_eq!(lr.at(0), 0.5);
        assert_eq!(lr.at(999), 0.5);
    }

    #[test]
    fn step_decay_drops_every_interval() {
        let lr = LrSchedule::StepDecay {
            initial: 1.0,
            drop: 0.5,
            every: 10,
        };
        assert_eq!(lr.at(0), 1.0);
        assert_eq!(lr.at(9), 1.0);
        assert_eq!(lr.at(10), 0.5);
        assert_eq!(lr.at(25), 0.25);
    }

    #[test]
    fn exp_decay_compounds() {
        let lr = LrSchedule::ExpDecay {
            initial: 1.0,
            decay: 0.9,
        };
        assert!((lr.at(2) - 0.81).abs() < 1e-12);
    }
}
