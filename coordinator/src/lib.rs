mod adapter;
mod aggregate;
mod distributed;
mod error;
mod policy;
mod round;
mod session;

pub use adapter::executor_specs;
pub use aggregate::{ExecutorResponse, mean_gradients};
pub use distributed::{DistributedTraining, TrainingHandle};
pub use error::CoordinatorError;
pub use policy::FailurePolicy;
