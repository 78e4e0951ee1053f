pub mod gradient;
mod outcome;
pub mod partitions;
mod run;
mod supervised;
mod unsupervised;

pub use gradient::{Sample, batch_gradient, batch_loss};
pub use outcome::Outcome;
pub use run::apply_update;
pub use supervised::SupervisedTraining;
pub use unsupervised::UnsupervisedTraining;

use crate::{NetError, Result};

/// Builds the worker pool local gradient passes run on.
///
/// # Arguments
/// * `parallelism` - The thread count, degrees below one are clamped to one.
///
/// # Returns
/// The pool, or an invalid-settings error when it cannot be spawned.
pub fn build_pool(parallelism: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(parallelism.max(1))
        .build()
        .map_err(|err| NetError::InvalidSettings {
            setting: "parallelism",
            detail: err.to_string(),
        })
}
