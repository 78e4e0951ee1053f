//! Initial weight production for validated architectures.
//!
//! One matrix per trainable junction, populated from the chosen
//! distribution. Seeded runs are deterministic: the same seed always yields
//! the same weights.

use ndarray::Array2;
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal, Uniform};

use crate::{NetError, Result, arch::Arch};

/// The initialization policy for a network's weight matrices.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Initializer {
    /// All weights zero.
    Zero,
    /// All weights a fixed value.
    Const { value: f64 },
    /// Uniform random in `[low, high)`.
    Uniform { low: f64, high: f64 },
    /// Normal random with the given mean and standard deviation.
    Normal { mean: f64, std_dev: f64 },
    /// Uniform random in the Xavier/Glorot range derived from each
    /// junction's fan-in and fan-out.
    XavierUniform,
}

/// Produces one weight matrix per trainable junction of `arch`.
///
/// # Arguments
/// * `arch` - A validated architecture.
/// * `initializer` - The distribution weights are drawn from.
/// * `seed` - Fixes the random source. Identical seeds produce identical
///            weights, `None` draws a fresh seed from the system.
///
/// # Returns
/// The junction matrices in layer order, or an allocation error for
/// degenerate dimensions.
pub fn provide(arch: &Arch, initializer: Initializer, seed: Option<u64>) -> Result<Vec<Array2<f64>>> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    arch.junctions()
        .iter()
        .map(|&(rows, cols)| matrix(rows, cols, initializer, &mut rng))
        .collect()
}

fn matrix<R: Rng>(
    rows: usize,
    cols: usize,
    initializer: Initializer,
    rng: &mut R,
) -> Result<Array2<f64>> {
    if rows == 0 || cols == 0 {
        return Err(NetError::Allocation {
            what: "junction matrix",
            rows,
            cols,
        });
    }

    let values = match initializer {
        Initializer::Zero => vec![0.0; rows * cols],
        Initializer::Const { value } => vec![value; rows * cols],
        Initializer::Uniform { low, high } => sample(Uniform::new(low, high)?, rows * cols, rng),
        Initializer::Normal { mean, std_dev } => {
            sample(Normal::new(mean, std_dev)?, rows * cols, rng)
        }
        Initializer::XavierUniform => {
            // fan_out = rows, fan_in = cols for a (neurons_out, neurons_in) matrix
            let range = (6. / (rows + cols) as f64).sqrt();
            sample(Uniform::new(-range, range)?, rows * cols, rng)
        }
    };

    // the vec length matches rows * cols by construction
    Ok(Array2::from_shape_vec((rows, cols), values).unwrap())
}

fn sample<D, R>(distribution: D, n: usize, rng: &mut R) -> Vec<f64>
where
    D: Distribution<f64>,
    R: Rng,
{
    (0..n).map(|_| distribution.sample(rng)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{Layer, activations::ActFn, validate};

    fn arch() -> Arch {
        validate(vec![
            Layer::input(2),
            Layer::dense(3, ActFn::sigmoid(1.)),
            Layer::output(1, ActFn::sigmoid(1.)),
        ])
        .unwrap()
    }

    #[test]
    fn shapes_match_the_junctions() {
        let arch = arch();
        let weights = provide(&arch, Initializer::XavierUniform, Some(7)).unwrap();

        let dims: Vec<_> = weights.iter().map(|w| w.dim()).collect();
        assert_eq!(dims, arch.junctions());
    }

    #[test]
    fn identical_seeds_yield_identical_weights() {
        let arch = arch();
        let a = provide(&arch, Initializer::Uniform { low: -1., high: 1. }, Some(42)).unwrap();
        let b = provide(&arch, Initializer::Uniform { low: -1., high: 1. }, Some(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_diverge() {
        let arch = arch();
        let a = provide(&arch, Initializer::Uniform { low: -1., high: 1. }, Some(1)).unwrap();
        let b = provide(&arch, Initializer::Uniform { low: -1., high: 1. }, Some(2)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn zero_and_const_need_no_randomness() {
        let arch = arch();
        let zeros = provide(&arch, Initializer::Zero, None).unwrap();
        assert!(zeros.iter().all(|w| w.iter().all(|&v| v == 0.0)));

        let halves = provide(&arch, Initializer::Const { value: 0.5 }, None).unwrap();
        assert!(halves.iter().all(|w| w.iter().all(|&v| v == 0.5)));
    }

    #[test]
    fn degenerate_dimensions_are_an_allocation_error() {
        let arch = validate(vec![
            Layer::input(2),
            Layer::dense(0, ActFn::sigmoid(1.)),
            Layer::output(1, ActFn::sigmoid(1.)),
        ])
        .unwrap();

        let err = provide(&arch, Initializer::Zero, None).unwrap_err();
        assert!(matches!(err, NetError::Allocation { rows: 0, cols: 2, .. }));
    }

    #[test]
    fn an_inverted_uniform_range_is_rejected() {
        let arch = arch();
        let err = provide(&arch, Initializer::Uniform { low: 1., high: -1. }, None).unwrap_err();
        assert!(matches!(err, NetError::InvalidDistribution(_)));
    }
}
