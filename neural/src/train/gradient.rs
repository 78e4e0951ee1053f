//! Gradient computation: analytic backpropagation and the finite-difference
//! approximation.
//!
//! Training always measures its loss at the final output layer, a `Focus`
//! marker only redirects evaluation.

use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;

use crate::{
    NetError, Result,
    arch::{Arch, Conv, Layer},
    network::{conv_forward, propagate},
};

/// A labelled sample: input vector and expected output vector.
pub type Sample<'a> = (&'a [f64], &'a [f64]);

/// Mean squared error between a prediction and its target.
pub(crate) fn mse(y_pred: &[f64], y: &[f64]) -> f64 {
    let n = y_pred.len().max(1);

    y_pred
        .iter()
        .zip(y)
        .map(|(p, t)| (p - t).powi(2))
        .sum::<f64>()
        / n as f64
}

fn sample_loss(arch: &Arch, weights: &[Array2<f64>], sample: Sample) -> Result<f64> {
    let (input, target) = sample;
    let y_pred = propagate(arch, weights, input, false)?;

    if target.len() != y_pred.len() {
        return Err(NetError::ShapeMismatch {
            what: "target",
            got: target.len(),
            expected: y_pred.len(),
        });
    }

    Ok(mse(&y_pred, target))
}

/// The mean loss of a batch under the current weights.
///
/// # Arguments
/// * `arch` - The validated architecture.
/// * `weights` - The junction matrices, read only.
/// * `samples` - The `(input, target)` pairs.
///
/// # Returns
/// The mean squared error over the batch.
pub fn batch_loss(arch: &Arch, weights: &[Array2<f64>], samples: &[Sample]) -> Result<f64> {
    let mut total = 0.0;

    for &sample in samples {
        total += sample_loss(arch, weights, sample)?;
    }

    Ok(total / samples.len().max(1) as f64)
}

struct Trace {
    /// Pre-activations per junction.
    zs: Vec<Vec<f64>>,
    /// Activations, position 0 is the input itself.
    activations: Vec<Vec<f64>>,
}

fn forward_trace(arch: &Arch, weights: &[Array2<f64>], input: &[f64]) -> Result<Trace> {
    let layers = arch.layers();
    let expected = layers[0].neurons();

    if input.len() != expected {
        return Err(NetError::ShapeMismatch {
            what: "input",
            got: input.len(),
            expected,
        });
    }

    let mut zs = Vec::with_capacity(weights.len());
    let mut activations = Vec::with_capacity(weights.len() + 1);
    activations.push(input.to_vec());

    for (layer, w) in layers[1..].iter().zip(weights) {
        // the last pushed activation feeds this junction
        let a_prev = &activations[activations.len() - 1];

        let (z, act) = match layer.effective() {
            Layer::Dense { act_fn, .. } | Layer::Output { act_fn, .. } => {
                (w.dot(&ArrayView1::from(&a_prev[..])).to_vec(), *act_fn)
            }
            Layer::Conv(conv) => (conv_forward(conv, w, a_prev), conv.act_fn()),
            // validation rejects inputs and nested focus past position 0
            Layer::Input { .. } | Layer::Focus(_) => unreachable!(),
        };

        let a = z.iter().map(|&v| act.f(v)).collect();
        zs.push(z);
        activations.push(a);
    }

    Ok(Trace { zs, activations })
}

/// Analytic gradients for one sample via backpropagation.
///
/// Propagates the error signal from the output layer backward, chaining
/// each activation derivative and, for convolutions, the backward
/// convolution through the padded and strided receptive fields.
///
/// # Arguments
/// * `arch` - The validated architecture.
/// * `weights` - The junction matrices, read only.
/// * `sample` - The `(input, target)` pair.
///
/// # Returns
/// One gradient matrix per junction plus the sample loss.
pub(crate) fn backprop(
    arch: &Arch,
    weights: &[Array2<f64>],
    sample: Sample,
) -> Result<(Vec<Array2<f64>>, f64)> {
    let (input, target) = sample;
    let trace = forward_trace(arch, weights, input)?;

    let njunctions = weights.len();
    let y_pred = &trace.activations[njunctions];

    if target.len() != y_pred.len() {
        return Err(NetError::ShapeMismatch {
            what: "target",
            got: target.len(),
            expected: y_pred.len(),
        });
    }

    let loss = mse(y_pred, target);

    // dL/da at the output, the 2/n factor matching the mse mean
    let n = y_pred.len() as f64;
    let mut d: Vec<f64> = y_pred
        .iter()
        .zip(target)
        .map(|(p, t)| 2.0 * (p - t) / n)
        .collect();

    let mut grads = Vec::with_capacity(njunctions);

    for j in (0..njunctions).rev() {
        let layer = arch.layers()[j + 1].effective();
        let z = &trace.zs[j];
        let a_prev = &trace.activations[j];

        match layer {
            Layer::Dense { act_fn, .. } | Layer::Output { act_fn, .. } => {
                let delta: Vec<f64> = d.iter().zip(z).map(|(d, &z)| d * act_fn.df(z)).collect();

                let (rows, cols) = weights[j].dim();
                let mut dw = Array2::zeros((rows, cols));

                for (r, &dz) in delta.iter().enumerate() {
                    for (c, &ap) in a_prev.iter().enumerate() {
                        dw[[r, c]] = dz * ap;
                    }
                }

                d = weights[j].t().dot(&ArrayView1::from(&delta[..])).to_vec();
                grads.push(dw);
            }
            Layer::Conv(conv) => {
                let delta: Vec<f64> = d
                    .iter()
                    .zip(z)
                    .map(|(d, &z)| d * conv.act_fn().df(z))
                    .collect();

                let (dw, d_prev) = conv_backward(conv, &weights[j], a_prev, &delta);
                d = d_prev;
                grads.push(dw);
            }
            Layer::Input { .. } | Layer::Focus(_) => unreachable!(),
        }
    }

    grads.reverse();
    Ok((grads, loss))
}

/// Backward convolution: the gradient w.r.t. the filter bank and w.r.t. the
/// input volume, scattering each output delta back through its receptive
/// field.
fn conv_backward(
    conv: &Conv,
    bank: &Array2<f64>,
    input: &[f64],
    delta: &[f64],
) -> (Array2<f64>, Vec<f64>) {
    let (w, h, depth) = conv.dim_in();
    let (fw, fh) = conv.field();
    let (ow, oh) = (conv.out_w(), conv.out_h());
    let stride = conv.stride();
    let padding = conv.padding() as isize;

    let mut d_bank = Array2::zeros(conv.bank_dim());
    let mut d_input = vec![0.0; conv.in_neurons()];

    for f in 0..conv.filters() {
        for oy in 0..oh {
            for ox in 0..ow {
                let dz = delta[f * ow * oh + oy * ow + ox];

                for c in 0..depth {
                    for ky in 0..fh {
                        for kx in 0..fw {
                            let iy = (oy * stride + ky) as isize - padding;
                            let ix = (ox * stride + kx) as isize - padding;

                            if iy < 0 || ix < 0 || iy >= h as isize || ix >= w as isize {
                                continue;
                            }

                            let xi = c * w * h + iy as usize * w + ix as usize;
                            let ki = c * fh * fw + ky * fw + kx;

                            d_bank[[f, ki]] += dz * input[xi];
                            d_input[xi] += dz * bank[[f, ki]];
                        }
                    }
                }
            }
        }
    }

    (d_bank, d_input)
}

/// Numerical gradients via symmetric finite differences.
///
/// Perturbs every weight by `±epsilon`, re-evaluates the batch loss and
/// divides the difference by `2 * epsilon`. Strictly slower than the
/// analytic path, used when an activator lacks a usable derivative or to
/// audit backpropagation.
fn approximate(
    arch: &Arch,
    weights: &[Array2<f64>],
    samples: &[Sample],
    epsilon: f64,
) -> Result<(Vec<Array2<f64>>, f64)> {
    let mut scratch: Vec<Array2<f64>> = weights.to_vec();
    let mut grads = Vec::with_capacity(weights.len());
    let base = batch_loss(arch, weights, samples)?;

    for j in 0..weights.len() {
        let (rows, cols) = weights[j].dim();
        let mut dw = Array2::zeros((rows, cols));

        for r in 0..rows {
            for c in 0..cols {
                scratch[j][[r, c]] += epsilon;
                let plus = batch_loss(arch, &scratch, samples)?;

                scratch[j][[r, c]] -= 2.0 * epsilon;
                let minus = batch_loss(arch, &scratch, samples)?;

                scratch[j][[r, c]] = weights[j][[r, c]];
                dw[[r, c]] = (plus - minus) / (2.0 * epsilon);
            }
        }

        grads.push(dw);
    }

    Ok((grads, base))
}

fn add_grads(mut a: Vec<Array2<f64>>, b: Vec<Array2<f64>>) -> Vec<Array2<f64>> {
    for (a, b) in a.iter_mut().zip(b) {
        *a += &b;
    }

    a
}

/// Mean gradients and mean loss of a batch under the current weights.
///
/// Per-sample contributions run concurrently on `pool` and are reduced by
/// summation before the caller's single weight update, so the whole batch
/// sees one stable weight snapshot. The reduction is commutative, the
/// result does not depend on how rayon splits the batch.
///
/// # Arguments
/// * `arch` - The validated architecture.
/// * `weights` - The junction matrices, read only.
/// * `samples` - The `(input, target)` pairs, must be non-empty.
/// * `approximation` - Finite-difference epsilon, the analytic path when
///                     `None`.
/// * `pool` - The worker pool bounding the parallelism degree.
///
/// # Returns
/// One mean gradient matrix per junction plus the mean batch loss.
pub fn batch_gradient(
    arch: &Arch,
    weights: &[Array2<f64>],
    samples: &[Sample],
    approximation: Option<f64>,
    pool: &rayon::ThreadPool,
) -> Result<(Vec<Array2<f64>>, f64)> {
    if samples.is_empty() {
        return Err(NetError::ShapeMismatch {
            what: "samples",
            got: 0,
            expected: 1,
        });
    }

    if let Some(epsilon) = approximation {
        return approximate(arch, weights, samples, epsilon);
    }

    let summed: Result<Option<(Vec<Array2<f64>>, f64)>> = pool.install(|| {
        samples
            .par_iter()
            .fold(
                || Ok(None),
                |acc: Result<Option<(Vec<Array2<f64>>, f64)>>, &sample| {
                    let mut acc = acc?;
                    let (g, l) = backprop(arch, weights, sample)?;

                    Ok(Some(match acc.take() {
                        None => (g, l),
                        Some((ga, la)) => (add_grads(ga, g), la + l),
                    }))
                },
            )
            .reduce(
                || Ok(None),
                |a, b| {
                    let (a, b) = (a?, b?);

                    Ok(match (a, b) {
                        (None, x) | (x, None) => x,
                        (Some((ga, la)), Some((gb, lb))) => Some((add_grads(ga, gb), la + lb)),
                    })
                },
            )
    });

    // the batch was checked non-empty above
    let (sum, loss_sum) = summed?.unwrap();
    let n = samples.len() as f64;

    let grads = sum.into_iter().map(|g| g / n).collect();
    Ok((grads, loss_sum / n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        arch::{activations::ActFn, validate},
        init::{Initializer, provide},
        train::build_pool,
    };

    fn max_abs_diff(a: &[Array2<f64>], b: &[Array2<f64>]) -> f64 {
        a.iter()
            .zip(b)
            .flat_map(|(a, b)| a.iter().zip(b).map(|(a, b)| (a - b).abs()))
            .fold(0.0, f64::max)
    }

    #[test]
    fn analytic_and_approximated_gradients_agree() {
        let arch = validate(vec![
            Layer::input(2),
            Layer::dense(3, ActFn::sigmoid(1.)),
            Layer::output(1, ActFn::sigmoid(1.)),
        ])
        .unwrap();
        let weights = provide(&arch, Initializer::Uniform { low: -1., high: 1. }, Some(3)).unwrap();

        let input = [0.4, -0.7];
        let target = [0.3];
        let samples: Vec<Sample> = vec![(&input, &target)];

        let pool = build_pool(1).unwrap();
        let (analytic, _) = batch_gradient(&arch, &weights, &samples, None, &pool).unwrap();
        let (approx, _) = batch_gradient(&arch, &weights, &samples, Some(1e-6), &pool).unwrap();

        assert!(max_abs_diff(&analytic, &approx) < 1e-4);
    }

    #[test]
    fn gradients_through_a_convolution_agree_with_the_approximation() {
        let conv = Conv::new((3, 3, 1), (2, 2), 2, 1, 0, ActFn::tanh()).unwrap();
        let arch = validate(vec![
            Layer::input(9),
            Layer::Conv(conv),
            Layer::output(2, ActFn::sigmoid(1.)),
        ])
        .unwrap();
        let weights =
            provide(&arch, Initializer::Uniform { low: -0.5, high: 0.5 }, Some(5)).unwrap();

        let input = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9];
        let target = [1.0, 0.0];
        let samples: Vec<Sample> = vec![(&input, &target)];

        let pool = build_pool(1).unwrap();
        let (analytic, _) = batch_gradient(&arch, &weights, &samples, None, &pool).unwrap();
        let (approx, _) = batch_gradient(&arch, &weights, &samples, Some(1e-6), &pool).unwrap();

        assert!(max_abs_diff(&analytic, &approx) < 1e-4);
    }

    #[test]
    fn a_linear_junction_has_the_textbook_gradient() {
        // one junction, identity activation: loss = (w * x - y)^2 so
        // dL/dw = 2 * (w * x - y) * x
        let arch = validate(vec![Layer::input(1), Layer::output(1, ActFn::Identity)]).unwrap();
        let weights = vec![Array2::from_shape_vec((1, 1), vec![3.0]).unwrap()];

        let input = [1.0];
        let target = [0.0];
        let samples: Vec<Sample> = vec![(&input, &target)];

        let pool = build_pool(1).unwrap();
        let (grads, loss) = batch_gradient(&arch, &weights, &samples, None, &pool).unwrap();

        assert_eq!(loss, 9.0);
        assert_eq!(grads[0][[0, 0]], 6.0);
    }

    #[test]
    fn parallel_reduction_matches_the_sequential_sum() {
        let arch = validate(vec![
            Layer::input(2),
            Layer::dense(4, ActFn::tanh()),
            Layer::output(2, ActFn::Identity),
        ])
        .unwrap();
        let weights = provide(&arch, Initializer::Uniform { low: -1., high: 1. }, Some(9)).unwrap();

        let inputs: Vec<[f64; 2]> = (0..32).map(|i| [i as f64 * 0.1, -(i as f64) * 0.05]).collect();
        let targets: Vec<[f64; 2]> = (0..32).map(|i| [(i % 2) as f64, (i % 3) as f64]).collect();
        let samples: Vec<Sample> = inputs
            .iter()
            .zip(&targets)
            .map(|(x, y)| (x.as_slice(), y.as_slice()))
            .collect();

        let serial_pool = build_pool(1).unwrap();
        let parallel_pool = build_pool(4).unwrap();

        let (serial, serial_loss) =
            batch_gradient(&arch, &weights, &samples, None, &serial_pool).unwrap();
        let (parallel, parallel_loss) =
            batch_gradient(&arch, &weights, &samples, None, &parallel_pool).unwrap();

        assert!((serial_loss - parallel_loss).abs() < 1e-9);
        assert!(max_abs_diff(&serial, &parallel) < 1e-9);
    }

    #[test]
    fn a_mismatched_target_is_a_shape_error() {
        let arch = validate(vec![Layer::input(1), Layer::output(2, ActFn::Identity)]).unwrap();
        let weights = provide(&arch, Initializer::Zero, None).unwrap();

        let input = [1.0];
        let target = [0.0];
        let samples: Vec<Sample> = vec![(&input, &target)];

        let pool = build_pool(1).unwrap();
        let err = batch_gradient(&arch, &weights, &samples, None, &pool).unwrap_err();
        assert!(matches!(
            err,
            NetError::ShapeMismatch { what: "target", got: 1, expected: 2 }
        ));
    }
}
