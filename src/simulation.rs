//! Diffusion tensor distribution signal simulation
//!
//! Evaluates the generalized Stejskal-Tanner equation for every pair of
//! measurement b-tensor and distribution tensor, then averages the decays
//! with the population weights.
//!
//! Summation order: for measurement `i` the tensors are visited in index
//! order `j = 0..M`, and each contraction `<B_i, D_j>` is accumulated row by
//! row (`a` outer, `b` inner). Other orders agree to within rounding.

use nalgebra::Matrix3;
use ndarray::{Array1, ArrayViewD, Ix1, Ix3};

use crate::config::SimulationConfig;
use crate::error::SimError;
use crate::protocol::Protocol;

/// Weights are expected, not required, to sum to one within this tolerance.
const WEIGHT_SUM_TOL: f64 = 1e-6;

/// Simulate the signal of a distribution given as a dynamically shaped array.
///
/// `dtd` must have shape (M, 3, 3) with M > 0 and `p`, when given, shape (M,).
/// Zero-dimensional arrays are type errors; wrong ranks or lengths are shape
/// errors; negative weights or a non-positive exponent are value errors.
pub fn dtd_simulation(
    protocol: &Protocol,
    dtd: ArrayViewD<'_, f64>,
    p: Option<ArrayViewD<'_, f64>>,
    generalized_exponent: f64,
) -> Result<Array1<f64>, SimError> {
    if dtd.ndim() == 0 {
        return Err(SimError::Type {
            argument: "dtd",
            expected: "an array of shape (M, 3, 3)",
        });
    }
    if matches!(&p, Some(weights) if weights.ndim() == 0) {
        return Err(SimError::Type {
            argument: "p",
            expected: "an array of shape (M,)",
        });
    }

    let got = dtd.shape().to_vec();
    let dtd = dtd
        .into_dimensionality::<Ix3>()
        .map_err(|_| SimError::shape("dtd", "(M, 3, 3)", &got))?;
    if dtd.shape()[1] != 3 || dtd.shape()[2] != 3 || dtd.shape()[0] == 0 {
        return Err(SimError::shape("dtd", "(M, 3, 3) with M > 0", &got));
    }
    let m = dtd.shape()[0];

    let weights = match p {
        Some(weights) => {
            let got = weights.shape().to_vec();
            let weights = weights
                .into_dimensionality::<Ix1>()
                .map_err(|_| SimError::shape("p", format!("({m},)"), &got))?;
            if weights.len() != m {
                return Err(SimError::shape("p", format!("({m},)"), &got));
            }
            Some(weights.to_vec())
        }
        None => None,
    };

    let tensors: Vec<Matrix3<f64>> = dtd
        .outer_iter()
        .map(|t| Matrix3::from_fn(|a, b| t[[a, b]]))
        .collect();

    let config = SimulationConfig {
        population_weights: weights,
        generalized_exponent,
    };
    simulate(protocol, &tensors, &config).map(Array1::from)
}

/// Simulate the signal of a distribution of tensors under `protocol`.
///
/// Returns one attenuation value per measurement.
pub fn simulate(
    protocol: &Protocol,
    dtd: &[Matrix3<f64>],
    config: &SimulationConfig,
) -> Result<Vec<f64>, SimError> {
    if dtd.is_empty() {
        return Err(SimError::shape("dtd", "(M, 3, 3) with M > 0", &[0, 3, 3]));
    }
    if let Some(weights) = &config.population_weights {
        if weights.len() != dtd.len() {
            return Err(SimError::shape(
                "p",
                format!("({},)", dtd.len()),
                &[weights.len()],
            ));
        }
    }
    config.validate()?;
    if let Some(i) = dtd.iter().position(|d| d.iter().any(|x| !x.is_finite())) {
        return Err(SimError::value("dtd", format!("tensor {i} must be finite")));
    }

    let weights = match &config.population_weights {
        Some(weights) => {
            if !sums_to_one(weights) {
                let total: f64 = weights.iter().sum();
                tracing::warn!(total, "population weights do not sum to one");
            }
            weights.clone()
        }
        None => vec![1.0 / dtd.len() as f64; dtd.len()],
    };

    tracing::debug!(
        measurements = protocol.len(),
        tensors = dtd.len(),
        generalized_exponent = config.generalized_exponent,
        "simulating dtd signal"
    );

    Ok(protocol
        .btens()
        .iter()
        .map(|bten| ensemble_decay(bten, dtd, &weights, config.generalized_exponent))
        .collect())
}

fn sums_to_one(weights: &[f64]) -> bool {
    (weights.iter().sum::<f64>() - 1.0).abs() <= WEIGHT_SUM_TOL
}

/// Population-weighted average of the per-tensor decays for one b-tensor.
fn ensemble_decay(
    bten: &Matrix3<f64>,
    dtd: &[Matrix3<f64>],
    weights: &[f64],
    generalized_exponent: f64,
) -> f64 {
    dtd.iter()
        .zip(weights)
        .map(|(d, &w)| w * decay(contract(bten, d), generalized_exponent))
        .sum()
}

/// Full tensor contraction `sum_ab B_ab D_ab`.
fn contract(bten: &Matrix3<f64>, d: &Matrix3<f64>) -> f64 {
    let mut acc = 0.0;
    for a in 0..3 {
        for b in 0..3 {
            acc += bten[(a, b)] * d[(a, b)];
        }
    }
    acc
}

/// `exp(-x^gamma)`, sign-preserving so that negative contractions stay finite.
fn decay(x: f64, generalized_exponent: f64) -> f64 {
    if generalized_exponent == 1.0 {
        return (-x).exp();
    }
    (-(x.signum() * x.abs().powf(generalized_exponent))).exp()
}
