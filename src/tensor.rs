//! Diffusion tensor helpers
//!
//! Construction of oriented tensors and the first two moments of a
//! diffusion tensor distribution in Mandel notation.

use std::f64::consts::SQRT_2;

use nalgebra::{Matrix3, Matrix6, Vector3, Vector6};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::error::SimError;
use crate::rotation::vec2vec_rotmat;

/// Diagonal tensor `diag(evals)` rotated so that its first axis lies along `direction`.
pub fn oriented_tensor(evals: [f64; 3], direction: &Vector3<f64>) -> Matrix3<f64> {
    let r = vec2vec_rotmat(&Vector3::x(), direction);
    r * Matrix3::from_diagonal(&Vector3::from(evals)) * r.transpose()
}

/// Axially symmetric tensor with diffusivity `axial` along `direction` and `radial` across it.
pub fn axisymmetric_tensor(direction: &Vector3<f64>, axial: f64, radial: f64) -> Matrix3<f64> {
    oriented_tensor([axial, radial, radial], direction)
}

/// Mandel 6-vector `[xx, yy, zz, sqrt2 yz, sqrt2 xz, sqrt2 xy]` of a symmetric tensor.
///
/// The dot product of two Mandel vectors equals the full contraction of the tensors.
pub fn to_mandel(t: &Matrix3<f64>) -> Vector6<f64> {
    Vector6::new(
        t[(0, 0)],
        t[(1, 1)],
        t[(2, 2)],
        SQRT_2 * t[(1, 2)],
        SQRT_2 * t[(0, 2)],
        SQRT_2 * t[(0, 1)],
    )
}

/// Inverse of [`to_mandel`].
pub fn from_mandel(v: &Vector6<f64>) -> Matrix3<f64> {
    let yz = v[3] / SQRT_2;
    let xz = v[4] / SQRT_2;
    let xy = v[5] / SQRT_2;
    Matrix3::new(v[0], xy, xz, xy, v[1], yz, xz, yz, v[2])
}

/// Mean tensor of a distribution.
pub fn dtd_mean(dtd: &[Matrix3<f64>]) -> Result<Matrix3<f64>, SimError> {
    if dtd.is_empty() {
        return Err(SimError::shape("dtd", "(M, 3, 3) with M > 0", &[0, 3, 3]));
    }
    let sum: Matrix3<f64> = dtd.iter().sum();
    Ok(sum / dtd.len() as f64)
}

/// Population covariance of the Mandel vectors of a distribution (6x6).
pub fn dtd_covariance(dtd: &[Matrix3<f64>]) -> Result<Matrix6<f64>, SimError> {
    let mean = to_mandel(&dtd_mean(dtd)?);
    let second: Matrix6<f64> = dtd
        .iter()
        .map(|d| {
            let v = to_mandel(d);
            v * v.transpose()
        })
        .sum();
    Ok(second / dtd.len() as f64 - mean * mean.transpose())
}

/// `count` tensors with uniform eigenvalues in `[0, max_eval)` and isotropically random orientation.
pub fn sample_oriented_dtd<R: Rng + ?Sized>(
    count: usize,
    max_eval: f64,
    rng: &mut R,
) -> Vec<Matrix3<f64>> {
    (0..count)
        .map(|_| {
            let direction = loop {
                let k: Vector3<f64> = Vector3::new(
                    StandardNormal.sample(rng),
                    StandardNormal.sample(rng),
                    StandardNormal.sample(rng),
                );
                if k.norm() > 1e-12 {
                    break k;
                }
            };
            let evals = [
                max_eval * rng.gen::<f64>(),
                max_eval * rng.gen::<f64>(),
                max_eval * rng.gen::<f64>(),
            ];
            oriented_tensor(evals, &direction)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn oriented_tensor_keeps_eigenvalues() {
        let dir = Vector3::new(0.2, -0.4, 0.9);
        let d = oriented_tensor([3.0, 1.0, 0.5], &dir);
        assert_relative_eq!(d, d.transpose(), epsilon = 1e-12);
        assert_relative_eq!(d.trace(), 4.5, epsilon = 1e-12);
        assert_relative_eq!(d * dir.normalize(), 3.0 * dir.normalize(), epsilon = 1e-12);
    }

    #[test]
    fn mandel_dot_is_full_contraction() {
        let a = oriented_tensor([1.0, 2.0, 3.0], &Vector3::new(1.0, 1.0, 0.0));
        let b = axisymmetric_tensor(&Vector3::new(0.0, 1.0, 1.0), 2.0, 0.5);
        assert_relative_eq!(to_mandel(&a).dot(&to_mandel(&b)), a.dot(&b), epsilon = 1e-12);
        assert_relative_eq!(from_mandel(&to_mandel(&a)), a, epsilon = 1e-12);
    }

    #[test]
    fn identical_tensors_have_zero_covariance() {
        let d = axisymmetric_tensor(&Vector3::z(), 2.0, 0.3);
        let cov = dtd_covariance(&[d; 5]).expect("non-empty");
        assert!(cov.amax() < 1e-12);
    }

    #[test]
    fn two_isotropic_tensors_have_bulk_variance() {
        let dtd = [Matrix3::identity() * 1.0, Matrix3::identity() * 3.0];
        let cov = dtd_covariance(&dtd).expect("non-empty");
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(cov[(i, j)], 1.0, epsilon = 1e-12);
            }
        }
        assert_relative_eq!(cov[(3, 3)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn empty_distribution_is_rejected() {
        assert!(dtd_mean(&[]).is_err());
        assert!(dtd_covariance(&[]).is_err());
    }

    #[test]
    fn sampled_tensors_are_positive_semidefinite() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let dtd = sample_oriented_dtd(50, 1.0, &mut rng);
        assert_eq!(dtd.len(), 50);
        for d in &dtd {
            assert!(d.symmetric_eigenvalues().iter().all(|&e| e > -1e-12 && e < 1.0 + 1e-12));
        }
    }
}
