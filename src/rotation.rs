//! Vector-to-vector rotation
//!
//! Builds the rotation that carries one direction onto another using
//! Rodrigues' formula. Used to orient b-tensors and diffusion tensors.

use std::f64::consts::PI;

use nalgebra::{Matrix3, Vector3};

const PARALLEL_TOL: f64 = 1e-12;

/// Rotation matrix `R` such that `R * v` points along `k` with `|R * v| == |v|`.
///
/// Both vectors must be non-zero. Parallel inputs give the identity and
/// anti-parallel inputs a half turn about an axis orthogonal to `v`.
pub fn vec2vec_rotmat(v: &Vector3<f64>, k: &Vector3<f64>) -> Matrix3<f64> {
    let v_hat = v.normalize();
    let k_hat = k.normalize();

    let cross = v_hat.cross(&k_hat);
    let cos_angle = v_hat.dot(&k_hat).clamp(-1.0, 1.0);

    if cross.norm() < PARALLEL_TOL {
        if cos_angle > 0.0 {
            return Matrix3::identity();
        }
        let axis = orthogonal_axis(&v_hat);
        return rodrigues(&axis, PI);
    }

    rodrigues(&cross.normalize(), cos_angle.acos())
}

/// `R = I + sin(t) K + (1 - cos(t)) K^2` with `K` the cross-product matrix of `axis`.
fn rodrigues(axis: &Vector3<f64>, angle: f64) -> Matrix3<f64> {
    let k = axis.cross_matrix();
    Matrix3::identity() + k * angle.sin() + k * k * (1.0 - angle.cos())
}

/// Unit vector orthogonal to `v`, built from the basis axis least aligned with it.
fn orthogonal_axis(v: &Vector3<f64>) -> Vector3<f64> {
    let abs = v.abs();
    let basis = if abs.x <= abs.y && abs.x <= abs.z {
        Vector3::x()
    } else if abs.y <= abs.z {
        Vector3::y()
    } else {
        Vector3::z()
    };
    v.cross(&basis).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn assert_aligned(v: &Vector3<f64>, k: &Vector3<f64>) {
        let r = vec2vec_rotmat(v, k);
        let aligned = r * v;
        assert!((aligned.norm() - v.norm()).abs() < 1e-10);
        assert!((aligned.normalize() - k.normalize()).amax() < 1e-10);
        assert!((r.transpose() * r - Matrix3::identity()).amax() < 1e-10);
        assert!((r.determinant() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn random_pairs_are_aligned() {
        let mut rng = ChaCha8Rng::seed_from_u64(123);
        for _ in 0..10_000 {
            let v = Vector3::new(rng.gen::<f64>(), rng.gen::<f64>(), rng.gen::<f64>())
                - Vector3::repeat(0.5);
            let k = Vector3::new(rng.gen::<f64>(), rng.gen::<f64>(), rng.gen::<f64>())
                - Vector3::repeat(0.5);
            assert_aligned(&v, &k);
        }
    }

    #[test]
    fn parallel_vectors_give_identity() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        let r = vec2vec_rotmat(&v, &(2.5 * v));
        assert_relative_eq!(r, Matrix3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn antiparallel_vectors_flip_without_nan() {
        for v in [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, -3.0),
            Vector3::new(0.3, -0.7, 0.2),
        ] {
            let r = vec2vec_rotmat(&v, &(-v));
            assert!(r.iter().all(|x| x.is_finite()));
            assert_relative_eq!(r * v, -v, epsilon = 1e-12);
        }
    }

    #[test]
    fn x_axis_onto_z_axis() {
        let r = vec2vec_rotmat(&Vector3::x(), &Vector3::z());
        assert_relative_eq!(r * Vector3::x(), Vector3::z(), epsilon = 1e-12);
    }

    proptest! {
        #[test]
        fn rotation_preserves_norm_and_aligns(
            vx in -10.0f64..10.0, vy in -10.0f64..10.0, vz in -10.0f64..10.0,
            kx in -10.0f64..10.0, ky in -10.0f64..10.0, kz in -10.0f64..10.0,
        ) {
            let v = Vector3::new(vx, vy, vz);
            let k = Vector3::new(kx, ky, kz);
            prop_assume!(v.norm() > 1e-3 && k.norm() > 1e-3);
            let r = vec2vec_rotmat(&v, &k);
            let aligned = r * v;
            prop_assert!((aligned.norm() - v.norm()).abs() < 1e-9);
            prop_assert!((aligned.normalize() - k.normalize()).amax() < 1e-9);
        }
    }
}
